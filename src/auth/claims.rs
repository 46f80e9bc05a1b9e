use serde::{Deserialize, Serialize};

/// Identity of the caller, derived from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
}

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,   // user ID
    pub username: String,
    pub iat: i64,       // issued at (unix timestamp)
    pub exp: i64,       // expires at (unix timestamp)
    pub iss: String,    // issuer
    pub aud: String,    // audience
}

impl From<Claims> for Principal {
    fn from(c: Claims) -> Self {
        Self {
            user_id: c.user_id,
            username: c.username,
        }
    }
}
