use thiserror::Error;

/// Reasons a request fails to authenticate. All of them surface as 401.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingCredentials,
    #[error("Authorization header must be \"Bearer <token>\"")]
    MalformedHeader,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid username or password")]
    InvalidCredentials,
}
