use super::claims::Principal;
use crate::error::ApiError;

/// Mutations that require ownership. Reads never go through the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

pub fn authorize(principal: &Principal, owner_id: i64, _action: Action) -> Decision {
    if principal.user_id == owner_id {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// `authorize`, with `Deny` turned into a 403.
pub fn require_owner(principal: &Principal, owner_id: i64, action: Action) -> Result<(), ApiError> {
    match authorize(principal, owner_id, action) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            tracing::warn!(
                user_id = principal.user_id,
                owner_id,
                action = action.verb(),
                "ownership check denied"
            );
            Err(ApiError::Forbidden(format!(
                "no permission to {} this article",
                action.verb()
            )))
        }
    }
}
