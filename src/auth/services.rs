use tracing::{info, warn};

use crate::{
    auth::{
        claims::Principal,
        error::AuthError,
        jwt::JwtKeys,
        password::{hash_password, verify_password, DUMMY_HASH},
        repo::{UserStore, UsernameTaken},
        repo_types::User,
    },
    error::{ApiError, ApiResult},
};

pub(crate) const DEFAULT_AVATAR: &str = "https://example.com/avatar.jpg";

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 6;

pub(crate) fn validate_registration(username: &str, password: &str) -> ApiResult<()> {
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ApiError::validation(format!(
            "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if password.chars().count() < PASSWORD_MIN {
        return Err(ApiError::validation(format!(
            "password must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

pub async fn register(users: &dyn UserStore, username: &str, password: &str) -> ApiResult<User> {
    validate_registration(username, password)?;

    if users.exists(username).await? {
        warn!(%username, "username already registered");
        return Err(ApiError::validation("username already exists"));
    }

    let hash = hash_password(password)?;
    let user = users.insert(username, &hash).await.map_err(|e| {
        if e.is::<UsernameTaken>() {
            warn!(%username, "username taken during insert");
            ApiError::validation("username already exists")
        } else {
            ApiError::Store(e)
        }
    })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Checks credentials and issues a bearer token for the user.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    username: &str,
    password: &str,
) -> ApiResult<(String, Principal)> {
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }

    let Some(user) = users.find_by_username(username).await? else {
        // same Argon2 work as a wrong password
        let _ = verify_password(password, DUMMY_HASH);
        warn!(%username, "login unknown username");
        return Err(AuthError::InvalidCredentials.into());
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(%username, user_id = user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let principal = user.principal();
    let token = keys.sign(&principal)?;
    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok((token, principal))
}

pub async fn current_user(users: &dyn UserStore, principal: &Principal) -> ApiResult<User> {
    users
        .find_by_id(principal.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))
}
