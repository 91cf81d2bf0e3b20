use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::RegisterRequest,
        jwt::{IssuedToken, JwtKeys},
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    error::AppError,
};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    /// Checked when the email is unknown; same argon2 parameters as stored digests.
    static ref DUMMY_HASH: String = hash_password("oju-mountain-no-such-user").unwrap_or_default();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Emails are identity keys: compared and stored trimmed and lowercased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name must not be empty".into()));
    }
    Ok(name.to_string())
}

pub async fn register(store: &dyn UserStore, req: RegisterRequest) -> Result<User, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    validate_password(&req.password)?;
    let name = validate_name(&req.name)?;

    let password_hash = hash_password(&req.password)?;

    let new_user = NewUser {
        email,
        password_hash,
        name,
        role: req.role.unwrap_or_default(),
        is_active: req.is_active.unwrap_or(true),
    };
    let email = new_user.email.clone();

    match store.insert(new_user).await? {
        Some(user) => {
            info!(user_id = %user.id, email = %user.email, role = user.role.as_str(), "user registered");
            Ok(user)
        }
        None => {
            warn!(email = %email, "email already registered");
            Err(AppError::Conflict("Email already registered".into()))
        }
    }
}

/// Unknown email, wrong password and inactive account all yield `InvalidCredentials`.
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<(IssuedToken, User), AppError> {
    let email = normalize_email(email);

    let found = store.find_by_email(&email).await?;
    let digest = found
        .as_ref()
        .map_or(DUMMY_HASH.as_str(), |u| u.password_hash.as_str());
    let password_ok = verify_password(password, digest);

    let Some(user) = found else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !password_ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login for inactive user");
        return Err(AppError::InvalidCredentials);
    }

    let issued = keys.issue(&user.email)?;
    info!(user_id = %user.id, "user logged in");
    Ok((issued, user))
}
