use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        extractors::Session,
        password::{hash_password, verify_password, PasswordScheme},
        repo_types::{Role, User},
    },
    error::AppError,
    store::{self, RecordStore},
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Checks credentials. Unknown usernames and wrong passwords produce the same
/// error; there is no throttling of repeated attempts.
pub async fn login(store: &dyn RecordStore, req: LoginRequest) -> Result<User, AppError> {
    let (username, password) = match (req.username, req.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => return Err(AppError::validation("Username and password are required")),
    };

    let Some(user) = User::find_by_username(store, &username).await else {
        warn!(%username, "login unknown username");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let verified = verify_password(&password, &user.password_hash).unwrap_or_else(|e| {
        warn!(%username, user_id = user.id, error = %e, "stored password hash is unreadable");
        false
    });
    if !verified {
        warn!(%username, user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    info!(user_id = user.id, %username, "user logged in");
    Ok(user)
}

pub async fn register(
    store: &dyn RecordStore,
    scheme: PasswordScheme,
    req: RegisterRequest,
) -> Result<User, AppError> {
    let (username, password) = match (req.username, req.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => return Err(AppError::validation("Username and password are required")),
    };

    if username.chars().count() < 3 {
        return Err(AppError::validation(
            "Username must be at least 3 characters long",
        ));
    }
    if password.chars().count() < 6 {
        return Err(AppError::validation(
            "Password must be at least 6 characters long",
        ));
    }

    let role = match req.role.as_deref() {
        None => Role::Student,
        Some(raw) => Role::parse(raw)
            .ok_or_else(|| AppError::validation(format!("Unknown role '{raw}'")))?,
    };

    let mut users = User::load_for_update(store).await?;
    if users.iter().any(|u| u.username == username) {
        warn!(%username, "username already registered");
        return Err(AppError::validation(
            "A user with this username already exists",
        ));
    }

    let user = User {
        id: store::next_id(users.iter().map(|u| u.id)),
        username,
        password_hash: hash_password(&password, scheme)?,
        role,
        email: req.email,
        created_at: OffsetDateTime::now_utc(),
    };
    users.push(user.clone());

    if !User::save_all(store, &users).await {
        return Err(AppError::Persistence("users"));
    }

    info!(user_id = user.id, username = %user.username, role = %user.role, "user registered");
    Ok(user)
}

/// Resolves the session to its stored user record.
pub async fn current_user(store: &dyn RecordStore, session: &Session) -> Result<User, AppError> {
    let identity = session
        .identity()
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;
    User::find_by_id(store, identity.user_id)
        .await
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))
}
