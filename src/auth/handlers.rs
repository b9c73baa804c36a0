use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest},
        extractors::Session,
        jwt::SessionKeys,
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/current-user", get(current_user))
}

/// A missing or unparseable body is reported the same way as empty fields.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(v)| v)
        .map_err(|_| AppError::validation("No data provided"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user = services::login(&*state.store, body(payload)?).await?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(&user).map_err(|e| {
        error!(error = %e, user_id = user.id, "session sign failed");
        e
    })?;

    Ok((
        [(header::SET_COOKIE, keys.session_cookie(&token))],
        Json(PublicUser::from(&user)),
    ))
}

/// Always succeeds, signed in or not.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    if let Some(identity) = session.identity() {
        info!(user_id = identity.user_id, "user logged out");
    }
    let keys = SessionKeys::from_ref(&state);
    (
        [(header::SET_COOKIE, keys.expired_cookie())],
        Json(json!({ "message": "Logged out" })),
    )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::register(
        &*state.store,
        state.config.password_scheme,
        body(payload)?,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

#[instrument(skip(state, session))]
pub async fn current_user(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::current_user(&*state.store, &session).await?;
    Ok(Json(PublicUser::from(&user)))
}
