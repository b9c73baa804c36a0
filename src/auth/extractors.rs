use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::debug;

use super::{jwt::SessionKeys, repo_types::Role};
use crate::error::AppError;

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Per-request session context handed to every handler that cares who is
/// calling. A missing, expired or tampered token is simply `Anonymous`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(identity) => Some(identity),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.identity().map(|i| i.user_id)
    }

    pub fn require(&self) -> Result<&Identity, AppError> {
        self.identity().ok_or_else(AppError::login_required)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let Some(token) = bearer_token(parts).or_else(|| cookie_value(parts, &keys.cookie_name))
        else {
            return Ok(Session::Anonymous);
        };

        let claims = match keys.verify(&token) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "ignoring invalid session token");
                return Ok(Session::Anonymous);
            }
        };

        let Ok(user_id) = claims.sub.parse::<i64>() else {
            debug!(sub = %claims.sub, "session subject is not a user id");
            return Ok(Session::Anonymous);
        };

        Ok(Session::Authenticated(Identity {
            user_id,
            username: claims.username,
            role: claims.role,
        }))
    }
}

/// The caller's identity, for handlers that need a login. Rejects with 401
/// before any later extractor reads the body.
#[derive(Debug, Clone)]
pub struct RequiredIdentity(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for RequiredIdentity
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Session::from_request_parts(parts, state).await {
            Ok(Session::Authenticated(identity)) => Ok(Self(identity)),
            Ok(Session::Anonymous) => Err(AppError::login_required()),
            Err(never) => match never {},
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}
