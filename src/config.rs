use std::path::PathBuf;

use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;

use crate::auth::password::PasswordScheme;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_name: String,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub public_dir: PathBuf,
    pub session: SessionConfig,
    pub password_scheme: PasswordScheme,
    pub max_upload_bytes: usize,
    pub cors_origin: Option<String>,
    pub seed_data: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = match std::env::var("SESSION_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!("SESSION_SECRET not set; sessions will not survive a restart");
                random_secret()
            }
        };
        let session = SessionConfig {
            secret,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "student-directory".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "student-directory-web".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
            cookie_name: std::env::var("SESSION_COOKIE").unwrap_or_else(|_| "session".into()),
            secure_cookie: env_flag("SESSION_COOKIE_SECURE", false),
        };

        let password_scheme = match std::env::var("PASSWORD_SCHEME") {
            Ok(v) => v.parse()?,
            Err(_) => PasswordScheme::default(),
        };

        Ok(Self {
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "data".into())
                .into(),
            public_dir: std::env::var("PUBLIC_DIR")
                .unwrap_or_else(|_| "public".into())
                .into(),
            session,
            password_scheme,
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(5 * 1024 * 1024),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            seed_data: env_flag("SEED_DATA", true),
        })
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.public_dir.join("images").join("uploads")
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}
