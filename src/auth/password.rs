use std::str::FromStr;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};
use tracing::error;

/// How new password hashes are produced. Verification accepts either format.
///
/// `Sha256` is a single unsalted pass and is weak; it stays the default so
/// existing `users.json` files keep working.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PasswordScheme {
    #[default]
    Sha256,
    Argon2,
}

impl FromStr for PasswordScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(PasswordScheme::Sha256),
            "argon2" => Ok(PasswordScheme::Argon2),
            other => anyhow::bail!("unknown password scheme `{other}`"),
        }
    }
}

pub fn hash_password(plain: &str, scheme: PasswordScheme) -> anyhow::Result<String> {
    match scheme {
        PasswordScheme::Sha256 => Ok(sha256_hex(plain)),
        PasswordScheme::Argon2 => {
            let salt = SaltString::generate(&mut OsRng);
            let hash = Argon2::default()
                .hash_password(plain.as_bytes(), &salt)
                .map_err(|e| {
                    error!(error = %e, "argon2 hash_password error");
                    anyhow::anyhow!(e.to_string())
                })?
                .to_string();
            Ok(hash)
        }
    }
}

pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    if stored.starts_with("$argon2") {
        let parsed = PasswordHash::new(stored).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        return Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok());
    }
    Ok(sha256_hex(plain).eq_ignore_ascii_case(stored))
}

fn sha256_hex(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}
