//! HTTP Basic Auth against a local credential file.

use std::path::Path;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::Method;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

/// Routes reachable without credentials, as `(method, path)`.
pub const PUBLIC_ROUTES: &[(&str, &str)] = &[("GET", "/"), ("GET", "/health")];

pub fn is_public(method: &Method, path: &str) -> bool {
    PUBLIC_ROUTES
        .iter()
        .any(|(m, p)| *m == method.as_str() && *p == path)
}

/// One entry of the credential file.
#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub name: String,
    /// Argon2 PHC hash string.
    #[serde(alias = "password_hash")]
    pub password: String,
}

/// Users allowed through the gate, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: Vec<Credential>,
}

impl CredentialStore {
    pub fn new(users: Vec<Credential>) -> Self {
        Self { users }
    }

    /// Load the credential file, replacing it with an empty list if it is
    /// missing or malformed. An empty store rejects every login.
    pub fn load_or_init(path: &Path) -> Self {
        let loaded = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str::<Vec<Credential>>(&s).map_err(Into::into));

        match loaded {
            Ok(users) => {
                info!("Loaded {} user(s) from {}", users.len(), path.display());
                Self::new(users)
            }
            Err(e) => {
                warn!(
                    "Credential file {} unusable ({}); writing an empty one",
                    path.display(),
                    e
                );
                if let Err(e) = std::fs::write(path, "[]") {
                    warn!("Failed to create {}: {}", path.display(), e);
                }
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check a name/password pair against the stored hashes.
    pub fn verify(&self, name: &str, password: &str) -> bool {
        let user = self
            .users
            .iter()
            .find(|u| bool::from(u.name.as_bytes().ct_eq(name.as_bytes())));
        match user {
            Some(user) => verify_password(password, &user.password),
            None => false,
        }
    }

    /// Check the raw value of an `Authorization` header.
    pub fn verify_header(&self, header: &str) -> bool {
        match parse_basic_auth(header) {
            Some((name, password)) => self.verify(&name, &password),
            None => false,
        }
    }
}

/// Split a `Basic <base64(name:password)>` header value.
///
/// Returns `None` unless the header has exactly two space-separated parts, the
/// scheme is `basic` (any case), and the payload decodes to UTF-8 containing
/// exactly one `:`.
pub fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = header.split(' ').collect();
    if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(parts[1]).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    let mut fields = decoded.split(':');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(name), Some(password), None) => Some((name.to_string(), password.to_string())),
        _ => None,
    }
}

/// Hash a password for storage in the credential file.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
