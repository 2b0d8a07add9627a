pub mod jwt;
pub mod middleware;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use jwt::JwtVerifier;
pub use middleware::{authenticate, require_admin};
pub use remote::RemoteVerifier;

pub const ADMIN_ROLES: &[&str] = &["admin", "super_admin"];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

/// The caller behind a verified access token.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| ADMIN_ROLES.contains(&role))
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Picks the application role. Only `app_metadata` counts: `user_metadata`
/// is writable by the user, and the top-level `role` claim is the Postgres
/// role (`authenticated`).
pub fn application_role(app_metadata: &Metadata) -> Option<String> {
    app_metadata.role.clone()
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}
