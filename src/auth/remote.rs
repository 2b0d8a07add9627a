use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{application_role, AuthError, AuthUser, Metadata, TokenVerifier};

/// Asks Supabase Auth who the token belongs to. Used when no JWT secret is
/// configured.
pub struct RemoteVerifier {
    client: Client,
    user_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    app_metadata: Metadata,
}

impl RemoteVerifier {
    pub fn new(client: Client, supabase_url: &str, api_key: &str) -> Self {
        Self {
            client,
            user_url: format!("{}/auth/v1/user", supabase_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl TokenVerifier for RemoteVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(&self.user_url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AuthError::Unavailable(format!("auth service returned {}", status)));
        }
        if !status.is_success() {
            return Err(AuthError::Invalid(format!("auth service returned {}", status)));
        }

        let user: SupabaseUser = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let role = application_role(&user.app_metadata);
        Ok(AuthUser {
            id: user.id,
            email: user.email,
            role,
        })
    }
}
