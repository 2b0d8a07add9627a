use reqwest::Client;
use std::sync::Arc;

use crate::auth::{JwtVerifier, RemoteVerifier, TokenVerifier};
use crate::config::{Config, ConfigError, StoreConfig};
use crate::media::{MediaStore, S3MediaStore};
use crate::supabase::{MemoryStore, Store, SupabaseStore};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Option<Arc<dyn MediaStore>>,
    pub verifier: Arc<dyn TokenVerifier>,
}

pub type SharedState = Arc<AppState>;

pub async fn build_app_state(config: &Config) -> Result<AppState, ConfigError> {
    let store: Arc<dyn Store> = match &config.store {
        StoreConfig::Supabase { url, api_key } => {
            tracing::info!(%url, "using supabase store");
            Arc::new(SupabaseStore::new(url, api_key))
        }
        StoreConfig::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let verifier: Arc<dyn TokenVerifier> = match (&config.jwt_secret, &config.supabase_url) {
        (Some(secret), _) => Arc::new(JwtVerifier::new(secret)),
        (None, Some(url)) => {
            let api_key = config
                .supabase_anon_key
                .as_deref()
                .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
            tracing::info!("no jwt secret configured, verifying tokens with supabase auth");
            Arc::new(RemoteVerifier::new(Client::new(), url, api_key))
        }
        (None, None) => return Err(ConfigError::Missing("SUPABASE_JWT_SECRET")),
    };

    let media: Option<Arc<dyn MediaStore>> = match &config.media {
        Some(media) => Some(Arc::new(S3MediaStore::connect(media).await)),
        None => {
            tracing::warn!("S3_BUCKET not set, media uploads disabled");
            None
        }
    };

    Ok(AppState {
        store,
        media,
        verifier,
    })
}
