use std::env;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Supabase { url: String, api_key: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaConfig {
    pub bucket: String,
    pub region: String,
    pub credentials: Option<(String, String)>,
    pub public_base_url: Option<String>,
}

/// Runtime configuration, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub store: StoreConfig,
    /// Supabase project URL, needed for remote token checks even with the memory store.
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub media: Option<MediaConfig>,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port: u16 = match var("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value,
            })?,
            None => 5000,
        };

        let supabase_url = var("SUPABASE_URL");
        let service_key = var("SUPABASE_SERVICE_KEY").or_else(|| var("SUPABASE_API_KEY"));

        let store = match var("ESTATO_STORE").as_deref() {
            None | Some("supabase") => StoreConfig::Supabase {
                url: supabase_url
                    .clone()
                    .ok_or(ConfigError::Missing("SUPABASE_URL"))?,
                api_key: service_key
                    .clone()
                    .ok_or(ConfigError::Missing("SUPABASE_SERVICE_KEY"))?,
            },
            Some("memory") => StoreConfig::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "ESTATO_STORE",
                    value: other.to_string(),
                })
            }
        };

        let media = var("S3_BUCKET").map(|bucket| MediaConfig {
            bucket,
            region: var("AWS_REGION").unwrap_or_else(|| "us-west-2".to_string()),
            credentials: var("AWS_ACCESS_KEY_ID").zip(var("AWS_SECRET_ACCESS_KEY")),
            public_base_url: var("MEDIA_PUBLIC_BASE_URL"),
        });

        let cors_origins = var("CORS_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            port,
            store,
            supabase_url,
            supabase_anon_key: var("SUPABASE_ANON_KEY").or(service_key),
            jwt_secret: var("SUPABASE_JWT_SECRET"),
            media,
            cors_origins,
        })
    }
}
