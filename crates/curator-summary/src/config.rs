// curator-summary/crates/curator-summary/src/config.rs

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use tracing::{info, warn};

use crate::summarizer::NotFoundPolicy;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Where collection and comment records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Supabase project reached through its PostgREST endpoint.
    Supabase { url: String, key: String },
    /// Local SQLite file, for development.
    Sqlite { path: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub not_found_policy: NotFoundPolicy,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub http_timeout_seconds: u64,
    pub server_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from `./.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_file(Path::new(".env"))
    }

    /// Load configuration, preferring values from `env_file` over the
    /// process environment. A missing file is not an error.
    pub fn from_env_file(env_file: &Path) -> Result<Self> {
        let file_vals: HashMap<String, String> = match dotenvy::from_path_iter(env_file) {
            Ok(iter) => {
                let vals = iter
                    .collect::<std::result::Result<HashMap<_, _>, _>>()
                    .with_context(|| format!("Failed to parse {}", env_file.display()))?;
                info!("Loaded {} values from {}", vals.len(), env_file.display());
                vals
            }
            Err(e) => {
                warn!(
                    "Failed to load {}: {}. Using system environment variables.",
                    env_file.display(),
                    e
                );
                HashMap::new()
            }
        };

        Self::from_lookup(|key| {
            file_vals
                .get(key)
                .cloned()
                .filter(|v| !v.is_empty())
                .or_else(|| env::var(key).ok().filter(|v| !v.is_empty()))
        })
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "supabase".into());
        let store = match backend.to_ascii_lowercase().as_str() {
            "supabase" => {
                let url = lookup("SUPABASE_URL")
                    .context("SUPABASE_URL environment variable not set. Please set it in your .env file")?;
                let key = resolve_store_key(lookup("SUPABASE_KEY"), lookup("SUPABASE_ANON_KEY"))?;
                StoreConfig::Supabase {
                    url: url.trim_end_matches('/').to_string(),
                    key,
                }
            }
            "sqlite" => StoreConfig::Sqlite {
                path: lookup("SQLITE_PATH").unwrap_or_else(|| "./data/collections.db".into()),
            },
            other => {
                return Err(anyhow::anyhow!(
                    "Unknown STORE_BACKEND '{}'. Expected 'supabase' or 'sqlite'.",
                    other
                ))
            }
        };

        let gemini_api_key = lookup("GEMINI_API_KEY")
            .context("GEMINI_API_KEY environment variable not set. Please set it in your .env file")?;

        let not_found_policy = match lookup("NOT_FOUND_POLICY") {
            Some(value) => value.parse()?,
            None => NotFoundPolicy::default(),
        };

        Ok(Self {
            store,
            not_found_policy,
            gemini_api_key,
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
            api_host: lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            api_port: lookup("API_PORT")
                .unwrap_or_else(|| "8000".into())
                .parse()
                .context("API_PORT must be a valid port number")?,
            http_timeout_seconds: lookup("HTTP_TIMEOUT_SECONDS")
                .unwrap_or_else(|| "120".into())
                .parse()
                .context("HTTP_TIMEOUT_SECONDS must be a whole number of seconds")?,
            server_timeout_seconds: lookup("SERVER_TIMEOUT_SECONDS")
                .unwrap_or_else(|| "300".into())
                .parse()
                .context("SERVER_TIMEOUT_SECONDS must be a whole number of seconds")?,
        })
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        match &self.store {
            StoreConfig::Supabase { url, key } => {
                info!("- Store: supabase at {}", url);
                info!("- Store Key: {}", mask_secret(key));
            }
            StoreConfig::Sqlite { path } => info!("- Store: sqlite at {}", path),
        }
        info!("- Not Found Policy: {:?}", self.not_found_policy);
        info!("- Gemini Model: {}", self.gemini_model);
        info!("- Gemini Endpoint: {}", self.gemini_base_url);
        info!("- Gemini Key: {}", mask_secret(&self.gemini_api_key));
        info!("- API: {}", self.bind_address());
        info!("- Outbound Timeout: {}s", self.http_timeout_seconds);
        info!("- Request Timeout: {}s", self.server_timeout_seconds);
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

/// The service key wins; the anonymous key is the fallback.
fn resolve_store_key(primary: Option<String>, anon: Option<String>) -> Result<String> {
    primary
        .or(anon)
        .ok_or_else(|| anyhow::anyhow!("SUPABASE_KEY or SUPABASE_ANON_KEY must be set"))
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}
