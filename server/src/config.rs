use std::net::SocketAddr;

use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use platform_authn::AuthConfig;
use platform_db::DatabaseSettings;
use rand::RngCore;
use tracing::warn;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 480;
const MIN_SECRET_BYTES: usize = 32;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub bind: SocketAddr,
    pub auth: AuthConfig,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let database = DatabaseSettings::from_env()?;
        Self::from_lookup(database, |key| std::env::var(key).ok())
    }

    /// Everything except the database comes from `lookup`.
    pub fn from_lookup(
        database: DatabaseSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let bind = lookup("BIND")
            .unwrap_or_else(|| DEFAULT_BIND.into())
            .parse::<SocketAddr>()
            .context("invalid BIND address")?;

        let session_ttl_minutes = match lookup("SESSION_TTL_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .ok_or_else(|| anyhow!("SESSION_TTL_MINUTES must be a positive integer"))?,
            None => DEFAULT_SESSION_TTL_MINUTES,
        };
        let secret = match lookup("AUTH_SECRET_BASE64") {
            Some(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .context("invalid AUTH_SECRET_BASE64")?;
                if bytes.len() < MIN_SECRET_BYTES {
                    return Err(anyhow!(
                        "AUTH_SECRET_BASE64 must decode to at least {MIN_SECRET_BYTES} bytes"
                    ));
                }
                bytes
            }
            None => {
                warn!("AUTH_SECRET_BASE64 not set; sessions will not survive a restart");
                let mut bytes = vec![0u8; MIN_SECRET_BYTES];
                rand::thread_rng().fill_bytes(&mut bytes);
                bytes
            }
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();
        if cors_allowed_origins.is_empty() {
            return Err(anyhow!("CORS_ALLOWED_ORIGINS must list at least one origin"));
        }

        Ok(Self {
            database,
            bind,
            auth: AuthConfig::new(secret, session_ttl_minutes),
            cors_allowed_origins,
        })
    }
}
