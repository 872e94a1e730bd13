//! Server Configuration
//!
//! Everything the binary reads from the environment, parsed once at start-up.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::{AuthConfig, TokenSecret};
use base64::Engine;
use base64::engine::general_purpose;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:4000";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

pub struct ServerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub listen_addr: SocketAddr,
    pub allowed_origins: Vec<String>,
    pub store_timeout: Duration,
    pub request_timeout: Duration,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty());

        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .context("LISTEN_ADDR must be a socket address")?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let store_timeout = Duration::from_millis(parse_or("STORE_TIMEOUT_MS", 3000)?);
        let request_timeout = Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 10)?);
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 5)?;

        let auth = if cfg!(debug_assertions) {
            match env::var("JWT_SECRET") {
                Ok(secret) => AuthConfig::with_secret(decode_secret(&secret)?),
                Err(_) => {
                    tracing::warn!("JWT_SECRET not set, using a random signing secret");
                    AuthConfig::development()
                }
            }
        } else {
            // In production the secret must come from the environment
            let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set in production")?;
            AuthConfig::with_secret(decode_secret(&secret)?)
        };

        Ok(Self {
            database_url,
            database_max_connections,
            redis_url,
            listen_addr,
            allowed_origins,
            store_timeout,
            request_timeout,
            auth,
        })
    }
}

fn decode_secret(b64: &str) -> anyhow::Result<TokenSecret> {
    let bytes = general_purpose::STANDARD
        .decode(b64.trim())
        .context("JWT_SECRET must be base64")?;
    match TokenSecret::new(bytes) {
        Ok(secret) => Ok(secret),
        Err(e) => bail!("JWT_SECRET rejected: {e}"),
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}
