//! Server configuration from environment variables
//!
//! Environment:
//! - JWT_SECRET: HMAC secret for player tokens (required)
//! - SERVICE_SECRET: bearer token for /internal routes (default: dev-service-secret)
//! - HOST / PORT: bind address (default: 0.0.0.0:8002)
//! - SOCIAL_GRAPH_FILE: optional JSON seed for the in-memory social graph
//! - PRESENCE_OUTBOUND_BUFFER: per-connection outbound queue (default: 64)
//! - PRESENCE_IDLE_TIMEOUT_SECS: optional idle timeout for sessions

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::presence::SessionConfig;

pub const DEFAULT_SERVICE_SECRET: &str = "dev-service-secret";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8002;
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub service_secret: String,
    pub host: String,
    pub port: u16,
    pub social_graph_file: Option<PathBuf>,
    pub outbound_buffer: usize,
    pub idle_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            jwt_secret,
            service_secret: var("SERVICE_SECRET")
                .unwrap_or_else(|| DEFAULT_SERVICE_SECRET.to_string()),
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            social_graph_file: var("SOCIAL_GRAPH_FILE").map(PathBuf::from),
            outbound_buffer: parse_or(
                "PRESENCE_OUTBOUND_BUFFER",
                var("PRESENCE_OUTBOUND_BUFFER"),
                DEFAULT_OUTBOUND_BUFFER,
            )?,
            idle_timeout: var("PRESENCE_IDLE_TIMEOUT_SECS")
                .map(|v| parse("PRESENCE_IDLE_TIMEOUT_SECS", &v))
                .transpose()?
                .map(Duration::from_secs),
        })
    }

    /// `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            idle_timeout: self.idle_timeout,
        }
    }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_or<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => parse(name, &v),
        None => Ok(default),
    }
}
