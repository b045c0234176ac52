//! Environment-driven settings for the HTTP samples.

use crate::error::{GsnipError, GsnipResult};
use gsnip_sessions::visits::{RedisSettings, DEFAULT_REDIS_PORT};
use std::collections::HashMap;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    pub project: Option<String>,
    pub redis_host: Option<String>,
    pub redis_port: u16,
}

impl Settings {
    pub fn from_env() -> GsnipResult<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> GsnipResult<Self> {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();
        Ok(Self {
            port: parse_port(get("PORT"), "PORT", DEFAULT_PORT)?,
            project: get("GOOGLE_CLOUD_PROJECT"),
            redis_host: get("REDISHOST"),
            redis_port: parse_port(get("REDISPORT"), "REDISPORT", DEFAULT_REDIS_PORT)?,
        })
    }

    pub fn require_project(&self) -> GsnipResult<&str> {
        self.project
            .as_deref()
            .ok_or_else(|| GsnipError::Config("GOOGLE_CLOUD_PROJECT must be set".to_string()))
    }

    pub fn redis(&self) -> GsnipResult<RedisSettings> {
        let host = self
            .redis_host
            .as_deref()
            .ok_or_else(|| GsnipError::Config("REDISHOST must be set".to_string()))?;
        Ok(RedisSettings::new(host, self.redis_port))
    }
}

fn parse_port(raw: Option<String>, name: &str, default: u16) -> GsnipResult<u16> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| {
                GsnipError::Config(format!("{} must be a port number, got {:?}", name, v))
            }),
    }
}
