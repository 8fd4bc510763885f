// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `DATA_DIR` | Directory holding `conduit.redb` | unset (in-memory) |
//! | `JWT_SECRET` | HS256 signing secret | `jwt-conduit-secret` (warns) |
//! | `TOKEN_TTL_DAYS` | Bearer token lifetime | `60` |
//! | `MAX_CALL_LEVEL` | Nested broker call limit | `16` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;

use crate::broker::DEFAULT_MAX_CALL_LEVEL;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory.
///
/// When unset the database lives in memory and is lost on restart.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOKEN_TTL_DAYS_ENV: &str = "TOKEN_TTL_DAYS";
pub const MAX_CALL_LEVEL_ENV: &str = "MAX_CALL_LEVEL";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Development-only signing secret.
pub const DEFAULT_JWT_SECRET: &str = "jwt-conduit-secret";

pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 60;

/// Upper bound on `TOKEN_TTL_DAYS`; expiries must stay representable.
pub const MAX_TOKEN_TTL_DAYS: i64 = 36_500;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "conduit.redb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub max_call_level: u32,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            max_call_level: DEFAULT_MAX_CALL_LEVEL,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    value: other.to_string(),
                    expected: "`json` or `pretty`",
                })
            }
        };

        const TTL_EXPECTED: &str = "a number of days between 1 and 36500";
        let token_ttl_days = parse(get(TOKEN_TTL_DAYS_ENV), TOKEN_TTL_DAYS_ENV, TTL_EXPECTED)?
            .unwrap_or(defaults.token_ttl_days);
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&token_ttl_days)
            || chrono::TimeDelta::try_days(token_ttl_days).is_none()
        {
            return Err(ConfigError::Invalid {
                var: TOKEN_TTL_DAYS_ENV,
                value: token_ttl_days.to_string(),
                expected: TTL_EXPECTED,
            });
        }

        let max_call_level =
            parse(get(MAX_CALL_LEVEL_ENV), MAX_CALL_LEVEL_ENV, "a positive integer")?
                .unwrap_or(defaults.max_call_level);
        if max_call_level == 0 {
            return Err(ConfigError::Invalid {
                var: MAX_CALL_LEVEL_ENV,
                value: "0".to_string(),
                expected: "a positive integer",
            });
        }

        Ok(Self {
            host: get(HOST_ENV).unwrap_or(defaults.host),
            port: parse(get(PORT_ENV), PORT_ENV, "a port number")?.unwrap_or(defaults.port),
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            jwt_secret: get(JWT_SECRET_ENV).unwrap_or(defaults.jwt_secret),
            token_ttl_days,
            max_call_level,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Database file, or `None` for an in-memory database.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(DATABASE_FILE))
    }

    /// Token lifetime. Out-of-range day counts saturate instead of panicking.
    pub fn token_ttl(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::try_days(self.token_ttl_days).unwrap_or(chrono::TimeDelta::MAX)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn parse<T: FromStr>(
    raw: Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid {
                var,
                value,
                expected,
            })
    })
    .transpose()
}
