// Process configuration from environment variables

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::extractor::{ExtractorConfig, ExtractorMode};
use crate::normalizer::NormalizeOptions;
use crate::resolver::ResolverConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub extractor: ExtractorConfig,
    pub resolver: ResolverConfig,
    /// Allowed CORS origins; empty means any
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Reads raw values through `lookup` so tests never touch the process env
struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        match self.raw(key) {
            Some(value) => value.parse().map_err(|e: T::Err| invalid(key, &value, e)),
            None => Ok(default),
        }
    }

    fn positive(&self, key: &'static str, default: u64) -> Result<u64, ConfigError> {
        let value = self.parse(key, default)?;
        if value == 0 {
            return Err(invalid(key, "0", "must be greater than zero"));
        }
        Ok(value)
    }

    fn seconds(&self, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
        self.positive(key, default).map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let src = Source { lookup };

        let host: IpAddr = src.parse("HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port: u16 = src.parse("PORT", 3000)?;

        let mode: ExtractorMode = src.parse("EXTRACTOR_MODE", ExtractorMode::Auto)?;
        let socket_timeout = src.positive("SOCKET_TIMEOUT_SECS", 15)?;
        let socket_timeout = u32::try_from(socket_timeout)
            .map_err(|e| invalid("SOCKET_TIMEOUT_SECS", &socket_timeout.to_string(), e))?;

        let extractor = ExtractorConfig::default()
            .with_mode(mode)
            .with_ytdlp_path(src.raw("YTDLP_PATH").map(PathBuf::from))
            .with_python_cmd(src.raw("YTDLP_PYTHON").unwrap_or_else(|| "python3".to_string()))
            .with_proxy(src.raw("YTDLP_PROXY"))
            .with_cookies_path(src.raw("YTDLP_COOKIES").map(PathBuf::from))
            .with_socket_timeout(socket_timeout)
            .with_max_output_bytes(src.positive("MAX_OUTPUT_BYTES", 16 * 1024 * 1024)? as usize);

        let max_thumbnail_width = src.positive("MAX_THUMBNAIL_WIDTH", 1280)?;
        let max_thumbnail_width = u32::try_from(max_thumbnail_width)
            .map_err(|e| invalid("MAX_THUMBNAIL_WIDTH", &max_thumbnail_width.to_string(), e))?;

        let resolver = ResolverConfig {
            max_playlist_size: src.positive("MAX_PLAYLIST_SIZE", 200)? as usize,
            chunk_size: src.positive("CHUNK_SIZE", 25)? as usize,
            chunk_timeout: src.seconds("CHUNK_TIMEOUT_SECS", 45)?,
            listing_timeout: src.seconds("LISTING_TIMEOUT_SECS", 60)?,
            request_budget: src.seconds("REQUEST_BUDGET_SECS", 240)?,
            normalize: NormalizeOptions {
                max_thumbnail_width,
            },
        };

        let cors_origins = src
            .raw("CORS_ORIGINS")
            .filter(|v| v != "*")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            addr: SocketAddr::new(host, port),
            extractor,
            resolver,
            cors_origins,
            max_body_bytes: 16 * 1024,
        })
    }
}
