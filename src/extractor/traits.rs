// MetadataSource trait and extractor configuration

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::errors::ExtractionError;
use crate::models::{Batch, Listing};

/// Default stdout budget per invocation (16 MiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// How yt-dlp is launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorMode {
    /// `python3 -m yt_dlp`
    Python,
    /// Native `yt-dlp` binary
    Cli,
    /// Python module when importable, otherwise the binary
    #[default]
    Auto,
}

impl fmt::Display for ExtractorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::Cli => write!(f, "cli"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for ExtractorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "cli" | "binary" => Ok(Self::Cli),
            "auto" | "" => Ok(Self::Auto),
            other => Err(format!("unknown extractor mode '{}'", other)),
        }
    }
}

/// Configuration for the yt-dlp adapter
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub mode: ExtractorMode,
    /// Explicit yt-dlp binary; searched for when `None`
    pub ytdlp_path: Option<PathBuf>,
    /// Interpreter for python mode
    pub python_cmd: String,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Path to cookies.txt file
    pub cookies_path: Option<PathBuf>,
    /// yt-dlp network timeout in seconds
    pub socket_timeout_seconds: u32,
    /// stdout budget per invocation
    pub max_output_bytes: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            mode: ExtractorMode::Auto,
            ytdlp_path: None,
            python_cmd: "python3".to_string(),
            proxy: None,
            cookies_path: None,
            socket_timeout_seconds: 15,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ExtractorConfig {
    pub fn with_mode(mut self, mode: ExtractorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<PathBuf>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_python_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.python_cmd = cmd.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cookies_path(mut self, path: Option<PathBuf>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_socket_timeout(mut self, seconds: u32) -> Self {
        self.socket_timeout_seconds = seconds;
        self
    }

    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }
}

/// Anything that can turn a URL into raw video entries.
///
/// The resolver only talks to this trait, so the subprocess can be swapped
/// for a library binding or a remote API.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Name of the source (for logging)
    fn name(&self) -> &'static str;

    /// Check if this source can run at all
    fn is_available(&self) -> bool;

    /// Version string of the underlying tool, if known
    async fn version(&self) -> Option<String> {
        None
    }

    /// Flattened listing of a URL, falling back to single-video extraction
    /// when the listing is empty.
    async fn extract(&self, url: &str, timeout: Duration) -> Result<Listing, ExtractionError>;

    /// Full metadata for a chunk of video URLs in one invocation.
    /// Entries that fail individually are simply absent from the batch.
    async fn extract_batch(
        &self,
        urls: &[String],
        timeout: Duration,
    ) -> Result<Batch, ExtractionError>;
}
