// yt-dlp MetadataSource - runs the native binary or `python -m yt_dlp`
//
// Two kinds of invocation:
// - listing: `--flat-playlist --dump-json`, cheap, one line per entry
// - batch: `--dump-json --no-playlist` over a chunk of video URLs, one line per video
//
// Both emit line-delimited JSON; entries that fail are missing from stdout
// and reported on stderr (`--ignore-errors`).

use async_trait::async_trait;
use std::process::Command as StdCommand;
use std::time::Duration;
use tokio::time::Instant;

use super::errors::ExtractionError;
use super::output::{parse_lines, ParsedOutput};
use super::traits::{ExtractorConfig, ExtractorMode, MetadataSource};
use crate::models::{Batch, Listing};
use crate::process::{run_with_deadline, RunOutput};

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// How the extractor process is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// Native binary at this path
    Binary(String),
    /// Python interpreter running the yt_dlp module
    Python(String),
}

impl Launcher {
    pub fn program(&self) -> &str {
        match self {
            Self::Binary(path) => path,
            Self::Python(python) => python,
        }
    }

    fn prefix_args(&self) -> Vec<String> {
        match self {
            Self::Binary(_) => Vec::new(),
            Self::Python(_) => vec!["-m".to_string(), "yt_dlp".to_string()],
        }
    }
}

/// Find yt-dlp binary
fn find_ytdlp() -> Option<String> {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
        "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac / pip --user on Linux
        "/usr/bin/yt-dlp",          // System installation
    ];

    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return Some(path.to_string());
        }
    }

    if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }

    None
}

/// Check if the yt_dlp module is importable
fn python_has_module(python: &str) -> bool {
    match StdCommand::new(python).args(["-c", "import yt_dlp"]).output() {
        Ok(out) => out.status.success(),
        Err(_) => false,
    }
}

/// yt-dlp backed metadata source
pub struct YtDlpExtractor {
    launcher: Launcher,
    config: ExtractorConfig,
    available: bool,
}

impl YtDlpExtractor {
    /// Pick a launcher according to `config.mode`. Checks the system once.
    pub fn new(config: ExtractorConfig) -> Self {
        let explicit = config
            .ytdlp_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());

        let binary = || -> (Launcher, bool) {
            match explicit.clone().or_else(find_ytdlp) {
                Some(path) => {
                    let exists = std::path::Path::new(&path).exists();
                    (Launcher::Binary(path), exists)
                }
                None => (Launcher::Binary("yt-dlp".to_string()), false),
            }
        };

        let (launcher, available) = match config.mode {
            ExtractorMode::Cli => binary(),
            ExtractorMode::Python => {
                let ok = python_has_module(&config.python_cmd);
                (Launcher::Python(config.python_cmd.clone()), ok)
            }
            ExtractorMode::Auto => {
                if explicit.is_none() && python_has_module(&config.python_cmd) {
                    (Launcher::Python(config.python_cmd.clone()), true)
                } else {
                    binary()
                }
            }
        };

        if available {
            tracing::info!(program = launcher.program(), mode = %config.mode, "yt-dlp extractor ready");
        } else {
            tracing::warn!(program = launcher.program(), mode = %config.mode, "yt-dlp not found; extraction will fail");
        }

        Self {
            launcher,
            config,
            available,
        }
    }

    /// Use an explicit launcher without probing
    pub fn with_launcher(launcher: Launcher, config: ExtractorConfig) -> Self {
        Self {
            launcher,
            config,
            available: true,
        }
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = self.launcher.prefix_args();
        args.extend([
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout_seconds.to_string(),
        ]);

        if let Some(path) = &self.config.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args
    }

    pub(crate) fn listing_args(&self, url: &str) -> Vec<String> {
        let mut args = self.common_args();
        args.extend(
            ["--flat-playlist", "--dump-json", "--ignore-errors", "--", url].map(String::from),
        );
        args
    }

    pub(crate) fn single_args(&self, url: &str) -> Vec<String> {
        let mut args = self.common_args();
        args.extend(
            ["--dump-json", "--no-playlist", "--skip-download", "--", url].map(String::from),
        );
        args
    }

    pub(crate) fn batch_args(&self, urls: &[String]) -> Vec<String> {
        let mut args = self.common_args();
        args.extend(
            ["--dump-json", "--no-playlist", "--ignore-errors", "--skip-download", "--"]
                .map(String::from),
        );
        args.extend(urls.iter().cloned());
        args
    }

    async fn run(&self, args: Vec<String>, timeout: Duration) -> Result<RunOutput, ExtractionError> {
        tracing::debug!(
            program = self.launcher.program(),
            args = %args.join(" "),
            timeout_s = timeout.as_secs(),
            "running extractor"
        );

        let out = run_with_deadline(
            self.launcher.program(),
            &args,
            timeout,
            self.config.max_output_bytes,
        )
        .await
        .map_err(|e| ExtractionError::ProcessFailure(e.to_string()))?;

        tracing::debug!(
            source = self.name(),
            mode = %self.config.mode,
            elapsed_ms = out.elapsed.as_millis() as u64,
            timed_out = out.timed_out,
            "extractor finished"
        );
        Ok(out)
    }

    /// Listing from a flat run that produced entries
    fn flat_listing(url: &str, out: &RunOutput, parsed: ParsedOutput) -> Listing {
        if parsed.malformed > 0 {
            tracing::warn!(url, malformed = parsed.malformed, "listing had unparsable lines");
        }
        if out.timed_out || out.stdout_truncated {
            tracing::warn!(
                url,
                entries = parsed.items.len(),
                timed_out = out.timed_out,
                "flat listing cut short"
            );
        }
        if !out.success() && !out.timed_out {
            tracing::debug!(url, stderr = %out.stderr_lossy(), "listing finished with errors");
        }

        Listing {
            title: parsed.playlist_title,
            items: parsed.items,
            single_fallback: false,
            complete: !out.timed_out && !out.stdout_truncated,
        }
    }

    /// Channel pages list their tabs, not videos. List the uploads tab once.
    async fn extract_tab(
        &self,
        url: &str,
        tab_urls: &[String],
        deadline: Instant,
        timeout: Duration,
    ) -> Result<Listing, ExtractionError> {
        let Some(tab) = tab_urls
            .iter()
            .find(|t| t.trim_end_matches('/').ends_with("/videos"))
            .or_else(|| tab_urls.first())
        else {
            return Err(ExtractionError::EmptyResult(format!("no videos listed for {}", url)));
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ExtractionError::Timeout(timeout));
        }

        tracing::info!(url, tab = %tab, "listing channel tab");
        let out = self.run(self.listing_args(tab), remaining).await?;
        let parsed = parse_lines(&out.stdout_lossy());

        if !parsed.items.is_empty() {
            return Ok(Self::flat_listing(tab, &out, parsed));
        }
        if out.timed_out {
            return Err(ExtractionError::Timeout(timeout));
        }
        if !out.success() {
            return Err(ExtractionError::from_stderr(&out.stderr_lossy()));
        }
        Err(ExtractionError::EmptyResult(format!("no videos listed for {}", url)))
    }

    /// Single-video retry after an empty flat listing
    async fn extract_single(
        &self,
        url: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<Listing, ExtractionError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ExtractionError::Timeout(timeout));
        }

        let out = self.run(self.single_args(url), remaining).await?;
        let parsed = parse_lines(&out.stdout_lossy());

        if !parsed.items.is_empty() {
            return Ok(Listing {
                title: None,
                items: parsed.items,
                single_fallback: true,
                complete: true,
            });
        }

        if out.timed_out {
            return Err(ExtractionError::Timeout(timeout));
        }
        if !out.success() {
            return Err(ExtractionError::from_stderr(&out.stderr_lossy()));
        }
        Err(ExtractionError::EmptyResult(format!("no entries for {}", url)))
    }
}

#[async_trait]
impl MetadataSource for YtDlpExtractor {
    fn name(&self) -> &'static str {
        match self.launcher {
            Launcher::Binary(_) => "cli-yt-dlp",
            Launcher::Python(_) => "python-yt-dlp",
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn version(&self) -> Option<String> {
        let mut args = self.launcher.prefix_args();
        args.push("--version".to_string());

        let out = run_with_deadline(self.launcher.program(), &args, VERSION_TIMEOUT, 4096)
            .await
            .ok()?;
        if !out.success() {
            return None;
        }
        out.stdout_lossy()
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    }

    async fn extract(&self, url: &str, timeout: Duration) -> Result<Listing, ExtractionError> {
        // Every follow-up run shares this deadline
        let deadline = Instant::now() + timeout;

        let out = self.run(self.listing_args(url), timeout).await?;
        let parsed = parse_lines(&out.stdout_lossy());

        if !parsed.items.is_empty() {
            return Ok(Self::flat_listing(url, &out, parsed));
        }

        if out.timed_out {
            return Err(ExtractionError::Timeout(timeout));
        }

        if !out.success() {
            let err = ExtractionError::from_stderr(&out.stderr_lossy());
            if matches!(err, ExtractionError::InvalidUrl(_)) {
                return Err(err);
            }
            tracing::debug!(url, error = %err, "flat listing failed");
        }

        if parsed.nested > 0 {
            return self.extract_tab(url, &parsed.tab_urls, deadline, timeout).await;
        }

        tracing::info!(url, "flat listing empty, retrying as single video");
        self.extract_single(url, deadline, timeout).await
    }

    async fn extract_batch(
        &self,
        urls: &[String],
        timeout: Duration,
    ) -> Result<Batch, ExtractionError> {
        if urls.is_empty() {
            return Ok(Batch::default());
        }

        let out = self.run(self.batch_args(urls), timeout).await?;
        let parsed = parse_lines(&out.stdout_lossy());

        if !parsed.items.is_empty() {
            let missing = urls.len().saturating_sub(parsed.items.len());
            if missing > 0 && !out.timed_out {
                tracing::debug!(missing, stderr = %out.stderr_lossy(), "some videos in batch failed");
            }
            return Ok(Batch {
                items: parsed.items,
                timed_out: out.timed_out || out.stdout_truncated,
            });
        }

        if out.timed_out {
            return Err(ExtractionError::Timeout(timeout));
        }
        if !out.success() {
            return Err(ExtractionError::from_stderr(&out.stderr_lossy()));
        }
        Ok(Batch::default())
    }
}
