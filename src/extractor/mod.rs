// Extraction Adapter - turns a URL into raw video entries via yt-dlp
//
// Two launch modes:
// - Python mode: `python3 -m yt_dlp`
// - CLI mode: native `yt-dlp` binary
//
// Auto mode picks the Python module when it is importable and falls back to
// the binary otherwise. Everything above this module only sees `MetadataSource`.

mod cli;
mod diagnostics;
mod errors;
mod output;
mod traits;

pub use cli::{Launcher, YtDlpExtractor};
pub use diagnostics::{diagnose_error, BlockingReason};
pub use errors::{ExtractionError, FailureReason};
pub use output::{parse_lines, ParsedOutput};
pub use traits::{ExtractorConfig, ExtractorMode, MetadataSource, DEFAULT_MAX_OUTPUT_BYTES};
