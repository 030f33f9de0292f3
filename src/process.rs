// Process runner - one external command with a deadline and bounded output
//
// Every extractor invocation goes through `run_with_deadline`:
// - stdout is captured up to a byte budget, the rest is drained and dropped
// - the child is killed when the deadline elapses, output read so far is kept
// - the child is killed when the returned future is dropped (client went away)

use std::borrow::Cow;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Instant};

/// Captured stderr never grows past this
pub const MAX_STDERR_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to capture {stream} from {program}")]
    Pipe {
        program: String,
        stream: &'static str,
    },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// What a finished (or killed) process left behind
#[derive(Debug)]
pub struct RunOutput {
    /// `None` when the process was killed at the deadline
    pub status: Option<ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
    /// stdout hit the byte budget; the trailing partial line was dropped
    pub stdout_truncated: bool,
    pub elapsed: Duration,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.status.map_or(false, |s| s.success())
    }

    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

struct CappedBuffer {
    data: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl CappedBuffer {
    fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            truncated: false,
        }
    }

    /// Read until EOF. Bytes past the limit are read and discarded so the
    /// child never blocks on a full pipe.
    async fn fill_from<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> io::Result<()> {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            let room = self.limit.saturating_sub(self.data.len());
            if n > room {
                self.truncated = true;
            }
            self.data.extend_from_slice(&chunk[..n.min(room)]);
        }
    }

    /// Drop everything after the last newline
    fn into_complete_lines(mut self) -> Vec<u8> {
        match self.data.iter().rposition(|b| *b == b'\n') {
            Some(pos) => self.data.truncate(pos + 1),
            None => self.data.clear(),
        }
        self.data
    }
}

/// Run command with a deadline (shared by every extractor call)
pub async fn run_with_deadline(
    program: &str,
    args: &[String],
    deadline: Duration,
    max_stdout_bytes: usize,
) -> Result<RunOutput, RunError> {
    let started = Instant::now();

    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| RunError::Pipe {
        program: program.to_string(),
        stream: "stdout",
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| RunError::Pipe {
        program: program.to_string(),
        stream: "stderr",
    })?;

    let mut stdout = CappedBuffer::new(max_stdout_bytes);
    let mut stderr = CappedBuffer::new(MAX_STDERR_BYTES);

    let waited = timeout(deadline, async {
        let (out, err) = tokio::join!(
            stdout.fill_from(&mut stdout_pipe),
            stderr.fill_from(&mut stderr_pipe)
        );
        out?;
        err?;
        child.wait().await
    })
    .await;

    let (status, timed_out) = match waited {
        Ok(Ok(status)) => (Some(status), false),
        Ok(Err(source)) => {
            let _ = child.kill().await;
            return Err(RunError::Io {
                program: program.to_string(),
                source,
            });
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(program, error = %e, "failed to kill timed out process");
            }
            (None, true)
        }
    };

    let stdout_truncated = stdout.truncated;
    let stdout = if stdout_truncated || timed_out {
        stdout.into_complete_lines()
    } else {
        stdout.data
    };

    let elapsed = started.elapsed();
    tracing::debug!(
        program,
        elapsed_ms = elapsed.as_millis() as u64,
        timed_out,
        stdout_bytes = stdout.len(),
        "process finished"
    );

    Ok(RunOutput {
        status,
        stdout,
        stderr: stderr.data,
        timed_out,
        stdout_truncated,
        elapsed,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_captures_output_and_status() {
        let out = run_with_deadline("sh", &sh("echo hello; echo oops >&2; exit 3"), Duration::from_secs(5), 1024)
            .await
            .unwrap();

        assert!(!out.timed_out);
        assert!(!out.success());
        assert_eq!(out.status.and_then(|s| s.code()), Some(3));
        assert_eq!(out.stdout_lossy(), "hello\n");
        assert_eq!(out.stderr_lossy(), "oops\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let out = run_with_deadline(
            "sh",
            &sh("echo first; printf 'half'; sleep 5; echo second"),
            Duration::from_millis(500),
            1024,
        )
        .await
        .unwrap();

        assert!(out.timed_out);
        assert!(out.status.is_none());
        assert_eq!(out.stdout_lossy(), "first\n");
        assert!(out.elapsed < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_stdout_cap_drops_cut_line() {
        let out = run_with_deadline(
            "sh",
            &sh("printf 'aaaa\\nbbbb\\ncccc\\n'"),
            Duration::from_secs(5),
            7,
        )
        .await
        .unwrap();

        assert!(out.success());
        assert!(out.stdout_truncated);
        assert_eq!(out.stdout_lossy(), "aaaa\n");
    }

    /// Gone from /proc, or a zombie waiting to be reaped
    #[cfg(target_os = "linux")]
    fn is_dead(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .map_or(false, |rest| rest.trim_start().starts_with(['Z', 'X'])),
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropped_future_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());

        let cancelled = tokio::time::timeout(
            Duration::from_millis(300),
            run_with_deadline("sh", &sh(&script), Duration::from_secs(60), 1024),
        )
        .await;
        assert!(cancelled.is_err());

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let pid = pid.trim();
        assert!(!pid.is_empty());

        let mut dead = false;
        for _ in 0..40 {
            if is_dead(pid) {
                dead = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(dead, "child {} still running after the future was dropped", pid);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run_with_deadline(
            "/nonexistent/definitely-not-here",
            &[],
            Duration::from_secs(1),
            1024,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::Spawn { .. }));
    }
}
