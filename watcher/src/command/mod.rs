//! Adapter for external commands that print JSON on stdout.
//!
//! [`run_json`] runs a binary to completion, captures at most `output_limit`
//! bytes of stdout and decodes it into a typed schema. It blocks the calling
//! thread until the process exits; async callers go through
//! [`ValidatorsCommand`], which moves the call onto the blocking pool.

pub mod validators;

pub use validators::{ValidatorSetSource, ValidatorsCommand};

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use serde::de::DeserializeOwned;

/// Default stdout cap, 4 MiB.
pub const DEFAULT_OUTPUT_LIMIT: usize = 4 * 1024 * 1024;

/// How much of stderr is kept for error messages.
const STDERR_EXCERPT_LEN: usize = 512;

/// Errors produced by [`run_json`].
///
/// `Parse` is the only parse failure; every other variant means the process
/// did not run to a successful completion.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to spawn {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} exited with {status}: {stderr}", binary.display())]
    ExitStatus {
        binary: PathBuf,
        status: String,
        stderr: String,
    },
    #[error("{} wrote more than {limit} bytes to stdout", binary.display())]
    OutputTooLarge { binary: PathBuf, limit: usize },
    #[error("I/O error while running {}: {source}", binary.display())]
    Io {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode output of {}: {source}", binary.display())]
    Parse {
        binary: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The blocking task running the command was cancelled or panicked.
    #[error("command task did not complete: {0}")]
    Join(String),
}

impl CommandError {
    /// Whether the process ran but its output was not the expected JSON.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, CommandError::Parse { .. })
    }
}

/// Runs `binary` with `args` and decodes its stdout as JSON.
pub fn run_json<T, S>(binary: &Path, args: &[S], output_limit: usize) -> Result<T, CommandError>
where
    T: DeserializeOwned,
    S: AsRef<std::ffi::OsStr>,
{
    let stdout = run_captured(binary, args, output_limit)?;
    serde_json::from_slice(&stdout).map_err(|source| CommandError::Parse {
        binary: binary.to_path_buf(),
        source,
    })
}

/// Runs `binary` and returns its stdout if it exits successfully.
fn run_captured<S: AsRef<std::ffi::OsStr>>(
    binary: &Path,
    args: &[S],
    output_limit: usize,
) -> Result<Vec<u8>, CommandError> {
    let io_err = |source| CommandError::Io {
        binary: binary.to_path_buf(),
        source,
    };

    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CommandError::Spawn {
            binary: binary.to_path_buf(),
            source,
        })?;

    // Drain stderr on a helper thread so a chatty child cannot block on a
    // full stderr pipe while we are reading stdout.
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut excerpt = Vec::new();
            let _ = (&mut pipe)
                .take(STDERR_EXCERPT_LEN as u64)
                .read_to_end(&mut excerpt);
            let _ = io::copy(&mut pipe, &mut io::sink());
            excerpt
        })
    });

    let mut stdout = Vec::new();
    if let Some(pipe) = child.stdout.take() {
        if let Err(source) = pipe.take(output_limit as u64 + 1).read_to_end(&mut stdout) {
            abort(&mut child);
            return Err(io_err(source));
        }
    }

    if stdout.len() > output_limit {
        abort(&mut child);
        return Err(CommandError::OutputTooLarge {
            binary: binary.to_path_buf(),
            limit: output_limit,
        });
    }

    let status = match child.wait() {
        Ok(status) => status,
        Err(source) => {
            let _ = child.kill();
            return Err(io_err(source));
        }
    };
    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();

    if !status.success() {
        return Err(CommandError::ExitStatus {
            binary: binary.to_path_buf(),
            status: status.to_string(),
            stderr,
        });
    }

    Ok(stdout)
}

/// Kills and reaps `child`. Both may fail if it already exited.
fn abort(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
