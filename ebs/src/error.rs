use std::path::PathBuf;

use thiserror::Error;

/// Failure of one external operation (a child process or a syscall).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Status { program: PathBuf, status: String },

    #[error("{op} failed: {source}")]
    Sys {
        op: String,
        #[source]
        source: nix::Error,
    },
}

impl CommandError {
    pub fn status(program: impl Into<PathBuf>, status: std::process::ExitStatus) -> Self {
        let status = match status.code() {
            Some(code) => format!("exit code {code}"),
            None => "no exit code (terminated by signal)".to_string(),
        };
        Self::Status {
            program: program.into(),
            status,
        }
    }
}
