//! OS capabilities the backup loop depends on.
//!
//! Each step is a trait so the loop can be driven against real devices
//! ([`crate::system`]) or against scripted stand-ins in tests.

use crate::error::CommandError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Maps a volume UUID to the device it is currently attached as.
pub trait VolumeResolver {
    /// `Ok(None)` when no attached partition carries `uuid`.
    fn resolve(&self, uuid: &str) -> Result<Option<PathBuf>, CommandError>;
}

/// Attaches and detaches filesystems at a mount point.
pub trait MountController {
    fn mount(&self, device: &Path, mount_point: &Path) -> Result<(), CommandError>;

    fn unmount(&self, mount_point: &Path) -> Result<(), CommandError>;

    /// Flushes dirty buffers to stable storage.
    fn flush(&self) -> Result<(), CommandError>;
}

/// Mirrors a directory tree, deleting extraneous destination entries
/// before transferring.
pub trait MirrorRunner {
    fn mirror(&self, source: &Path, destination: &Path) -> Result<MirrorStatus, CommandError>;
}

/// Exit status of a finished mirror process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorStatus {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl MirrorStatus {
    pub const SUCCESS: MirrorStatus = MirrorStatus { code: Some(0) };

    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for MirrorStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for MirrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{code}"),
            None => write!(f, "signal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_status() {
        assert!(MirrorStatus::SUCCESS.success());
        assert!(!MirrorStatus::from_code(23).success());
        assert!(!MirrorStatus { code: None }.success());
        assert_eq!(MirrorStatus::from_code(24).to_string(), "24");
    }
}
