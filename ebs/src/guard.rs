use anyhow::{Context, Result, anyhow};
use nix::fcntl::{Flock, FlockArg};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

pub static DEFAULT_LOCK_PATH: &str = "/var/lock/ebs";

/// Single-instance guard backed by a lock file.
///
/// The file is created exclusively and held under an exclusive `flock`.
/// When the guard is dropped the file is removed and the lock released,
/// so every exit path that unwinds through the owner frees it. A file
/// left behind by a killed process blocks later runs until removed.
pub struct RunGuard {
    path: PathBuf,
    lock: Option<Flock<File>>,
}

impl RunGuard {
    /// Returns `Ok(None)` when another run holds the guard, or when a
    /// stale guard file is present. An existing file is never modified.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o644)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if is_stale(path) {
                    tracing::warn!(
                        path = %path.display(),
                        "Lockfile found and no running process holds it; if no other run is starting, it may be stale and can be removed"
                    );
                } else {
                    tracing::warn!(path = %path.display(), "Lockfile found, exiting.");
                }
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create lock file {path:?}"));
            }
        };

        let mut lock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => lock,
            Err((_file, errno)) => {
                let _ = fs::remove_file(path);
                return Err(anyhow!("Failed to lock {}: {}", path.display(), errno));
            }
        };
        writeln!(lock, "ebs {}", std::process::id())
            .with_context(|| format!("Failed to write lock file {path:?}"))?;

        tracing::debug!(path = %path.display(), "acquired run guard");
        Ok(Some(Self {
            path: path.to_path_buf(),
            lock: Some(lock),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the lock file now instead of at drop.
    pub fn release(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        let Some(lock) = self.lock.take() else {
            return Ok(());
        };
        let removed = fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove lock file {:?}", self.path));
        drop(lock);
        tracing::debug!(path = %self.path.display(), "released run guard");
        removed
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            tracing::error!("{e:#}");
        }
    }
}

/// Pause before re-probing a guard file that looked unheld. A starting
/// run creates the file before it takes the `flock`.
const STALE_RECHECK: Duration = Duration::from_millis(200);

/// A guard file nobody holds a `flock` on, on two probes, was left by a
/// dead process.
fn is_stale(path: &Path) -> bool {
    if !is_unlocked(path) {
        return false;
    }
    thread::sleep(STALE_RECHECK);
    is_unlocked(path)
}

fn is_unlocked(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    Flock::lock(file, FlockArg::LockSharedNonblock).is_ok()
}
