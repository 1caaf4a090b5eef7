use crate::error::CommandError;
use crate::volume::{MirrorRunner, MirrorStatus, MountController, VolumeResolver};
use nix::mount::umount;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};

static BLKID: &str = "/sbin/blkid";
static MOUNT: &str = "/bin/mount";
static RSYNC: &str = "/usr/bin/rsync";

/// Exit code of `blkid -U` when no partition carries the UUID.
const BLKID_NOT_FOUND: i32 = 2;

/// rsync flags: quiet, recursive, symlinks, hard links, permissions,
/// times, group, owner, devices and specials, then delete-before.
static RSYNC_ARGS: [&str; 2] = ["-qrlHptgoD", "--delete-before"];

fn run(program: &Path, command: &mut Command) -> Result<Output, CommandError> {
    tracing::trace!(?command, "running");
    command.output().map_err(|source| CommandError::Spawn {
        program: program.to_path_buf(),
        source,
    })
}

fn log_stderr(program: &Path, output: &Output) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        tracing::debug!(program = %program.display(), "stderr: {}", stderr.trim());
    }
}

/// Resolves volume UUIDs with `blkid -U`.
#[derive(Debug, Clone)]
pub struct Blkid {
    pub program: PathBuf,
}

impl Default for Blkid {
    fn default() -> Self {
        Self {
            program: PathBuf::from(BLKID),
        }
    }
}

impl Blkid {
    fn device_from(&self, status: ExitStatus, stdout: &[u8]) -> Result<Option<PathBuf>, CommandError> {
        if status.success() {
            let device = String::from_utf8_lossy(stdout).trim().to_string();
            return Ok((!device.is_empty()).then(|| PathBuf::from(device)));
        }
        if status.code() == Some(BLKID_NOT_FOUND) {
            return Ok(None);
        }
        Err(CommandError::status(&self.program, status))
    }
}

impl VolumeResolver for Blkid {
    fn resolve(&self, uuid: &str) -> Result<Option<PathBuf>, CommandError> {
        let output = run(&self.program, Command::new(&self.program).arg("-U").arg(uuid))?;
        if !output.status.success() {
            log_stderr(&self.program, &output);
        }
        self.device_from(output.status, &output.stdout)
    }
}

/// Mounts through `mount(8)`, so the filesystem type is detected for us,
/// and unmounts and syncs through the syscalls directly.
#[derive(Debug, Clone)]
pub struct SystemMount {
    pub program: PathBuf,
}

impl Default for SystemMount {
    fn default() -> Self {
        Self {
            program: PathBuf::from(MOUNT),
        }
    }
}

impl MountController for SystemMount {
    fn mount(&self, device: &Path, mount_point: &Path) -> Result<(), CommandError> {
        let output = run(
            &self.program,
            Command::new(&self.program).arg(device).arg(mount_point),
        )?;
        if output.status.success() {
            Ok(())
        } else {
            log_stderr(&self.program, &output);
            Err(CommandError::status(&self.program, output.status))
        }
    }

    fn unmount(&self, mount_point: &Path) -> Result<(), CommandError> {
        umount(mount_point).map_err(|source| CommandError::Sys {
            op: format!("umount {}", mount_point.display()),
            source,
        })
    }

    fn flush(&self) -> Result<(), CommandError> {
        nix::unistd::sync();
        Ok(())
    }
}

/// Mirrors with `rsync --delete-before`.
#[derive(Debug, Clone)]
pub struct Rsync {
    pub program: PathBuf,
}

impl Default for Rsync {
    fn default() -> Self {
        Self {
            program: PathBuf::from(RSYNC),
        }
    }
}

impl MirrorRunner for Rsync {
    fn mirror(&self, source: &Path, destination: &Path) -> Result<MirrorStatus, CommandError> {
        let output = run(
            &self.program,
            Command::new(&self.program)
                .args(RSYNC_ARGS)
                .arg(source)
                .arg(destination),
        )?;
        if !output.status.success() {
            log_stderr(&self.program, &output);
        }
        Ok(output.status.into())
    }
}
