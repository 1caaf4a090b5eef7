use crate::config::Config;
use crate::error::CommandError;
use crate::guard::RunGuard;
use crate::volume::{MirrorRunner, MirrorStatus, MountController, VolumeResolver};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// What happened to one configured volume.
#[derive(Debug)]
pub enum VolumeOutcome {
    /// The volume is not attached.
    NotFound,
    ResolveFailed(CommandError),
    /// Mirroring was skipped so nothing is written into the bare mount point.
    MountFailed {
        device: PathBuf,
        error: CommandError,
    },
    /// The device was mounted; mirror, flush and unmount were attempted.
    Mirrored {
        device: PathBuf,
        mirror: Result<MirrorStatus, CommandError>,
        flush_error: Option<CommandError>,
        unmount_error: Option<CommandError>,
    },
}

impl VolumeOutcome {
    pub fn is_failure(&self) -> bool {
        match self {
            VolumeOutcome::NotFound => false,
            VolumeOutcome::ResolveFailed(_) | VolumeOutcome::MountFailed { .. } => true,
            VolumeOutcome::Mirrored {
                mirror,
                flush_error,
                unmount_error,
                ..
            } => {
                !matches!(mirror, Ok(status) if status.success())
                    || flush_error.is_some()
                    || unmount_error.is_some()
            }
        }
    }

    pub fn device(&self) -> Option<&Path> {
        match self {
            VolumeOutcome::MountFailed { device, .. } | VolumeOutcome::Mirrored { device, .. } => {
                Some(device.as_path())
            }
            _ => None,
        }
    }
}

/// Per-volume results of one pass over the configured identifiers.
#[derive(Debug, Default)]
pub struct RunReport {
    pub volumes: Vec<(String, VolumeOutcome)>,
    /// Set when an unmount failure ended the pass early.
    pub aborted: bool,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.aborted || self.volumes.iter().any(|(_, outcome)| outcome.is_failure())
    }

    /// Devices that were mounted and mirrored, in processing order.
    pub fn mirrored_devices(&self) -> Vec<&Path> {
        self.volumes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, VolumeOutcome::Mirrored { .. }))
            .filter_map(|(_, outcome)| outcome.device())
            .collect()
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// Another run holds the guard; nothing was done.
    Busy,
    /// The configuration is disabled; nothing was mounted.
    Disabled,
    Completed(RunReport),
}

/// The resolve, mount, mirror, flush, unmount loop.
pub struct Orchestrator<R, M, X> {
    resolver: R,
    mounter: M,
    mirror: X,
}

impl<R, M, X> Orchestrator<R, M, X>
where
    R: VolumeResolver,
    M: MountController,
    X: MirrorRunner,
{
    pub fn new(resolver: R, mounter: M, mirror: X) -> Self {
        Self {
            resolver,
            mounter,
            mirror,
        }
    }

    /// A full run: take the guard, load the config, back up, release.
    pub fn run_once(&self, lock_path: &Path, config_path: &Path) -> Result<Outcome> {
        let Some(guard) = RunGuard::try_acquire(lock_path)? else {
            return Ok(Outcome::Busy);
        };

        let config = Config::load(config_path);
        let outcome = if config.enabled {
            tracing::debug!("EBS is enabled");
            Outcome::Completed(self.run(&config))
        } else {
            tracing::warn!(
                "EBS is not enabled, please refer to the documentation, and update the configuration file before you continue."
            );
            Outcome::Disabled
        };

        if let Err(e) = guard.release() {
            tracing::error!("{e:#}");
        }
        Ok(outcome)
    }

    /// Processes every configured volume in order. Volumes that are not
    /// attached are skipped. An unmount failure stops the pass because the
    /// mount point is still occupied.
    pub fn run(&self, config: &Config) -> RunReport {
        let mut report = RunReport::default();

        for uuid in &config.volume_ids {
            let outcome = self.process(uuid, config);
            let stop = matches!(
                &outcome,
                VolumeOutcome::Mirrored {
                    unmount_error: Some(_),
                    ..
                }
            );
            report.volumes.push((uuid.clone(), outcome));
            if stop {
                tracing::error!(
                    mount_point = %config.mount_point.display(),
                    "mount point is still in use, skipping remaining volumes"
                );
                report.aborted = true;
                break;
            }
        }

        report
    }

    #[tracing::instrument(skip(self, config))]
    fn process(&self, uuid: &str, config: &Config) -> VolumeOutcome {
        tracing::debug!("Trying {uuid}");

        let device = match self.resolver.resolve(uuid) {
            Ok(Some(device)) => device,
            Ok(None) => {
                tracing::debug!("Invalid disk");
                return VolumeOutcome::NotFound;
            }
            Err(e) => {
                tracing::error!("failed to resolve volume: {e}");
                return VolumeOutcome::ResolveFailed(e);
            }
        };
        tracing::info!(device = %device.display(), "Found valid disk");

        tracing::info!("Mounting disk in {}", config.mount_point.display());
        if let Err(error) = self.mounter.mount(&device, &config.mount_point) {
            tracing::error!(device = %device.display(), "failed to mount, skipping backup: {error}");
            return VolumeOutcome::MountFailed { device, error };
        }

        tracing::info!("Initiating backup process");
        let mirror = self.mirror.mirror(&config.source, &config.destination);
        match &mirror {
            Ok(status) if status.success() => tracing::info!("Backup process completed."),
            Ok(status) => tracing::warn!("Backup process completed with returncode: {status}."),
            Err(e) => tracing::error!("failed to run backup process: {e}"),
        }

        tracing::info!("Syncing disks prior to umount");
        let flush_error = self.mounter.flush().err();
        if let Some(e) = &flush_error {
            tracing::error!("failed to sync: {e}");
        }

        tracing::info!("Unmounting disk from {}", config.mount_point.display());
        let unmount_error = self.mounter.unmount(&config.mount_point).err();
        if let Some(e) = &unmount_error {
            tracing::error!(device = %device.display(), "failed to unmount: {e}");
        }

        VolumeOutcome::Mirrored {
            device,
            mirror,
            flush_error,
            unmount_error,
        }
    }
}
