pub mod args;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod orchestrator;
pub mod system;
pub mod volume;

// re-export selected public API
pub use config::Config;
pub use error::CommandError;
pub use guard::RunGuard;
pub use orchestrator::{Orchestrator, Outcome, RunReport, VolumeOutcome};
pub use volume::{MirrorRunner, MirrorStatus, MountController, VolumeResolver};

use system::{Blkid, Rsync, SystemMount};

/// Orchestrator wired to `blkid`, `mount`/umount(2)/sync(2) and `rsync`.
pub fn system_orchestrator() -> Orchestrator<Blkid, SystemMount, Rsync> {
    Orchestrator::new(Blkid::default(), SystemMount::default(), Rsync::default())
}
