#![allow(dead_code)]

use ebs::{CommandError, MirrorRunner, MirrorStatus, MountController, VolumeResolver};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve(String),
    Mount(PathBuf, PathBuf),
    Mirror(PathBuf, PathBuf),
    Flush,
    Unmount(PathBuf),
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub fn mount(device: &str, mount_point: &str) -> Call {
    Call::Mount(device.into(), mount_point.into())
}

pub fn mirror(source: &str, destination: &str) -> Call {
    Call::Mirror(source.into(), destination.into())
}

pub fn unmount(mount_point: &str) -> Call {
    Call::Unmount(mount_point.into())
}

pub fn resolve(uuid: &str) -> Call {
    Call::Resolve(uuid.to_string())
}

fn scripted_failure(program: &str) -> CommandError {
    CommandError::Status {
        program: PathBuf::from(program),
        status: "exit code 32".to_string(),
    }
}

#[derive(Default)]
pub struct FakeResolver {
    pub log: CallLog,
    pub devices: HashMap<String, PathBuf>,
    pub broken: HashSet<String>,
}

impl VolumeResolver for FakeResolver {
    fn resolve(&self, uuid: &str) -> Result<Option<PathBuf>, CommandError> {
        self.log.borrow_mut().push(Call::Resolve(uuid.to_string()));
        if self.broken.contains(uuid) {
            return Err(scripted_failure("blkid"));
        }
        Ok(self.devices.get(uuid).cloned())
    }
}

#[derive(Default)]
pub struct FakeMount {
    pub log: CallLog,
    pub failing_devices: HashSet<PathBuf>,
    pub fail_unmount: bool,
    pub fail_flush: bool,
}

impl MountController for FakeMount {
    fn mount(&self, device: &Path, mount_point: &Path) -> Result<(), CommandError> {
        self.log
            .borrow_mut()
            .push(Call::Mount(device.to_path_buf(), mount_point.to_path_buf()));
        if self.failing_devices.contains(device) {
            return Err(scripted_failure("mount"));
        }
        Ok(())
    }

    fn unmount(&self, mount_point: &Path) -> Result<(), CommandError> {
        self.log
            .borrow_mut()
            .push(Call::Unmount(mount_point.to_path_buf()));
        if self.fail_unmount {
            return Err(CommandError::Sys {
                op: format!("umount {}", mount_point.display()),
                source: nix::errno::Errno::EBUSY,
            });
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), CommandError> {
        self.log.borrow_mut().push(Call::Flush);
        if self.fail_flush {
            return Err(scripted_failure("sync"));
        }
        Ok(())
    }
}

pub struct FakeMirror {
    pub log: CallLog,
    pub status: MirrorStatus,
    /// Deleted while mirroring, to make the guard release fail.
    pub remove_on_mirror: Option<PathBuf>,
}

impl MirrorRunner for FakeMirror {
    fn mirror(&self, source: &Path, destination: &Path) -> Result<MirrorStatus, CommandError> {
        self.log.borrow_mut().push(Call::Mirror(
            source.to_path_buf(),
            destination.to_path_buf(),
        ));
        if let Some(path) = &self.remove_on_mirror {
            let _ = std::fs::remove_file(path);
        }
        Ok(self.status)
    }
}

/// Fakes sharing one call log. `devices` maps UUIDs to device paths.
pub struct Rig {
    pub log: CallLog,
    pub resolver: FakeResolver,
    pub mounter: FakeMount,
    pub mirror: FakeMirror,
}

impl Rig {
    pub fn new(devices: &[(&str, &str)]) -> Self {
        let log = CallLog::default();
        Self {
            resolver: FakeResolver {
                log: log.clone(),
                devices: devices
                    .iter()
                    .map(|(uuid, device)| (uuid.to_string(), PathBuf::from(device)))
                    .collect(),
                broken: HashSet::new(),
            },
            mounter: FakeMount {
                log: log.clone(),
                ..Default::default()
            },
            mirror: FakeMirror {
                log: log.clone(),
                status: MirrorStatus::SUCCESS,
                remove_on_mirror: None,
            },
            log,
        }
    }

    pub fn orchestrator(self) -> (ebs::Orchestrator<FakeResolver, FakeMount, FakeMirror>, CallLog) {
        let log = self.log;
        (
            ebs::Orchestrator::new(self.resolver, self.mounter, self.mirror),
            log,
        )
    }
}

pub fn config(uuids: &[&str]) -> ebs::Config {
    ebs::Config {
        enabled: true,
        volume_ids: uuids.iter().map(|id| id.to_string()).collect(),
        source: "/src/".into(),
        destination: "/dst/dirvish/".into(),
        mount_point: "/dst/".into(),
    }
}

/// The mount, mirror, flush, unmount sequence for one device.
pub fn backup_sequence(device: &str) -> Vec<Call> {
    vec![
        mount(device, "/dst/"),
        mirror("/src/", "/dst/dirvish/"),
        Call::Flush,
        unmount("/dst/"),
    ]
}

/// The log with resolver calls removed.
pub fn side_effects(log: &CallLog) -> Vec<Call> {
    log.borrow()
        .iter()
        .filter(|call| !matches!(call, Call::Resolve(_)))
        .cloned()
        .collect()
}
