use anyhow::{Context, Result};
use ini::{Ini, WriteOption};
use std::fs;
use std::path::{Path, PathBuf};

pub static DEFAULT_CONFIG_PATH: &str = "/etc/ebs.ini";

static DEFAULT_SECTION: &str = "DEFAULT";
static BACKUP_SECTION: &str = "BACKUP";

static KEY_ENABLED: &str = "enabled";
static KEY_BLKID: &str = "blkid";
static KEY_SOURCE: &str = "rsync_source";
static KEY_DESTINATION: &str = "rsync_destination";
static KEY_MOUNT_PATH: &str = "mount_path";

static SOURCE_PATH: &str = "/mnt/backup/dirvish/";
static DESTINATION_PATH: &str = "/mnt/externalbackup/dirvish/";
static MOUNT_PATH: &str = "/mnt/externalbackup/";

/// Settings for one run, read from an INI file with a `DEFAULT` and a
/// `BACKUP` section.
///
/// Paths are kept exactly as written. A trailing `/` on the source
/// matters to rsync (copy the directory contents, not the directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub enabled: bool,
    /// Volume UUIDs in the order they are tried.
    pub volume_ids: Vec<String>,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mount_point: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            volume_ids: Vec::new(),
            source: PathBuf::from(SOURCE_PATH),
            destination: PathBuf::from(DESTINATION_PATH),
            mount_point: PathBuf::from(MOUNT_PATH),
        }
    }
}

impl Config {
    /// Loads the configuration at `path`.
    ///
    /// A missing, unreadable or blank file is replaced by the disabled
    /// default, which is written back to `path` before being returned.
    /// A file that is present but not valid UTF-8 or INI is left alone and
    /// the disabled default is used for this run. This never fails.
    pub fn load(path: &Path) -> Self {
        tracing::debug!(path = %path.display(), "loading configuration");

        let bytes = match fs::read(path) {
            Ok(bytes) if !bytes.trim_ascii().is_empty() => bytes,
            Ok(_) => {
                tracing::warn!(path = %path.display(), "configuration file is empty, creating default configuration");
                return Self::synthesize_default(path);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "no configuration file ({e}), creating default configuration");
                return Self::synthesize_default(path);
            }
        };

        let parsed = String::from_utf8(bytes)
            .context("configuration is not valid UTF-8")
            .and_then(|content| Self::parse(&content));
        match parsed {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path.display(), "failed to parse configuration: {e:#}");
                Self::default()
            }
        }
    }

    fn synthesize_default(path: &Path) -> Self {
        let config = Self::default();
        if let Err(e) = config.persist(path) {
            tracing::error!("{e:#}");
        }
        config
    }

    /// Parses INI text. Keys missing from `BACKUP` are looked up in
    /// `DEFAULT`, then fall back to the built-in defaults. Section and key
    /// names match regardless of case.
    pub fn parse(content: &str) -> Result<Self> {
        let ini = Ini::load_from_str(content).context("invalid INI syntax")?;
        let defaults = ini.section(Some(DEFAULT_SECTION));
        let backup = ini.section(Some(BACKUP_SECTION));

        let lookup = |key: &'static str| {
            backup
                .and_then(|props| props.get(key))
                .or_else(|| defaults.and_then(|props| props.get(key)))
        };
        let base = Self::default();

        Ok(Self {
            enabled: defaults
                .and_then(|props| props.get(KEY_ENABLED))
                .map(|value| value.trim() == "true")
                .unwrap_or(false),
            volume_ids: lookup(KEY_BLKID).map(split_volume_ids).unwrap_or_default(),
            source: lookup(KEY_SOURCE).map(PathBuf::from).unwrap_or(base.source),
            destination: lookup(KEY_DESTINATION)
                .map(PathBuf::from)
                .unwrap_or(base.destination),
            mount_point: lookup(KEY_MOUNT_PATH)
                .map(PathBuf::from)
                .unwrap_or(base.mount_point),
        })
    }

    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(DEFAULT_SECTION))
            .set(KEY_ENABLED, if self.enabled { "true" } else { "false" });
        ini.with_section(Some(BACKUP_SECTION))
            .set(KEY_BLKID, self.volume_ids.join(","))
            .set(KEY_SOURCE, self.source.to_string_lossy())
            .set(KEY_DESTINATION, self.destination.to_string_lossy())
            .set(KEY_MOUNT_PATH, self.mount_point.to_string_lossy());
        ini
    }

    /// Overwrites `path` with this configuration.
    pub fn persist(&self, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), "saving configuration");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {parent:?}"))?;
        }

        let mut buf = Vec::new();
        let opt = WriteOption {
            kv_separator: " = ",
            ..Default::default()
        };
        self.to_ini()
            .write_to_opt(&mut buf, opt)
            .context("Failed to serialize configuration")?;
        fs::write(path, buf).with_context(|| format!("Failed to write configuration to {path:?}"))
    }
}

/// Splits the comma separated `blkid` value. Blank entries are dropped,
/// duplicates are kept.
pub fn split_volume_ids(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}
