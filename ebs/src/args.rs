use crate::config::DEFAULT_CONFIG_PATH;
use crate::guard::DEFAULT_LOCK_PATH;
use clap::Parser;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ebs",
    version,
    about = "External Backup Script: copy dirvish backups to external disks"
)]
pub struct Cli {
    /// Configuration File
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Set execution log level, 0 (everything) to 5 (critical only)
    #[arg(
        short,
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(0..=5)
    )]
    pub loglevel: u8,

    /// Lock file preventing overlapping runs
    #[arg(long, value_name = "FILE", default_value = DEFAULT_LOCK_PATH)]
    pub lock_file: PathBuf,

    /// Exit with a non-zero status if any mount, sync or unmount failed
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.loglevel {
            0 => LevelFilter::TRACE,
            1 => LevelFilter::DEBUG,
            2 => LevelFilter::INFO,
            3 => LevelFilter::WARN,
            _ => LevelFilter::ERROR,
        }
    }
}
