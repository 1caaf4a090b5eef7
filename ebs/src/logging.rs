use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable whose filter directives override the `-l` level.
pub static LOG_ENV: &str = "EBS_LOG";

/// Installs the stderr subscriber. `EBS_LOG` wins over `level` when set.
pub fn init(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
