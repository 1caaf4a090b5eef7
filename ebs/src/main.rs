use clap::Parser;
use ebs::{Outcome, args::Cli, logging, system_orchestrator};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level());

    match system_orchestrator().run_once(&cli.lock_file, &cli.config) {
        Ok(Outcome::Completed(report)) if cli.strict && report.has_failures() => {
            tracing::error!("backup finished with failures");
            std::process::exit(1);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!("{e:?}");
            std::process::exit(1);
        }
    }
}
