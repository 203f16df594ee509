//! DustDevil - metric forwarding worker
//!
//! Consumes time-series metric messages from a partitioned message log,
//! reshapes them, and forwards them as JSON to an HTTP collector or
//! Elasticsearch endpoint, committing offsets only after the downstream
//! write succeeded.
//!
//! # Usage
//!
//! ```bash
//! dustdevil --config /etc/dustdevil/dustdevil.conf
//! dustdevil --version
//! ```
//!
//! Exit codes: 0 on clean shutdown, 1 on fault.

mod kafka;
mod logging;
mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use dustdevil_config::Config;

/// DustDevil metric forwarder
#[derive(Parser, Debug)]
#[command(name = "dustdevil")]
#[command(about = "Forwards metric messages from a partitioned log to an HTTP endpoint")]
struct Cli {
    /// Configuration file location
    #[arg(short, long, default_value = "dustdevil.conf")]
    config: PathBuf,

    /// Print version information and exit
    #[arg(long)]
    version: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("could not open configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.log) {
        eprintln!("unable to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "starting DUSTDEVIL"
    );

    match serve::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "dustdevil terminated on fault");
            ExitCode::FAILURE
        }
    }
}

/// Print build metadata to stderr
fn print_version() {
    eprintln!("DustDevil Metric Forwarder");
    eprintln!("Version  : {}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "Git Hash : {}",
        option_env!("DUSTDEVIL_GIT_HASH").unwrap_or("unknown")
    );
    eprintln!(
        "Built    : {}",
        option_env!("DUSTDEVIL_BUILD_DATE").unwrap_or("unknown")
    );
}
