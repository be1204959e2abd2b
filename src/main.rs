use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ftpsweep::commands::sweep::{run_sweep, RunSettings};

#[derive(Parser)]
#[clap(name = "ftpsweep")]
#[clap(about = "Download every file from the FTP sites listed in a YAML credentials file")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Path to the YAML file with FTP hostnames, users, passwords and paths
    /// (default: ftp.yaml in the current directory, then the user directory)
    #[clap(short = 'f', long = "file")]
    file: Option<PathBuf>,
    /// Directory the files are downloaded into (default: home, or Downloads on Windows)
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Only run against this site from the configuration ("*" for all sites)
    #[clap(short, long)]
    site: Option<String>,
    /// Keep old files even when a purge pattern is given
    #[clap(short, long)]
    preserve: bool,
    /// Before downloading, delete files in the output directory whose name matches this regex
    #[clap(long, value_name = "REGEX")]
    purge_pattern: Option<String>,
    /// Extract downloaded zip and tar files into the output directory
    #[clap(short, long)]
    unzip: bool,
    /// Mirror the session log to the terminal
    #[clap(short, long)]
    verbose: bool,
    /// Directory for session log files (default: ~/log)
    #[clap(long)]
    log_dir: Option<PathBuf>,
    /// Also write the run report as JSON to this path
    #[clap(long)]
    report: Option<PathBuf>,
}

impl From<Cli> for RunSettings {
    fn from(cli: Cli) -> Self {
        RunSettings {
            config_path: cli.file,
            output_dir: cli.output,
            site: cli.site,
            preserve: cli.preserve,
            purge_pattern: cli.purge_pattern,
            unzip: cli.unzip,
            verbose: cli.verbose,
            log_dir: cli.log_dir,
            report_path: cli.report,
        }
    }
}

fn main() -> Result<()> {
    // Diagnostics only; the session log is written regardless of RUST_LOG.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = RunSettings::from(cli);

    let result = run_sweep(&settings).map_err(|e| anyhow::anyhow!(e));

    match result {
        Ok(report) => report.print_summary(),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}
