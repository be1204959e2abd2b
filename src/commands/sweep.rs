use crate::core::config::SiteCatalog;
use crate::core::pipeline::{run_pipeline, PipelineOptions, SiteSelector};
use crate::core::report::RunReport;
use crate::core::transfer::{FtpConnector, SessionOptions};
use crate::error::Result;
use crate::utils::log::{LogConfig, Logger};
use crate::utils::{fs, paths};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Everything a run needs, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub site: Option<String>,
    pub preserve: bool,
    pub purge_pattern: Option<String>,
    pub unzip: bool,
    pub verbose: bool,
    pub log_dir: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

/// Opens the session log and runs the whole sweep against real FTP servers.
/// Any error returned here has already been logged as fatal.
pub fn run_sweep(settings: &RunSettings) -> Result<RunReport> {
    let report = RunReport::new();
    let log_dir = match &settings.log_dir {
        Some(dir) => dir.clone(),
        None => paths::default_log_dir()?,
    };
    let mut log = Logger::open(&LogConfig::in_dir(&log_dir, settings.verbose))?;

    let result = sweep(settings, report, &mut log);
    match &result {
        Ok(_) => {
            let log_path = log.path().display().to_string();
            log.info(format!("Session log: {log_path}"));
        }
        Err(e) => {
            log.fatal(e.to_string());
            log.fatal("Exiting...");
        }
    }
    log.close()?;

    result
}

fn sweep(settings: &RunSettings, report: RunReport, log: &mut Logger) -> Result<RunReport> {
    let config_path = paths::resolve_config_path(settings.config_path.as_deref(), log)?;
    let (output_dir, defaulted) = paths::resolve_output_dir(settings.output_dir.as_deref(), log)?;

    log.info(format!("FTP YAML path: {}", config_path.display()));
    log.info(format!(
        "Local directory: {}{}",
        output_dir.display(),
        if defaulted { " (default)" } else { "" }
    ));
    log.info(format!("Preserve: {}", settings.preserve));
    log.info(format!("Verbose: {}", settings.verbose));
    log.info(format!("Unzip files: {}", settings.unzip));

    let (catalog, dropped) = SiteCatalog::load(&config_path)?;
    for site in &dropped {
        log.warn(format!(
            "Site entry '{}' removed from configuration: {}",
            site.name, site.reason
        ));
    }

    let selector = SiteSelector::from_arg(settings.site.as_deref());
    if let Err(e) = selector.resolve(&catalog) {
        log.error("Check the log to make sure the site wasn't removed due to incomplete information.");
        return Err(e);
    }

    purge_old_files(settings, &output_dir, log)?;

    let options = PipelineOptions {
        output_dir,
        expand: settings.unzip,
        session: SessionOptions::default(),
    };
    let report = run_pipeline(&FtpConnector, &catalog, &selector, &options, report, log)?;

    if let Some(path) = &settings.report_path {
        report.write_json(path)?;
        log.info(format!("Report written to {}", path.display()));
    }

    Ok(report)
}

fn purge_old_files(settings: &RunSettings, output_dir: &Path, log: &mut Logger) -> Result<()> {
    let pattern = match &settings.purge_pattern {
        Some(pattern) => pattern,
        None => return Ok(()),
    };

    if settings.preserve {
        log.info(format!("Preserve is set, not purging files matching '{pattern}'."));
        return Ok(());
    }

    let regex = Regex::new(pattern)?;
    let removed = fs::purge_matching(output_dir, &regex)?;
    log.info(format!(
        "Purged {removed} existing files matching '{pattern}' from {}.",
        output_dir.display()
    ));
    Ok(())
}
