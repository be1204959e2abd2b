//! Drives a whole run: pick sites, transfer each one, expand archives, report.

use crate::core::archive;
use crate::core::config::{SiteCatalog, SiteConfig};
use crate::core::report::{DownloadRecord, RunReport, SiteFailure};
use crate::core::transfer::{run_session, Connector, SessionOptions};
use crate::error::{Result, SweepError};
use crate::utils::fs;
use crate::utils::log::Logger;
use std::path::PathBuf;
use std::str::FromStr;

/// Sentinel accepted on the command line for "every configured site".
pub const MATCH_ALL: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSelector {
    All,
    Named(String),
}

impl SiteSelector {
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None => SiteSelector::All,
            Some(name) if name == MATCH_ALL => SiteSelector::All,
            Some(name) => SiteSelector::Named(name.to_string()),
        }
    }

    /// Resolves to catalog entries. Fails before anything touches the network.
    pub fn resolve<'a>(&self, catalog: &'a SiteCatalog) -> Result<Vec<&'a SiteConfig>> {
        match self {
            SiteSelector::All => Ok(catalog.iter().collect()),
            SiteSelector::Named(name) => catalog
                .get(name)
                .map(|site| vec![site])
                .ok_or_else(|| SweepError::UnknownSite { name: name.clone() }),
        }
    }
}

impl FromStr for SiteSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(SiteSelector::from_arg(Some(s)))
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    pub expand: bool,
    pub session: SessionOptions,
}

/// Runs every selected site into `report`, which the caller opens when the
/// run starts so the elapsed time covers setup as well.
pub fn run_pipeline<C: Connector>(
    connector: &C,
    catalog: &SiteCatalog,
    selector: &SiteSelector,
    options: &PipelineOptions,
    mut report: RunReport,
    log: &mut Logger,
) -> Result<RunReport> {

    let targets = selector.resolve(catalog)?;
    let target_names: Vec<&str> = targets.iter().map(|site| site.name.as_str()).collect();
    log.info(format!("Target sites: {target_names:?}"));

    fs::ensure_dir_exists(&options.output_dir)?;

    for site in targets {
        let outcome = match run_session(connector, site, &options.output_dir, &options.session, log)
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_site_local() => {
                log.error(format!("Site {} failed: {e}. Continuing with next site.", site.name));
                report.site_failures.push(SiteFailure {
                    site: site.name.clone(),
                    error: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        let fetched = outcome.fetched_names();

        if options.expand {
            let expansions = archive::expand(&options.output_dir, &fetched, log);
            report.expansions.extend(expansions);
        }

        for name in fetched {
            let path = options.output_dir.join(&name);
            let size_bytes = match fs::file_size(&path) {
                Ok(size) => size,
                Err(e) => {
                    log.warn(format!("Could not read size of {}: {e}", path.display()));
                    0
                }
            };
            report.records.push(DownloadRecord {
                site: site.name.clone(),
                file_name: name,
                path,
                size_bytes,
            });
        }
    }

    report.finish();
    log.info(format!(
        "Run finished: {} files, {} bytes, {} site failures",
        report.records.len(),
        report.total_bytes(),
        report.site_failures.len()
    ));

    Ok(report)
}
