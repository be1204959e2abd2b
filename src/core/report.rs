use crate::core::archive::ExpandOutcome;
use crate::error::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const RULE: &str = "=================================================================";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRecord {
    pub site: String,
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// A site whose session could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteFailure {
    pub site: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub records: Vec<DownloadRecord>,
    pub site_failures: Vec<SiteFailure>,
    pub expansions: Vec<ExpandOutcome>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self::started_at(Local::now())
    }

    pub fn started_at(started_at: DateTime<Local>) -> Self {
        RunReport {
            started_at,
            finished_at: None,
            records: Vec::new(),
            site_failures: Vec::new(),
            expansions: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finish_at(Local::now());
    }

    pub fn finish_at(&mut self, finished_at: DateTime<Local>) {
        self.finished_at = Some(finished_at);
    }

    pub fn elapsed_millis(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Local::now);
        (end - self.started_at).num_milliseconds()
    }

    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size_bytes).sum()
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.file_name.as_str()).collect()
    }

    pub fn render_summary(&self) -> String {
        let end = self.finished_at.unwrap_or_else(Local::now);
        let millis = self.elapsed_millis();
        let mut out = String::new();

        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "RUN COMPLETED");
        let _ = writeln!(out, "Starting time: {}", self.started_at.format("%H:%M:%S"));
        let _ = writeln!(out, "Ending time: {}", end.format("%H:%M:%S"));
        let _ = writeln!(
            out,
            "Total execution time: {millis} milliseconds ({} seconds)",
            millis as f64 / 1000.0
        );
        let _ = writeln!(out, "Total files downloaded: {}", self.records.len());
        for record in &self.records {
            let _ = writeln!(
                out,
                "\tFilename: {}\t\tSize: {} bytes.",
                record.path.display(),
                record.size_bytes
            );
        }
        if !self.site_failures.is_empty() {
            let _ = writeln!(out, "Sites that failed: {}", self.site_failures.len());
            for failure in &self.site_failures {
                let _ = writeln!(out, "\t{}: {}", failure.site, failure.error);
            }
        }
        let _ = write!(out, "{RULE}");

        out
    }

    pub fn print_summary(&self) {
        println!("{}", self.render_summary());
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
