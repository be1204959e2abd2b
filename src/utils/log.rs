//! Session logger.
//!
//! Every line lands in the session log file; when verbose, the bare message is
//! mirrored to stdout. Each line is also emitted as a `tracing` event so a
//! subscriber installed by the host process sees the same stream.

use crate::error::Result;
use crate::utils::fs;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const HEADER: &str = " Ind. | Time stamp              : Message\n=====================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
    Error,
    /// Always followed by process termination.
    Fatal,
}

impl Severity {
    pub fn indicator(&self) -> &'static str {
        match self {
            Severity::Normal => "[N]",
            Severity::Warning => "[W]",
            Severity::Error => "[X]",
            Severity::Fatal => "[!]",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub verbose: bool,
    pub log_path: PathBuf,
}

impl LogConfig {
    /// Session log named after the current local time inside `log_dir`.
    pub fn in_dir(log_dir: &Path, verbose: bool) -> Self {
        let stamp = Local::now().format("%Y_%m_%d-%H-%M-%S");
        LogConfig {
            verbose,
            log_path: log_dir.join(format!("ftpsweep_{stamp}.log")),
        }
    }
}

pub struct Logger {
    sink: BufWriter<File>,
    path: PathBuf,
    verbose: bool,
}

impl Logger {
    /// Opens (appending) the session log and writes the header row.
    pub fn open(config: &LogConfig) -> Result<Self> {
        if let Some(parent) = config.log_path.parent() {
            fs::ensure_dir_exists(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_path)?;
        let mut sink = BufWriter::new(file);
        writeln!(sink, "{HEADER}")?;

        Ok(Logger {
            sink,
            path: config.log_path.clone(),
            verbose: config.verbose,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.write(Severity::Normal, message.as_ref());
    }

    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.write(Severity::Warning, message.as_ref());
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.write(Severity::Error, message.as_ref());
    }

    /// Records a fatal entry and flushes; the caller is expected to exit.
    pub fn fatal(&mut self, message: impl AsRef<str>) {
        self.write(Severity::Fatal, message.as_ref());
        let _ = self.sink.flush();
    }

    pub fn write(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Normal => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error | Severity::Fatal => tracing::error!("{message}"),
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        let line = format_line(severity, &timestamp, message);
        // A failing log sink must not take the transfer down with it.
        let _ = writeln!(self.sink, "{line}");

        if self.verbose {
            println!("{message}");
        }
    }

    /// Flushes and closes the log file.
    pub fn close(mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.sink.flush();
    }
}

fn format_line(severity: Severity, timestamp: &str, message: &str) -> String {
    format!(" {}  | {timestamp} : {message}", severity.indicator())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_line() {
        let line = format_line(Severity::Warning, "2024-01-02 03:04:05.000", "dropped siteB");
        assert_eq!(line, " [W]  | 2024-01-02 03:04:05.000 : dropped siteB");
    }

    #[test]
    fn test_severity_indicators() {
        assert_eq!(Severity::Normal.indicator(), "[N]");
        assert_eq!(Severity::Warning.indicator(), "[W]");
        assert_eq!(Severity::Error.indicator(), "[X]");
        assert_eq!(Severity::Fatal.indicator(), "[!]");
    }

    #[test]
    fn test_logger_writes_header_and_lines() {
        let temp = TempDir::new().unwrap();
        let config = LogConfig {
            verbose: false,
            log_path: temp.path().join("nested").join("session.log"),
        };

        let mut log = Logger::open(&config).unwrap();
        log.info("Connecting to siteA");
        log.error("Connection refused");
        log.close().unwrap();

        let content = std::fs::read_to_string(&config.log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].contains("Message"));
        assert!(lines[1].starts_with("====="));
        assert!(lines[2].starts_with(" [N]  | "));
        assert!(lines[2].ends_with(": Connecting to siteA"));
        assert!(lines[3].starts_with(" [X]  | "));
    }

    #[test]
    fn test_log_config_file_name() {
        let config = LogConfig::in_dir(Path::new("/tmp/logs"), true);
        let name = config.log_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("ftpsweep_"));
        assert!(name.ends_with(".log"));
        assert!(config.verbose);
    }
}
