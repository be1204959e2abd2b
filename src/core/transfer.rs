//! One connection to one site: login, cd, list, fetch every plain file, quit.

use crate::core::config::SiteConfig;
use crate::error::{Result, SweepError};
use crate::utils::fs;
use crate::utils::log::Logger;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Component, Path};
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Status};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Why a single retrieve did not produce file contents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrieveError {
    #[error("not a regular file")]
    NotAFile,
    #[error("{0}")]
    Other(String),
}

/// An authenticated session positioned somewhere on a remote server.
pub trait RemoteDirectory {
    fn welcome(&self) -> Option<String>;
    fn change_dir(&mut self, path: &str) -> Result<()>;
    /// Human-readable listing of the working directory (`LIST`).
    fn list_long(&mut self) -> Result<Vec<String>>;
    /// Bare entry names of the working directory (`NLST`).
    fn list_names(&mut self) -> Result<Vec<String>>;
    /// Streams the contents of `name` into `dest`; returns the bytes copied.
    fn retrieve(&mut self, name: &str, dest: &mut dyn Write)
        -> std::result::Result<u64, RetrieveError>;
    fn quit(&mut self) -> Result<()>;
}

/// Opens authenticated sessions for site entries.
pub trait Connector {
    type Remote: RemoteDirectory;

    fn connect(&self, site: &SiteConfig) -> Result<Self::Remote>;
}

/// Plain FTP in passive mode with binary transfers.
#[derive(Debug, Default, Clone, Copy)]
pub struct FtpConnector;

pub struct FtpRemote {
    stream: FtpStream,
    host: String,
    cwd: String,
}

impl Connector for FtpConnector {
    type Remote = FtpRemote;

    fn connect(&self, site: &SiteConfig) -> Result<FtpRemote> {
        let mut stream = FtpStream::connect((site.host.as_str(), site.port))
            .map_err(|e| SweepError::connection(&site.host, e.to_string()))?;
        stream
            .login(site.user.as_str(), site.password.as_str())
            .map_err(|e| SweepError::connection(&site.host, format!("login failed: {e}")))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| SweepError::connection(&site.host, e.to_string()))?;

        Ok(FtpRemote {
            stream,
            host: site.host.clone(),
            cwd: "/".to_string(),
        })
    }
}

impl RemoteDirectory for FtpRemote {
    fn welcome(&self) -> Option<String> {
        self.stream.get_welcome_msg().map(str::to_string)
    }

    fn change_dir(&mut self, path: &str) -> Result<()> {
        self.stream
            .cwd(path)
            .map_err(|e| SweepError::remote_path(path, e.to_string()))?;
        self.cwd = path.to_string();
        Ok(())
    }

    fn list_long(&mut self) -> Result<Vec<String>> {
        self.stream
            .list(None)
            .map_err(|e| SweepError::listing(&self.cwd, e.to_string()))
    }

    fn list_names(&mut self) -> Result<Vec<String>> {
        self.stream
            .nlst(None)
            .map_err(|e| SweepError::listing(&self.cwd, e.to_string()))
    }

    fn retrieve(
        &mut self,
        name: &str,
        dest: &mut dyn Write,
    ) -> std::result::Result<u64, RetrieveError> {
        let copied = self.stream.retr(name, |reader| {
            std::io::copy(reader, &mut *dest).map_err(FtpError::ConnectionError)
        });
        match copied {
            Ok(bytes) => Ok(bytes),
            Err(FtpError::UnexpectedResponse(response))
                if response.status == Status::FileUnavailable =>
            {
                Err(RetrieveError::NotAFile)
            }
            Err(e) => Err(RetrieveError::Other(e.to_string())),
        }
    }

    fn quit(&mut self) -> Result<()> {
        self.stream
            .quit()
            .map_err(|e| SweepError::connection(&self.host, e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Fetched { bytes: u64 },
    SkippedNotAFile,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub site: String,
    pub entries: Vec<(String, FetchOutcome)>,
}

impl SessionOutcome {
    pub fn fetched_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, outcome)| matches!(outcome, FetchOutcome::Fetched { .. }))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Pause after QUIT so the server can finish tearing the session down.
    pub linger: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            linger: Duration::from_secs(1),
        }
    }
}

pub fn run_session<C: Connector>(
    connector: &C,
    site: &SiteConfig,
    local_dir: &Path,
    options: &SessionOptions,
    log: &mut Logger,
) -> Result<SessionOutcome> {
    log.info(format!("Connecting to {} at host {}...", site.name, site.host));
    let mut remote = connector.connect(site)?;

    if let Some(welcome) = remote.welcome() {
        log.info("Welcome: ");
        for line in welcome.lines() {
            log.info(line);
        }
    }
    log.info("Connected Successfully!");

    let result = download_all(&mut remote, site, local_dir, log);
    disconnect(&mut remote, site, options, log);

    let entries = result?;
    Ok(SessionOutcome {
        site: site.name.clone(),
        entries,
    })
}

fn download_all<R: RemoteDirectory>(
    remote: &mut R,
    site: &SiteConfig,
    local_dir: &Path,
    log: &mut Logger,
) -> Result<Vec<(String, FetchOutcome)>> {
    remote.change_dir(&site.remote_path)?;
    fs::ensure_dir_exists(local_dir)?;

    log.info("Only files are downloaded, directories are skipped.");
    log.info(format!("Files at {}:", site.remote_path));
    let long_listing = remote.list_long()?;
    for line in &long_listing {
        log.info(line);
    }

    let names = remote.list_names()?;
    let mut entries = Vec::new();

    for raw in &names {
        let name = match entry_name(raw) {
            Some(name) => name,
            None => {
                if !matches!(raw.trim_end(), "." | ".." | "") {
                    log.warn(format!("Ignoring entry with unusable name: {raw:?}"));
                }
                continue;
            }
        };

        log.info(format!("Downloading {name}..."));
        let outcome = fetch_one(remote, &long_listing, name, local_dir);
        match &outcome {
            FetchOutcome::Fetched { .. } => {}
            FetchOutcome::SkippedNotAFile => {
                log.info(format!("{name} is a directory, skipping..."))
            }
            FetchOutcome::Failed { reason } => {
                log.error(format!("Failed to download {name}: {reason}"))
            }
        }
        entries.push((name.to_string(), outcome));
    }

    let fetched = entries
        .iter()
        .filter(|(_, o)| matches!(o, FetchOutcome::Fetched { .. }))
        .count();
    log.info(format!("{fetched} files successfully downloaded"));

    Ok(entries)
}

fn fetch_one<R: RemoteDirectory>(
    remote: &mut R,
    long_listing: &[String],
    name: &str,
    local_dir: &Path,
) -> FetchOutcome {
    if listed_as_directory(long_listing, name) {
        return FetchOutcome::SkippedNotAFile;
    }

    // Contents land in a temp file next to the target and are renamed into
    // place only once complete; dropping the temp file removes it.
    let staging = match NamedTempFile::new_in(local_dir) {
        Ok(staging) => staging,
        Err(e) => {
            return FetchOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };

    let mut writer = BufWriter::new(staging);
    let bytes = match remote.retrieve(name, &mut writer) {
        Ok(bytes) => bytes,
        Err(RetrieveError::NotAFile) => return FetchOutcome::SkippedNotAFile,
        Err(RetrieveError::Other(reason)) => return FetchOutcome::Failed { reason },
    };

    let staging = match writer.into_inner() {
        Ok(staging) => staging,
        Err(e) => {
            return FetchOutcome::Failed {
                reason: e.error().to_string(),
            }
        }
    };

    match staging.persist(local_dir.join(name)) {
        Ok(_) => FetchOutcome::Fetched { bytes },
        Err(e) => FetchOutcome::Failed {
            reason: e.error.to_string(),
        },
    }
}

fn disconnect<R: RemoteDirectory>(
    remote: &mut R,
    site: &SiteConfig,
    options: &SessionOptions,
    log: &mut Logger,
) {
    log.info(format!("Disconnecting from {}...", site.host));
    match remote.quit() {
        Ok(()) => log.info(format!("Disconnected from {}.", site.host)),
        Err(e) => log.warn(format!("Unclean disconnect from {}: {e}", site.host)),
    }
    if !options.linger.is_zero() {
        std::thread::sleep(options.linger);
    }
}

/// Some servers answer NLST with paths; only the last component is kept.
/// Returns `None` unless what remains is a single plain path component.
fn entry_name(raw: &str) -> Option<&str> {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if name.contains('\\') {
        return None;
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(name),
        _ => None,
    }
}

/// Returns the rest of `line` after skipping `count` whitespace-separated fields.
fn skip_fields(line: &str, count: usize) -> Option<&str> {
    let mut rest = line.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace)?;
        rest = rest[end..].trim_start();
    }
    (!rest.is_empty()).then_some(rest)
}

/// Splits a `LIST` line into (is directory, file name).
///
/// DOS servers print `date time <DIR>|size name`; everything else is read as
/// the Unix `ls -l` layout where the name follows eight fields.
fn parse_listing_line(line: &str) -> Option<(bool, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.starts_with(|c: char| c.is_ascii_digit()) {
        let is_dir = line.split_whitespace().nth(2) == Some("<DIR>");
        return skip_fields(line, 3).map(|name| (is_dir, name));
    }

    let is_dir = line.starts_with('d');
    skip_fields(line, 8).map(|name| (is_dir, name))
}

fn listed_as_directory(long_listing: &[String], name: &str) -> bool {
    long_listing
        .iter()
        .filter_map(|line| parse_listing_line(line))
        .any(|(is_dir, listed)| is_dir && listed == name)
}
