//! In-memory stand-ins for an FTP server, used by the unit tests.

use crate::core::config::SiteConfig;
use crate::core::transfer::{Connector, RemoteDirectory, RetrieveError};
use crate::error::{Result, SweepError};
use crate::utils::log::{LogConfig, Logger};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

pub fn test_logger(dir: &Path) -> Logger {
    Logger::open(&LogConfig {
        verbose: false,
        log_path: dir.join("logs").join("test.log"),
    })
    .unwrap()
}

pub fn test_site(name: &str) -> SiteConfig {
    SiteConfig {
        name: name.to_string(),
        host: "ftp.example.com".to_string(),
        user: "u".to_string(),
        password: "p".to_string(),
        remote_path: "/out".to_string(),
        port: 21,
    }
}

#[derive(Debug, Clone)]
enum FakeEntry {
    File(Vec<u8>),
    Dir { listed: bool },
    Broken,
    NameOnly,
}

#[derive(Debug, Clone)]
pub struct FakeServer {
    remote_path: String,
    entries: Vec<(String, FakeEntry)>,
    listing_fails: bool,
}

impl FakeServer {
    pub fn new(remote_path: &str) -> Self {
        FakeServer {
            remote_path: remote_path.to_string(),
            entries: Vec::new(),
            listing_fails: false,
        }
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push((name.to_string(), FakeEntry::File(data.to_vec())));
        self
    }

    /// A directory that shows up as `d...` in the long listing.
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), FakeEntry::Dir { listed: true }));
        self
    }

    /// A directory only discoverable through a 550 on retrieve.
    pub fn hidden_dir(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), FakeEntry::Dir { listed: false }));
        self
    }

    pub fn broken(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), FakeEntry::Broken));
        self
    }

    /// An NLST-only name such as `.` or `..`.
    pub fn name(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), FakeEntry::NameOnly));
        self
    }

    /// LIST and NLST are refused after a successful CWD.
    pub fn refuse_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }
}

#[derive(Debug, Default)]
struct Activity {
    attempts: Vec<String>,
    quits: usize,
}

#[derive(Default)]
pub struct FakeConnector {
    servers: HashMap<String, FakeServer>,
    activity: Rc<RefCell<Activity>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, host: &str, server: FakeServer) -> Self {
        self.servers.insert(host.to_string(), server);
        self
    }

    /// Site names in the order connections were attempted.
    pub fn attempts(&self) -> Vec<String> {
        self.activity.borrow().attempts.clone()
    }

    pub fn quit_count(&self) -> usize {
        self.activity.borrow().quits
    }
}

pub struct FakeRemote {
    server: FakeServer,
    cwd: Option<String>,
    activity: Rc<RefCell<Activity>>,
}

impl Connector for FakeConnector {
    type Remote = FakeRemote;

    fn connect(&self, site: &SiteConfig) -> Result<FakeRemote> {
        self.activity.borrow_mut().attempts.push(site.name.clone());
        let server = self
            .servers
            .get(&site.host)
            .cloned()
            .ok_or_else(|| SweepError::connection(&site.host, "connection refused"))?;

        Ok(FakeRemote {
            server,
            cwd: None,
            activity: Rc::clone(&self.activity),
        })
    }
}

impl FakeRemote {
    fn check_listing(&self) -> Result<()> {
        if self.server.listing_fails {
            let path = self.cwd.as_deref().unwrap_or("/");
            return Err(SweepError::listing(path, "425 Can't open data connection"));
        }
        Ok(())
    }
}

impl RemoteDirectory for FakeRemote {
    fn welcome(&self) -> Option<String> {
        Some("220-Welcome\n220 Fake FTP ready".to_string())
    }

    fn change_dir(&mut self, path: &str) -> Result<()> {
        if path == self.server.remote_path {
            self.cwd = Some(path.to_string());
            Ok(())
        } else {
            Err(SweepError::remote_path(path, "550 No such directory"))
        }
    }

    fn list_long(&mut self) -> Result<Vec<String>> {
        self.check_listing()?;
        Ok(self
            .server
            .entries
            .iter()
            .filter_map(|(name, entry)| match entry {
                FakeEntry::File(data) => Some(format!(
                    "-rw-r--r--    1 ftp      ftp      {:>8} Jan 01 10:00 {name}",
                    data.len()
                )),
                FakeEntry::Broken => {
                    Some(format!("-rw-------    1 ftp      ftp             0 Jan 01 10:00 {name}"))
                }
                FakeEntry::Dir { listed: true } => {
                    Some(format!("drwxr-xr-x    2 ftp      ftp          4096 Jan 01 10:00 {name}"))
                }
                _ => None,
            })
            .collect())
    }

    fn list_names(&mut self) -> Result<Vec<String>> {
        self.check_listing()?;
        Ok(self.server.entries.iter().map(|(name, _)| name.clone()).collect())
    }

    fn retrieve(
        &mut self,
        name: &str,
        dest: &mut dyn Write,
    ) -> std::result::Result<u64, RetrieveError> {
        let io_failed = |e: std::io::Error| RetrieveError::Other(e.to_string());
        match self.server.entries.iter().find(|(n, _)| n == name) {
            Some((_, FakeEntry::File(data))) => {
                dest.write_all(data).map_err(io_failed)?;
                Ok(data.len() as u64)
            }
            Some((_, FakeEntry::Broken)) => {
                // The data connection drops halfway through.
                dest.write_all(b"partial").map_err(io_failed)?;
                Err(RetrieveError::Other("426 Connection closed; transfer aborted".to_string()))
            }
            _ => Err(RetrieveError::NotAFile),
        }
    }

    fn quit(&mut self) -> Result<()> {
        self.activity.borrow_mut().quits += 1;
        Ok(())
    }
}
