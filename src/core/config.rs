use crate::error::{Result, SweepError};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

pub const DEFAULT_FTP_PORT: u16 = 21;

/// One validated site entry from the credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub name: String,
    pub host: String,
    pub user: String,
    pub password: String,
    pub remote_path: String,
    pub port: u16,
}

/// An entry that was discarded while loading, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedSite {
    pub name: String,
    pub reason: String,
}

/// Validated sites, in the order they appear in the file.
#[derive(Debug, Clone, Default)]
pub struct SiteCatalog {
    sites: Vec<SiteConfig>,
}

/// Shape of an entry before validation. Values stay untyped so numeric
/// passwords and other scalars can be coerced to strings.
#[derive(Debug, Deserialize)]
struct RawSite {
    site: Option<Value>,
    user: Option<Value>,
    password: Option<Value>,
    remote_path: Option<Value>,
    port: Option<u16>,
}

impl SiteCatalog {
    pub fn load(path: &Path) -> Result<(Self, Vec<DroppedSite>)> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            SweepError::ConfigParse { message, .. } => SweepError::config_parse(path, message),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<(Self, Vec<DroppedSite>)> {
        let document: Value = serde_yaml::from_str(content)
            .map_err(|e| SweepError::config_parse("<input>", e.to_string()))?;

        let entries = match document {
            Value::Mapping(entries) => entries,
            _ => {
                return Err(SweepError::config_parse(
                    "<input>",
                    "top level must be a mapping of site names to site entries",
                ))
            }
        };

        let mut sites: Vec<SiteConfig> = Vec::new();
        let mut dropped = Vec::new();

        for (key, value) in entries {
            let name = match scalar_to_string(&key) {
                Some(name) if !name.is_empty() => name,
                _ => {
                    dropped.push(DroppedSite {
                        name: format!("{key:?}"),
                        reason: "site name must be a non-empty scalar".to_string(),
                    });
                    continue;
                }
            };

            match validate_entry(&name, value) {
                Ok(site) => sites.push(site),
                Err(reason) => dropped.push(DroppedSite { name, reason }),
            }
        }

        Ok((SiteCatalog { sites }, dropped))
    }

    pub fn get(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|site| site.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sites.iter().map(|site| site.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.iter()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl FromIterator<SiteConfig> for SiteCatalog {
    fn from_iter<I: IntoIterator<Item = SiteConfig>>(iter: I) -> Self {
        let mut sites: Vec<SiteConfig> = Vec::new();
        for site in iter {
            if let Some(existing) = sites.iter_mut().find(|s| s.name == site.name) {
                *existing = site;
            } else {
                sites.push(site);
            }
        }
        SiteCatalog { sites }
    }
}

fn validate_entry(name: &str, value: Value) -> std::result::Result<SiteConfig, String> {
    if !value.is_mapping() {
        return Err("site entry must be a mapping".to_string());
    }

    let raw: RawSite = serde_yaml::from_value(value).map_err(|e| e.to_string())?;

    let host = required(raw.site, "site")?;
    let user = required(raw.user, "user")?;
    let password = required(raw.password, "password")?;
    let remote_path = required(raw.remote_path, "remote_path")?;

    let port = match raw.port {
        Some(0) => return Err("port must be between 1 and 65535".to_string()),
        Some(port) => port,
        None => DEFAULT_FTP_PORT,
    };

    Ok(SiteConfig {
        name: name.to_string(),
        host,
        user,
        password,
        remote_path,
        port,
    })
}

fn required(value: Option<Value>, key: &str) -> std::result::Result<String, String> {
    let value = value.ok_or_else(|| format!("key '{key}' is missing"))?;
    match scalar_to_string(&value) {
        Some(text) if !text.is_empty() => Ok(text),
        Some(_) => Err(format!("value of '{key}' is empty")),
        None if value.is_null() => Err(format!("value of '{key}' is empty")),
        None => Err(format!("value of '{key}' must be a scalar")),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
