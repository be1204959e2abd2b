use crate::error::{Result, SweepError};
use crate::utils::log::Logger;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "ftp.yaml";

/// Directories searched for `ftp.yaml` when no usable `--file` is given:
/// the working directory first, then the per-user location.
pub fn config_search_dirs() -> Vec<PathBuf> {
    let mut dirs_to_search = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs_to_search.push(cwd);
    }

    let user_dir = if cfg!(windows) {
        dirs::data_local_dir()
    } else {
        dirs::home_dir()
    };
    if let Some(dir) = user_dir {
        dirs_to_search.push(dir);
    }

    dirs_to_search
}

pub fn find_config_in(search_dirs: &[PathBuf]) -> Result<PathBuf> {
    search_dirs
        .iter()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| SweepError::ConfigNotFound {
            file_name: CONFIG_FILE_NAME.to_string(),
        })
}

/// Reason a user-supplied config path cannot be used, if any.
pub fn check_config_path(path: &Path) -> Option<&'static str> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if !is_yaml {
        return Some("Configuration file must have a .yaml extension");
    }
    if !path.exists() {
        return Some("Specified path to the configuration file is invalid");
    }
    None
}

pub fn resolve_config_path(custom: Option<&Path>, log: &mut Logger) -> Result<PathBuf> {
    if let Some(path) = custom {
        match check_config_path(path) {
            None => return Ok(path.to_path_buf()),
            Some(reason) => log.error(format!(
                "{reason}: {}. Looking for configuration file in default locations.",
                path.display()
            )),
        }
    }

    find_config_in(&config_search_dirs())
}

/// Reason a user-supplied output directory cannot be used, if any.
pub fn check_output_dir(path: &Path) -> Option<&'static str> {
    if !path.exists() {
        return Some("The download path does not exist");
    }
    if !path.is_dir() {
        return Some("The download path must be a directory, not a file");
    }
    None
}

pub fn default_output_dir() -> Result<PathBuf> {
    if cfg!(windows) {
        dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .ok_or(SweepError::HomeDirectoryNotFound)
    } else {
        dirs::home_dir().ok_or(SweepError::HomeDirectoryNotFound)
    }
}

/// Returns the output directory and whether the default had to be used.
pub fn resolve_output_dir(custom: Option<&Path>, log: &mut Logger) -> Result<(PathBuf, bool)> {
    if let Some(path) = custom {
        match check_output_dir(path) {
            None => return Ok((path.to_path_buf(), false)),
            Some(reason) => log.warn(format!(
                "{reason}: {}. Switching to default download location.",
                path.display()
            )),
        }
    }

    Ok((default_output_dir()?, true))
}

pub fn default_log_dir() -> Result<PathBuf> {
    if cfg!(windows) {
        Ok(default_output_dir()?.join("log"))
    } else {
        dirs::home_dir()
            .map(|home| home.join("log"))
            .ok_or(SweepError::HomeDirectoryNotFound)
    }
}
