//! Best-effort extraction of downloaded archives.
//!
//! Format is decided by content, never by file name. Zip is tried first,
//! then tar, plain or compressed with gzip, bzip2 or xz. Everything extracts flat into the
//! download directory and the archive itself is left in place.

use crate::error::{Result, SweepError};
use crate::utils::log::Logger;
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tar::Archive;
use xz2::read::XzDecoder;
use zip::ZipArchive;

const TAR_BLOCK: usize = 512;
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpandOutcome {
    Extracted {
        name: String,
        kind: ArchiveKind,
        entries: usize,
    },
    NotArchive {
        name: String,
    },
    Failed {
        name: String,
        reason: String,
    },
}

impl ExpandOutcome {
    pub fn name(&self) -> &str {
        match self {
            ExpandOutcome::Extracted { name, .. }
            | ExpandOutcome::NotArchive { name }
            | ExpandOutcome::Failed { name, .. } => name,
        }
    }
}

/// Expands every archive among `names` (relative to `local_dir`) into
/// `local_dir`. Failures are logged and do not stop the loop.
pub fn expand(local_dir: &Path, names: &[String], log: &mut Logger) -> Vec<ExpandOutcome> {
    names
        .iter()
        .map(|name| {
            let path = local_dir.join(name);
            let outcome = expand_one(&path, local_dir, name);
            match &outcome {
                ExpandOutcome::Extracted { kind, entries, .. } => log.info(format!(
                    "Unzipped {} ({kind:?}, {entries} entries).",
                    path.display()
                )),
                ExpandOutcome::Failed { reason, .. } => {
                    log.error(format!("Could not extract {}: {reason}", path.display()))
                }
                ExpandOutcome::NotArchive { .. } => {}
            }
            outcome
        })
        .collect()
}

fn expand_one(path: &Path, destination: &Path, name: &str) -> ExpandOutcome {
    let kind = match detect(path) {
        Ok(Some(kind)) => kind,
        Ok(None) => {
            return ExpandOutcome::NotArchive {
                name: name.to_string(),
            }
        }
        Err(e) => {
            return ExpandOutcome::Failed {
                name: name.to_string(),
                reason: e.to_string(),
            }
        }
    };

    match extract(path, kind, destination) {
        Ok(entries) => ExpandOutcome::Extracted {
            name: name.to_string(),
            kind,
            entries,
        },
        Err(e) => ExpandOutcome::Failed {
            name: name.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Sniffs the container format of `path`.
pub fn detect(path: &Path) -> Result<Option<ArchiveKind>> {
    if ZipArchive::new(File::open(path)?).is_ok() {
        return Ok(Some(ArchiveKind::Zip));
    }

    let mut magic = [0u8; 6];
    let read = read_up_to(&mut File::open(path)?, &mut magic)?;
    let magic = &magic[..read];
    let compressed = if magic.starts_with(GZIP_MAGIC) {
        Some(ArchiveKind::TarGz)
    } else if magic.starts_with(BZIP2_MAGIC) {
        Some(ArchiveKind::TarBz2)
    } else if magic.starts_with(XZ_MAGIC) {
        Some(ArchiveKind::TarXz)
    } else {
        None
    };

    if let Some(kind) = compressed {
        let mut block = [0u8; TAR_BLOCK];
        let mut decoder = tar_stream(File::open(path)?, kind);
        // A compressed stream that is not a tarball is just a compressed file.
        return match read_up_to(&mut decoder, &mut block) {
            Ok(TAR_BLOCK) if is_tar_header(&block) => Ok(Some(kind)),
            _ => Ok(None),
        };
    }

    let mut block = [0u8; TAR_BLOCK];
    let read = read_up_to(&mut File::open(path)?, &mut block)?;
    if read == TAR_BLOCK && is_tar_header(&block) {
        return Ok(Some(ArchiveKind::Tar));
    }

    Ok(None)
}

pub fn extract(path: &Path, kind: ArchiveKind, destination: &Path) -> Result<usize> {
    std::fs::create_dir_all(destination)?;

    match kind {
        ArchiveKind::Zip => extract_zip(path, destination),
        _ => extract_tar(tar_stream(File::open(path)?, kind), path, destination),
    }
}

/// The tar byte stream inside `file`, decompressed according to `kind`.
fn tar_stream(file: File, kind: ArchiveKind) -> Box<dyn Read> {
    match kind {
        ArchiveKind::TarGz => Box::new(GzDecoder::new(file)),
        ArchiveKind::TarBz2 => Box::new(BzDecoder::new(file)),
        ArchiveKind::TarXz => Box::new(XzDecoder::new(file)),
        ArchiveKind::Zip | ArchiveKind::Tar => Box::new(file),
    }
}

fn extract_tar<R: Read>(reader: R, archive_path: &Path, destination: &Path) -> Result<usize> {
    let mut archive = Archive::new(reader);
    let mut count = 0;

    let entries = archive
        .entries()
        .map_err(|e| SweepError::extraction(archive_path, e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| SweepError::extraction(archive_path, e.to_string()))?;
        // unpack_in refuses paths that would land outside the destination.
        if entry
            .unpack_in(destination)
            .map_err(|e| SweepError::extraction(archive_path, e.to_string()))?
        {
            count += 1;
        }
    }

    Ok(count)
}

fn extract_zip(archive_path: &Path, destination: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| SweepError::extraction(archive_path, e.to_string()))?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| SweepError::extraction(archive_path, e.to_string()))?;
        let outpath = match file.enclosed_name() {
            Some(path) => destination.join(path),
            None => continue,
        };

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(p) = outpath.parent() {
                if !p.exists() {
                    std::fs::create_dir_all(p)?;
                }
            }
            let mut outfile = File::create(&outpath)?;
            std::io::copy(&mut file, &mut outfile)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
            }
        }

        count += 1;
    }
    Ok(count)
}

/// Fills `buf` as far as the reader allows; returns the bytes read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// A tar header carries an octal checksum at bytes 148..156 computed with
/// the checksum field itself read as spaces.
fn is_tar_header(block: &[u8; TAR_BLOCK]) -> bool {
    if block.iter().all(|&b| b == 0) {
        return false;
    }

    let field = &block[148..156];
    let digits: String = field
        .iter()
        .map(|&b| b as char)
        .filter(|c| !c.is_whitespace() && *c != '\0')
        .collect();
    let stored = match u32::from_str_radix(&digits, 8) {
        Ok(value) => value,
        Err(_) => return false,
    };

    let computed: u32 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| if (148..156).contains(&i) { b' ' as u32 } else { b as u32 })
        .sum();

    stored == computed
}
