//! ftpsweep library
//!
//! Core functionality for the `ftpsweep` CLI: load FTP site credentials,
//! download every file from each site's remote directory and optionally
//! expand the archives that came down.

pub mod commands;
pub mod core;
pub mod error;
pub mod utils;
