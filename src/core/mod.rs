pub mod archive;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;
