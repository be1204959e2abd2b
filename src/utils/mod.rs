pub mod fs;
pub mod log;
pub mod paths;
