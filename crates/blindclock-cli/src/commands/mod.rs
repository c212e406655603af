pub mod config;
pub mod format;
pub mod play;
pub mod structure;
