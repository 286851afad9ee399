//! CLI command implementations

pub mod add;
pub mod completions;
pub mod config;
pub mod get;
pub mod geturls;
pub mod license;
pub mod update;
