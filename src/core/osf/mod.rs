//! OSF (Open Science Framework) storage: the `osf` CLI and the JSON API

pub mod api;
pub mod cli;

pub use api::{collect_urls, to_csv, FileUrl, OsfClient, OsfError, StorageBrowser, OSF_API};
pub use cli::{fetch_plan, upload_plan, OsfCli, OsfCredentials};
