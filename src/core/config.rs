//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::provider::Provider;

/// Upstream Archive repository on GitHub
pub const DEFAULT_UPSTREAM: &str = "templateflow/templateflow";

/// Branch of the Archive repository receiving intake pull requests
pub const DEFAULT_INTAKE_BRANCH: &str = "tpl-intake";

/// tfmgr configuration with layered hierarchy.
///
/// Passwords are never part of the configuration; they come from flags,
/// environment variables or an interactive prompt.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Default OSF project identifier
    pub osf_project: Option<String>,

    /// Default OSF user name
    pub osf_user: Option<String>,

    /// Default GitHub user owning the Archive fork
    pub gh_user: Option<String>,

    /// CLI used to fork and open pull requests
    pub provider: Option<Provider>,

    /// Upstream Archive repository (owner/name)
    pub upstream: Option<String>,

    /// Branch of the upstream repository receiving intake pull requests
    pub intake_branch: Option<String>,

    /// Default number of concurrent transfers
    pub nprocs: Option<usize>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // Command-line flags and their environment variables are applied by
        // the commands on top of what is loaded here.
        if let Some(path) = Self::config_path() {
            if let Some(file) = Self::load_from(&path) {
                config.merge(file);
            }
        }

        config
    }

    /// Read a single config file, ignoring it if missing or malformed
    pub fn load_from(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read config file");
                return None;
            }
        };

        // An empty file deserializes to null
        if contents.trim().is_empty() {
            return Some(Config::default());
        }

        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
                None
            }
        }
    }

    /// Path of the config file: `$TFMGR_CONFIG` or the user config directory
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os("TFMGR_CONFIG") {
            return Some(PathBuf::from(path));
        }

        directories::ProjectDirs::from("org", "templateflow", "tfmanager")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.osf_project.is_some() {
            self.osf_project = other.osf_project;
        }
        if other.osf_user.is_some() {
            self.osf_user = other.osf_user;
        }
        if other.gh_user.is_some() {
            self.gh_user = other.gh_user;
        }
        if other.provider.is_some() {
            self.provider = other.provider;
        }
        if other.upstream.is_some() {
            self.upstream = other.upstream;
        }
        if other.intake_branch.is_some() {
            self.intake_branch = other.intake_branch;
        }
        if other.nprocs.is_some() {
            self.nprocs = other.nprocs;
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider.unwrap_or_default()
    }

    pub fn upstream(&self) -> &str {
        self.upstream.as_deref().unwrap_or(DEFAULT_UPSTREAM)
    }

    /// Name of the upstream repository without its owner
    pub fn upstream_repo_name(&self) -> &str {
        let upstream = self.upstream();
        upstream.rsplit('/').next().unwrap_or(upstream)
    }

    /// Owner of the upstream repository
    pub fn upstream_owner(&self) -> &str {
        let upstream = self.upstream();
        upstream.split('/').next().unwrap_or(upstream)
    }

    pub fn intake_branch(&self) -> &str {
        self.intake_branch
            .as_deref()
            .unwrap_or(DEFAULT_INTAKE_BRANCH)
    }

    /// Number of concurrent transfers, defaulting to the available CPUs
    pub fn nprocs(&self) -> usize {
        self.nprocs.filter(|n| *n >= 1).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Value of a key as shown by `tfmgr config show`
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "osf_project" => self.osf_project.clone(),
            "osf_user" => self.osf_user.clone(),
            "gh_user" => self.gh_user.clone(),
            "provider" => self.provider.map(|p| p.to_string()),
            "upstream" => self.upstream.clone(),
            "intake_branch" => self.intake_branch.clone(),
            "nprocs" => self.nprocs.map(|n| n.to_string()),
            _ => None,
        }
    }
}
