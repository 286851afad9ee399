//! Template identifiers and the local copy of the TemplateFlow Archive

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Prefix every template directory carries in the Archive
pub const TEMPLATE_PREFIX: &str = "tpl-";

/// A template identifier, e.g. `MNI152NLin2009cAsym`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(String);

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid template identifier '{0}': only ASCII letters and digits are allowed")]
    InvalidTemplateId(String),

    #[error("cannot determine the TemplateFlow home; set TEMPLATEFLOW_HOME")]
    NoHome,

    #[error("failed to read the Archive at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name of the template, `tpl-<ID>`
    pub fn dir_name(&self) -> String {
        format!("{}{}", TEMPLATE_PREFIX, self.0)
    }

    /// Branch used for the intake pull request
    pub fn branch_name(&self) -> String {
        format!("pr-{}{}", TEMPLATE_PREFIX, self.0.to_lowercase())
    }

    /// Name of the intake file committed to the Archive repository
    pub fn intake_file_name(&self) -> String {
        format!("{}.toml", self.dir_name())
    }

    /// Prefix of this template's files in `osf list` output
    pub fn storage_prefix(&self) -> String {
        format!("osfstorage/{}/", self.dir_name())
    }
}

impl FromStr for TemplateId {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let id = trimmed.strip_prefix(TEMPLATE_PREFIX).unwrap_or(trimmed);

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ArchiveError::InvalidTemplateId(s.to_string()));
        }

        Ok(Self(id.to_string()))
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The local TemplateFlow home holding one `tpl-*` directory per template
#[derive(Debug, Clone)]
pub struct Archive {
    home: PathBuf,
}

impl Archive {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Locate the Archive from `$TEMPLATEFLOW_HOME`, falling back to the
    /// user cache directory (`~/.cache/templateflow` on Linux)
    pub fn from_env() -> Result<Self, ArchiveError> {
        if let Some(home) = std::env::var_os("TEMPLATEFLOW_HOME") {
            return Ok(Self::new(home));
        }

        directories::BaseDirs::new()
            .map(|dirs| Self::new(dirs.cache_dir().join("templateflow")))
            .ok_or(ArchiveError::NoHome)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Identifiers of all templates present in the Archive, sorted
    pub fn templates(&self) -> Result<Vec<String>, ArchiveError> {
        if !self.home.is_dir() {
            tracing::warn!(
                home = %self.home.display(),
                "TemplateFlow home not found; treating the Archive as empty"
            );
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.home).map_err(|source| ArchiveError::Io {
            path: self.home.clone(),
            source,
        })?;

        let mut templates: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix(TEMPLATE_PREFIX))
                    .map(str::to_string)
            })
            .collect();

        templates.sort();
        Ok(templates)
    }

    pub fn contains(&self, id: &TemplateId) -> Result<bool, ArchiveError> {
        Ok(self.templates()?.iter().any(|t| t == id.as_str()))
    }
}
