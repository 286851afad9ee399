//! Invocations of the `osf` command-line client

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::core::archive::TemplateId;
use crate::core::runner::CommandSpec;
use crate::core::transfer::{TransferJob, TransferKind};

/// Credentials and target project for `osf`
#[derive(Debug, Clone)]
pub struct OsfCredentials {
    pub project: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl OsfCredentials {
    /// Read-only access to a public project
    pub fn anonymous(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            username: None,
            password: None,
        }
    }

    pub fn env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("OSF_PROJECT".to_string(), self.project.clone());
        if let Some(user) = &self.username {
            env.insert("OSF_USERNAME".to_string(), user.clone());
        }
        if let Some(password) = &self.password {
            env.insert("OSF_PASSWORD".to_string(), password.clone());
        }
        env
    }
}

/// Builds `osf` command lines for one project
#[derive(Debug, Clone)]
pub struct OsfCli {
    credentials: OsfCredentials,
    /// Pass `-f` so existing files get replaced
    force: bool,
}

impl OsfCli {
    pub fn new(credentials: OsfCredentials) -> Self {
        Self {
            credentials,
            force: false,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn base(&self, subcommand: &str) -> CommandSpec {
        let spec = CommandSpec::new("osf")
            .arg(subcommand)
            .envs(&self.credentials.env());
        if self.force {
            spec.arg("-f")
        } else {
            spec
        }
    }

    pub fn upload(&self, local: &Path, remote: &str) -> CommandSpec {
        self.base("upload")
            .arg(local.to_string_lossy())
            .arg(remote)
    }

    pub fn fetch(&self, remote: &str, local: &Path) -> CommandSpec {
        self.base("fetch")
            .arg(remote)
            .arg(local.to_string_lossy())
    }

    pub fn list(&self) -> CommandSpec {
        CommandSpec::new("osf")
            .arg("list")
            .envs(&self.credentials.env())
    }

    /// One upload job per file of the template directory
    pub fn upload_jobs(&self, template_dir: &Path) -> Vec<TransferJob> {
        upload_plan(template_dir)
            .into_iter()
            .map(|(local, remote)| TransferJob {
                kind: TransferKind::Upload,
                command: self.upload(&local, &remote),
            })
            .collect()
    }

    /// One fetch job per remote file of the template, given `osf list` output
    pub fn fetch_jobs(&self, listing: &str, id: &TemplateId, dest: &Path) -> Vec<TransferJob> {
        fetch_plan(listing, id, dest)
            .into_iter()
            .map(|(remote, local)| TransferJob {
                kind: TransferKind::Fetch,
                command: self.fetch(&remote, &local),
            })
            .collect()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// All files under `template_dir` paired with their remote path.
///
/// Dotfiles and everything inside dot-directories are skipped. Symlinks are
/// followed, so annexed files count as files. Remote paths are relative to the
/// directory's parent, so they start with `tpl-<ID>/`.
pub fn upload_plan(template_dir: &Path) -> Vec<(PathBuf, String)> {
    let root = template_dir.parent().unwrap_or(template_dir);

    let mut plan: Vec<(PathBuf, String)> = WalkDir::new(template_dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let local = e.path().to_path_buf();
            let remote = local
                .strip_prefix(root)
                .ok()?
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            Some((local, remote))
        })
        .collect();

    plan.sort_by(|a, b| a.1.cmp(&b.1));
    plan
}

/// Remote files of the template in `osf list` output, paired with their
/// local destination under `dest`
pub fn fetch_plan(listing: &str, id: &TemplateId, dest: &Path) -> Vec<(String, PathBuf)> {
    let prefix = id.storage_prefix();

    listing
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let relative = line.strip_prefix(&prefix)?;
            if relative.is_empty() {
                return None;
            }
            let local = relative
                .split('/')
                .filter(|part| !part.is_empty() && *part != "..")
                .fold(dest.to_path_buf(), |path, part| path.join(part));
            Some((line.to_string(), local))
        })
        .collect()
}
