//! GitHub CLI wrapper for forking the Archive and opening pull requests
//!
//! Shells out to `hub` or `gh`. All user input is passed via `Command` args.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::runner::{CommandRunner, CommandSpec, RunnerError};

/// CLI used to talk to GitHub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// The `hub` git wrapper, authenticated with GITHUB_USER/GITHUB_PASSWORD
    #[default]
    Hub,
    /// The official `gh` CLI, authenticated with GH_TOKEN
    Gh,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Hub => write!(f, "hub"),
            Provider::Gh => write!(f, "gh"),
        }
    }
}

/// GitHub account used to fork and push
#[derive(Debug, Clone)]
pub struct GitHubCredentials {
    pub user: String,
    pub password: String,
}

/// A pull request to open against the upstream Archive
#[derive(Debug, Clone)]
pub struct PullRequest<'a> {
    /// Upstream repository, `owner/name`
    pub upstream: &'a str,
    /// Owner of the upstream repository
    pub owner: &'a str,
    /// Branch of the upstream repository to merge into
    pub base: &'a str,
    /// Branch pushed to the contributor's fork
    pub head: &'a str,
    pub title: &'a str,
    /// Markdown file holding the message
    pub message_file: &'a Path,
}

/// Errors that can occur during provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{cli} CLI not found. Install it from {install_url}")]
    CliNotFound { cli: String, install_url: String },

    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Provider client operating from a working directory
pub struct ProviderClient {
    provider: Provider,
    workdir: PathBuf,
    runner: CommandRunner,
    credentials: GitHubCredentials,
}

impl ProviderClient {
    pub fn new(
        provider: Provider,
        workdir: &Path,
        runner: CommandRunner,
        credentials: GitHubCredentials,
    ) -> Self {
        Self {
            provider,
            workdir: workdir.to_path_buf(),
            runner,
            credentials,
        }
    }

    /// Same client, operating from another directory
    pub fn in_dir(&self, workdir: &Path) -> Self {
        Self {
            provider: self.provider,
            workdir: workdir.to_path_buf(),
            runner: self.runner,
            credentials: self.credentials.clone(),
        }
    }

    /// Get the CLI command name for this provider
    fn cli_name(&self) -> &'static str {
        match self.provider {
            Provider::Hub => "hub",
            Provider::Gh => "gh",
        }
    }

    /// Get the install URL for the CLI
    fn install_url(&self) -> &'static str {
        match self.provider {
            Provider::Hub => "https://hub.github.com",
            Provider::Gh => "https://cli.github.com",
        }
    }

    /// Environment carrying the credentials in the form the CLI expects
    pub fn auth_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        match self.provider {
            Provider::Hub => {
                env.insert("GITHUB_USER".to_string(), self.credentials.user.clone());
                env.insert(
                    "GITHUB_PASSWORD".to_string(),
                    self.credentials.password.clone(),
                );
            }
            Provider::Gh => {
                env.insert("GH_TOKEN".to_string(), self.credentials.password.clone());
            }
        }
        env
    }

    /// Build the command line for a provider call
    pub fn command(&self, args: &[&str]) -> CommandSpec {
        CommandSpec::new(self.cli_name())
            .args(args.iter().copied())
            .envs(&self.auth_env())
            .current_dir(&self.workdir)
    }

    /// Execute a CLI command
    fn run(&self, args: &[&str]) -> Result<String, ProviderError> {
        let output = self.runner.run(&self.command(args)).map_err(|e| match e {
            RunnerError::NotFound { .. } => ProviderError::CliNotFound {
                cli: self.cli_name().to_string(),
                install_url: self.install_url().to_string(),
            },
            other => ProviderError::Runner(other),
        })?;

        if output.success {
            Ok(output.stdout)
        } else {
            Err(ProviderError::CommandFailed {
                message: output.stderr,
            })
        }
    }

    /// Clone the upstream repository into the working directory
    pub fn clone_upstream(&self, upstream: &str) -> Result<(), ProviderError> {
        match self.provider {
            Provider::Hub => self.run(&["clone", upstream])?,
            Provider::Gh => self.run(&["repo", "clone", upstream])?,
        };
        Ok(())
    }

    /// Fork the repository in the working directory, adding the fork as `remote`
    pub fn fork(&self, remote: &str) -> Result<(), ProviderError> {
        match self.provider {
            Provider::Hub => self.run(&["fork", "--remote-name", remote])?,
            Provider::Gh => self.run(&["repo", "fork", "--remote", "--remote-name", remote])?,
        };
        Ok(())
    }

    /// Open a pull request, returning the CLI output (usually its URL)
    pub fn create_pr(&self, pr: &PullRequest<'_>) -> Result<String, ProviderError> {
        let args = self.pr_args(pr);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args)
    }

    fn pr_args(&self, pr: &PullRequest<'_>) -> Vec<String> {
        let head = format!("{}:{}", self.credentials.user, pr.head);
        let message_file = pr.message_file.to_string_lossy().into_owned();

        match self.provider {
            Provider::Hub => vec![
                "pull-request".to_string(),
                "-b".to_string(),
                format!("{}:{}", pr.owner, pr.base),
                "-h".to_string(),
                head,
                "-F".to_string(),
                message_file,
            ],
            Provider::Gh => vec![
                "pr".to_string(),
                "create".to_string(),
                "--repo".to_string(),
                pr.upstream.to_string(),
                "--base".to_string(),
                pr.base.to_string(),
                "--head".to_string(),
                head,
                "--title".to_string(),
                pr.title.to_string(),
                "--body-file".to_string(),
                message_file,
            ],
        }
    }
}
