//! Git command abstraction layer
//!
//! Provides the handful of git operations the intake pull request needs.
//! All user input is passed via `Command` args, never through a shell.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::runner::{CommandOutput, CommandRunner, CommandSpec, RunnerError};

/// Git operations on one working copy
pub struct Git {
    repo_root: PathBuf,
    runner: CommandRunner,
    /// Extra environment (credentials) passed to every git call
    env: BTreeMap<String, String>,
}

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Git command failed: {message}")]
    CommandFailed { message: String },

    #[error("Branch already exists: {branch}")]
    BranchExists { branch: String },

    #[error("Git not installed or not in PATH")]
    GitNotFound,

    #[error(transparent)]
    Runner(RunnerError),
}

impl From<RunnerError> for GitError {
    fn from(e: RunnerError) -> Self {
        match e {
            RunnerError::NotFound { .. } => GitError::GitNotFound,
            other => GitError::Runner(other),
        }
    }
}

impl Git {
    /// Create a new Git instance for the repository at the given path
    pub fn new(repo_root: &Path, runner: CommandRunner) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            runner,
            env: BTreeMap::new(),
        }
    }

    /// Attach environment variables to every subsequent git call
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn spec(&self, args: &[&str]) -> CommandSpec {
        CommandSpec::new("git")
            .args(args.iter().copied())
            .envs(&self.env)
            .current_dir(&self.repo_root)
    }

    /// Execute a git command and return the output
    fn run(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        Ok(self.runner.run(&self.spec(args))?)
    }

    /// Execute a git command that must succeed
    fn run_checked(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        let output = self.run(args)?;
        if output.success {
            Ok(output)
        } else {
            Err(GitError::CommandFailed {
                message: output.stderr,
            })
        }
    }

    /// Clone `url` into `parent`, returning a handle on the new working copy.
    ///
    /// With `branch`, only that branch is cloned.
    pub fn clone_into(
        runner: CommandRunner,
        parent: &Path,
        url: &str,
        branch: Option<&str>,
        env: BTreeMap<String, String>,
    ) -> Result<Self, GitError> {
        let name = url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(url)
            .trim_end_matches(".git")
            .to_string();

        let mut spec = CommandSpec::new("git").arg("clone").arg(url);
        if let Some(branch) = branch {
            spec = spec.args(["--branch", branch, "--single-branch"]);
        }
        let spec = spec.envs(&env).current_dir(parent);

        let output = runner.run(&spec)?;
        if !output.success {
            return Err(GitError::CommandFailed {
                message: output.stderr,
            });
        }

        Ok(Self::new(&parent.join(name), runner).with_env(env))
    }

    /// Check if we're in a git repository
    pub fn is_repo(&self) -> bool {
        self.run(&["rev-parse", "--git-dir"])
            .map(|o| o.success)
            .unwrap_or(false)
    }

    /// Get current branch name
    pub fn current_branch(&self) -> Result<String, GitError> {
        Ok(self.run_checked(&["rev-parse", "--abbrev-ref", "HEAD"])?.stdout)
    }

    /// Check if a branch exists
    pub fn branch_exists(&self, name: &str) -> bool {
        self.run(&["rev-parse", "--verify", &format!("refs/heads/{}", name)])
            .map(|o| o.success)
            .unwrap_or(false)
    }

    /// Point remote `name` at `url`, adding it if it does not exist yet
    pub fn set_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        let exists = !self.runner.is_dry_run()
            && self
                .run(&["remote", "get-url", name])
                .map(|o| o.success)
                .unwrap_or(false);

        if exists {
            self.run_checked(&["remote", "set-url", name, url])?;
        } else {
            self.run_checked(&["remote", "add", name, url])?;
        }
        Ok(())
    }

    /// Fetch one branch from a remote
    pub fn fetch_branch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_checked(&["fetch", remote, branch])?;
        Ok(())
    }

    /// Create a branch at `start_point` and check it out
    pub fn checkout_new_branch(&self, name: &str, start_point: &str) -> Result<(), GitError> {
        if !self.runner.is_dry_run() && self.branch_exists(name) {
            return Err(GitError::BranchExists {
                branch: name.to_string(),
            });
        }

        self.run_checked(&["checkout", "-b", name, start_point])?;
        Ok(())
    }

    /// Stage a file for commit
    pub fn stage_file(&self, path: &Path) -> Result<(), GitError> {
        let path_str = path.to_string_lossy();
        self.run_checked(&["add", &path_str])?;
        Ok(())
    }

    /// Commit staged changes, returning the new commit hash
    pub fn commit(&self, message: &str) -> Result<String, GitError> {
        self.run_checked(&["commit", "-m", message])?;
        Ok(self.run(&["rev-parse", "HEAD"])?.stdout)
    }

    /// Push a branch, setting its upstream
    pub fn push_upstream(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_checked(&["push", "-u", remote, branch])?;
        Ok(())
    }
}
