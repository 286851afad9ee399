//! External command execution
//!
//! Every collaborator tfmgr drives (`osf`, `git`, `hub`/`gh`) goes through
//! this layer. Arguments are passed as a vector via `Command::args`, never
//! through a shell, so template paths and user names need no escaping.

use console::style;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Output;
use thiserror::Error;

/// A fully described invocation of an external program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Variables layered over the inherited environment
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
}

/// Result of running a command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{program} not installed or not in PATH")]
    NotFound { program: String },

    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Last argument of the command line, which for `osf upload`/`osf fetch`
    /// is the file being written
    pub fn target(&self) -> &str {
        self.args.last().map(String::as_str).unwrap_or(&self.program)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl CommandOutput {
    fn dry() -> Self {
        Self {
            success: true,
            stdout: String::new(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            code: output.status.code(),
        }
    }
}

/// Executes [`CommandSpec`]s, honoring dry-run and verbose modes
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner {
    /// If true, don't execute commands, just print what would be run
    dry_run: bool,
    /// If true, print commands to stderr before executing
    verbose: bool,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Announce a command; returns true when it must not actually run
    fn announce(&self, spec: &CommandSpec) -> bool {
        tracing::debug!(command = %spec, cwd = ?spec.cwd, "running external command");
        if self.dry_run {
            println!("{} {}", style("[dry-run]").dim(), spec);
            return true;
        }
        if self.verbose {
            eprintln!("  {}", spec);
        }
        false
    }

    fn map_spawn_error(spec: &CommandSpec, e: std::io::Error) -> RunnerError {
        if e.kind() == std::io::ErrorKind::NotFound {
            RunnerError::NotFound {
                program: spec.program.clone(),
            }
        } else {
            RunnerError::Io {
                program: spec.program.clone(),
                source: e,
            }
        }
    }

    /// Run a command to completion, blocking the current thread
    pub fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        if self.announce(spec) {
            return Ok(CommandOutput::dry());
        }

        let mut cmd = std::process::Command::new(&spec.program);
        cmd.args(&spec.args).envs(&spec.env);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| Self::map_spawn_error(spec, e))?;
        Ok(CommandOutput::from_output(output))
    }

    /// Run a command on the tokio runtime
    pub async fn run_async(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        if self.announce(spec) {
            return Ok(CommandOutput::dry());
        }

        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args).envs(&spec.env).kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| Self::map_spawn_error(spec, e))?;
        Ok(CommandOutput::from_output(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_hides_environment() {
        let spec = CommandSpec::new("osf")
            .args(["upload", "-f", "tpl-Foo/a.nii.gz", "tpl-Foo/a.nii.gz"])
            .env("OSF_PASSWORD", "secret");
        let shown = spec.to_string();
        assert_eq!(shown, "osf upload -f tpl-Foo/a.nii.gz tpl-Foo/a.nii.gz");
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn test_target_is_last_argument() {
        let spec = CommandSpec::new("osf").args(["fetch", "remote/a", "local/a"]);
        assert_eq!(spec.target(), "local/a");
        assert_eq!(CommandSpec::new("osf").target(), "osf");
    }

    #[test]
    fn test_dry_run_does_not_execute() {
        let runner = CommandRunner::new().with_dry_run(true);
        let spec = CommandSpec::new("definitely-not-a-real-program-tfmgr");
        let output = runner.run(&spec).unwrap();
        assert!(output.success);
        assert!(output.stdout.is_empty());
    }

    #[test]
    fn test_missing_program() {
        let runner = CommandRunner::new();
        let spec = CommandSpec::new("definitely-not-a-real-program-tfmgr");
        let err = runner.run(&spec).unwrap_err();
        assert!(matches!(err, RunnerError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_overlay_and_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new();
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf '%s' \"$TFMGR_TEST_VAR\"; pwd >&2"])
            .env("TFMGR_TEST_VAR", "overlay")
            .current_dir(tmp.path());
        let output = runner.run(&spec).unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "overlay");
        let reported = std::path::PathBuf::from(&output.stderr);
        assert_eq!(
            reported.canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_async_reports_failure() {
        let runner = CommandRunner::new();
        let spec = CommandSpec::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        let output = runner.run_async(&spec).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stderr, "boom");
    }
}
