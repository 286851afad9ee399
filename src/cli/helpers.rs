//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::core::archive::TemplateId;
use crate::core::runner::CommandRunner;
use crate::core::transfer::TransferReport;

/// Install the tracing subscriber. `RUST_LOG` takes precedence over flags.
pub fn init_logging(global: &GlobalOpts) {
    use tracing_subscriber::EnvFilter;

    let default_level = if global.verbose {
        "tfmanager=debug,tfmgr=debug,info"
    } else if global.quiet {
        "warn"
    } else {
        "tfmanager=info,tfmgr=info,warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

/// Command runner honoring the global flags
pub fn runner(global: &GlobalOpts) -> CommandRunner {
    CommandRunner::new()
        .with_dry_run(global.dry_run)
        .with_verbose(global.verbose)
}

/// Drive a future to completion on a fresh multi-threaded runtime
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    Ok(runtime.block_on(future))
}

/// Unwrap a value that must be set through a flag, its environment variable
/// or the config file
pub fn require(value: Option<String>, flag: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(miette::miette!(
            help = "Please set it explicitly or define the corresponding environment variable.",
            "Missing value for {}",
            flag
        )),
    }
}

/// Use the given secret, or prompt for it without echo
pub fn secret(value: Option<String>, prompt: &str) -> Result<String> {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        return Ok(v);
    }

    if !console::Term::stderr().is_term() {
        return Err(miette::miette!(
            "{} is required but no terminal is available to prompt for it",
            prompt
        ));
    }

    dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .into_diagnostic()
}

/// Parse a concurrency level (at least 1)
pub fn parse_nprocs(s: &str) -> std::result::Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a positive integer", s))?;
    if n == 0 {
        return Err("at least one process is required".to_string());
    }
    Ok(n)
}

/// Directory holding a template's files.
///
/// Defaults to `./tpl-<ID>`; a given path that does not end in `tpl-<ID>`
/// is taken as the parent of the template directory.
pub fn template_dir(id: &TemplateId, path: Option<&Path>) -> PathBuf {
    let dir_name = id.dir_name();
    match path {
        None => PathBuf::from(&dir_name),
        Some(p) if p.file_name().map(|n| n == dir_name.as_str()).unwrap_or(false) => {
            p.to_path_buf()
        }
        Some(p) => p.join(&dir_name),
    }
}

/// Print the closing line of a batch of transfers
pub fn print_transfer_summary(report: &TransferReport, verb: &str) {
    let mut line = format!(
        "{} {} of {} file(s)",
        style(format!("{}:", verb)).bold(),
        report.done,
        report.total()
    );
    if report.skipped > 0 {
        line.push_str(&format!(", {} left untouched", report.skipped));
    }
    if !report.failed.is_empty() {
        line.push_str(&format!(", {}", style(format!("{} failed", report.failed.len())).red()));
    }
    println!("{}", line);
}

/// Turn failed transfers into an error once every job has run
pub fn check_transfers(report: &TransferReport) -> Result<()> {
    if report.is_success() {
        return Ok(());
    }

    let targets: Vec<&str> = report.failed.iter().map(|(t, _)| t.as_str()).collect();
    Err(miette::miette!(
        "{} transfer(s) failed: {}",
        report.failed.len(),
        targets.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        assert_eq!(require(Some("ue5gx".into()), "--osf-project").unwrap(), "ue5gx");
        let err = require(None, "--osf-project").unwrap_err();
        assert!(err.to_string().contains("--osf-project"));
        assert!(require(Some("  ".into()), "--gh-user").is_err());
    }

    #[test]
    fn test_secret_uses_given_value() {
        assert_eq!(secret(Some("pw".into()), "OSF password").unwrap(), "pw");
    }

    #[test]
    fn test_parse_nprocs() {
        assert_eq!(parse_nprocs("4"), Ok(4));
        assert!(parse_nprocs("0").is_err());
        assert!(parse_nprocs("-1").is_err());
        assert!(parse_nprocs("many").is_err());
    }

    #[test]
    fn test_template_dir() {
        let id: TemplateId = "Foo".parse().unwrap();
        assert_eq!(template_dir(&id, None), PathBuf::from("tpl-Foo"));
        assert_eq!(
            template_dir(&id, Some(Path::new("/data/tpl-Foo"))),
            PathBuf::from("/data/tpl-Foo")
        );
        assert_eq!(
            template_dir(&id, Some(Path::new("/data"))),
            PathBuf::from("/data/tpl-Foo")
        );
    }

    #[test]
    fn test_check_transfers() {
        let mut report = TransferReport {
            done: 2,
            ..Default::default()
        };
        assert!(check_transfers(&report).is_ok());

        report.failed.push(("tpl-Foo/a.nii.gz".into(), "boom".into()));
        let err = check_transfers(&report).unwrap_err();
        assert!(err.to_string().contains("tpl-Foo/a.nii.gz"));
    }
}
