//! Concurrent execution of OSF transfer commands
//!
//! Jobs run as tokio tasks, each holding a semaphore permit while its child
//! process is alive, so at most `max_runners` transfers are in flight.
//! Outcomes are reported in completion order.

use console::style;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::runner::{CommandOutput, CommandRunner, CommandSpec, RunnerError};

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Upload,
    Fetch,
}

impl TransferKind {
    fn done_label(&self) -> &'static str {
        match self {
            TransferKind::Upload => "Uploaded",
            TransferKind::Fetch => "Fetched",
        }
    }

    /// Flag that would have replaced the existing file
    fn overwrite_flag(&self) -> &'static str {
        match self {
            TransferKind::Upload => "--osf-overwrite",
            TransferKind::Fetch => "--overwrite",
        }
    }
}

/// One file to transfer
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub kind: TransferKind,
    pub command: CommandSpec,
}

/// What happened to a single job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Done { target: String },
    /// The destination already existed and was left untouched
    Skipped { target: String },
    Failed { target: String, error: String },
}

impl TransferOutcome {
    /// Classify a finished command
    pub fn classify(target: &str, output: &CommandOutput) -> Self {
        let target = target.to_string();
        if output.success {
            return TransferOutcome::Done { target };
        }

        let error = output.stderr.clone();
        if error.contains("FileExistsError") || error.contains("already exists") {
            TransferOutcome::Skipped { target }
        } else {
            TransferOutcome::Failed { target, error }
        }
    }

    /// Line printed for this outcome
    pub fn message(&self, kind: TransferKind) -> String {
        match self {
            TransferOutcome::Done { target } => format!("{}: {}", kind.done_label(), target),
            TransferOutcome::Skipped { target } => format!(
                "WARNING: Did not overwrite <{}>, please consider {}",
                target,
                kind.overwrite_flag()
            ),
            TransferOutcome::Failed { error, .. } => format!("ERROR:\n{}", error),
        }
    }

    fn print(&self, kind: TransferKind) {
        let message = self.message(kind);
        match self {
            TransferOutcome::Done { .. } => println!("{} {}", style("✓").green(), message),
            TransferOutcome::Skipped { .. } => println!("{} {}", style("!").yellow(), message),
            TransferOutcome::Failed { .. } => println!("{} {}", style("✗").red(), message),
        }
    }
}

/// Tally of a batch of transfers
#[derive(Debug, Default, Clone)]
pub struct TransferReport {
    pub done: usize,
    pub skipped: usize,
    /// (target, error) of every failed job
    pub failed: Vec<(String, String)>,
}

impl TransferReport {
    fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Done { .. } => self.done += 1,
            TransferOutcome::Skipped { .. } => self.skipped += 1,
            TransferOutcome::Failed { target, error } => self.failed.push((target, error)),
        }
    }

    pub fn total(&self) -> usize {
        self.done + self.skipped + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("at least one concurrent transfer is required")]
    NoRunners,

    #[error("transfer queue closed")]
    Closed,

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("transfer task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Run every job, at most `max_runners` at a time
pub async fn run_all(
    jobs: Vec<TransferJob>,
    runner: CommandRunner,
    max_runners: usize,
) -> Result<TransferReport, TransferError> {
    if max_runners == 0 {
        return Err(TransferError::NoRunners);
    }

    let semaphore = Arc::new(Semaphore::new(max_runners));
    let mut tasks = JoinSet::new();

    for job in jobs {
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| TransferError::Closed)?;
            let output = runner.run_async(&job.command).await?;
            let outcome = TransferOutcome::classify(job.command.target(), &output);
            Ok::<_, TransferError>((job.kind, outcome))
        });
    }

    let mut report = TransferReport::default();
    while let Some(joined) = tasks.join_next().await {
        let (kind, outcome) = joined??;
        outcome.print(kind);
        if let TransferOutcome::Failed { target, .. } = &outcome {
            tracing::warn!(file = %target, "transfer failed");
        }
        report.record(outcome);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(success: bool, stderr: &str) -> CommandOutput {
        CommandOutput {
            success,
            stdout: String::new(),
            stderr: stderr.to_string(),
            code: Some(if success { 0 } else { 1 }),
        }
    }

    #[test]
    fn test_classify_success() {
        let outcome = TransferOutcome::classify("tpl-Foo/a.nii.gz", &output(true, ""));
        assert_eq!(
            outcome.message(TransferKind::Upload),
            "Uploaded: tpl-Foo/a.nii.gz"
        );

        let outcome = TransferOutcome::classify("out/a.gii", &output(true, ""));
        assert_eq!(outcome.message(TransferKind::Fetch), "Fetched: out/a.gii");
    }

    #[test]
    fn test_classify_existing_file() {
        let stderr = "Traceback...\nFileExistsError: tpl-Foo/a.nii.gz";
        let outcome = TransferOutcome::classify("tpl-Foo/a.nii.gz", &output(false, stderr));
        assert!(matches!(outcome, TransferOutcome::Skipped { .. }));
        assert_eq!(
            outcome.message(TransferKind::Upload),
            "WARNING: Did not overwrite <tpl-Foo/a.nii.gz>, please consider --osf-overwrite"
        );

        let outcome =
            TransferOutcome::classify("out/a.gii", &output(false, "local file already exists"));
        assert_eq!(
            outcome.message(TransferKind::Fetch),
            "WARNING: Did not overwrite <out/a.gii>, please consider --overwrite"
        );
    }

    #[test]
    fn test_classify_error() {
        let outcome = TransferOutcome::classify("x", &output(false, "401 Unauthorized"));
        assert_eq!(outcome.message(TransferKind::Upload), "ERROR:\n401 Unauthorized");
    }

    #[tokio::test]
    async fn test_zero_runners_rejected() {
        let err = run_all(Vec::new(), CommandRunner::new(), 0).await.unwrap_err();
        assert!(matches!(err, TransferError::NoRunners));
    }

    #[tokio::test]
    async fn test_dry_run_batch() {
        let jobs = (0..5)
            .map(|i| TransferJob {
                kind: TransferKind::Upload,
                command: CommandSpec::new("osf")
                    .args(["upload", "a"])
                    .arg(format!("tpl-Foo/{i}")),
            })
            .collect();
        let report = run_all(jobs, CommandRunner::new().with_dry_run(true), 2)
            .await
            .unwrap();
        assert_eq!(report.done, 5);
        assert_eq!(report.total(), 5);
        assert!(report.is_success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_mixed_outcomes() {
        let script = |body: &str| CommandSpec::new("sh").args(["-c", body, "target"]);
        let jobs = vec![
            TransferJob {
                kind: TransferKind::Upload,
                command: script("exit 0"),
            },
            TransferJob {
                kind: TransferKind::Upload,
                command: script("echo 'FileExistsError' >&2; exit 1"),
            },
            TransferJob {
                kind: TransferKind::Upload,
                command: script("echo 'boom' >&2; exit 1"),
            },
        ];
        let report = run_all(jobs, CommandRunner::new(), 3).await.unwrap();
        assert_eq!(report.done, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, vec![("target".to_string(), "boom".to_string())]);
        assert!(!report.is_success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log");
        // Each job records its start and end; with one runner they never overlap
        let body = format!(
            "echo start >> {0}; sleep 0.05; echo end >> {0}",
            log.display()
        );
        let jobs = (0..4)
            .map(|_| TransferJob {
                kind: TransferKind::Fetch,
                command: CommandSpec::new("sh").args(["-c", body.as_str()]),
            })
            .collect();

        let report = run_all(jobs, CommandRunner::new(), 1).await.unwrap();
        assert_eq!(report.done, 4);

        let contents = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 8);
        for pair in lines.chunks(2) {
            assert_eq!(pair, ["start", "end"]);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_two_runners_never_overlap_more_than_two() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log");
        let body = format!(
            "echo start >> {0}; sleep 0.1; echo end >> {0}",
            log.display()
        );
        let jobs = (0..6)
            .map(|_| TransferJob {
                kind: TransferKind::Upload,
                command: CommandSpec::new("sh").args(["-c", body.as_str()]),
            })
            .collect();

        let report = run_all(jobs, CommandRunner::new(), 2).await.unwrap();
        assert_eq!(report.done, 6);

        let contents = std::fs::read_to_string(&log).unwrap();
        let mut running = 0i32;
        let mut peak = 0i32;
        for line in contents.lines() {
            match line {
                "start" => running += 1,
                "end" => running -= 1,
                other => panic!("unexpected log line {:?}", other),
            }
            peak = peak.max(running);
        }
        assert_eq!(running, 0);
        assert_eq!(contents.lines().count(), 12);
        assert!((1..=2).contains(&peak), "peak concurrency {}", peak);
    }
}
