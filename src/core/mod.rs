//! Core module - Archive model and external collaborators

pub mod archive;
pub mod config;
pub mod git;
pub mod intake;
pub mod licenses;
pub mod osf;
pub mod provider;
pub mod runner;
pub mod transfer;

pub use archive::{Archive, ArchiveError, TemplateId};
pub use config::Config;
pub use git::{Git, GitError};
pub use intake::{IntakeError, IntakeFile, MessageRenderer};
pub use provider::{GitHubCredentials, Provider, ProviderClient, ProviderError, PullRequest};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, RunnerError};
pub use transfer::{TransferError, TransferJob, TransferKind, TransferOutcome, TransferReport};
