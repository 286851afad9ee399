//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    add::AddArgs, completions::CompletionsArgs, config::ConfigCommands, get::GetArgs,
    geturls::GetUrlsArgs, license::LicenseCommands, update::UpdateArgs,
};

#[derive(Parser)]
#[command(name = "tfmgr")]
#[command(author, version, about = "TemplateFlow Archive manager")]
#[command(long_about = "The TemplateFlow Archive manager assists you in adding and updating templates.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output (debug logs, echo external commands)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Print external commands instead of running them
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new template
    Add(AddArgs),

    /// Upload new or changed files of a template already in the Archive
    Update(UpdateArgs),

    /// Get a full template from OSF storage
    Get(GetArgs),

    /// List the download URLs of a template's imaging files on OSF
    #[command(name = "geturls")]
    GetUrls(GetUrlsArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Bundled license notices
    #[command(subcommand)]
    License(LicenseCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
