//! `tfmgr get` command - download a template from OSF storage

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::{self, parse_nprocs};
use crate::cli::GlobalOpts;
use crate::core::osf::{fetch_plan, OsfCli, OsfCredentials};
use crate::core::{transfer, Config, TemplateId};

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Template identifier (with or without the tpl- prefix)
    pub template_id: TemplateId,

    /// OSF project holding the template
    #[arg(long, env = "OSF_PROJECT")]
    pub osf_project: Option<String>,

    /// Replace local files that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Destination directory (default: ./tpl-<ID>)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Maximum number of concurrent downloads
    #[arg(long, short = 'j', value_parser = parse_nprocs)]
    pub nprocs: Option<usize>,
}

pub fn run(args: GetArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    let runner = helpers::runner(global);
    let id = &args.template_id;

    let project = helpers::require(
        args.osf_project.clone().or_else(|| config.osf_project.clone()),
        "--osf-project",
    )?;
    let dest = args.path.clone().unwrap_or_else(|| PathBuf::from(id.dir_name()));
    let nprocs = args.nprocs.unwrap_or_else(|| config.nprocs());

    let osf = OsfCli::new(OsfCredentials::anonymous(&project)).with_force(args.overwrite);

    let listing = runner.run(&osf.list()).into_diagnostic()?;
    if !listing.success {
        return Err(miette::miette!(
            "Could not list OSF project {}: {}",
            project,
            listing.stderr
        ));
    }

    let jobs = osf.fetch_jobs(&listing.stdout, id, &dest);
    if jobs.is_empty() {
        if runner.is_dry_run() {
            let note = "Fetch commands depend on the remote listing; run without --dry-run";
            println!("{}", style(note).dim());
            return Ok(());
        }
        return Err(miette::miette!(
            "No files found for {} in OSF project {}",
            id.dir_name(),
            project
        ));
    }

    if !runner.is_dry_run() {
        for (_, local) in fetch_plan(&listing.stdout, id, &dest) {
            if let Some(parent) = local.parent() {
                fs::create_dir_all(parent).into_diagnostic()?;
            }
        }
    }

    println!(
        "Fetching {} file(s) into {} ({} at a time)",
        style(jobs.len()).cyan(),
        style(dest.display()).yellow(),
        nprocs
    );

    let report = helpers::block_on(transfer::run_all(jobs, runner, nprocs))?.into_diagnostic()?;
    helpers::print_transfer_summary(&report, "Fetched");
    helpers::check_transfers(&report)
}
