//! `tfmgr update` command - push new or changed files of an existing template

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::helpers::{self, parse_nprocs};
use crate::cli::GlobalOpts;
use crate::core::osf::{OsfCli, OsfCredentials};
use crate::core::{transfer, Archive, CommandRunner, Config, TemplateId};
use crate::description::TemplateDescription;

/// OSF options shared by the commands that upload template files
#[derive(clap::Args, Debug)]
pub struct OsfUploadArgs {
    /// OSF project receiving the files
    #[arg(long, env = "OSF_PROJECT")]
    pub osf_project: Option<String>,

    /// OSF user name
    #[arg(long, env = "OSF_USERNAME")]
    pub osf_user: Option<String>,

    /// OSF password (prompted for when missing)
    #[arg(long, env = "OSF_PASSWORD", hide_env_values = true)]
    pub osf_password: Option<String>,

    /// Replace files already present on OSF
    #[arg(long)]
    pub osf_overwrite: bool,

    /// Template directory, or the directory containing tpl-<ID>
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Maximum number of concurrent uploads
    #[arg(long, short = 'j', value_parser = parse_nprocs)]
    pub nprocs: Option<usize>,
}

impl OsfUploadArgs {
    /// OSF project, from the flag, its environment variable or the config
    pub fn project(&self, config: &Config) -> Result<String> {
        helpers::require(
            self.osf_project.clone().or_else(|| config.osf_project.clone()),
            "--osf-project",
        )
    }

    pub fn user(&self, config: &Config) -> Result<String> {
        helpers::require(
            self.osf_user.clone().or_else(|| config.osf_user.clone()),
            "--osf-user",
        )
    }

    pub fn nprocs(&self, config: &Config) -> usize {
        self.nprocs.unwrap_or_else(|| config.nprocs())
    }
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Template identifier (with or without the tpl- prefix)
    pub template_id: TemplateId,

    #[command(flatten)]
    pub osf: OsfUploadArgs,
}

pub fn run(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    let runner = helpers::runner(global);
    let id = &args.template_id;

    let archive = Archive::from_env().into_diagnostic()?;
    if !archive.contains(id).into_diagnostic()? {
        return Err(miette::miette!(
            help = "Use 'tfmgr add' to submit a new template",
            "Template {} is not in the Archive ({})",
            id,
            archive.home().display()
        ));
    }

    let project = args.osf.project(&config)?;
    let user = args.osf.user(&config)?;

    let template_dir = existing_template_dir(id, args.osf.path.as_deref())?;
    let description = TemplateDescription::load(&template_dir)?;
    tracing::debug!(name = description.display_name(), "template description loaded");

    let password = helpers::secret(args.osf.osf_password.clone(), "OSF password")?;
    let credentials = OsfCredentials {
        project,
        username: Some(user),
        password: Some(password),
    };

    upload_template(
        &template_dir,
        credentials,
        args.osf.osf_overwrite,
        args.osf.nprocs(&config),
        runner,
    )?;

    Ok(())
}

/// Resolve the template directory, failing if it does not exist
pub fn existing_template_dir(id: &TemplateId, path: Option<&Path>) -> Result<PathBuf> {
    let dir = helpers::template_dir(id, path);
    if !dir.is_dir() {
        return Err(miette::miette!(
            help = "Pass --path pointing at the template directory or its parent",
            "Template folder {} does not exist",
            dir.display()
        ));
    }
    Ok(dir)
}

/// Upload every file of the template, failing if any upload failed
pub fn upload_template(
    template_dir: &Path,
    credentials: OsfCredentials,
    overwrite: bool,
    nprocs: usize,
    runner: CommandRunner,
) -> Result<()> {
    let project = credentials.project.clone();
    let jobs = OsfCli::new(credentials)
        .with_force(overwrite)
        .upload_jobs(template_dir);

    if jobs.is_empty() {
        eprintln!(
            "{} No files to upload in {}",
            style("!").yellow(),
            template_dir.display()
        );
        return Ok(());
    }

    println!(
        "Uploading {} file(s) to OSF project {} ({} at a time)",
        style(jobs.len()).cyan(),
        style(&project).yellow(),
        nprocs
    );

    let report = helpers::block_on(transfer::run_all(jobs, runner, nprocs))?.into_diagnostic()?;
    helpers::print_transfer_summary(&report, "Uploaded");
    helpers::check_transfers(&report)
}
