//! `tfmgr add` command - submit a new template to the Archive
//!
//! Uploads the template files to OSF, then opens an intake pull request
//! against the upstream Archive repository from the contributor's fork.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::Path;

use crate::cli::commands::license::suggest_notice;
use crate::cli::commands::update::{existing_template_dir, upload_template, OsfUploadArgs};
use crate::cli::helpers;
use crate::cli::GlobalOpts;
use crate::core::intake::{self, IntakeFile, MessageRenderer};
use crate::core::osf::OsfCredentials;
use crate::core::{
    Archive, CommandRunner, Config, Git, GitHubCredentials, Provider, ProviderClient, PullRequest,
    TemplateId,
};
use crate::description::TemplateDescription;

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Template identifier (with or without the tpl- prefix)
    pub template_id: TemplateId,

    #[command(flatten)]
    pub osf: OsfUploadArgs,

    /// GitHub user owning the Archive fork
    #[arg(long, env = "GITHUB_USER")]
    pub gh_user: Option<String>,

    /// GitHub password or token (prompted for when missing)
    #[arg(long, env = "GITHUB_PASSWORD", hide_env_values = true)]
    pub gh_password: Option<String>,

    /// CLI used to fork and open the pull request
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,
}

pub fn run(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    let runner = helpers::runner(global);
    let id = &args.template_id;

    let archive = Archive::from_env().into_diagnostic()?;
    if archive.contains(id).into_diagnostic()? {
        return Err(miette::miette!(
            help = "Use 'tfmgr update' to upload changes to an existing template",
            "A template with name {} already exists in the Archive.",
            id
        ));
    }

    let osf_project = args.osf.project(&config)?;
    let osf_user = args.osf.user(&config)?;
    let gh_user = helpers::require(
        args.gh_user.clone().or_else(|| config.gh_user.clone()),
        "--gh-user",
    )?;

    let template_dir = existing_template_dir(id, args.osf.path.as_deref())?;
    let description = TemplateDescription::load(&template_dir)?;
    suggest_notice(description.display_license(), &template_dir);

    let osf_password = helpers::secret(args.osf.osf_password.clone(), "OSF password")?;
    let gh_password = helpers::secret(args.gh_password.clone(), "GitHub password")?;

    upload_template(
        &template_dir,
        OsfCredentials {
            project: osf_project.clone(),
            username: Some(osf_user),
            password: Some(osf_password),
        },
        args.osf.osf_overwrite,
        args.osf.nprocs(&config),
        runner,
    )?;

    let request = IntakeRequest {
        id,
        description: &description,
        osf_project: &osf_project,
        credentials: GitHubCredentials {
            user: gh_user,
            password: gh_password,
        },
        provider: args.provider.unwrap_or_else(|| config.provider()),
        config: &config,
    };
    open_intake_pr(&request, runner)
}

/// Everything needed to open the intake pull request of a template
struct IntakeRequest<'a> {
    id: &'a TemplateId,
    description: &'a TemplateDescription,
    osf_project: &'a str,
    credentials: GitHubCredentials,
    provider: Provider,
    config: &'a Config,
}

fn open_intake_pr(request: &IntakeRequest<'_>, runner: CommandRunner) -> Result<()> {
    let config = request.config;
    let id = request.id;

    let workspace = tempfile::Builder::new()
        .prefix("tfmgr-")
        .tempdir()
        .into_diagnostic()?;
    println!(
        "Preparing pull request (wd={})",
        style(workspace.path().display()).dim()
    );

    let client = ProviderClient::new(
        request.provider,
        workspace.path(),
        runner,
        request.credentials.clone(),
    );
    let git = checkout_fork(&client, workspace.path(), request, runner)?;

    // Nothing was cloned in a dry run; the intake file still goes somewhere
    if runner.is_dry_run() {
        fs::create_dir_all(git.repo_root()).into_diagnostic()?;
    }

    git.set_remote("upstream", &github_url(config.upstream()))
        .into_diagnostic()?;
    git.fetch_branch("upstream", config.intake_branch())
        .into_diagnostic()?;

    let branch = id.branch_name();
    git.checkout_new_branch(&branch, &format!("upstream/{}", config.intake_branch()))
        .into_diagnostic()?;

    let intake_name = id.intake_file_name();
    let intake_toml = IntakeFile::new(request.osf_project)
        .to_toml()
        .into_diagnostic()?;
    fs::write(git.repo_root().join(&intake_name), intake_toml).into_diagnostic()?;
    git.stage_file(Path::new(&intake_name)).into_diagnostic()?;
    git.commit(&intake::commit_message(id)).into_diagnostic()?;
    git.push_upstream("origin", &branch).into_diagnostic()?;

    let message = MessageRenderer::new()
        .into_diagnostic()?
        .pr_message(id, request.description, request.osf_project)
        .into_diagnostic()?;
    let message_file = workspace.path().join("message.md");
    fs::write(&message_file, message).into_diagnostic()?;

    let title = intake::pr_title(id);
    let output = client
        .in_dir(git.repo_root())
        .create_pr(&PullRequest {
            upstream: config.upstream(),
            owner: config.upstream_owner(),
            base: config.intake_branch(),
            head: &branch,
            title: &title,
            message_file: &message_file,
        })
        .into_diagnostic()?;

    let url = output.trim();
    if url.is_empty() {
        println!("{} Pull request prepared for {}", style("✓").green(), id.dir_name());
    } else {
        println!("{} Opened pull request {}", style("✓").green(), style(url).cyan());
    }

    Ok(())
}

/// Clone the contributor's fork on the intake branch, forking upstream first
/// if there is no usable fork yet
fn checkout_fork(
    client: &ProviderClient,
    workspace: &Path,
    request: &IntakeRequest<'_>,
    runner: CommandRunner,
) -> Result<Git> {
    let config = request.config;
    let auth_env = client.auth_env();
    let fork = fork_url(&request.credentials.user, config.upstream_repo_name());

    match Git::clone_into(
        runner,
        workspace,
        &fork,
        Some(config.intake_branch()),
        auth_env.clone(),
    ) {
        Ok(git) => Ok(git),
        Err(e) => {
            tracing::info!(fork = %fork, error = %e, "no usable fork, forking upstream");
            client.clone_upstream(config.upstream()).into_diagnostic()?;

            let repo_dir = workspace.join(config.upstream_repo_name());
            client.in_dir(&repo_dir).fork("origin").into_diagnostic()?;
            Ok(Git::new(&repo_dir, runner).with_env(auth_env))
        }
    }
}

fn github_url(repo: &str) -> String {
    format!("https://github.com/{}.git", repo)
}

fn fork_url(user: &str, repo_name: &str) -> String {
    github_url(&format!("{}/{}", user, repo_name))
}
