//! `tfmgr geturls` command - CSV of a template's download links

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers;
use crate::cli::GlobalOpts;
use crate::core::osf::{collect_urls, to_csv, OsfClient, OSF_API};
use crate::core::{Config, TemplateId};

#[derive(clap::Args, Debug)]
pub struct GetUrlsArgs {
    /// Template identifier (with or without the tpl- prefix)
    pub template_id: TemplateId,

    /// OSF project holding the template
    #[arg(long, env = "OSF_PROJECT")]
    pub osf_project: Option<String>,

    /// Write the CSV to this file instead of stdout
    #[arg(long, short = 'o')]
    pub out_file: Option<PathBuf>,

    /// Base URL of the OSF API
    #[arg(long, env = "OSF_API_URL", default_value = OSF_API, hide = true)]
    pub api_url: String,
}

pub fn run(args: GetUrlsArgs, _global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    let project = helpers::require(
        args.osf_project.clone().or_else(|| config.osf_project.clone()),
        "--osf-project",
    )?;

    let client = OsfClient::new(&args.api_url);
    let root = client.storage_root(&project);
    let urls = helpers::block_on(collect_urls(&client, &root, &args.template_id))?
        .into_diagnostic()?;
    let csv = to_csv(&urls).into_diagnostic()?;

    match &args.out_file {
        Some(path) => {
            fs::write(path, &csv).into_diagnostic()?;
            eprintln!(
                "{} Wrote {} link(s) to {}",
                style("✓").green(),
                urls.len(),
                style(path.display()).cyan()
            );
        }
        None => print!("{}", csv),
    }

    Ok(())
}
