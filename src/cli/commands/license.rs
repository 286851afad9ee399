//! `tfmgr license` command - bundled license notices

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::core::licenses;

#[derive(Subcommand, Debug)]
pub enum LicenseCommands {
    /// List the bundled license notices
    List,

    /// Print a bundled license notice
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// License identifier (e.g., CC-BY-4.0)
    pub id: String,
}

pub fn run(cmd: LicenseCommands) -> Result<()> {
    match cmd {
        LicenseCommands::List => {
            for id in licenses::available() {
                println!("{}", id);
            }
            Ok(())
        }
        LicenseCommands::Show(args) => match licenses::get(&args.id) {
            Some(text) => {
                print!("{}", text);
                Ok(())
            }
            None => Err(miette::miette!(
                help = format!("Bundled licenses: {}", licenses::available().join(", ")),
                "No bundled license named '{}'",
                args.id
            )),
        },
    }
}

/// Hint at the bundled notice when a template declares a known license but
/// ships no LICENSE file of its own
pub fn suggest_notice(license: &str, template_dir: &std::path::Path) {
    if template_dir.join("LICENSE").exists() || licenses::get(license).is_none() {
        return;
    }

    eprintln!(
        "{} Template has no LICENSE file; 'tfmgr license show {}' prints the {} notice",
        style("!").yellow(),
        license,
        license
    );
}
