//! `tfmgr completions` command - shell completion scripts
//!
//! `source <(tfmgr completions bash)` enables completion in the current shell;
//! `-o` writes the script to a file instead, for example
//! `tfmgr completions fish -o ~/.config/fish/completions/tfmgr.fish`.

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cli::Cli;

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).into_diagnostic()?;
            }
            let mut file = fs::File::create(path).into_diagnostic()?;
            write_script(args.shell, &mut file)?;
            eprintln!(
                "{} Wrote {} completions to {}",
                style("✓").green(),
                args.shell,
                style(path.display()).cyan()
            );
            Ok(())
        }
        None => write_script(args.shell, &mut io::stdout().lock()),
    }
}

/// Completion script for `shell`, covering every subcommand of `tfmgr`
fn write_script(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
    out.flush().into_diagnostic()
}
