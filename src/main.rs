use clap::Parser;
use miette::Result;
use tfmanager::cli::{helpers, Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior so piping to `head` ends quietly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    helpers::init_logging(&global);

    match cli.command {
        Commands::Add(args) => tfmanager::cli::commands::add::run(args, &global),
        Commands::Update(args) => tfmanager::cli::commands::update::run(args, &global),
        Commands::Get(args) => tfmanager::cli::commands::get::run(args, &global),
        Commands::GetUrls(args) => tfmanager::cli::commands::geturls::run(args, &global),
        Commands::Config(cmd) => tfmanager::cli::commands::config::run(cmd, &global),
        Commands::License(cmd) => tfmanager::cli::commands::license::run(cmd),
        Commands::Completions(args) => tfmanager::cli::commands::completions::run(args),
    }
}
