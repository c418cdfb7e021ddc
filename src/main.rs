use clap::Parser;
use tracing_subscriber::EnvFilter;

use genotext::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("genotext=debug,info")
    } else {
        EnvFilter::new("genotext=info")
    };

    // Logs go to stderr; the pubmed report owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Text(args) => cli::text::run(args)?,
        cli::Commands::Magic(args) => cli::magic::run(args)?,
        cli::Commands::Combine(args) => cli::combine::run(args)?,
        cli::Commands::Pubmed(args) => cli::pubmed::run(args)?,
    }

    Ok(())
}
