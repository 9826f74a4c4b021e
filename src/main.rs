use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feedsmith::build::build_site;
use feedsmith::config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feedsmith", version, about)]
struct Cli {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Builds the site from the project's feed.
    Build {
        /// The project directory, or any directory beneath it.
        #[arg(long, default_value = ".")]
        project: PathBuf,

        /// Where to write the site. Defaults to `_output` in the project
        /// root.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = match cli.verbose {
        true => "feedsmith=debug",
        false => "feedsmith=info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Command::Build { project, output } => {
            let project = std::fs::canonicalize(&project)
                .with_context(|| format!("Resolving project directory `{}`", project.display()))?;
            let config = Config::from_directory(&project, output.as_deref())?;
            build_site(&config)?;
            Ok(())
        }
    }
}
