//! CLI entry point for fencepost

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fencepost")]
#[command(version)]
#[command(about = "Render front-matter Markdown posts into a static site", long_about = None)]
struct Cli {
    /// Set the site directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render all posts into the public directory
    #[command(alias = "g")]
    Render,

    /// Parse and render every post without writing, reporting failures
    Check,

    /// List site information
    List {
        /// Type of content to list (post, category, failure)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Remove the public directory
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "fencepost=debug,info"
    } else {
        "fencepost=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Render => {
            let site = fencepost::Site::new(&base_dir)?;
            tracing::info!("Rendering site in {:?}", base_dir);
            let report = site.generate().await?;
            println!(
                "Rendered {} posts ({} skipped)",
                report.pages.len(),
                report.failures.len()
            );
        }

        Commands::Check => {
            let site = fencepost::Site::new(&base_dir)?;
            let report = fencepost::commands::check::run(&site).await?;
            if report.has_failures() {
                anyhow::bail!("{} documents failed to render", report.failures.len());
            }
        }

        Commands::List { r#type } => {
            let site = fencepost::Site::new(&base_dir)?;
            fencepost::commands::list::run(&site, &r#type).await?;
        }

        Commands::Clean => {
            let site = fencepost::Site::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("fencepost version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
