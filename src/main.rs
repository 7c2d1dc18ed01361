//! CLI entry point for quill

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill::{commands, Site};

#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "A small static blog generator with a front-matter and link checker", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
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
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post or page
    New {
        /// Layout to use (post, page, draft); defaults to `default_layout`
        #[arg(short, long)]
        layout: Option<String>,

        /// Title of the new post
        title: String,

        /// Path for the new post, relative to its folder
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Watch for file changes
        #[arg(short, long)]
        watch: bool,

        /// Ignore the cache and rebuild everything
        #[arg(short, long)]
        force: bool,
    },

    /// Start a local server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Enable static mode (no file watching)
        #[arg(long)]
        r#static: bool,
    },

    /// Clean the public folder and cache
    Clean,

    /// List site information
    List {
        /// Type of content to list (post, page, tag, route)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Check front-matter and internal links
    Check {
        /// Fail on warnings too
        #[arg(short, long)]
        strict: bool,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "quill=debug,info"
    } else {
        "quill=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            commands::init::init_site(&target_dir)?;
            println!("Initialized empty site in {:?}", target_dir);
        }

        Commands::New {
            layout,
            title,
            path,
        } => {
            let site = Site::new(&base_dir)?;
            let layout = layout.unwrap_or_else(|| site.config.default_layout.clone());
            let file = commands::new::create_post(&site, &title, &layout, path.as_deref())?;
            println!("Created {}", file.display());
        }

        Commands::Generate { watch, force } => {
            let site = Site::new(&base_dir)?;
            commands::generate::run_with_options(&site, force)?;
            println!("Generated successfully!");

            if watch {
                tokio::task::spawn_blocking(move || commands::generate::watch(&site, |_| {}))
                    .await??;
            }
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
        } => {
            let site = Site::new(&base_dir)?;
            site.generate()?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            quill::server::start(&site, &ip, port, !r#static, open).await?;
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let site = Site::new(&base_dir)?;
            commands::list::run(&site, &r#type)?;
        }

        Commands::Check { strict } => {
            let site = Site::new(&base_dir)?;
            let report = commands::check::run(&site)?;
            if !report.passes(strict) {
                std::process::exit(1);
            }
        }

        Commands::Version => {
            println!("quill version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
