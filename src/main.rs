use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use everwiki::server::AppState;
use everwiki::{
    ConfigLoader, ContentPipeline, OpenAiImageProvider, OpenAiTextProvider, PageCache,
    ValidPageRegistry,
};

#[derive(Parser)]
#[command(name = "everwiki")]
#[command(version, about = "On-demand AI encyclopedia server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, help = "Path to a TOML config file")]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the wiki server
    Serve {
        #[arg(long, help = "Override the bind address")]
        host: Option<String>,
        #[arg(long, help = "Override the bind port")]
        port: Option<u16>,
    },

    /// Remove expired cache entries
    Clean {
        #[arg(
            long,
            default_value = "168",
            help = "Remove cache files older than this many hours"
        )]
        max_age_hours: u64,
    },

    /// Print cache statistics
    Stats,
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mEverwiki encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    let rt = Runtime::new()?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            rt.block_on(async {
                let cache = Arc::new(PageCache::new(config.storage.cache_dir()));
                let registry =
                    Arc::new(ValidPageRegistry::load(config.storage.registry_path()).await?);

                let llm: everwiki::SharedTextGenerator =
                    Arc::new(OpenAiTextProvider::new(config.llm.clone())?);
                let imagegen: everwiki::SharedImageGenerator =
                    Arc::new(OpenAiImageProvider::new(config.image.clone())?);

                let state = AppState {
                    content: Arc::new(ContentPipeline::new(
                        Arc::clone(&llm),
                        Arc::clone(&cache),
                        Arc::clone(&registry),
                        config.cache.page_ttl_hours,
                    )),
                    images: Arc::new(everwiki::ImagePipeline::new(
                        llm,
                        imagegen,
                        Arc::clone(&cache),
                        config.cache.image_ttl_hours,
                    )),
                    cache,
                };

                everwiki::server::serve(&config.server, state).await?;
                Ok::<(), anyhow::Error>(())
            })?;
        }
        Commands::Clean { max_age_hours } => {
            let removed = rt.block_on(async {
                let cache = PageCache::new(config.storage.cache_dir());
                cache.clear_expired(max_age_hours).await
            })?;
            println!("Removed {} expired cache file(s)", removed);
        }
        Commands::Stats => {
            let stats = rt.block_on(async {
                let cache = PageCache::new(config.storage.cache_dir());
                cache.stats().await
            })?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
