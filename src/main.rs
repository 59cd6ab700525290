use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[derive(Parser)]
#[command(name = "surrogate")]
#[command(about = "Caching and intercepting proxies in front of a slow key/value provider", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Print results as JSON")]
    json: bool,

    #[arg(
        long,
        global = true,
        env = "SURROGATE_CACHE_DIR",
        help = "Persist cached values under this directory"
    )]
    cache_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "SURROGATE_TABLE",
        help = "Answer lookups from this YAML table instead of the prefix backend"
    )]
    table: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "SURROGATE_MAX_ENTRIES",
        help = "Bound the in-memory cache, evicting least recently used entries"
    )]
    max_entries: Option<usize>,

    #[arg(
        long,
        global = true,
        env = "SURROGATE_TTL_SECS",
        help = "Expire in-memory cache entries after this many seconds"
    )]
    ttl_secs: Option<u64>,

    #[arg(
        long,
        global = true,
        env = "SURROGATE_LATENCY_MS",
        default_value_t = 0,
        help = "Simulated latency of the prefix backend"
    )]
    latency_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Look up keys through the caching proxy")]
    Get {
        #[arg(required = true, help = "Keys to look up, repeated keys are served from the cache")]
        keys: Vec<String>,

        #[arg(long, help = "Resolve keys concurrently")]
        parallel: bool,
    },

    #[command(about = "Walk through the caching, timing and access-control proxies")]
    Demo,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "surrogate=debug" } else { "surrogate=warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; settings can come from flags or the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli::Config {
        verbose: cli.verbose,
        json: cli.json,
        cache_dir: cli.cache_dir,
        table: cli.table,
        max_entries: cli.max_entries,
        ttl_secs: cli.ttl_secs,
        latency_ms: cli.latency_ms,
    };

    match cli.command {
        Commands::Get { keys, parallel } => {
            cli::get(keys, parallel, &config).await?;
        }
        Commands::Demo => {
            cli::demo(&config).await?;
        }
    }

    Ok(())
}
