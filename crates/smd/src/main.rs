//! Student Manager Daemon - cached student, teacher and subject lookups

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tablecache::{CacheStore, MemoryStore};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smd::config::Settings;
use smd::handler::CommandHandler;
use smd::server;
use smd::tables::Tables;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory with one `<table>.toon` sheet per table
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cache capacity (number of entries)
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Default table lifetime in seconds
    #[arg(long)]
    ttl_secs: Option<u64>,

    /// Lifetime of the subjects table in seconds
    #[arg(long)]
    subjects_ttl_secs: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Load every table before answering
    #[arg(long)]
    warm: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Answer line commands over TCP
    Serve {
        /// Bind address
        #[arg(short, long, default_value = "127.0.0.1:7070")]
        bind: String,

        /// Seconds between sweeps of expired cache entries
        #[arg(long, default_value_t = 60)]
        purge_secs: u64,
    },
    /// Run one command against the data directory and print the response
    Query {
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// Ping a running daemon (for container health checks)
    Health {
        #[arg(short, long, default_value = "127.0.0.1:7070")]
        bind: String,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    if let Mode::Health { bind } = &args.mode {
        let healthy = health(bind).await.is_ok();
        println!("{}", if healthy { "OK" } else { "FAILED" });
        std::process::exit(if healthy { 0 } else { 1 });
    }

    let settings = Settings::load(args.config.as_deref())?.override_with(
        args.capacity,
        args.ttl_secs,
        args.subjects_ttl_secs,
    );
    settings.validate()?;
    let cache_config = settings.cache_config();

    info!("Starting Student Manager Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", args.data.display());
    info!(
        capacity = cache_config.capacity,
        default_ttl_secs = settings.default_ttl_secs,
        overrides = ?settings.ttl_overrides_secs,
        "Cache configured"
    );

    let store = Arc::new(MemoryStore::new(cache_config.capacity));
    let shared: Arc<dyn CacheStore> = Arc::clone(&store) as Arc<dyn CacheStore>;
    let tables = Arc::new(Tables::open(&args.data, shared, &cache_config));

    if args.warm {
        let failed = tables.warm_up().await;
        if failed > 0 {
            warn!(failed, "Some tables are cold; they load on first use");
        }
    }

    let handler = Arc::new(CommandHandler::new(tables, Arc::clone(&store)));

    match args.mode {
        Mode::Serve { bind, purge_secs } => {
            let listener = TcpListener::bind(&bind)
                .await
                .with_context(|| format!("binding {}", bind))?;
            info!("Server listening on {}", bind);

            server::spawn_purger(store, Duration::from_secs(purge_secs.max(1)));
            server::serve(listener, handler, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Cannot listen for shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await;
            info!("Shutting down");
            Ok(())
        }
        Mode::Query { command } => {
            let response = handler.handle(&command.join(" ")).await;
            println!("{}", response.to_line());
            if !response.is_ok() {
                std::process::exit(1);
            }
            Ok(())
        }
        Mode::Health { .. } => Ok(()),
    }
}

async fn health(bind: &str) -> Result<()> {
    let stream = TcpStream::connect(bind).await?;
    let (reader, mut writer) = stream.into_split();
    writer.write_all(b"PING\n").await?;

    let mut lines = BufReader::new(reader).lines();
    let line = lines
        .next_line()
        .await?
        .context("connection closed before reply")?;
    if !line.contains(r#""status":"ok""#) {
        anyhow::bail!("unexpected reply: {}", line);
    }
    Ok(())
}
