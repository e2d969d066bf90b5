//! loopcast server binary
//!
//! Examples:
//!   loopcast --file ./data/0001.aac                 # loop one file on every path
//!   loopcast --data-dir ./data --bind 0.0.0.0:8000   # serve /{record}/{track}
//!
//! Listen with:
//!   ffplay http://localhost:8080/
//!   vlc http://localhost:8080/0001/intro

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};

use loopcast::{AudioContent, ContentSource, RegistryConfig, ServerConfig, StreamServer};

#[derive(Debug, Parser)]
#[command(version, about = "Loop an audio file to any number of HTTP listeners")]
#[command(group(ArgGroup::new("source").required(true).args(["file", "data_dir"])))]
struct Args {
    /// Audio file to loop on every stream path
    #[arg(long, env = "LOOPCAST_FILE")]
    file: Option<PathBuf>,

    /// Directory of <record>/<track>.<extension> files served on /{record}/{track}
    #[arg(long, env = "LOOPCAST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address to bind to
    #[arg(long, env = "LOOPCAST_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Bytes sent per tick
    #[arg(long, default_value_t = 4096)]
    chunk_size: usize,

    /// Milliseconds between chunks
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Chunks that may wait for a slow client before drops start
    #[arg(long, default_value_t = 1)]
    subscriber_capacity: usize,

    /// Content-Type of stream responses
    #[arg(long, default_value = "audio/aac")]
    content_type: String,

    /// Extension appended to track names in library mode
    #[arg(long, default_value = "aac")]
    extension: String,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("loopcast=info".parse()?),
        )
        .init();

    let config = ServerConfig::with_addr(args.bind)
        .chunk_size(args.chunk_size)
        .tick_period(Duration::from_millis(args.tick_ms))
        .subscriber_capacity(args.subscriber_capacity)
        .content_type(args.content_type)
        .max_connections(args.max_connections);

    let source = match (args.file, args.data_dir) {
        (Some(file), _) => ContentSource::Single(AudioContent::load(&file).await?),
        (None, Some(dir)) => {
            ContentSource::Library(RegistryConfig::with_data_dir(dir).extension(args.extension))
        }
        (None, None) => return Err("one of --file or --data-dir is required".into()),
    };

    let server = StreamServer::new(config, source)?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
