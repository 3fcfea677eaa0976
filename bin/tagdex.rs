use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tagdex::{server, IndexConfig, ServerConfig, TopicIndex};
use tracing::info;

#[derive(Parser)]
#[command(name = "tagdex")]
#[command(about = "In-memory tagged topic index with expression slice queries", long_about = None)]
struct Args {
    /// Unix socket to listen on
    #[arg(long, env = "TAGDEX_SOCKET", default_value = "./tagdex.sock")]
    socket: PathBuf,

    /// Seconds between automatic count flushes
    #[arg(long, env = "TAGDEX_FLUSH_INTERVAL", default_value = "60")]
    flush_interval: u64,

    /// Active-window width in seconds
    #[arg(long, env = "TAGDEX_MESSAGE_CUTOFF", default_value = "43200")]
    message_cutoff: u32,

    /// Age in seconds past which topics stop collecting posts
    #[arg(long, env = "TAGDEX_TOPIC_CUTOFF", default_value = "432000")]
    topic_cutoff: u32,

    /// Global population required before inverse tags materialise
    #[arg(long, env = "TAGDEX_INVERSE_THRESHOLD", default_value = "10000")]
    inverse_threshold: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("Starting tagdex v{}", tagdex::VERSION);
    info!("  Socket: {}", args.socket.display());
    info!("  Flush interval: {}s", args.flush_interval);
    info!("  Message cutoff: {}s", args.message_cutoff);
    info!("  Topic cutoff: {}s", args.topic_cutoff);
    info!("  Inverse threshold: {}", args.inverse_threshold);

    let index_config = IndexConfig {
        message_cutoff_secs: args.message_cutoff,
        topic_cutoff_secs: args.topic_cutoff,
        inverse_threshold: args.inverse_threshold,
        ..Default::default()
    };
    let server_config =
        ServerConfig::new(args.socket).with_flush_interval_secs(args.flush_interval);

    // The index starts empty; upstream replays its event log into it
    let index = Arc::new(TopicIndex::new(index_config));

    tokio::select! {
        result = server::run(index, server_config) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, exiting");
        }
    }

    Ok(())
}
