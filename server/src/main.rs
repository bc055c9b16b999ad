use clap::Parser;
use log::info;
use server::network::Server;
use shared::config::{ID_POOL_CAPACITY, TICK_PERIOD_MS, XP_BLOB_COUNT};
use shared::GameConfig;
use std::time::Duration;

// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick period in milliseconds
    #[clap(short, long, default_value_t = TICK_PERIOD_MS)]
    tick_ms: u64,
    /// Maximum number of concurrent players
    #[clap(short, long, default_value_t = ID_POOL_CAPACITY)]
    max_players: u32,
    /// Number of xp blobs scattered at startup
    #[clap(short, long, default_value_t = XP_BLOB_COUNT)]
    xp_blobs: usize,
}

/// Main-method of the application.
/// Parses command-line arguments, then runs the server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let config = GameConfig {
        tick_period: Duration::from_millis(args.tick_ms.max(1)),
        id_pool_capacity: args.max_players,
        xp_blob_count: args.xp_blobs,
        ..GameConfig::default()
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
