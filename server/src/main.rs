use clap::Parser;
use log::info;
use server::network::GameServer;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "12345")]
    port: u16,

    /// Simulation tick period in milliseconds
    #[arg(short, long, default_value = "50")]
    tick_ms: u64,

    /// Obstacle cap per room
    #[arg(long, default_value = "10")]
    max_obstacles: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting shooting game server...");
    info!(
        "Tick period: {}ms, obstacle cap: {}",
        args.tick_ms, args.max_obstacles
    );

    let address = format!("{}:{}", args.host, args.port);
    let server = GameServer::bind(
        &address,
        Duration::from_millis(args.tick_ms),
        args.max_obstacles,
    )
    .await?;

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
