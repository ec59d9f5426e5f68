//! dlep-router - track a radio's destination advertisements.

use std::time::Duration;

use clap::Parser;
use dlep::router::RouterInterface;
use dlep::session::DLEP_PORT;
use dlep::SessionConfig;
use tokio_stream::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dlep-router", version, about = "DLEP router daemon")]
struct Cli {
    /// Interface facing the radio.
    #[arg(short, long, default_value = "eth0")]
    interface: String,

    /// Radio DLEP port.
    #[arg(short, long, default_value_t = DLEP_PORT)]
    port: u16,

    /// Peer type string sent during initialization.
    #[arg(long, default_value = "router")]
    peer_type: String,

    /// Heartbeat interval in milliseconds.
    #[arg(long, default_value_t = 5000)]
    heartbeat_interval: u64,

    /// Discovery interval in milliseconds.
    #[arg(long, default_value_t = 60000)]
    discovery_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let cfg = SessionConfig {
        peer_type: cli.peer_type,
        heartbeat_interval: Duration::from_millis(cli.heartbeat_interval),
        discovery_interval: Duration::from_millis(cli.discovery_interval),
        ..Default::default()
    };

    let mut router = RouterInterface::bind(&cli.interface, cfg, cli.port).await?;

    if let Some(events) = router.events() {
        tokio::spawn(async move {
            let mut events = events;
            while let Some(event) = events.next().await {
                info!(?event, "l2 change");
            }
        });
    }

    info!(interface = %cli.interface, port = cli.port, "dlep-router up");
    router.run().await?;
    Ok(())
}
