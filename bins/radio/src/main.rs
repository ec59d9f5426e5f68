//! dlep-radio - advertise layer-2 neighbors to a co-located router.

use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use dlep::radio::RadioInterface;
use dlep::session::{ConnectionPoint, DLEP_PORT};
use dlep::{MacAddress, SessionConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dlep-radio", version, about = "DLEP radio daemon")]
struct Cli {
    /// Layer-2 interface to serve.
    #[arg(short, long, default_value = "wlan0")]
    interface: String,

    /// TCP/UDP port to listen on.
    #[arg(short, long, default_value_t = DLEP_PORT)]
    port: u16,

    /// Address to advertise in peer offers. Repeatable.
    #[arg(short, long)]
    address: Vec<IpAddr>,

    /// Peer type string sent during initialization.
    #[arg(long, default_value = "radio")]
    peer_type: String,

    /// Heartbeat interval in milliseconds.
    #[arg(long, default_value_t = 5000)]
    heartbeat_interval: u64,

    /// Mirror direct layer-2 neighbors.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    send_neighbors: bool,

    /// Mirror proxied layer-2 destinations.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    send_proxied: bool,

    /// Seed the neighbor table with a MAC address. Repeatable; useful
    /// without a live link tracker.
    #[arg(short, long)]
    neighbor: Vec<MacAddress>,
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
        send_neighbors: cli.send_neighbors,
        send_proxied: cli.send_proxied,
        ..Default::default()
    };

    let mut radio = RadioInterface::bind(&cli.interface, cfg, cli.port).await?;

    if !cli.address.is_empty() {
        radio.set_connection_points(
            cli.address
                .into_iter()
                .map(|addr| ConnectionPoint {
                    addr,
                    port: cli.port,
                    tls: false,
                })
                .collect(),
        );
    }

    let l2 = radio.l2_handle();
    for mac in cli.neighbor {
        info!(%mac, "seeding neighbor");
        l2.add_neighbor(mac);
    }

    info!(interface = %cli.interface, port = cli.port, "dlep-radio up");
    radio.run().await?;
    Ok(())
}
