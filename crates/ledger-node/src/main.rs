use clap::Parser;
use ledger_core::constants::POW_DIFFICULTY;
use ledger_node::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HTTP_LISTEN, DEFAULT_MAX_MESSAGE_SIZE,
    DEFAULT_MAX_MINING_ROUNDS, DEFAULT_P2P_LISTEN,
};
use ledger_node::{api, Node, NodeConfig, PeerAddr};
use std::{net::SocketAddr, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "ledger-node")]
#[command(about = "Peer-to-peer proof-of-work ledger node")]
struct Args {
    /// Address the peer listener binds, e.g. 127.0.0.1:8080
    #[arg(long, env = "LEDGER_P2P_LISTEN", default_value = DEFAULT_P2P_LISTEN)]
    p2p_listen: SocketAddr,

    /// Address the HTTP control plane binds, e.g. 127.0.0.1:8081
    #[arg(long, env = "LEDGER_HTTP_LISTEN", default_value = DEFAULT_HTTP_LISTEN)]
    http_listen: SocketAddr,

    /// Peer to dial at startup as host:port; repeatable
    #[arg(long = "peer")]
    peers: Vec<PeerAddr>,

    /// Trailing zero hex digits required of each block hash
    #[arg(long, env = "LEDGER_DIFFICULTY", default_value_t = POW_DIFFICULTY)]
    difficulty: usize,

    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    connect_timeout_ms: u64,

    /// Largest WebSocket message accepted from a peer, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,

    #[arg(
        long,
        default_value_t = DEFAULT_MAX_MINING_ROUNDS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_mining_rounds: u32,
}

impl Args {
    fn node_config(&self) -> NodeConfig {
        NodeConfig {
            p2p_listen: self.p2p_listen,
            difficulty: self.difficulty,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            max_message_size: self.max_message_size,
            max_mining_rounds: self.max_mining_rounds,
            max_nonce: None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let node = Node::new(args.node_config());
    let p2p = node.listen().await?;
    info!("starting node on {p2p}");

    for peer in &args.peers {
        // failures are logged by the node; startup carries on without the peer
        let _ = node.add_peer(&peer.host, peer.port).await;
    }

    let app = api::router(node.clone()).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(args.http_listen).await?;
    info!("HTTP server is listening at http://{}", args.http_listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    node.shutdown();
    info!("ledger-node stopped");
    Ok(())
}
