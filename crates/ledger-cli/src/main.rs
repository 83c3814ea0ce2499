use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_NODE: &str = "http://127.0.0.1:8081";

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the peer-to-peer ledger node")]
struct Cli {
    /// Node control-plane base URL
    #[arg(long, global = true, env = "LEDGER_NODE", default_value = DEFAULT_NODE)]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect the node to another node's peer listener
    AddPeer {
        /// Peer host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Peer listener port
        #[arg(long)]
        port: u16,
    },
    /// Mine a block carrying DATA and broadcast it
    Mine {
        data: String,
    },
    /// Show block and peer counts
    Stats,
    /// Print the node's full chain
    Chain,
    /// List connected peers
    Peers,
}

#[derive(Serialize)]
struct PeerIn {
    host: String,
    port: u16,
}

#[derive(Serialize)]
struct BlockIn {
    data: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();
    let request = match cli.cmd {
        Command::AddPeer { host, port } => client
            .post(format!("{node}/peers"))
            .json(&PeerIn { host, port }),
        Command::Mine { data } => client.post(format!("{node}/blocks")).json(&BlockIn { data }),
        Command::Stats => client.get(format!("{node}/stats")),
        Command::Chain => client.get(format!("{node}/chain")),
        Command::Peers => client.get(format!("{node}/peers")),
    };
    debug!(?request, "sending");

    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
