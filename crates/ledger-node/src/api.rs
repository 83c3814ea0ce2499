//! HTTP control plane: the request/response front end that adds peers and mines blocks.

use crate::constants::LOCALHOST;
use crate::node::{Node, Stats};
use crate::peers::{PeerId, PeerInfo};
use crate::NodeError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::Block;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PeerIn {
    pub host: String,
    pub port: u16,
}

#[derive(Serialize)]
pub struct PeerAdded {
    pub peer: PeerId,
}

#[derive(Deserialize)]
pub struct BlockIn {
    pub data: String,
}

struct ApiError(NodeError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            NodeError::Connect { .. }
            | NodeError::Handshake { .. }
            | NodeError::ConnectTimeout { .. } => StatusCode::BAD_GATEWAY,
            NodeError::StaleHead { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        Self(err)
    }
}

pub fn router(node: Node) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/stats", get(stats))
        .route("/chain", get(chain))
        .route("/peers", get(list_peers).post(add_peer))
        .route("/blocks", post(create_block))
        .route("/addNode/{port}", get(add_node))
        .route("/spawnBrew/{data}", get(spawn_brew))
        .with_state(node)
}

async fn stats(State(node): State<Node>) -> Json<Stats> {
    Json(node.stats().await)
}

async fn chain(State(node): State<Node>) -> Json<Vec<Block>> {
    Json(node.chain().await)
}

async fn list_peers(State(node): State<Node>) -> Json<Vec<PeerInfo>> {
    Json(node.peers().await)
}

async fn add_peer(
    State(node): State<Node>,
    Json(peer): Json<PeerIn>,
) -> Result<Json<PeerAdded>, ApiError> {
    let peer = node.add_peer(&peer.host, peer.port).await?;
    Ok(Json(PeerAdded { peer }))
}

async fn create_block(
    State(node): State<Node>,
    Json(block): Json<BlockIn>,
) -> Result<Json<Block>, ApiError> {
    Ok(Json(node.create_block(block.data).await?))
}

/// Legacy route: dial a node on this host. Connection failures are only logged.
async fn add_node(State(node): State<Node>, Path(port): Path<u16>) -> &'static str {
    info!(port, "addNode connection");
    let _ = node.add_peer(LOCALHOST, port).await;
    "addNode"
}

/// Legacy route: mine a block whose payload is the path segment.
async fn spawn_brew(
    State(node): State<Node>,
    Path(data): Path<String>,
) -> Result<&'static str, ApiError> {
    info!(%data, "spawnBrew connection");
    node.create_block(data).await?;
    Ok("spawnBrew")
}
