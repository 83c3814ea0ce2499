#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use ledger_node::{Message, Node, NodeConfig};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const WAIT_LIMIT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub fn test_config() -> NodeConfig {
    NodeConfig {
        p2p_listen: "127.0.0.1:0".parse().expect("valid address"),
        connect_timeout: Duration::from_secs(2),
        ..NodeConfig::default()
    }
}

/// Starts a node listening on an ephemeral port.
pub async fn spawn_node() -> (Node, SocketAddr) {
    let node = Node::new(test_config());
    let addr = node.listen().await.expect("Failed to bind p2p listener");
    (node, addr)
}

/// Dials `to` from `from` and waits until both ends have registered the connection.
pub async fn connect(from: &Node, to: (&Node, SocketAddr)) {
    let (to_node, to_addr) = to;
    let before_from = from.stats().await.peers;
    let before_to = to_node.stats().await.peers;
    from.add_peer(&to_addr.ip().to_string(), to_addr.port())
        .await
        .expect("Failed to connect to peer");
    wait_until("both ends register the connection", || async move {
        from.stats().await.peers == before_from + 1 && to_node.stats().await.peers == before_to + 1
    })
    .await;
}

/// Polls `condition` until it holds, panicking after a generous limit.
pub async fn wait_until<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !condition().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting until {what}"
        );
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// A hand-driven peer speaking the WebSocket protocol directly.
pub struct RawPeer {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RawPeer {
    pub async fn connect(addr: SocketAddr) -> Self {
        let (socket, _response) = connect_async(format!("ws://{addr}"))
            .await
            .expect("Failed to connect");
        Self { socket }
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.socket
            .send(WsMessage::text(text.to_string()))
            .await
            .expect("Failed to send frame");
    }

    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        self.socket
            .send(WsMessage::binary(bytes.to_vec()))
            .await
            .expect("Failed to send frame");
    }

    pub async fn send(&mut self, message: &Message) {
        let frame = message.encode().expect("Failed to encode");
        self.send_raw(&frame).await;
    }

    pub async fn recv(&mut self) -> Message {
        loop {
            let frame = tokio::time::timeout(WAIT_LIMIT, self.socket.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed")
                .expect("Failed to read frame");
            if frame.is_text() {
                return Message::decode(&frame.into_data())
                    .expect("node sent an undecodable frame");
            }
        }
    }
}
