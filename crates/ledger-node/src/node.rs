use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::message::{DecodeError, Message};
use crate::peers::{Direction, PeerId, PeerInfo, PeerSet};
use crate::sync::{self, BlockOutcome, ChainOutcome};
use futures::{SinkExt, StreamExt};
use ledger_core::{mine_block_parallel, Block, Ledger};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_async_with_config, client_async_with_config, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub blocks: usize,
    pub peers: usize,
}

/// A ledger participant. Cloning is cheap and every clone drives the same ledger and peer
/// set.
#[derive(Clone)]
pub struct Node {
    inner: Arc<Inner>,
}

struct Inner {
    config: NodeConfig,
    ledger: RwLock<Ledger>,
    peers: PeerSet,
    shutdown: CancellationToken,
    stop_mining: AtomicBool,
}

impl Node {
    /// Creates the node with a ledger holding only the genesis block.
    pub fn new(config: NodeConfig) -> Self {
        let ledger = Ledger::with_difficulty(config.difficulty);
        info!(genesis = %ledger.genesis().hash, difficulty = config.difficulty, "ledger initialised");
        Self {
            inner: Arc::new(Inner {
                config,
                ledger: RwLock::new(ledger),
                peers: PeerSet::new(),
                shutdown: CancellationToken::new(),
                stop_mining: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// Binds the peer listener and accepts connections in the background until shutdown.
    /// Returns the bound address.
    pub async fn listen(&self) -> Result<SocketAddr> {
        let addr = self.inner.config.p2p_listen;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NodeError::Bind { addr, source })?;
        let local = listener.local_addr()?;
        info!(%local, "p2p listener started");

        let node = self.clone();
        tokio::spawn(async move { node.accept_loop(listener).await });
        Ok(local)
    }

    async fn accept_loop(self, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.inner.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let node = self.clone();
                        tokio::spawn(async move { node.accept(stream, addr).await });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
            }
        }
        info!("p2p listener stopped");
    }

    async fn accept(self, stream: TcpStream, addr: SocketAddr) {
        let timeout = self.inner.config.connect_timeout;
        let handshake = accept_async_with_config(stream, Some(self.ws_config()));
        match tokio::time::timeout(timeout, handshake).await {
            Ok(Ok(socket)) => {
                info!(%addr, "connection in");
                self.attach(socket, addr, Direction::Inbound).await;
            }
            Ok(Err(e)) => warn!(%addr, error = %e, "WebSocket handshake failed"),
            Err(_) => warn!(%addr, ?timeout, "WebSocket handshake timed out"),
        }
    }

    /// Dials `ws://host:port` and, once connected, treats the connection like an accepted
    /// one. Failures are logged and returned; nothing is retried.
    pub async fn add_peer(&self, host: &str, port: u16) -> Result<PeerId> {
        let target = format!("{host}:{port}");
        let timeout = self.inner.config.connect_timeout;
        let dial = async {
            let stream = TcpStream::connect(&target)
                .await
                .map_err(|source| NodeError::Connect {
                    target: target.clone(),
                    source,
                })?;
            let addr = stream.peer_addr()?;
            let url = format!("ws://{target}");
            let (socket, _response) =
                client_async_with_config(url, stream, Some(self.ws_config()))
                    .await
                    .map_err(|source| NodeError::Handshake {
                        target: target.clone(),
                        source,
                    })?;
            Ok::<_, NodeError>((socket, addr))
        };
        let (socket, addr) = match tokio::time::timeout(timeout, dial).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                warn!(%target, error = %e, "failed to connect to peer");
                return Err(e);
            }
            Err(_) => {
                warn!(%target, ?timeout, "timed out connecting to peer");
                return Err(NodeError::ConnectTimeout { target, timeout });
            }
        };
        let id = self.attach(socket, addr, Direction::Outbound).await;
        info!(peer = %id, %target, "a new peer is connected");
        Ok(id)
    }

    fn ws_config(&self) -> WebSocketConfig {
        let limit = self.inner.config.max_message_size;
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(limit);
        config.max_frame_size = Some(limit);
        config
    }

    /// Registers the connection, announces our head and spawns its reader and writer.
    async fn attach<S>(
        &self,
        socket: WebSocketStream<S>,
        addr: SocketAddr,
        direction: Direction,
    ) -> PeerId
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sink, mut frames) = socket.split();
        let (outbox, mut inbox) = mpsc::unbounded_channel::<Message>();
        let id = {
            // The ledger stays read-locked until the peer is registered, so every block
            // appended after the announced head is also broadcast to this peer.
            let ledger = self.inner.ledger.read().await;
            let _ = outbox.send(Message::Block(ledger.latest_block().clone()));
            self.inner.peers.insert(addr, direction, outbox).await
        };
        debug!(peer = %id, %addr, ?direction, "peer active");

        let closed = self.inner.shutdown.child_token();

        let writer_closed = closed.clone();
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = writer_closed.cancelled() => break,
                    message = inbox.recv() => match message {
                        Some(message) => message,
                        None => break,
                    },
                };
                let frame = match message.encode() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(peer = %id, error = %e, "failed to encode message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(WsMessage::text(frame)).await {
                    warn!(peer = %id, error = %e, "send failed");
                    break;
                }
            }
            writer_closed.cancel();
            let _ = sink.close().await;
        });

        let node = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = closed.cancelled() => break,
                    frame = frames.next() => match frame {
                        Some(Ok(frame)) if frame.is_text() || frame.is_binary() => {
                            node.handle_frame(id, &frame.into_data()).await
                        }
                        Some(Ok(frame)) if frame.is_close() => break,
                        // pings are answered by the protocol layer
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(peer = %id, error = %e, "connection error");
                            break;
                        }
                        None => break,
                    },
                }
            }
            closed.cancel();
            node.inner.peers.remove(id).await;
            info!(peer = %id, "closing connection");
        });

        id
    }

    async fn handle_frame(&self, from: PeerId, frame: &[u8]) {
        match Message::decode(frame) {
            Ok(message) => self.handle_message(from, message).await,
            Err(DecodeError::UnknownEvent(event)) => {
                warn!(peer = %from, %event, "unknown message");
            }
            Err(e) => warn!(peer = %from, error = %e, "dropping unparseable message"),
        }
    }

    /// Dispatches one message received from `from`.
    pub async fn handle_message(&self, from: PeerId, message: Message) {
        debug!(peer = %from, event = message.event(), "message in");
        match message {
            Message::RequestChain => {
                let chain = self.chain().await;
                self.inner.peers.send_to(from, Message::Chain(chain)).await;
            }
            Message::RequestBlock => {
                let head = self.latest_block().await;
                self.inner.peers.send_to(from, Message::Block(head)).await;
            }
            Message::Block(block) => {
                let index = block.index;
                let outcome = {
                    let mut ledger = self.inner.ledger.write().await;
                    sync::receive_block(&mut ledger, block)
                };
                match outcome {
                    BlockOutcome::Stale => debug!(peer = %from, index, "no update needed"),
                    BlockOutcome::Appended => info!(peer = %from, index, "new block added"),
                    BlockOutcome::Rejected(reason) => {
                        warn!(peer = %from, index, %reason, "block rejected")
                    }
                    BlockOutcome::ChainRequested => {
                        info!(peer = %from, index, "behind peer, requesting chain");
                        self.inner.peers.broadcast(Message::RequestChain).await;
                    }
                }
            }
            Message::Chain(chain) => {
                let length = chain.len();
                let outcome = {
                    let mut ledger = self.inner.ledger.write().await;
                    sync::receive_chain(&mut ledger, chain)
                };
                match outcome {
                    ChainOutcome::Replaced => info!(peer = %from, length, "chain replaced"),
                    ChainOutcome::Rejected(reason) => {
                        debug!(peer = %from, length, %reason, "chain ignored")
                    }
                }
            }
        }
    }

    /// Mines a block carrying `data` off the async runtime, appends it and broadcasts it.
    ///
    /// The head may move while mining; the block is then re-mined on the new head, up to
    /// `max_mining_rounds` times.
    pub async fn create_block(&self, data: impl Into<String>) -> Result<Block> {
        let data = data.into();
        let rounds = self.inner.config.max_mining_rounds.max(1);
        for round in 1..=rounds {
            let candidate = Block::next(self.inner.ledger.read().await.latest_block(), data.clone());
            let inner = Arc::clone(&self.inner);
            let mined = tokio::task::spawn_blocking(move || {
                mine_block_parallel(
                    candidate,
                    inner.config.difficulty,
                    inner.config.max_nonce,
                    &inner.stop_mining,
                )
            })
            .await??;

            let appended = self.inner.ledger.write().await.add_to_chain(mined.clone());
            match appended {
                Ok(()) => {
                    info!(index = mined.index, hash = %mined.hash, "block created");
                    self.inner.peers.broadcast(Message::Block(mined.clone())).await;
                    return Ok(mined);
                }
                Err(reason) => warn!(round, %reason, "head moved while mining"),
            }
        }
        Err(NodeError::StaleHead { rounds })
    }

    pub async fn latest_block(&self) -> Block {
        self.inner.ledger.read().await.latest_block().clone()
    }

    pub async fn chain(&self) -> Vec<Block> {
        self.inner.ledger.read().await.chain().to_vec()
    }

    pub async fn stats(&self) -> Stats {
        Stats {
            blocks: self.inner.ledger.read().await.total_blocks(),
            peers: self.inner.peers.len().await,
        }
    }

    pub async fn peers(&self) -> Vec<PeerInfo> {
        self.inner.peers.list().await
    }

    /// Stops the listener, closes every connection and aborts any mining in progress.
    pub fn shutdown(&self) {
        self.inner.stop_mining.store(true, Ordering::Relaxed);
        self.inner.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}
