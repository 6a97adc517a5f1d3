//! The reliable endpoint: one socket, one actor, many peers.
//!
//! [`ReliableEndpoint::bind`] spawns an actor task that exclusively owns
//!
//! - the receive side of the socket,
//! - the per-source [`ReceiveTable`], and
//! - the per-destination sender actors ([`spawn_peer`]).
//!
//! The actor loop never waits for an ACK itself. Inbound ACKs are forwarded
//! to the owning peer actor over a channel, START/DATA/END are answered
//! immediately, and completed messages are pushed to the application as
//! [`Delivery`] values.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use udpchat_protocol::{Packet, PacketKind};

use crate::peer::{spawn_peer, PeerHandle, SendRequest};
use crate::{Datagram, ReceiveTable, TransportConfig, TransportError};

/// A complete message reassembled from one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Who sent it.
    pub from: SocketAddr,
    /// The reassembled message text.
    pub payload: String,
}

/// Commands sent to the endpoint actor through its channel.
enum Command {
    /// Queue a reliable send to `peer`.
    Send {
        peer: SocketAddr,
        payload: String,
        reply: oneshot::Sender<Result<(), TransportError>>,
    },
    /// Abandon every transfer to and from `peer`.
    Forget(SocketAddr),
    /// Stop the actor.
    Shutdown,
}

/// Cloneable handle for sending through a [`ReliableEndpoint`].
#[derive(Clone)]
pub struct EndpointHandle {
    commands: mpsc::UnboundedSender<Command>,
    local_addr: SocketAddr,
}

impl EndpointHandle {
    /// Reliably sends `payload` to `peer`.
    ///
    /// Resolves once the END packet is acknowledged. Sends to the same peer
    /// run one after another in call order; sends to different peers run
    /// concurrently.
    ///
    /// # Errors
    /// - [`TransportError::DeliveryFailed`] if the retransmission ceiling
    ///   was reached.
    /// - [`TransportError::Abandoned`] if the peer was forgotten mid-send.
    /// - [`TransportError::Shutdown`] if the endpoint is gone.
    pub async fn send(
        &self,
        peer: SocketAddr,
        payload: impl Into<String>,
    ) -> Result<(), TransportError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                peer,
                payload: payload.into(),
                reply: reply_tx,
            })
            .map_err(|_| TransportError::Shutdown)?;
        reply_rx
            .await
            .map_err(|_| TransportError::Abandoned(peer))?
    }

    /// Abandons in-flight and queued sends to `peer` and drops any partial
    /// message received from it.
    pub fn forget(&self, peer: SocketAddr) {
        let _ = self.commands.send(Command::Forget(peer));
    }

    /// Stops the endpoint. Pending sends fail and
    /// [`ReliableEndpoint::recv`] returns `None`.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    /// The address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// A bound socket speaking the reliable START/DATA/END protocol.
pub struct ReliableEndpoint {
    handle: EndpointHandle,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
    task: JoinHandle<()>,
}

impl ReliableEndpoint {
    /// Binds a UDP socket and starts the endpoint actor.
    pub async fn bind(addr: &str, config: TransportConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        let endpoint = Self::with_socket(socket, config)?;
        info!(addr = %endpoint.local_addr(), "reliable endpoint listening");
        Ok(endpoint)
    }

    /// Starts the endpoint actor on an already-bound datagram socket.
    pub fn with_socket<D: Datagram>(
        socket: D,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let local_addr = socket.local_addr().map_err(TransportError::BindFailed)?;
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (deliveries_tx, deliveries_rx) = mpsc::unbounded_channel();

        let actor = EndpointActor {
            socket: Arc::new(socket),
            config,
            commands: commands_rx,
            deliveries: deliveries_tx,
            receptions: ReceiveTable::new(),
            peers: HashMap::new(),
        };

        Ok(Self {
            handle: EndpointHandle {
                commands: commands_tx,
                local_addr,
            },
            deliveries: deliveries_rx,
            task: tokio::spawn(actor.run()),
        })
    }

    /// Waits for the next reassembled message.
    ///
    /// Returns `None` once the endpoint has shut down.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.deliveries.recv().await
    }

    /// A cloneable handle for sending.
    pub fn handle(&self) -> EndpointHandle {
        self.handle.clone()
    }

    /// The address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr
    }

    /// Stops the endpoint actor and every peer actor.
    pub fn shutdown(&self) {
        self.handle.shutdown();
    }
}

impl Drop for ReliableEndpoint {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The internal endpoint state. Runs inside a Tokio task.
struct EndpointActor<D: Datagram> {
    socket: Arc<D>,
    config: TransportConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    deliveries: mpsc::UnboundedSender<Delivery>,
    receptions: ReceiveTable,
    /// Sender actors, keyed by destination. Dropping one aborts it.
    peers: HashMap<SocketAddr, PeerHandle>,
}

impl<D: Datagram> EndpointActor<D> {
    async fn run(mut self) {
        let mut buf = vec![0u8; self.config.recv_buffer_size];

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Send { peer, payload, reply }) => {
                        self.peer(peer).enqueue(SendRequest { payload, reply });
                    }
                    Some(Command::Forget(peer)) => {
                        debug!(%peer, "forgetting peer");
                        self.peers.remove(&peer);
                        self.receptions.forget(&peer);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => self.on_datagram(from, &buf[..len]).await,
                    Err(e) => {
                        let error = TransportError::ReceiveFailed(e);
                        warn!(%error, "datagram receive failed");
                    }
                },
            }
        }

        info!(peers = self.peers.len(), "reliable endpoint stopped");
    }

    /// Returns the sender actor for `peer`, spawning it on first use.
    fn peer(&mut self, peer: SocketAddr) -> &PeerHandle {
        let socket = &self.socket;
        let config = &self.config;
        self.peers
            .entry(peer)
            .or_insert_with(|| spawn_peer(peer, Arc::clone(socket), config.clone()))
    }

    async fn on_datagram(&mut self, from: SocketAddr, datagram: &[u8]) {
        let packet = match Packet::decode(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(%from, error = %e, "dropping invalid packet");
                return;
            }
        };
        trace!(%from, kind = %packet.kind, seq = packet.sequence, "packet received");

        if packet.kind == PacketKind::Ack {
            match self.peers.get(&from) {
                Some(peer) => peer.ack(packet.sequence),
                None => trace!(%from, seq = packet.sequence, "ack with no sender, ignoring"),
            }
            return;
        }

        let outcome = self.receptions.on_packet(from, &packet);
        if let Some(sequence) = outcome.ack {
            let ack = Packet::ack(sequence).frame();
            if let Err(e) = self.socket.send_to(ack.as_bytes(), from).await {
                warn!(%from, error = %e, "failed to send ack");
            }
        }
        if let Some(payload) = outcome.delivered {
            let _ = self.deliveries.send(Delivery { from, payload });
        }
    }
}
