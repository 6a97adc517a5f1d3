//! Per-destination sender actor.
//!
//! Each destination the endpoint sends to gets one Tokio task that owns
//! that peer's [`Transfer`] state. Requests queue on the actor's channel and
//! run one at a time; ACKs routed in by the endpoint's receive loop arrive
//! on a second channel. Nothing else ever touches a peer's send state.

use std::net::SocketAddr;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use udpchat_protocol::Packet;

use crate::{Datagram, RetransmitTimer, Transfer, TransportConfig, TransportError};

/// Inclusive range the START sequence number is drawn from.
const BASE_SEQUENCE_RANGE: std::ops::RangeInclusive<u64> = 1..=1_000_000;

/// One queued message and the channel its outcome is reported on.
pub(crate) struct SendRequest {
    pub(crate) payload: String,
    pub(crate) reply: oneshot::Sender<Result<(), TransportError>>,
}

/// Handle to a running peer actor, held by the endpoint actor.
///
/// Dropping the handle aborts the actor, abandoning any transfer in flight
/// and every queued request (their callers see [`TransportError::Abandoned`]).
pub(crate) struct PeerHandle {
    requests: mpsc::UnboundedSender<SendRequest>,
    acks: mpsc::UnboundedSender<u64>,
    task: JoinHandle<()>,
}

impl PeerHandle {
    /// Queues a message behind any transfers already waiting for this peer.
    pub(crate) fn enqueue(&self, request: SendRequest) {
        if let Err(mpsc::error::SendError(request)) = self.requests.send(request) {
            let _ = request.reply.send(Err(TransportError::Shutdown));
        }
    }

    /// Forwards an observed ACK sequence to the actor.
    pub(crate) fn ack(&self, sequence: u64) {
        let _ = self.acks.send(sequence);
    }
}

impl Drop for PeerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The actor state. Runs inside its own task.
struct PeerActor<D: Datagram> {
    peer: SocketAddr,
    socket: Arc<D>,
    config: TransportConfig,
    requests: mpsc::UnboundedReceiver<SendRequest>,
    acks: mpsc::UnboundedReceiver<u64>,
    timer: RetransmitTimer,
}

impl<D: Datagram> PeerActor<D> {
    async fn run(mut self) {
        trace!(peer = %self.peer, "peer sender started");

        while let Some(request) = self.requests.recv().await {
            let result = self.deliver(&request.payload).await;
            if let Err(e) = &result {
                warn!(peer = %self.peer, error = %e, "delivery failed");
            }
            let _ = request.reply.send(result);
        }

        trace!(peer = %self.peer, "peer sender stopped");
    }

    /// Drives one message through START, DATA..., END.
    async fn deliver(&mut self, payload: &str) -> Result<(), TransportError> {
        let base = rand::rng().random_range(BASE_SEQUENCE_RANGE);
        let mut transfer = Transfer::new(base, payload, self.config.chunk_size);

        // ACKs left over from an earlier transfer can't release this one.
        while self.acks.try_recv().is_ok() {}

        debug!(
            peer = %self.peer,
            base,
            chunks = transfer.chunk_count(),
            "transfer started"
        );

        while let Some(packet) = transfer.current_packet() {
            self.send_until_acked(&mut transfer, &packet).await?;
        }

        debug!(peer = %self.peer, base, "transfer acknowledged");
        Ok(())
    }

    /// Sends `packet` and resends it on every timeout until `transfer`
    /// accepts an ACK.
    async fn send_until_acked(
        &mut self,
        transfer: &mut Transfer,
        packet: &Packet,
    ) -> Result<(), TransportError> {
        let framed = packet.frame();
        let mut retransmissions: u32 = 0;

        loop {
            self.socket
                .send_to(framed.as_bytes(), self.peer)
                .await
                .map_err(TransportError::SendFailed)?;
            trace!(
                peer = %self.peer,
                kind = %packet.kind,
                seq = packet.sequence,
                retransmissions,
                "packet sent"
            );
            self.timer.arm();

            loop {
                tokio::select! {
                    ack = self.acks.recv() => {
                        let Some(sequence) = ack else {
                            return Err(TransportError::Shutdown);
                        };
                        if transfer.on_ack(sequence) {
                            self.timer.disarm();
                            return Ok(());
                        }
                        trace!(peer = %self.peer, sequence, "ignoring ack");
                    }
                    _ = self.timer.expired() => break,
                }
            }

            if self.config.max_retransmissions == Some(retransmissions) {
                return Err(TransportError::DeliveryFailed {
                    peer: self.peer,
                    sequence: packet.sequence,
                });
            }
            retransmissions += 1;
        }
    }
}

/// Spawns a sender actor for `peer` and returns the handle that feeds it.
pub(crate) fn spawn_peer<D: Datagram>(
    peer: SocketAddr,
    socket: Arc<D>,
    config: TransportConfig,
) -> PeerHandle {
    let (requests_tx, requests_rx) = mpsc::unbounded_channel();
    let (acks_tx, acks_rx) = mpsc::unbounded_channel();

    let actor = PeerActor {
        peer,
        socket,
        timer: RetransmitTimer::new(config.retransmit_timeout()),
        config,
        requests: requests_rx,
        acks: acks_rx,
    };

    PeerHandle {
        requests: requests_tx,
        acks: acks_tx,
        task: tokio::spawn(actor.run()),
    }
}
