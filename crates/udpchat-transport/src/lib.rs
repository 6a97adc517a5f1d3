//! Reliable message transport over UDP for udpchat.
//!
//! Every application message is pushed through a stop-and-wait sequence of
//! checksummed packets (`START`, one `DATA` per chunk, `END`), each resent
//! until the matching `ACK` arrives. The pieces:
//!
//! - [`Datagram`]: the socket seam. Implemented for [`tokio::net::UdpSocket`];
//!   tests plug in lossy wrappers.
//! - [`ReliableEndpoint`]: binds a socket and runs the endpoint actor.
//!   [`ReliableEndpoint::recv`] yields reassembled messages.
//! - [`EndpointHandle`]: cloneable sender. [`EndpointHandle::send`] resolves
//!   once the receiver has acknowledged the whole message.
//! - [`Transfer`] and [`ReceiveTable`]: the pure send and receive state
//!   machines the actors drive.

mod config;
mod endpoint;
mod error;
mod peer;
mod reassembly;
mod timer;
mod transfer;

pub use config::TransportConfig;
pub use endpoint::{Delivery, EndpointHandle, ReliableEndpoint};
pub use error::TransportError;
pub use reassembly::{ReceiveOutcome, ReceiveTable};
pub use timer::RetransmitTimer;
pub use transfer::{SenderPhase, Transfer};

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

/// A connectionless datagram socket.
///
/// The endpoint actor and every peer actor share one socket through an
/// `Arc`, so both operations take `&self`.
pub trait Datagram: Send + Sync + 'static {
    /// Sends one datagram to `target`.
    fn send_to(
        &self,
        buf: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send;

    /// Receives one datagram into `buf`.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;

    /// The local address the socket is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Datagram for UdpSocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}
