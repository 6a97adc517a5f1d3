use std::net::SocketAddr;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the socket (or reading its local address) failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Sending a datagram failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a datagram failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The retransmission ceiling was reached without an acknowledgement.
    #[error("delivery to {peer} failed: no ack for sequence {sequence}")]
    DeliveryFailed {
        /// Destination of the transfer.
        peer: SocketAddr,
        /// Sequence number of the packet that was never acknowledged.
        sequence: u64,
    },

    /// The transfer was dropped because the peer was forgotten.
    #[error("transfer to {0} abandoned")]
    Abandoned(SocketAddr),

    /// The endpoint was shut down.
    #[error("transport shut down")]
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_failed_display_includes_cause() {
        let error = TransportError::ReceiveFailed(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset,
        ));
        assert!(error.to_string().starts_with("receive failed: "));
        assert!(std::error::Error::source(&error).is_some());
    }
}
