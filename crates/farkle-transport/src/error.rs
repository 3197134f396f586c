use std::io;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be opened.
    #[error("bind failed: {0}")]
    BindFailed(#[source] io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),

    /// A TCP connection arrived but never became a WebSocket.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),
}

impl TransportError {
    /// Whether this error only affects the one incoming connection, so the
    /// accept loop can carry on.
    pub fn is_per_connection(&self) -> bool {
        matches!(self, Self::AcceptFailed(_) | Self::HandshakeFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_per_connection() {
        let refused = || io::Error::new(io::ErrorKind::ConnectionRefused, "x");
        assert!(TransportError::HandshakeFailed("bad".into()).is_per_connection());
        assert!(TransportError::AcceptFailed(refused()).is_per_connection());
        assert!(!TransportError::BindFailed(refused()).is_per_connection());
        assert!(!TransportError::SendFailed(refused()).is_per_connection());
    }
}
