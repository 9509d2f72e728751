/// Errors that can occur in the fan-out layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or accepting a socket failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade was refused or broke off.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Writing a frame to the peer failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The peer's stream errored mid-connection.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}
