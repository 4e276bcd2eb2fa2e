//! Error types for beacon

use thiserror::Error;

/// Result type alias for beacon operations.
pub type Result<T> = std::result::Result<T, BeaconError>;

/// Errors surfaced by the engine and the shared data model.
///
/// Only [`BeaconError::InvalidArgument`], [`BeaconError::InvalidFilter`] and
/// [`BeaconError::RuntimeStart`] ever reach a caller; they indicate the
/// engine cannot function. The remaining variants are produced at adapter
/// boundaries, logged and dropped there so the engine keeps making forward
/// progress.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BeaconError {
    /// A constructor was handed unusable input.
    ///
    /// Examples: an empty route list, an empty host IP, a broken config file.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A filter pattern contained a malformed token.
    #[error("invalid filter token {0:?}")]
    InvalidFilter(String),

    /// The runtime refused to open its event stream.
    #[error("runtime failed to start: {0}")]
    RuntimeStart(String),

    /// An event carried an action the engine does not understand.
    #[error("unknown action {0:?}")]
    InvalidAction(String),

    /// A port number or protocol failed to parse.
    #[error("invalid port {0:?}")]
    InvalidPort(String),

    /// A service specification failed to parse.
    #[error("invalid service {0:?}")]
    InvalidService(String),
}

/// Error type for backend and discovery adapters.
///
/// These are advisory: the engine logs them per route per event and carries
/// on. A persistently failing backend produces a log storm but cannot block
/// the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The adapter failed to deliver an event or announcement.
    ///
    /// Examples: server rejected the request, write to the sink failed.
    #[error("send failed: {0}")]
    Send(String),

    /// A network connection to the destination failed.
    ///
    /// Examples: DNS lookup failed, connection refused, TLS handshake error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Graceful shutdown of the adapter failed.
    ///
    /// Examples: failed to flush buffered output, delete of a stale key
    /// timed out.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn beacon_error_display() {
        let err = BeaconError::InvalidArgument("routes may not be empty".to_string());
        assert_eq!(err.to_string(), "invalid argument: routes may not be empty");

        let err = BeaconError::InvalidFilter("color".to_string());
        assert_eq!(err.to_string(), "invalid filter token \"color\"");

        let err = BeaconError::RuntimeStart("socket unavailable".to_string());
        assert_eq!(err.to_string(), "runtime failed to start: socket unavailable");
    }

    #[test]
    fn backend_error_display() {
        let err = BackendError::Send("timeout".to_string());
        assert_eq!(err.to_string(), "send failed: timeout");

        let err = BackendError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "connection error: refused");

        let err = BackendError::Shutdown("flush failed".to_string());
        assert_eq!(err.to_string(), "shutdown error: flush failed");
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BeaconError>();
        assert_send_sync::<BackendError>();
    }
}
