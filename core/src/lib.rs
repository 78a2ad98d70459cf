// CAN Snooper Core Library
// Live CAN signal stream: records, pause gate, filtering and a bounded view

pub mod controller;
pub mod record;
pub mod session;
pub mod transport;
pub mod view;

// Export core types
pub use controller::{Command, ConnectionStatus, Snapshot, StreamController};
pub use record::Record;
pub use session::{Session, SessionHandle};
pub use transport::{Transport, TransportEvent, WebSocketTransport};
pub use view::{ViewCache, VIEW_WINDOW};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnooperError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Payload is not valid UTF-8")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
pub type Result<T> = std::result::Result<T, SnooperError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn open_missing() -> Result<()> {
        std::fs::File::open("/nonexistent/can_snooper/input")?;
        Ok(())
    }

    #[test]
    fn test_io_errors_convert() {
        let err = open_missing().unwrap_err();
        assert!(matches!(err, SnooperError::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }
}
