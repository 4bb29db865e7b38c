use thiserror::Error;

pub type Result<T, E = TransportError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("device handle is closed")]
    Closed,
}
