use hid_transport::TransportError;
use thiserror::Error;

pub type Result<T, E = UpsError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum UpsError {
    /// No matching device, or it vanished between enumeration and open.
    #[error("connection error: {0}")]
    Connection(String),
    /// The device stopped answering; reconnecting may help.
    #[error("transport error: {0}")]
    Transport(String),
    /// The device answered with something other than what was asked for.
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("invalid register map: {0}")]
    Config(String),
    #[error("metrics error: {0}")]
    Metrics(String),
}

impl UpsError {
    pub(crate) fn connection(err: TransportError) -> Self {
        UpsError::Connection(err.to_string())
    }

    pub(crate) fn transport(err: TransportError) -> Self {
        UpsError::Transport(err.to_string())
    }

    /// Whether a fresh connection next cycle can be expected to clear this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, UpsError::Connection(_) | UpsError::Transport(_))
    }
}
