use thiserror::Error;

/// Errors from the client-side purchase helpers.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("pending purchase storage failed: {0}")]
    Storage(String),

    #[error("status request failed: {0}")]
    Transport(String),

    #[error("status endpoint returned HTTP {0}")]
    Status(u16),

    #[error("unexpected status response: {0}")]
    Decode(String),
}
