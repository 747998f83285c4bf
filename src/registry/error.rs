//! Registry error types
//!
//! Error types for stream registry operations.

use super::frame::StreamId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Stream not found
    StreamNotFound(StreamId),
    /// Stream id is already registered
    StreamAlreadyExists(StreamId),
    /// No unique client id could be generated
    IdentityGeneration,
    /// Stream was not configured for HLS delivery
    HlsNotSupported(StreamId),
    /// An HLS cast task is already draining this stream
    HlsCastAlreadyRunning(StreamId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::StreamNotFound(id) => write!(f, "Stream not found: {}", id),
            RegistryError::StreamAlreadyExists(id) => {
                write!(f, "Stream already registered: {}", id)
            }
            RegistryError::IdentityGeneration => write!(f, "Failed to generate client id"),
            RegistryError::HlsNotSupported(id) => {
                write!(f, "Stream does not support HLS: {}", id)
            }
            RegistryError::HlsCastAlreadyRunning(id) => {
                write!(f, "HLS cast already running: {}", id)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
