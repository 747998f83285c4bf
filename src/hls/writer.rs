//! Segment writer interface

use std::future::Future;

use crate::registry::{Packet, StreamId};

/// Consumer of a stream's HLS packets
///
/// Implementations turn packets into segments and playlists. They are driven
/// by a single cast task per stream, so calls for one stream never overlap.
pub trait SegmentWriter: Send + Sync + 'static {
    /// Append one packet to the current segment
    fn write_packet(
        &self,
        stream: StreamId,
        packet: &Packet,
    ) -> impl Future<Output = Result<(), SegmentWriteError>> + Send;

    /// Called once after the cast task stops, to flush any open segment
    fn finish(&self, _stream: StreamId) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Error returned by a [`SegmentWriter`]
#[derive(Debug)]
pub enum SegmentWriteError {
    /// I/O failure while writing segment or playlist files
    Io(std::io::Error),
    /// Packet could not be muxed (e.g. codecs not negotiated yet)
    Mux(String),
}

impl std::fmt::Display for SegmentWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentWriteError::Io(e) => write!(f, "Segment I/O error: {}", e),
            SegmentWriteError::Mux(msg) => write!(f, "Segment mux error: {}", msg),
        }
    }
}

impl std::error::Error for SegmentWriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentWriteError::Io(e) => Some(e),
            SegmentWriteError::Mux(_) => None,
        }
    }
}

impl From<std::io::Error> for SegmentWriteError {
    fn from(e: std::io::Error) -> Self {
        SegmentWriteError::Io(e)
    }
}
