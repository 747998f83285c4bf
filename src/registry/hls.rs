//! HLS cast lifecycle for registered streams

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::RegistryError;
use super::frame::StreamId;
use super::store::StreamRegistry;
use crate::hls::{self, SegmentWriter};

impl StreamRegistry {
    /// Start draining a stream's HLS queue into `writer`
    ///
    /// The task stops when `cancel` fires, when [`stop_hls_cast`] is called,
    /// or when the stream is removed. Only one task may run per stream, and a
    /// stopped task counts as running until it has returned from the writer.
    ///
    /// [`stop_hls_cast`]: StreamRegistry::stop_hls_cast
    pub async fn start_hls_cast<W: SegmentWriter>(
        &self,
        id: &StreamId,
        writer: W,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>, RegistryError> {
        let mut entry = self.write_entry(id).await?;
        let verbosity = entry.verbosity;
        let capacity = self.config().hls_queue_capacity;

        // Stopping this stream cancels only the child, never the caller's token
        let token = cancel.child_token();

        let hls = entry
            .hls
            .as_mut()
            .ok_or(RegistryError::HlsNotSupported(*id))?;
        let (rx, done) = hls
            .claim(token.clone(), capacity)
            .ok_or(RegistryError::HlsCastAlreadyRunning(*id))?;

        Ok(tokio::spawn(hls::run_cast(
            *id, rx, writer, token, done, verbosity,
        )))
    }

    /// Stop the HLS cast task of a stream
    ///
    /// Returns `Ok(false)` if no task was running or it was already asked to
    /// stop. The task may still be finishing a write when this returns.
    pub async fn stop_hls_cast(&self, id: &StreamId) -> Result<bool, RegistryError> {
        let mut entry = self.write_entry(id).await?;

        let stopped = entry.hls.as_mut().is_some_and(|hls| hls.stop());
        if stopped {
            tracing::debug!(stream = %id, "HLS cast stop requested");
        }
        Ok(stopped)
    }
}
