//! HLS casting
//!
//! A cast task drains one stream's HLS queue and hands every packet to a
//! [`SegmentWriter`], which owns segmenting and playlist output. The task runs
//! until its cancellation token fires or the stream is removed.
//!
//! ```text
//!   cast(id, pkt, true)
//!          │ try_send
//!          ▼
//!    [HLS queue] ──recv──► run_cast ──write_packet──► SegmentWriter
//!                              ▲
//!                     CancellationToken
//! ```

pub mod writer;

pub use writer::{SegmentWriteError, SegmentWriter};

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::registry::{Packet, StreamId, Verbosity};

/// Drain `rx` into `writer` until cancelled or the queue closes
///
/// Write failures are logged and the loop moves on to the next packet.
/// `done` is released only after the writer has been finished (or the future
/// is dropped), which is what frees the stream's HLS queue for a new task.
pub(crate) async fn run_cast<W: SegmentWriter>(
    stream: StreamId,
    mut rx: mpsc::Receiver<Packet>,
    writer: W,
    cancel: CancellationToken,
    done: DropGuard,
    verbosity: Verbosity,
) {
    let _done = done;

    tracing::info!(stream = %stream, "HLS cast started");

    let mut written: u64 = 0;
    let mut failed: u64 = 0;

    loop {
        let packet = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            packet = rx.recv() => packet,
        };

        let Some(packet) = packet else {
            tracing::debug!(stream = %stream, "HLS queue closed");
            break;
        };

        match writer.write_packet(stream, &packet).await {
            Ok(()) => {
                written += 1;
                if verbosity.detailed {
                    tracing::trace!(
                        stream = %stream,
                        track = packet.track,
                        keyframe = packet.is_keyframe,
                        "Packet written to HLS segment"
                    );
                }
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(stream = %stream, error = %e, "HLS segment write failed");
            }
        }
    }

    writer.finish(stream).await;

    tracing::info!(
        stream = %stream,
        written = written,
        failed = failed,
        "HLS cast stopped"
    );
}
