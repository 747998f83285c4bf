//! Packet fan-out
//!
//! Every send is a `try_send`: a full viewer or HLS queue loses the newest
//! packet instead of stalling the publisher or the other viewers.

use super::entry::StreamEntry;
use super::error::RegistryError;
use super::frame::{Packet, StreamId};
use super::store::StreamRegistry;

/// Result of fanning one packet out to a stream's consumers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct FanOut {
    pub delivered: usize,
    pub dropped: usize,
    pub hls_dropped: bool,
}

impl StreamEntry {
    pub(super) fn fan_out(&mut self, packet: Packet, hls_enabled: bool) -> FanOut {
        let mut result = FanOut::default();

        if hls_enabled {
            match self.hls.as_ref() {
                Some(hls) => {
                    if hls.tx.try_send(packet.clone()).is_err() {
                        result.hls_dropped = true;
                    }
                }
                None => {
                    tracing::trace!(stream = %self.id, "HLS requested but stream has no HLS queue");
                }
            }
        }

        for viewer in self.viewers.values() {
            if viewer.offer(packet.clone()) {
                result.delivered += 1;
            } else {
                result.dropped += 1;
            }
        }

        self.stats.packets_cast += 1;
        self.stats.viewer_drops += result.dropped as u64;
        if result.hls_dropped {
            self.stats.hls_drops += 1;
        }

        result
    }
}

impl StreamRegistry {
    /// Broadcast a packet to every viewer of a stream
    ///
    /// With `hls_enabled`, the packet is also forwarded to the stream's HLS
    /// queue. Packets dropped for full consumers are not reported as errors.
    pub async fn cast(
        &self,
        id: &StreamId,
        packet: Packet,
        hls_enabled: bool,
    ) -> Result<(), RegistryError> {
        let mut entry = self.write_entry(id).await?;

        let track = packet.track;
        let keyframe = packet.is_keyframe;
        let result = entry.fan_out(packet, hls_enabled);

        if entry.verbosity.detailed {
            tracing::trace!(
                stream = %id,
                track = track,
                keyframe = keyframe,
                delivered = result.delivered,
                "Packet cast"
            );
        }

        if entry.verbosity.verbose && (result.dropped > 0 || result.hls_dropped) {
            tracing::debug!(
                stream = %id,
                dropped = result.dropped,
                hls_dropped = result.hls_dropped,
                "Consumer queue full, packet dropped"
            );
        }

        Ok(())
    }
}
