//! Identity and packet types for stream routing
//!
//! This module defines the identifiers used to address streams and viewers,
//! and the packets that are fanned out to them.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a registered stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(Uuid);

impl StreamId {
    /// Create a new random stream id
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a stream id from its textual form
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for StreamId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for StreamId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a viewer, unique within its stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    pub(super) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub(super) fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Codec kind negotiated by ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecType {
    H264,
    H265,
    Aac,
    Opus,
    PcmAlaw,
    PcmMulaw,
}

impl CodecType {
    /// Whether this codec carries video
    pub fn is_video(&self) -> bool {
        matches!(self, CodecType::H264 | CodecType::H265)
    }

    /// Whether this codec carries audio
    pub fn is_audio(&self) -> bool {
        !self.is_video()
    }
}

/// Codec descriptor for one track of a stream
///
/// `config` holds the decoder configuration record (e.g. AVCDecoderConfigurationRecord
/// or AudioSpecificConfig) exactly as delivered by the demuxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecData {
    pub codec_type: CodecType,
    pub config: Bytes,
}

impl CodecData {
    pub fn new(codec_type: CodecType, config: Bytes) -> Self {
        Self { codec_type, config }
    }
}

/// One encoded media unit to be fanned out to viewers
///
/// Cheap to clone: the payload is a reference-counted `Bytes`, so every viewer
/// queue shares the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Index of the track in the stream's codec list
    pub track: u8,
    /// Whether this is a keyframe (video only)
    pub is_keyframe: bool,
    /// Decode timestamp relative to stream start
    pub time: Duration,
    /// Presentation offset from the decode timestamp
    pub composition_time: Duration,
    /// Encoded payload
    pub data: Bytes,
}

impl Packet {
    /// Create a packet for the given track
    pub fn new(track: u8, time: Duration, data: Bytes) -> Self {
        Self {
            track,
            is_keyframe: false,
            time,
            composition_time: Duration::ZERO,
            data,
        }
    }

    /// Mark this packet as a keyframe
    pub fn keyframe(mut self) -> Self {
        self.is_keyframe = true;
        self
    }

    /// Set the composition time offset
    pub fn with_composition_time(mut self, offset: Duration) -> Self {
        self.composition_time = offset;
        self
    }
}
