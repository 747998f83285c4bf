//! Stream entry and viewer types
//!
//! This module defines the per-stream state stored in the registry.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::frame::{ClientId, CodecData, Packet, StreamId};

/// Delivery type tag that enables the HLS forwarding queue
pub const HLS_STREAM_TYPE: &str = "hls";

/// Logging intensity for a single stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbosity {
    /// Log drops and lifecycle events at debug level
    pub verbose: bool,
    /// Additionally trace every packet
    pub detailed: bool,
}

impl Verbosity {
    /// Map a configuration string to verbosity flags
    ///
    /// `"v"` enables basic logging, `"vvv"` enables basic and detailed logging.
    /// Matching is case-insensitive; anything else leaves both flags off.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "v" => Self {
                verbose: true,
                detailed: false,
            },
            "vvv" => Self {
                verbose: true,
                detailed: true,
            },
            _ => Self::default(),
        }
    }
}

/// Description of a stream to register
#[derive(Debug, Clone, Default)]
pub struct StreamSpec {
    /// Where packets originate (informational)
    pub source_url: String,
    /// Delivery types this stream may be served as (e.g. "mse", "hls")
    pub supported_types: Vec<String>,
    /// Logging intensity
    pub verbosity: Verbosity,
}

impl StreamSpec {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    /// Add a supported delivery type
    pub fn with_type(mut self, stream_type: impl Into<String>) -> Self {
        self.supported_types.push(stream_type.into());
        self
    }

    /// Set the verbosity flags
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// One connected client's delivery queue
#[derive(Debug)]
pub(super) struct Viewer {
    tx: mpsc::Sender<Packet>,
}

impl Viewer {
    pub(super) fn new(tx: mpsc::Sender<Packet>) -> Self {
        Self { tx }
    }

    /// Enqueue without waiting. Returns false if the packet was dropped.
    pub(super) fn offer(&self, packet: Packet) -> bool {
        self.tx.try_send(packet).is_ok()
    }
}

/// HLS forwarding queue of a stream
///
/// The receiver is parked here until a cast task claims it. While a task runs,
/// `cancel` is the token that asks it to stop and `done` fires only once the
/// task has actually exited, so a stop request alone never frees the queue.
#[derive(Debug)]
pub(super) struct HlsQueue {
    pub(super) tx: mpsc::Sender<Packet>,
    rx: Option<mpsc::Receiver<Packet>>,
    cancel: Option<CancellationToken>,
    done: Option<CancellationToken>,
}

impl HlsQueue {
    pub(super) fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Some(rx),
            cancel: None,
            done: None,
        }
    }

    /// Whether a cast task still owns the receiver
    pub(super) fn is_running(&self) -> bool {
        self.done.as_ref().is_some_and(|d| !d.is_cancelled())
    }

    /// Hand the receiver to a new cast task
    ///
    /// Returns `None` while a previous task has not exited. Otherwise returns
    /// the receiver and the guard the task must hold until it is done. A
    /// receiver consumed by a finished task is replaced with a fresh channel.
    pub(super) fn claim(
        &mut self,
        cancel: CancellationToken,
        capacity: usize,
    ) -> Option<(mpsc::Receiver<Packet>, DropGuard)> {
        if self.is_running() {
            return None;
        }

        let rx = match self.rx.take() {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::channel(capacity.max(1));
                self.tx = tx;
                rx
            }
        };

        let done = CancellationToken::new();
        self.cancel = Some(cancel);
        self.done = Some(done.clone());
        Some((rx, done.drop_guard()))
    }

    /// Ask the running cast task to stop
    ///
    /// Returns true only if a task is running and had not been asked yet.
    pub(super) fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        match self.cancel.as_ref() {
            Some(cancel) if !cancel.is_cancelled() => {
                cancel.cancel();
                true
            }
            _ => false,
        }
    }
}

/// Entry for a single stream in the registry
#[derive(Debug)]
pub struct StreamEntry {
    /// Stream identity
    pub(super) id: StreamId,

    /// Source URL the ingestion side pulls from
    pub(super) source_url: String,

    /// Delivery types this stream may be served as
    pub(super) supported_types: BTreeSet<String>,

    /// Negotiated codecs; empty until ingestion sets them
    pub(super) codecs: Vec<CodecData>,

    /// Liveness reported by ingestion
    pub(super) status: bool,

    /// Connected viewers
    pub(super) viewers: HashMap<ClientId, Viewer>,

    /// HLS forwarding queue (None if the stream does not support HLS)
    pub(super) hls: Option<HlsQueue>,

    /// Logging intensity
    pub(super) verbosity: Verbosity,

    /// Counters
    pub(super) stats: StreamStats,

    /// When the stream was registered
    pub(super) created_at: Instant,

    /// Set once the entry has been detached from the registry
    pub(super) closed: bool,
}

impl StreamEntry {
    pub(super) fn new(id: StreamId, spec: StreamSpec, hls_queue_capacity: usize) -> Self {
        let supported_types: BTreeSet<String> = spec.supported_types.into_iter().collect();
        let hls = supported_types
            .contains(HLS_STREAM_TYPE)
            .then(|| HlsQueue::new(hls_queue_capacity));

        Self {
            id,
            source_url: spec.source_url,
            supported_types,
            codecs: Vec::new(),
            status: false,
            viewers: HashMap::new(),
            hls,
            verbosity: spec.verbosity,
            stats: StreamStats::default(),
            created_at: Instant::now(),
            closed: false,
        }
    }

    /// Check whether the stream may be served as the given delivery type
    pub fn supports(&self, stream_type: &str) -> bool {
        self.supported_types.contains(stream_type)
    }

    /// Number of connected viewers
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// Release every viewer and stop HLS forwarding
    ///
    /// Dropping the senders closes each viewer's receiver, so connection
    /// handlers see the end of the stream instead of waiting forever.
    pub(super) fn close(&mut self) {
        if let Some(hls) = self.hls.as_mut() {
            hls.stop();
        }
        self.viewers.clear();
        self.hls = None;
        self.closed = true;
    }

    /// Build a snapshot of this entry
    pub(super) fn info(&self) -> StreamInfo {
        StreamInfo {
            id: self.id,
            source_url: self.source_url.clone(),
            supported_types: self.supported_types.iter().cloned().collect(),
            status: self.status,
            codec_count: self.codecs.len(),
            viewer_count: self.viewers.len(),
            verbosity: self.verbosity,
            hls_running: self.hls.as_ref().is_some_and(HlsQueue::is_running),
            uptime: self.created_at.elapsed(),
            stats: self.stats.clone(),
        }
    }
}

/// Counters for a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Packets passed to `cast`
    pub packets_cast: u64,
    /// Packet deliveries dropped because a viewer queue was full or closed
    pub viewer_drops: u64,
    /// Packets dropped because the HLS queue was full or closed
    pub hls_drops: u64,
}

/// Point-in-time view of a stream
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub id: StreamId,
    pub source_url: String,
    /// Supported delivery types, sorted
    pub supported_types: Vec<String>,
    pub status: bool,
    pub codec_count: usize,
    pub viewer_count: usize,
    pub verbosity: Verbosity,
    /// Whether an HLS cast task is draining this stream
    pub hls_running: bool,
    pub uptime: std::time::Duration,
    pub stats: StreamStats,
}
