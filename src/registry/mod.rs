//! Stream registry and packet fan-out
//!
//! The registry tracks every stream the server restreams and routes packets
//! from ingestion to connected viewers and to the HLS cast task.
//!
//! # Architecture
//!
//! ```text
//!                            Arc<StreamRegistry>
//!                   ┌──────────────────────────────────┐
//!                   │ streams: HashMap<StreamId,       │
//!                   │   Arc<RwLock<StreamEntry {       │
//!                   │     codecs, status,              │
//!                   │     viewers: {ClientId → tx},    │
//!                   │     hls: tx,                     │
//!                   │   }>>                            │
//!                   │ >                                │
//!                   └────────────────┬─────────────────┘
//!                                    │
//!         ┌──────────────────────────┼──────────────────────────┐
//!         │                          │                          │
//!         ▼                          ▼                          ▼
//!    [Ingestion]                [Viewer]                  [HLS cast]
//!    cast(id, pkt)              rx.recv()                 rx.recv()
//!         │                          ▲                          ▲
//!         └───── try_send ───────────┴──────────────────────────┘
//! ```
//!
//! # Locking
//!
//! The outer map lock is held only to find, insert or remove an entry. Each
//! entry has its own lock; `cast` holds it for the whole fan-out, so packets
//! reach each viewer in the order they were cast. Sends never wait: a full
//! queue drops the packet for that consumer only.
//!
//! # Zero-Copy Design
//!
//! `bytes::Bytes` is reference counted, so every queue shares the payload of
//! a cast packet.

mod broadcast;
pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
mod hls;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{StreamEntry, StreamInfo, StreamSpec, StreamStats, Verbosity, HLS_STREAM_TYPE};
pub use error::RegistryError;
pub use frame::{ClientId, CodecData, CodecType, Packet, StreamId};
pub use store::StreamRegistry;
