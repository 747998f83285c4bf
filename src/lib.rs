//! Core of a live video restreaming server
//!
//! This crate tracks the streams a restreaming server serves and fans out
//! encoded packets from ingestion to every connected viewer and to a
//! per-stream HLS cast task.
//!
//! - [`registry`]: stream registry, viewer queues and packet fan-out
//! - [`hls`]: HLS cast task and the [`SegmentWriter`](hls::SegmentWriter) seam
//! - [`config`]: configuration consumed at startup
//! - [`Application`]: composition root used by the HTTP and ingestion layers
//!
//! # Example
//!
//! ```no_run
//! use restream_rs::config::{AppConfig, StreamConfig};
//! use restream_rs::Application;
//!
//! # async fn run() {
//! let config = AppConfig::default().stream(
//!     StreamConfig::new("0e1a2b3c-4d5e-4f60-8172-839405a6b7c8", "rtsp://10.0.0.5/live")
//!         .stream_type("mse"),
//! );
//! let app = Application::new(config).await;
//!
//! let (id, _) = app.list().await;
//! let (_client, mut rx) = app.add_client(&id.unwrap()).await.unwrap();
//! while let Some(packet) = rx.recv().await {
//!     // forward packet to the viewer's connection
//!     let _ = packet;
//! }
//! # }
//! ```

pub mod app;
pub mod config;
pub mod cors;
pub mod hls;
pub mod registry;

pub use app::Application;
pub use config::AppConfig;
pub use cors::cors_layer;
pub use registry::{
    ClientId, CodecData, CodecType, Packet, RegistryError, StreamId, StreamRegistry, StreamSpec,
};
