//! Application facade
//!
//! Wires configuration and the stream registry together and exposes the
//! registry operations to the HTTP and ingestion layers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::config::{AppConfig, HlsConfig, ServerConfig};
use crate::cors::cors_layer;
use crate::hls::SegmentWriter;
use crate::registry::{
    ClientId, CodecData, Packet, RegistryError, StreamId, StreamInfo, StreamRegistry, StreamSpec,
    Verbosity,
};

/// Composition root of the restreaming core
pub struct Application {
    server: ServerConfig,
    hls: HlsConfig,
    cors: Option<CorsLayer>,
    streams: Arc<StreamRegistry>,
}

impl Application {
    /// Build the application from configuration
    ///
    /// Streams with an id that is not a UUID, or that repeat an earlier id,
    /// are skipped with a warning.
    pub async fn new(config: AppConfig) -> Self {
        let streams = Arc::new(StreamRegistry::with_config(config.registry));

        for stream in config.streams {
            let id = match StreamId::parse(stream.id.trim()) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(id = %stream.id, error = %e, "Skipping stream with invalid id");
                    continue;
                }
            };

            let spec = StreamSpec {
                source_url: stream.url,
                supported_types: stream.stream_types,
                verbosity: Verbosity::parse(&stream.verbose),
            };

            if let Err(e) = streams.register_stream(id, spec).await {
                tracing::warn!(stream = %id, error = %e, "Skipping duplicate stream");
            }
        }

        let cors = cors_layer(&config.cors);

        tracing::info!(
            streams = streams.stream_count().await,
            cors = cors.is_some(),
            "Application configured"
        );

        Self {
            server: config.server,
            hls: config.hls,
            cors,
            streams,
        }
    }

    /// Network settings
    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// HLS parameters for segment writers
    pub fn hls(&self) -> &HlsConfig {
        &self.hls
    }

    /// CORS layer for the HTTP router, if enabled
    pub fn cors(&self) -> Option<&CorsLayer> {
        self.cors.as_ref()
    }

    /// Shared handle to the stream registry
    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.streams
    }

    /// Broadcast a packet to a stream's viewers and optionally its HLS queue
    pub async fn cast(
        &self,
        id: &StreamId,
        packet: Packet,
        hls_enabled: bool,
    ) -> Result<(), RegistryError> {
        self.streams.cast(id, packet, hls_enabled).await
    }

    pub async fn exists(&self, id: &StreamId) -> bool {
        self.streams.exists(id).await
    }

    pub async fn exists_with_type(&self, id: &StreamId, stream_type: &str) -> bool {
        self.streams.exists_with_type(id, stream_type).await
    }

    pub async fn get_codecs(&self, id: &StreamId) -> Result<Vec<CodecData>, RegistryError> {
        self.streams.get_codecs(id).await
    }

    pub async fn set_codecs(
        &self,
        id: &StreamId,
        codecs: Vec<CodecData>,
    ) -> Result<(), RegistryError> {
        self.streams.set_codecs(id, codecs).await
    }

    pub async fn update_status(&self, id: &StreamId, status: bool) -> Result<(), RegistryError> {
        self.streams.update_status(id, status).await
    }

    pub async fn add_client(
        &self,
        id: &StreamId,
    ) -> Result<(ClientId, mpsc::Receiver<Packet>), RegistryError> {
        self.streams.add_client(id).await
    }

    pub async fn remove_client(&self, id: &StreamId, client_id: &ClientId) {
        self.streams.remove_client(id, client_id).await
    }

    /// Representative stream id plus every id, ascending
    pub async fn list(&self) -> (Option<StreamId>, Vec<StreamId>) {
        self.streams.list().await
    }

    pub async fn stream_info(&self, id: &StreamId) -> Result<StreamInfo, RegistryError> {
        self.streams.stream_info(id).await
    }

    /// Register a stream after startup
    pub async fn add_stream(&self, id: StreamId, spec: StreamSpec) -> Result<(), RegistryError> {
        self.streams.register_stream(id, spec).await
    }

    pub async fn remove_stream(&self, id: &StreamId) -> Result<(), RegistryError> {
        self.streams.remove_stream(id).await
    }

    /// Start the HLS cast task of a stream
    pub async fn start_hls_cast<W: SegmentWriter>(
        &self,
        id: &StreamId,
        writer: W,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>, RegistryError> {
        self.streams.start_hls_cast(id, writer, cancel).await
    }

    pub async fn stop_hls_cast(&self, id: &StreamId) -> Result<bool, RegistryError> {
        self.streams.stop_hls_cast(id).await
    }
}
