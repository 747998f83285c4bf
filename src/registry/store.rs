//! Stream registry implementation
//!
//! The central registry that tracks every configured stream and its viewers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use super::config::RegistryConfig;
use super::entry::{StreamEntry, StreamInfo, StreamSpec, Viewer};
use super::error::RegistryError;
use super::frame::{ClientId, CodecData, Packet, StreamId};

/// Central registry for all streams
///
/// The map lock is only held long enough to find or insert an entry; each
/// entry has its own lock, so work on one stream never waits on another.
pub struct StreamRegistry {
    /// Map of stream id to stream entry
    streams: RwLock<HashMap<StreamId, Arc<RwLock<StreamEntry>>>>,

    /// Configuration
    config: RegistryConfig,
}

impl StreamRegistry {
    /// Create a new stream registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new stream registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    async fn lookup(&self, id: &StreamId) -> Result<Arc<RwLock<StreamEntry>>, RegistryError> {
        self.streams
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(RegistryError::StreamNotFound(*id))
    }

    /// Lock an entry for reading. Entries detached by `remove_stream` count as missing.
    pub(super) async fn read_entry(
        &self,
        id: &StreamId,
    ) -> Result<OwnedRwLockReadGuard<StreamEntry>, RegistryError> {
        let entry = self.lookup(id).await?.read_owned().await;
        if entry.closed {
            return Err(RegistryError::StreamNotFound(*id));
        }
        Ok(entry)
    }

    /// Lock an entry for writing. Entries detached by `remove_stream` count as missing.
    pub(super) async fn write_entry(
        &self,
        id: &StreamId,
    ) -> Result<OwnedRwLockWriteGuard<StreamEntry>, RegistryError> {
        let entry = self.lookup(id).await?.write_owned().await;
        if entry.closed {
            return Err(RegistryError::StreamNotFound(*id));
        }
        Ok(entry)
    }

    /// Register a stream
    ///
    /// Returns an error if the id is already taken.
    pub async fn register_stream(
        &self,
        id: StreamId,
        spec: StreamSpec,
    ) -> Result<(), RegistryError> {
        let mut streams = self.streams.write().await;

        if streams.contains_key(&id) {
            return Err(RegistryError::StreamAlreadyExists(id));
        }

        let entry = StreamEntry::new(id, spec, self.config.hls_queue_capacity);

        tracing::info!(
            stream = %id,
            url = %entry.source_url,
            types = ?entry.supported_types,
            "Stream registered"
        );

        streams.insert(id, Arc::new(RwLock::new(entry)));
        Ok(())
    }

    /// Remove a stream
    ///
    /// Stops its HLS cast task, releases every viewer, then deletes the entry.
    /// Viewer receivers observe a closed channel afterwards.
    pub async fn remove_stream(&self, id: &StreamId) -> Result<(), RegistryError> {
        let mut streams = self.streams.write().await;

        let entry_arc = streams
            .get(id)
            .cloned()
            .ok_or(RegistryError::StreamNotFound(*id))?;

        let mut entry = entry_arc.write().await;
        let viewers = entry.viewer_count();
        entry.close();
        streams.remove(id);

        tracing::info!(stream = %id, viewers = viewers, "Stream removed");
        Ok(())
    }

    /// Check if a stream is registered
    pub async fn exists(&self, id: &StreamId) -> bool {
        self.read_entry(id).await.is_ok()
    }

    /// Check if a stream is registered and may be served as `stream_type`
    pub async fn exists_with_type(&self, id: &StreamId, stream_type: &str) -> bool {
        match self.read_entry(id).await {
            Ok(entry) => entry.supports(stream_type),
            Err(_) => false,
        }
    }

    /// Get the codecs negotiated for a stream
    pub async fn get_codecs(&self, id: &StreamId) -> Result<Vec<CodecData>, RegistryError> {
        Ok(self.read_entry(id).await?.codecs.clone())
    }

    /// Replace the codecs of a stream
    pub async fn set_codecs(
        &self,
        id: &StreamId,
        codecs: Vec<CodecData>,
    ) -> Result<(), RegistryError> {
        let mut entry = self.write_entry(id).await?;

        if entry.verbosity.verbose {
            tracing::debug!(stream = %id, codecs = codecs.len(), "Codecs updated");
        }

        entry.codecs = codecs;
        Ok(())
    }

    /// Update the liveness status of a stream
    pub async fn update_status(&self, id: &StreamId, status: bool) -> Result<(), RegistryError> {
        let mut entry = self.write_entry(id).await?;

        if entry.status != status {
            tracing::info!(stream = %id, online = status, "Stream status changed");
        }

        entry.status = status;
        Ok(())
    }

    /// Add a viewer to a stream
    ///
    /// Returns the new client id and the receiving end of its delivery queue.
    pub async fn add_client(
        &self,
        id: &StreamId,
    ) -> Result<(ClientId, mpsc::Receiver<Packet>), RegistryError> {
        self.add_client_with(id, ClientId::generate).await
    }

    async fn add_client_with(
        &self,
        id: &StreamId,
        generate: impl FnMut() -> ClientId,
    ) -> Result<(ClientId, mpsc::Receiver<Packet>), RegistryError> {
        let mut entry = self.write_entry(id).await?;

        let client_id = self.generate_client_id(&entry, generate)?;
        let (tx, rx) = mpsc::channel(self.config.viewer_queue_capacity.max(1));
        entry.viewers.insert(client_id, Viewer::new(tx));

        tracing::info!(
            stream = %id,
            client = %client_id,
            viewers = entry.viewer_count(),
            "Viewer added"
        );

        Ok((client_id, rx))
    }

    fn generate_client_id(
        &self,
        entry: &StreamEntry,
        mut generate: impl FnMut() -> ClientId,
    ) -> Result<ClientId, RegistryError> {
        for _ in 0..self.config.client_id_attempts.max(1) {
            let candidate = generate();
            if !candidate.is_nil() && !entry.viewers.contains_key(&candidate) {
                return Ok(candidate);
            }
        }

        tracing::warn!(stream = %entry.id, "Could not generate a unique client id");
        Err(RegistryError::IdentityGeneration)
    }

    /// Remove a viewer from a stream
    ///
    /// Unknown streams and clients are ignored.
    pub async fn remove_client(&self, id: &StreamId, client_id: &ClientId) {
        let Ok(mut entry) = self.write_entry(id).await else {
            return;
        };

        if entry.viewers.remove(client_id).is_some() {
            tracing::info!(
                stream = %id,
                client = %client_id,
                viewers = entry.viewer_count(),
                "Viewer removed"
            );
        }
    }

    /// List registered streams
    ///
    /// Returns the smallest id as a representative for single-stream callers,
    /// followed by every id in ascending order.
    pub async fn list(&self) -> (Option<StreamId>, Vec<StreamId>) {
        let ids = self.stream_ids().await;
        (ids.first().copied(), ids)
    }

    /// Get all registered stream ids in ascending order
    pub async fn stream_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.streams.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Get a snapshot of a stream
    pub async fn stream_info(&self, id: &StreamId) -> Result<StreamInfo, RegistryError> {
        Ok(self.read_entry(id).await?.info())
    }

    /// Get total number of streams
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use bytes::Bytes;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::registry::frame::CodecType;

    fn spec() -> StreamSpec {
        StreamSpec::new("rtsp://camera.local/stream")
            .with_type("mse")
            .with_type("hls")
    }

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = StreamRegistry::new();
        let id = StreamId::new_v4();

        assert!(!registry.exists(&id).await);
        assert_ok!(registry.register_stream(id, spec()).await);
        assert!(registry.exists(&id).await);

        // Can't register the same id twice
        let result = registry.register_stream(id, spec()).await;
        assert_eq!(result, Err(RegistryError::StreamAlreadyExists(id)));

        assert_ok!(registry.remove_stream(&id).await);
        assert!(!registry.exists(&id).await);
        assert_eq!(registry.stream_count().await, 0);

        let result = registry.remove_stream(&id).await;
        assert_eq!(result, Err(RegistryError::StreamNotFound(id)));
    }

    #[tokio::test]
    async fn test_unknown_stream() {
        let registry = StreamRegistry::new();
        let id = StreamId::new_v4();

        assert!(!registry.exists(&id).await);
        assert!(!registry.exists_with_type(&id, "mse").await);
        assert_eq!(
            registry.get_codecs(&id).await,
            Err(RegistryError::StreamNotFound(id))
        );
        assert_eq!(
            registry.set_codecs(&id, Vec::new()).await,
            Err(RegistryError::StreamNotFound(id))
        );
        assert_eq!(
            registry.update_status(&id, true).await,
            Err(RegistryError::StreamNotFound(id))
        );
        assert!(matches!(
            registry.add_client(&id).await,
            Err(RegistryError::StreamNotFound(_))
        ));
        assert_err!(registry.stream_info(&id).await);

        // Silent no-op
        registry.remove_client(&id, &ClientId::generate()).await;
    }

    #[tokio::test]
    async fn test_exists_with_type() {
        let registry = StreamRegistry::new();
        let id = StreamId::new_v4();
        registry
            .register_stream(id, StreamSpec::new("rtsp://a").with_type("mse"))
            .await
            .unwrap();

        assert!(registry.exists_with_type(&id, "mse").await);
        assert!(!registry.exists_with_type(&id, "hls").await);
        assert!(!registry.exists_with_type(&id, "MSE").await);
    }

    #[tokio::test]
    async fn test_codecs_round_trip() {
        let registry = StreamRegistry::new();
        let id = StreamId::new_v4();
        registry.register_stream(id, spec()).await.unwrap();

        assert!(registry.get_codecs(&id).await.unwrap().is_empty());

        let codecs = vec![
            CodecData::new(CodecType::H264, Bytes::from_static(&[0x01, 0x64, 0x00, 0x1f])),
            CodecData::new(CodecType::Aac, Bytes::from_static(&[0x12, 0x10])),
        ];
        registry.set_codecs(&id, codecs.clone()).await.unwrap();
        assert_eq!(registry.get_codecs(&id).await.unwrap(), codecs);

        // Replaced wholesale
        let replacement = vec![CodecData::new(CodecType::H265, Bytes::new())];
        registry.set_codecs(&id, replacement.clone()).await.unwrap();
        assert_eq!(registry.get_codecs(&id).await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_update_status() {
        let registry = StreamRegistry::new();
        let id = StreamId::new_v4();
        registry.register_stream(id, spec()).await.unwrap();

        assert!(!registry.stream_info(&id).await.unwrap().status);
        registry.update_status(&id, true).await.unwrap();
        assert!(registry.stream_info(&id).await.unwrap().status);
        registry.update_status(&id, false).await.unwrap();
        assert!(!registry.stream_info(&id).await.unwrap().status);
    }

    #[tokio::test]
    async fn test_add_remove_client() {
        let registry = StreamRegistry::new();
        let id = StreamId::new_v4();
        registry.register_stream(id, spec()).await.unwrap();

        let (c1, _rx1) = registry.add_client(&id).await.unwrap();
        let (c2, _rx2) = registry.add_client(&id).await.unwrap();
        assert_ne!(c1, c2);
        assert_eq!(registry.stream_info(&id).await.unwrap().viewer_count, 2);

        registry.remove_client(&id, &c1).await;
        assert_eq!(registry.stream_info(&id).await.unwrap().viewer_count, 1);

        // Removing twice is fine
        registry.remove_client(&id, &c1).await;
        assert_eq!(registry.stream_info(&id).await.unwrap().viewer_count, 1);
    }

    #[tokio::test]
    async fn test_client_id_collisions_exhaust_attempts() {
        let config = RegistryConfig::default().client_id_attempts(4);
        let registry = StreamRegistry::with_config(config);
        let id = StreamId::new_v4();
        registry.register_stream(id, spec()).await.unwrap();

        let (taken, _rx) = registry.add_client(&id).await.unwrap();

        let mut calls = 0;
        let result = registry
            .add_client_with(&id, || {
                calls += 1;
                taken
            })
            .await;

        assert_eq!(result.err(), Some(RegistryError::IdentityGeneration));
        assert_eq!(calls, 4);
        assert_eq!(registry.stream_info(&id).await.unwrap().viewer_count, 1);

        // The registry keeps working afterwards
        assert_ok!(registry.add_client(&id).await);
        assert_eq!(registry.stream_info(&id).await.unwrap().viewer_count, 2);
    }

    #[tokio::test]
    async fn test_remove_stream_closes_viewers() {
        let registry = StreamRegistry::new();
        let id = StreamId::new_v4();
        registry.register_stream(id, spec()).await.unwrap();

        let (client, mut rx) = registry.add_client(&id).await.unwrap();
        registry.remove_stream(&id).await.unwrap();

        assert!(rx.recv().await.is_none());
        registry.remove_client(&id, &client).await;
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let registry = StreamRegistry::new();

        let (first, all) = registry.list().await;
        assert!(first.is_none());
        assert!(all.is_empty());

        let mut ids: Vec<StreamId> = (0..5).map(|_| StreamId::new_v4()).collect();
        for id in &ids {
            registry.register_stream(*id, spec()).await.unwrap();
        }
        ids.sort();

        let (first, all) = registry.list().await;
        assert_eq!(first, Some(ids[0]));
        assert_eq!(all, ids);

        // Stable across calls
        assert_eq!(registry.list().await.0, Some(ids[0]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_client() {
        let registry = Arc::new(StreamRegistry::new());
        let id = StreamId::new_v4();
        registry.register_stream(id, spec()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..64 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.add_client(&id).await.unwrap()
            }));
        }

        let mut clients = HashSet::new();
        let mut receivers = Vec::new();
        for handle in handles {
            let (client, rx) = handle.await.unwrap();
            clients.insert(client);
            receivers.push(rx);
        }

        assert_eq!(clients.len(), 64);
        assert_eq!(registry.stream_info(&id).await.unwrap().viewer_count, 64);
    }

    #[tokio::test]
    async fn test_stream_info() {
        let registry = StreamRegistry::new();
        let id = StreamId::new_v4();
        registry.register_stream(id, spec()).await.unwrap();

        let info = registry.stream_info(&id).await.unwrap();
        assert_eq!(info.id, id);
        assert_eq!(info.source_url, "rtsp://camera.local/stream");
        assert_eq!(info.supported_types, vec!["hls".to_string(), "mse".to_string()]);
        assert_eq!(info.codec_count, 0);
        assert!(!info.hls_running);
    }
}
