//! Application configuration
//!
//! These types are plain data: the server binary loads them (e.g. from JSON)
//! and hands them to [`Application::new`](crate::Application::new).

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::registry::RegistryConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub hls: HlsConfig,
    pub cors: CorsConfig,
    pub registry: RegistryConfig,
    pub streams: Vec<StreamConfig>,
}

impl AppConfig {
    /// Add a stream entry
    pub fn stream(mut self, stream: StreamConfig) -> Self {
        self.streams.push(stream);
        self
    }
}

/// HTTP server network settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub http_addr: String,

    /// Port serving video (MSE websocket, HLS files)
    pub video_http_port: u16,

    /// Port serving the REST API
    pub api_http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "localhost".to_string(),
            video_http_port: 8091,
            api_http_port: 8091,
        }
    }
}

impl ServerConfig {
    /// Set the bind host
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Set the video port
    pub fn video_http_port(mut self, port: u16) -> Self {
        self.video_http_port = port;
        self
    }

    /// Set the API port
    pub fn api_http_port(mut self, port: u16) -> Self {
        self.api_http_port = port;
        self
    }

    /// `host:port` the video server binds to
    pub fn video_bind(&self) -> String {
        format!("{}:{}", self.http_addr, self.video_http_port)
    }

    /// `host:port` the API server binds to
    pub fn api_bind(&self) -> String {
        format!("{}:{}", self.http_addr, self.api_http_port)
    }
}

/// HLS segmenting parameters, passed through to the segment writer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HlsConfig {
    /// Target segment duration in milliseconds
    #[serde(rename = "hls_ms_per_segment")]
    pub ms_per_segment: u64,

    /// Directory segments and playlists are written to
    #[serde(rename = "hls_directory")]
    pub directory: PathBuf,

    /// Segments listed in the playlist
    #[serde(rename = "hls_window_size")]
    pub window_size: u32,

    /// Segments kept on disk
    #[serde(rename = "hls_window_capacity")]
    pub window_capacity: u32,
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            ms_per_segment: 10_000,
            directory: PathBuf::from("./hls"),
            window_size: 5,
            window_capacity: 10,
        }
    }
}

impl HlsConfig {
    /// Target segment duration
    pub fn segment_duration(&self) -> Duration {
        Duration::from_millis(self.ms_per_segment)
    }

    /// Set the target segment duration
    pub fn segment_duration_ms(mut self, ms: u64) -> Self {
        self.ms_per_segment = ms;
        self
    }

    /// Set the output directory
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = dir.into();
        self
    }

    /// Set playlist window size and on-disk capacity
    ///
    /// Capacity is raised to the window size if smaller.
    pub fn window(mut self, size: u32, capacity: u32) -> Self {
        self.window_size = size;
        self.window_capacity = capacity.max(size);
        self
    }
}

/// Cross-origin settings for the HTTP layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    #[serde(rename = "use_cors")]
    pub enabled: bool,
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
}

/// One configured stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Stream identity; must be a UUID
    #[serde(alias = "guid")]
    pub id: String,

    /// Source URL
    pub url: String,

    /// Delivery types ("mse", "hls")
    pub stream_types: Vec<String>,

    /// Verbosity: "v", "vvv" or empty
    pub verbose: String,
}

impl StreamConfig {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a delivery type
    pub fn stream_type(mut self, stream_type: impl Into<String>) -> Self {
        self.stream_types.push(stream_type.into());
        self
    }

    /// Set the verbosity string
    pub fn verbose(mut self, verbose: impl Into<String>) -> Self {
        self.verbose = verbose.into();
        self
    }
}
