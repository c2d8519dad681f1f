/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Upstream media service defaults
pub const DEFAULT_MEDIA_SERVICE_BASE: &str = "http://127.0.0.1:8081";
pub const DEFAULT_UPSTREAM_REQUEST_TIMEOUT_SECONDS: u64 = 8;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECONDS: u64 = 3;

// Auth defaults
pub const DEFAULT_SESSION_COOKIE: &str = "access_token";

// Playback engine tuning defaults
pub const DEFAULT_ENABLE_WORKER: bool = true;
pub const DEFAULT_LOW_LATENCY_MODE: bool = true;
pub const DEFAULT_BACK_BUFFER_SECONDS: u64 = 90;
pub const DEFAULT_MAX_BUFFER_SECONDS: u64 = 30;
pub const DEFAULT_MAX_MAX_BUFFER_SECONDS: u64 = 600;
pub const DEFAULT_MAX_BUFFER_SIZE: u64 = 60 * 1000 * 1000; // 60MB
pub const DEFAULT_MAX_BUFFER_HOLE_MILLIS: u64 = 500;
pub const DEFAULT_MANIFEST_LOADING_TIMEOUT_SECONDS: u64 = 10;

// Environment overrides
pub const ENV_PREFIX: &str = "STREAMGATE_";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
