//! Capability surface between the controller and a playback engine

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;

use crate::config::defaults::*;
use crate::config::duration_serde::duration;

use super::error::PlaybackError;
use super::session::SessionToken;
use super::sink::SinkHandle;
use super::strategy::PlaybackStrategy;

/// Fixed tuning handed to the adaptive engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Offload demuxing to a worker thread
    #[serde(default = "default_enable_worker")]
    pub enable_worker: bool,
    #[serde(default = "default_low_latency_mode")]
    pub low_latency_mode: bool,
    /// Already-played media kept behind the playhead
    #[serde(default = "default_back_buffer_length", with = "duration")]
    pub back_buffer_length: Duration,
    /// Target forward buffer
    #[serde(default = "default_max_buffer_length", with = "duration")]
    pub max_buffer_length: Duration,
    /// Ceiling the forward buffer may grow to
    #[serde(default = "default_max_max_buffer_length", with = "duration")]
    pub max_max_buffer_length: Duration,
    /// Forward buffer size limit in bytes
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: u64,
    /// Largest gap in buffered media that is jumped over
    #[serde(default = "default_max_buffer_hole", with = "duration")]
    pub max_buffer_hole: Duration,
    #[serde(default = "default_manifest_loading_timeout", with = "duration")]
    pub manifest_loading_timeout: Duration,
}

fn default_enable_worker() -> bool {
    DEFAULT_ENABLE_WORKER
}

fn default_low_latency_mode() -> bool {
    DEFAULT_LOW_LATENCY_MODE
}

fn default_back_buffer_length() -> Duration {
    Duration::from_secs(DEFAULT_BACK_BUFFER_SECONDS)
}

fn default_max_buffer_length() -> Duration {
    Duration::from_secs(DEFAULT_MAX_BUFFER_SECONDS)
}

fn default_max_max_buffer_length() -> Duration {
    Duration::from_secs(DEFAULT_MAX_MAX_BUFFER_SECONDS)
}

fn default_max_buffer_size() -> u64 {
    DEFAULT_MAX_BUFFER_SIZE
}

fn default_max_buffer_hole() -> Duration {
    Duration::from_millis(DEFAULT_MAX_BUFFER_HOLE_MILLIS)
}

fn default_manifest_loading_timeout() -> Duration {
    Duration::from_secs(DEFAULT_MANIFEST_LOADING_TIMEOUT_SECONDS)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_worker: default_enable_worker(),
            low_latency_mode: default_low_latency_mode(),
            back_buffer_length: default_back_buffer_length(),
            max_buffer_length: default_max_buffer_length(),
            max_max_buffer_length: default_max_max_buffer_length(),
            max_buffer_size: default_max_buffer_size(),
            max_buffer_hole: default_max_buffer_hole(),
            manifest_loading_timeout: default_manifest_loading_timeout(),
        }
    }
}

/// Something an engine observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Manifest loaded and handed to the sink. `None` when the platform
    /// parses the manifest itself.
    ManifestLoaded { variant_count: Option<usize> },
    /// Media is flowing again
    FragmentBuffered,
    Error(PlaybackError),
}

/// An event stamped with the session that created the emitting engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEvent {
    pub token: SessionToken,
    pub event: EngineEvent,
}

/// The engine's only way to talk back to the controller.
///
/// Handed to the engine at creation; every event it sends carries the token
/// of that session, however late it arrives.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    token: SessionToken,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventEmitter {
    pub fn new(token: SessionToken, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn emit(&self, event: EngineEvent) {
        if self
            .tx
            .send(TaggedEvent {
                token: self.token,
                event,
            })
            .is_err()
        {
            trace!(token = %self.token, "Controller gone, dropping engine event");
        }
    }

    pub fn error(&self, error: PlaybackError) {
        self.emit(EngineEvent::Error(error));
    }
}

/// A playback engine instance bound to at most one sink
pub trait StreamingEngine: Send {
    fn attach(&mut self, sink: SinkHandle);

    fn load(&mut self, source: &str);

    /// Try to get past a fatal media error without tearing down
    fn recover_media_error(&mut self);

    /// Stop all work. Events already in flight may still arrive.
    fn destroy(&mut self);
}

/// Creates the engine for a chosen strategy
pub trait EngineFactory {
    fn create(&self, strategy: PlaybackStrategy, emitter: EventEmitter)
    -> Box<dyn StreamingEngine>;
}
