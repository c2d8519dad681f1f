//! The playback surface an engine renders into

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::info;

pub type SinkHandle = Arc<dyn MediaSink>;

/// A media element-like surface.
///
/// The controller owns the sink for the lifetime of a session; engines only
/// assign sources to it.
pub trait MediaSink: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    /// Whether the sink can play HLS manifests without an adaptive engine
    fn supports_native_hls(&self) -> bool;

    fn assign_source(&self, source: &str);

    /// Drop whatever source is assigned
    fn release(&self);
}

/// A sink with no output, used for probing streams from the command line
#[derive(Debug)]
pub struct HeadlessSink {
    id: String,
    native_hls: bool,
    source: Mutex<Option<String>>,
}

impl HeadlessSink {
    pub fn new<S: Into<String>>(id: S, native_hls: bool) -> Self {
        Self {
            id: id.into(),
            native_hls,
            source: Mutex::new(None),
        }
    }

    pub fn current_source(&self) -> Option<String> {
        self.source
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl MediaSink for HeadlessSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports_native_hls(&self) -> bool {
        self.native_hls
    }

    fn assign_source(&self, source: &str) {
        info!(sink = %self.id, source = %source, "Source assigned");
        *self
            .source
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(source.to_string());
    }

    fn release(&self) {
        info!(sink = %self.id, "Sink released");
        *self
            .source
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}
