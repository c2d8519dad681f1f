use tracing::{debug, warn};

use crate::playback::engine::{EngineEvent, EventEmitter, StreamingEngine};
use crate::playback::error::{ErrorCategory, PlaybackError};
use crate::playback::sink::SinkHandle;

/// Hands the source straight to the sink and lets the platform play it.
///
/// `verified` is false for the direct fallback, where nothing confirmed the
/// sink understands the format.
pub struct NativeSourceEngine {
    emitter: EventEmitter,
    verified: bool,
    sink: Option<SinkHandle>,
    source: Option<String>,
}

impl NativeSourceEngine {
    pub fn new(emitter: EventEmitter, verified: bool) -> Self {
        Self {
            emitter,
            verified,
            sink: None,
            source: None,
        }
    }
}

impl StreamingEngine for NativeSourceEngine {
    fn attach(&mut self, sink: SinkHandle) {
        self.sink = Some(sink);
    }

    fn load(&mut self, source: &str) {
        let Some(sink) = &self.sink else {
            self.emitter.error(PlaybackError::fatal(
                ErrorCategory::Other,
                "load called before a sink was attached",
            ));
            return;
        };
        if !self.verified {
            warn!(
                token = %self.emitter.token(),
                sink = sink.id(),
                "Assigning source without verified format support"
            );
        }
        sink.assign_source(source);
        self.source = Some(source.to_string());
        self.emitter
            .emit(EngineEvent::ManifestLoaded { variant_count: None });
    }

    fn recover_media_error(&mut self) {
        if let (Some(sink), Some(source)) = (&self.sink, &self.source) {
            debug!(token = %self.emitter.token(), "Reassigning source after media error");
            sink.assign_source(source);
            self.emitter.emit(EngineEvent::FragmentBuffered);
        }
    }

    fn destroy(&mut self) {
        self.sink = None;
        self.source = None;
    }
}
