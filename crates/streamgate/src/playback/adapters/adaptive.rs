//! Adaptive engine: fetches and inspects the manifest itself before handing
//! a playable entry point to the sink.

use futures::StreamExt;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::playback::engine::{EngineConfig, EngineEvent, EventEmitter, StreamingEngine};
use crate::playback::error::{ErrorCategory, PlaybackError};
use crate::playback::manifest::{self, MAX_MANIFEST_BYTES, ManifestAnalysis};
use crate::playback::sink::SinkHandle;

/// The attached sink, shared with in-flight loads.
///
/// Loads only touch the sink while holding the lock, and `destroy` clears it
/// under the same lock, so no load can write to the sink once `destroy`
/// returns. `JoinHandle::abort` alone cannot stop a poll already running on
/// another worker.
#[derive(Clone, Default)]
struct SinkSlot(Arc<Mutex<Option<SinkHandle>>>);

impl SinkSlot {
    fn set(&self, sink: Option<SinkHandle>) {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = sink;
    }

    fn is_attached(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Assign `source` if a sink is still attached. Returns the sink id.
    fn assign(&self, source: &str) -> Option<String> {
        let guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.as_ref().map(|sink| {
            sink.assign_source(source);
            sink.id().to_string()
        })
    }
}

pub struct HlsEngine {
    client: Client,
    config: EngineConfig,
    bearer_token: Option<String>,
    emitter: EventEmitter,
    sink: SinkSlot,
    source: Option<String>,
    task: Option<JoinHandle<()>>,
    destroyed: bool,
}

impl HlsEngine {
    pub fn new(
        client: Client,
        config: EngineConfig,
        bearer_token: Option<String>,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            client,
            config,
            bearer_token,
            emitter,
            sink: SinkSlot::default(),
            source: None,
            task: None,
            destroyed: false,
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn spawn_load(&mut self, source: String, recovering: bool) {
        if !self.sink.is_attached() {
            self.emitter.error(PlaybackError::fatal(
                ErrorCategory::Other,
                "load called before a sink was attached",
            ));
            return;
        }
        self.abort_in_flight();

        let client = self.client.clone();
        let bearer_token = self.bearer_token.clone();
        let timeout = self.config.manifest_loading_timeout;
        let emitter = self.emitter.clone();
        let slot = self.sink.clone();

        self.task = Some(tokio::spawn(async move {
            let result = fetch_manifest(&client, &source, bearer_token.as_deref(), timeout).await;
            match result {
                Ok(analysis) => {
                    let entry = analysis.playable_uri(&source);
                    let Some(sink_id) = slot.assign(&entry) else {
                        debug!(token = %emitter.token(), "Engine destroyed before manifest arrived");
                        return;
                    };
                    log_analysis(&emitter, &sink_id, &entry, &analysis);
                    if recovering {
                        emitter.emit(EngineEvent::FragmentBuffered);
                    } else {
                        emitter.emit(EngineEvent::ManifestLoaded {
                            variant_count: analysis.variant_count(),
                        });
                    }
                }
                Err(err) if slot.is_attached() => {
                    warn!(token = %emitter.token(), error = %err, "Manifest load failed");
                    emitter.error(err);
                }
                Err(_) => {}
            }
        }));
    }
}

fn log_analysis(emitter: &EventEmitter, sink_id: &str, entry: &str, analysis: &ManifestAnalysis) {
    let chosen = analysis.variants.first();
    info!(
        token = %emitter.token(),
        sink = sink_id,
        entry = %entry,
        kind = ?analysis.kind,
        variants = ?analysis.variant_count(),
        bandwidth = ?chosen.map(|v| v.bandwidth),
        resolution = ?chosen.and_then(|v| v.resolution),
        target_duration = ?analysis.target_duration,
        segments = analysis.segment_count,
        encrypted = analysis.encrypted,
        fmp4 = analysis.uses_fmp4,
        "Manifest loaded"
    );
}

impl StreamingEngine for HlsEngine {
    fn attach(&mut self, sink: SinkHandle) {
        if !self.destroyed {
            self.sink.set(Some(sink));
        }
    }

    fn load(&mut self, source: &str) {
        if self.destroyed {
            return;
        }
        debug!(
            token = %self.emitter.token(),
            worker = self.config.enable_worker,
            low_latency = self.config.low_latency_mode,
            max_buffer = ?self.config.max_buffer_length,
            "Loading source"
        );
        self.source = Some(source.to_string());
        self.spawn_load(source.to_string(), false);
    }

    fn recover_media_error(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(source) = self.source.clone() {
            info!(token = %self.emitter.token(), "Reloading source to recover from media error");
            self.spawn_load(source, true);
        }
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.sink.set(None);
        self.abort_in_flight();
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.sink.set(None);
        self.abort_in_flight();
    }
}

/// Single bounded GET of the manifest, classified into engine errors
async fn fetch_manifest(
    client: &Client,
    url: &str,
    bearer_token: Option<&str>,
    timeout: std::time::Duration,
) -> Result<ManifestAnalysis, PlaybackError> {
    let mut request = client.get(url).timeout(timeout);
    if let Some(token) = bearer_token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let response = request
        .send()
        .await
        .map_err(|e| PlaybackError::fatal(ErrorCategory::Network, describe_transport(&e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PlaybackError::fatal(
            ErrorCategory::Network,
            format!("Manifest request returned {status}"),
        )
        .with_status(status.as_u16()));
    }

    let mut body = response.bytes_stream();
    let mut collected: Vec<u8> = Vec::with_capacity(8192);
    while let Some(chunk) = body.next().await {
        let chunk = chunk
            .map_err(|e| PlaybackError::fatal(ErrorCategory::Network, describe_transport(&e)))?;
        if collected.len() + chunk.len() > MAX_MANIFEST_BYTES {
            collected.extend_from_slice(&chunk[..(MAX_MANIFEST_BYTES - collected.len())]);
            break;
        }
        collected.extend_from_slice(&chunk);
    }

    let text = String::from_utf8_lossy(&collected);
    manifest::analyze(&text).map_err(|e| {
        PlaybackError::fatal(ErrorCategory::Network, format!("Unusable manifest: {e}"))
    })
}

fn describe_transport(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Manifest request timed out".to_string()
    } else if err.is_connect() {
        format!("Could not connect: {err}")
    } else {
        format!("Manifest request failed: {err}")
    }
}
