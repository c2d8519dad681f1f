//! Session lifecycle, error classification and bounded recovery

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::engine::{EngineEvent, EngineFactory, EventEmitter, TaggedEvent};
use super::error::{ErrorCategory, PlaybackError, TerminalKind, TerminalReport};
use super::session::{PlaybackState, SessionToken, SessionTokenMint, StreamSession};
use super::sink::SinkHandle;
use super::strategy::{PlatformCapabilities, PlaybackStrategy};

/// Automatic recovery calls allowed per session for fatal media errors
const MAX_MEDIA_RECOVERIES: u32 = 1;

/// Where a session ended up after draining events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Playing,
    Failed(TerminalReport),
    /// Nothing is running (never started, stopped, or already reported)
    Inactive,
}

/// Owns at most one engine and drives it through
/// `Idle -> Initializing -> Playing <-> Recovering -> Terminated`.
///
/// All methods take `&mut self`; engine events queue on an internal channel
/// and are applied one at a time by [`handle_event`](Self::handle_event).
pub struct PlaybackController<F: EngineFactory> {
    factory: F,
    capabilities: PlatformCapabilities,
    mint: SessionTokenMint,
    state: PlaybackState,
    current: Option<SessionToken>,
    session: Option<StreamSession>,
    tx: mpsc::UnboundedSender<TaggedEvent>,
    rx: mpsc::UnboundedReceiver<TaggedEvent>,
}

impl<F: EngineFactory> PlaybackController<F> {
    pub fn new(factory: F, capabilities: PlatformCapabilities) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            factory,
            capabilities,
            mint: SessionTokenMint::default(),
            state: PlaybackState::Idle,
            current: None,
            session: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_token(&self) -> Option<SessionToken> {
        self.current
    }

    pub fn strategy(&self) -> Option<PlaybackStrategy> {
        self.session.as_ref().map(|s| s.strategy)
    }

    /// Begin playing `source_url` on `sink`, replacing any live session.
    ///
    /// The previous engine is destroyed and its token retired before the new
    /// engine exists, so nothing it emits afterwards is acted upon.
    pub fn start(&mut self, sink: SinkHandle, source_url: &str) -> SessionToken {
        self.teardown("replaced");

        let token = self.mint.mint();
        self.current = Some(token);

        let strategy = PlaybackStrategy::select(sink.supports_native_hls(), self.capabilities);
        let emitter = EventEmitter::new(token, self.tx.clone());
        let mut engine = self.factory.create(strategy, emitter);

        info!(
            token = %token,
            sink = sink.id(),
            strategy = strategy.as_str(),
            "Starting playback session"
        );

        self.state = PlaybackState::Initializing;
        engine.attach(sink.clone());
        engine.load(source_url);

        self.session = Some(StreamSession {
            token,
            sink,
            engine,
            strategy,
            media_recoveries: 0,
        });
        token
    }

    /// Destroy the engine and release the sink. Idempotent.
    pub fn stop(&mut self) {
        if self.teardown("stopped") || self.state != PlaybackState::Idle {
            self.state = PlaybackState::Terminated;
        }
    }

    /// Apply one engine event. Returns the session's terminal report the one
    /// time it is produced.
    pub fn handle_event(&mut self, tagged: TaggedEvent) -> Option<TerminalReport> {
        if self.current != Some(tagged.token) {
            debug!(token = %tagged.token, current = ?self.current, "Ignoring stale engine event");
            return None;
        }
        if matches!(
            self.state,
            PlaybackState::Terminated | PlaybackState::Idle
        ) {
            debug!(token = %tagged.token, "Session already terminated, ignoring event");
            return None;
        }

        match tagged.event {
            EngineEvent::ManifestLoaded { variant_count } => {
                debug!(token = %tagged.token, ?variant_count, "Manifest loaded");
                if matches!(
                    self.state,
                    PlaybackState::Initializing | PlaybackState::Recovering
                ) {
                    self.state = PlaybackState::Playing;
                }
                None
            }
            EngineEvent::FragmentBuffered => {
                if self.state == PlaybackState::Recovering {
                    info!(token = %tagged.token, "Recovered from media error");
                    self.state = PlaybackState::Playing;
                }
                None
            }
            EngineEvent::Error(err) if !err.fatal => {
                debug!(token = %tagged.token, error = %err, "Non-fatal engine error");
                None
            }
            EngineEvent::Error(err) => self.apply_policy(tagged.token, err),
        }
    }

    /// Process queued events until the current session produces its terminal
    /// report. Resolves to `None` once no session is live.
    pub async fn next_report(&mut self) -> Option<TerminalReport> {
        loop {
            if !self.is_live() {
                return None;
            }
            let tagged = self.rx.recv().await?;
            if let Some(report) = self.handle_event(tagged) {
                return Some(report);
            }
        }
    }

    /// Process queued events until the session is playing or has ended.
    pub async fn settle(&mut self) -> Settled {
        loop {
            match self.state {
                PlaybackState::Playing => return Settled::Playing,
                PlaybackState::Idle | PlaybackState::Terminated => return Settled::Inactive,
                PlaybackState::Initializing | PlaybackState::Recovering => {}
            }
            let Some(tagged) = self.rx.recv().await else {
                return Settled::Inactive;
            };
            if let Some(report) = self.handle_event(tagged) {
                return Settled::Failed(report);
            }
        }
    }

    fn is_live(&self) -> bool {
        !matches!(
            self.state,
            PlaybackState::Idle | PlaybackState::Terminated
        )
    }

    fn apply_policy(&mut self, token: SessionToken, err: PlaybackError) -> Option<TerminalReport> {
        match err.category {
            ErrorCategory::Network if err.is_not_found() => {
                self.terminate(token, TerminalKind::NotFound, &err)
            }
            ErrorCategory::Network => self.terminate(token, TerminalKind::Network, &err),
            ErrorCategory::Media => {
                let session = self.session.as_mut()?;
                if session.media_recoveries < MAX_MEDIA_RECOVERIES {
                    session.media_recoveries += 1;
                    warn!(token = %token, error = %err, "Fatal media error, attempting recovery");
                    session.engine.recover_media_error();
                    self.state = PlaybackState::Recovering;
                    None
                } else {
                    self.terminate(token, TerminalKind::Playback, &err)
                }
            }
            ErrorCategory::Other => self.terminate(token, TerminalKind::Generic, &err),
        }
    }

    fn terminate(
        &mut self,
        token: SessionToken,
        kind: TerminalKind,
        err: &PlaybackError,
    ) -> Option<TerminalReport> {
        error!(token = %token, error = %err, "Playback session failed: {}", kind.message());
        self.teardown("terminal error");
        self.state = PlaybackState::Terminated;
        Some(TerminalReport {
            token,
            kind,
            upstream_status: err.upstream_status,
        })
    }

    /// The only place engines are destroyed. Returns whether a session existed.
    fn teardown(&mut self, reason: &str) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };
        debug!(token = %session.token, sink = session.sink.id(), reason, "Destroying engine");
        session.engine.destroy();
        session.sink.release();
        true
    }
}

impl<F: EngineFactory> Drop for PlaybackController<F> {
    fn drop(&mut self) {
        self.teardown("controller dropped");
    }
}
