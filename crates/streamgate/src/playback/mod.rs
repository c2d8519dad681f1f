//! Client-side playback session control.
//!
//! A [`PlaybackController`] owns at most one [`StreamingEngine`] bound to a
//! [`MediaSink`], classifies the errors that engine reports and applies a
//! bounded recovery policy, surfacing at most one [`TerminalReport`] per
//! session.

pub mod adapters;
pub mod controller;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod session;
pub mod sink;
pub mod strategy;

pub use adapters::{DefaultEngineFactory, HlsEngine, NativeSourceEngine};
pub use controller::{PlaybackController, Settled};
pub use engine::{
    EngineConfig, EngineEvent, EngineFactory, EventEmitter, StreamingEngine, TaggedEvent,
};
pub use error::{ErrorCategory, PlaybackError, TerminalKind, TerminalReport};
pub use session::{PlaybackState, SessionToken};
pub use sink::{HeadlessSink, MediaSink, SinkHandle};
pub use strategy::{PlatformCapabilities, PlaybackStrategy};
