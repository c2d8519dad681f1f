//! Session identity and the state a live session owns

use std::fmt;

use super::engine::StreamingEngine;
use super::sink::SinkHandle;
use super::strategy::PlaybackStrategy;

/// Identifies one `start` of the controller.
///
/// Tokens only ever increase, so an event carrying anything other than the
/// current token belongs to an engine that has already been torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionToken(u64);

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Mints strictly increasing session tokens
#[derive(Debug, Default)]
pub struct SessionTokenMint {
    last: u64,
}

impl SessionTokenMint {
    pub fn mint(&mut self) -> SessionToken {
        self.last += 1;
        SessionToken(self.last)
    }
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Initializing,
    Playing,
    Recovering,
    Terminated,
}

/// The engine currently bound to a sink
pub(crate) struct StreamSession {
    pub token: SessionToken,
    pub sink: SinkHandle,
    pub engine: Box<dyn StreamingEngine>,
    pub strategy: PlaybackStrategy,
    pub media_recoveries: u32,
}
