//! Engine error events and the terminal outcomes they can escalate to

use std::fmt;

/// Broad failure class reported by an engine adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Manifest or segment loading failed
    Network,
    /// Decoding or buffer append failed
    Media,
    Other,
}

/// One error event emitted by an engine.
///
/// Consumed exactly once by the controller's policy and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackError {
    pub category: ErrorCategory,
    /// `false` means the engine is still making progress on its own
    pub fatal: bool,
    /// HTTP status of the failed load, when there was one
    pub upstream_status: Option<u16>,
    pub detail: String,
}

impl PlaybackError {
    pub fn fatal<S: Into<String>>(category: ErrorCategory, detail: S) -> Self {
        Self {
            category,
            fatal: true,
            upstream_status: None,
            detail: detail.into(),
        }
    }

    pub fn non_fatal<S: Into<String>>(category: ErrorCategory, detail: S) -> Self {
        Self {
            fatal: false,
            ..Self::fatal(category, detail)
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.upstream_status = Some(status);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.upstream_status == Some(404)
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} error ({}): {}",
            self.category,
            if self.fatal { "fatal" } else { "non-fatal" },
            self.detail
        )?;
        if let Some(status) = self.upstream_status {
            write!(f, " [status {status}]")?;
        }
        Ok(())
    }
}

/// Why a session ended in failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalKind {
    /// The media service has no such content
    NotFound,
    Network,
    /// Media could not be decoded even after the one recovery attempt
    Playback,
    Generic,
}

impl TerminalKind {
    /// The message shown to the viewer
    pub fn message(self) -> &'static str {
        match self {
            Self::NotFound => "Content not found",
            Self::Network => "Network error: unable to load the stream",
            Self::Playback => "Playback failed: the media could not be decoded",
            Self::Generic => "An unexpected playback error occurred",
        }
    }
}

/// The single failure report a session is allowed to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalReport {
    pub token: super::SessionToken,
    pub kind: TerminalKind,
    pub upstream_status: Option<u16>,
}

impl TerminalReport {
    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}

impl fmt::Display for TerminalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::session::SessionTokenMint;

    #[test]
    fn test_not_found_requires_404() {
        let err = PlaybackError::fatal(ErrorCategory::Network, "manifestLoadError");
        assert!(!err.is_not_found());
        assert!(err.clone().with_status(404).is_not_found());
        assert!(!err.with_status(410).is_not_found());
    }

    #[test]
    fn test_display() {
        let err = PlaybackError::non_fatal(ErrorCategory::Media, "stalled").with_status(206);
        assert_eq!(err.to_string(), "Media error (non-fatal): stalled [status 206]");

        let report = TerminalReport {
            token: SessionTokenMint::default().mint(),
            kind: TerminalKind::Network,
            upstream_status: None,
        };
        assert_eq!(report.to_string(), "Network error: unable to load the stream");
    }
}
