//! Choosing how a source gets onto a sink

/// What the current platform can do with an HLS source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// An adaptive engine can run here
    pub adaptive_engine: bool,
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self {
            adaptive_engine: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStrategy {
    /// Adaptive engine drives the sink
    Adaptive,
    /// The sink plays the manifest itself
    Native,
    /// Assign the source and hope; nothing vouched for the format
    Direct,
}

impl PlaybackStrategy {
    /// Native support wins, then the adaptive engine, then a blind assignment
    pub fn select(sink_supports_native_hls: bool, capabilities: PlatformCapabilities) -> Self {
        if sink_supports_native_hls {
            Self::Native
        } else if capabilities.adaptive_engine {
            Self::Adaptive
        } else {
            Self::Direct
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Adaptive => "adaptive",
            Self::Native => "native",
            Self::Direct => "direct",
        }
    }
}
