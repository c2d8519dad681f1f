//! Lightweight HLS playlist inspection for the adaptive engine

use url::Url;

/// Upper bound on playlist bytes read before giving up on the rest
pub const MAX_MANIFEST_BYTES: usize = 256 * 1024;

/// One `#EXT-X-STREAM-INF` entry of a master playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub bandwidth: u64,
    pub resolution: Option<(u32, u32)>,
    pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    Master,
    Media,
}

/// What a manifest turned out to be
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestAnalysis {
    pub kind: PlaylistKind,
    /// Variants in source order; empty for media playlists
    pub variants: Vec<Variant>,
    pub target_duration: Option<f32>,
    pub segment_count: usize,
    pub encrypted: bool,
    pub uses_fmp4: bool,
}

impl ManifestAnalysis {
    pub fn variant_count(&self) -> Option<usize> {
        match self.kind {
            PlaylistKind::Master => Some(self.variants.len()),
            PlaylistKind::Media => None,
        }
    }

    /// The entry point to hand to the sink: first listed variant for a master
    /// playlist, the manifest itself otherwise.
    pub fn playable_uri(&self, manifest_url: &str) -> String {
        match self.variants.first() {
            Some(variant) => absolutize(manifest_url, &variant.uri),
            None => manifest_url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestParseError {
    #[error("Missing #EXTM3U header")]
    MissingHeader,
    #[error("Playlist has neither variants nor segments")]
    Empty,
}

/// Classify a playlist body. Requires the `#EXTM3U` header and at least one
/// variant or segment.
pub fn analyze(text: &str) -> Result<ManifestAnalysis, ManifestParseError> {
    let mut saw_header = false;
    let mut is_master = false;
    let mut target_duration = None;
    let mut segment_count = 0usize;
    let mut encrypted = false;
    let mut uses_fmp4 = false;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("#EXTM3U") {
            saw_header = true;
        } else if line.starts_with("#EXT-X-STREAM-INF") {
            is_master = true;
        } else if let Some(value) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            target_duration = value.trim().parse::<f32>().ok();
        } else if line.starts_with("#EXT-X-KEY") {
            encrypted = true;
        } else if line.starts_with("#EXT-X-MAP") {
            uses_fmp4 = true;
        } else if !line.starts_with('#') {
            segment_count += 1;
        }
    }

    if !saw_header {
        return Err(ManifestParseError::MissingHeader);
    }

    let variants = if is_master {
        parse_master_variants(text)
    } else {
        Vec::new()
    };
    if variants.is_empty() && segment_count == 0 {
        return Err(ManifestParseError::Empty);
    }

    Ok(ManifestAnalysis {
        kind: if is_master {
            PlaylistKind::Master
        } else {
            PlaylistKind::Media
        },
        variants,
        target_duration,
        segment_count: if is_master { 0 } else { segment_count },
        encrypted,
        uses_fmp4,
    })
}

/// Variants of a master playlist in the order they appear
pub fn parse_master_variants(text: &str) -> Vec<Variant> {
    let mut out = Vec::new();
    let mut pending: Option<(u64, Option<(u32, u32)>)> = None;
    for raw in text.lines() {
        let line = raw.trim();
        if let Some(attrs) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            let mut bandwidth = 0;
            let mut resolution = None;
            for part in attrs.split(',') {
                let kv = part.trim();
                if let Some(v) = kv.strip_prefix("BANDWIDTH=") {
                    bandwidth = v.parse().unwrap_or(bandwidth);
                } else if let Some((w, h)) =
                    kv.strip_prefix("RESOLUTION=").and_then(|v| v.split_once('x'))
                {
                    if let (Ok(w), Ok(h)) = (w.parse(), h.parse()) {
                        resolution = Some((w, h));
                    }
                }
            }
            pending = Some((bandwidth, resolution));
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((bandwidth, resolution)) = pending.take() {
            out.push(Variant {
                bandwidth,
                resolution,
                uri: line.to_string(),
            });
        }
    }
    out
}

/// Resolve a playlist entry against the playlist's own URL.
///
/// Absolute entries pass through; anything unresolvable is returned as-is.
pub fn absolutize(base: &str, entry: &str) -> String {
    if entry.starts_with("http://") || entry.starts_with("https://") {
        return entry.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(entry))
        .map(|joined| joined.to_string())
        .unwrap_or_else(|_| entry.to_string())
}
