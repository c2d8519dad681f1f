//! Authenticated manifest gateway
//!
//! A pure function of `(AuthContext, StreamQuery)`: authorize, validate,
//! compose the upstream URL, forward once, and hand back either the manifest
//! or a passthrough error. Nothing survives between requests.

pub mod request;
pub mod service;
pub mod upstream;

pub use request::{PlaybackRequest, StreamQuery};
pub use service::{ManifestResponse, StreamGateway};
pub use upstream::{
    HLS_CONTENT_TYPE, HttpManifestFetcher, ManifestFetcher, UpstreamManifestRequest,
    UpstreamResponse,
};
