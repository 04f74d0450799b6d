//! Playlist manifest parsing.
//!
//! Turns an HLS media playlist into the ordered list of absolute segment
//! URLs. Only the segment reference lines matter:
//!
//! - directive lines (`#...`) are skipped
//! - `#EXT-X-BYTERANGE` segments are unsupported and dropped
//! - relative references resolve against the manifest's own directory,
//!   never against a base-URL directive inside the document

mod parser;

pub use parser::{parse_manifest, ManifestParser};

use url::Url;

/// A parsed manifest. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// URL the manifest was fetched from.
    pub source_url: Url,
    /// Directory of `source_url`, used to resolve relative references.
    pub base_url: Url,
    /// Absolute segment URLs in playlist order.
    pub segment_urls: Vec<Url>,
}

impl Manifest {
    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segment_urls.len()
    }

    /// Whether the manifest lists no segments.
    ///
    /// Always false for manifests produced by the parser.
    pub fn is_empty(&self) -> bool {
        self.segment_urls.is_empty()
    }
}
