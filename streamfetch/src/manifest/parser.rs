//! Manifest fetching and line-level parsing.

use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use super::Manifest;
use crate::error::ParseError;
use crate::http::HttpClient;

/// Directive marking byte-range addressed segments.
const BYTERANGE_DIRECTIVE: &str = "#EXT-X-BYTERANGE";

/// Fetches manifests and resolves their segment references.
pub struct ManifestParser<C: HttpClient> {
    client: Arc<C>,
}

impl<C: HttpClient> ManifestParser<C> {
    /// Create a parser that fetches through `client`.
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Fetch `manifest_url` and parse it into a [`Manifest`].
    ///
    /// The manifest URL is sent as its own `Referer`.
    pub fn parse(&self, manifest_url: &str) -> Result<Manifest, ParseError> {
        debug!(url = %manifest_url, "Fetching manifest");

        let body = self
            .client
            .get_text(manifest_url, manifest_url)
            .map_err(ParseError::FetchFailed)?;

        parse_manifest(manifest_url, &body)
    }
}

/// Parse a manifest body fetched from `manifest_url`.
pub fn parse_manifest(manifest_url: &str, body: &str) -> Result<Manifest, ParseError> {
    let source_url = Url::parse(manifest_url).map_err(|e| ParseError::InvalidUrl {
        url: manifest_url.to_string(),
        reason: e.to_string(),
    })?;

    if body.trim().is_empty() {
        return Err(ParseError::Empty {
            url: manifest_url.to_string(),
        });
    }

    let base_url = source_url.join(".").map_err(|e| ParseError::InvalidUrl {
        url: manifest_url.to_string(),
        reason: e.to_string(),
    })?;

    let segment_urls: Vec<Url> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with(BYTERANGE_DIRECTIVE))
        .filter(|line| !line.starts_with('#'))
        .filter_map(|reference| match base_url.join(reference) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(reference, error = %e, "Skipping unresolvable segment reference");
                None
            }
        })
        .collect();

    if segment_urls.is_empty() {
        return Err(ParseError::NoSegments {
            url: manifest_url.to_string(),
        });
    }

    debug!(
        url = %manifest_url,
        segments = segment_urls.len(),
        "Parsed manifest"
    );

    Ok(Manifest {
        source_url,
        base_url,
        segment_urls,
    })
}
