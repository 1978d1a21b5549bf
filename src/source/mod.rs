//! Source retrieval and decoding collaborators.
//!
//! The pipeline treats both as replaceable seams: [`SourceFetcher`] turns a
//! URL into bytes, [`PdfRenderer`] turns those bytes into page metadata and
//! an RGBA raster. Tests substitute counting stubs; production wires
//! [`HttpSourceFetcher`] and [`MupdfRenderer`].

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::FetchError;

mod pdf;

pub use pdf::{MupdfRenderer, PdfRenderer, VECTOR_TEXT_THRESHOLD};

/// Probed source page metadata, input to quality selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    /// Physical page width in inches
    pub width_in: f64,

    /// Physical page height in inches
    pub height_in: f64,

    /// Number of pages in the document (only the first is tiled)
    pub page_count: usize,

    /// Whether the first page carries an extractable text layer; scanned
    /// sheets are bare images and do not
    pub has_text_layer: bool,
}

/// Retrieves source bytes from a URL.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the complete byte stream behind `url`.
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError>;
}

/// HTTP(S) implementation of [`SourceFetcher`].
#[derive(Clone, Default)]
pub struct HttpSourceFetcher {
    client: reqwest::Client,
}

impl HttpSourceFetcher {
    /// Create a fetcher with a default client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))
    }
}

/// Parse and sanity-check a caller-supplied source URL.
pub fn parse_source_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl(format!(
            "unsupported URL scheme '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_url_accepts_http() {
        assert!(parse_source_url("https://example.com/plan.pdf").is_ok());
        assert!(parse_source_url("http://example.com/plan.pdf").is_ok());
    }

    #[test]
    fn test_parse_source_url_rejects_other_schemes() {
        assert!(matches!(
            parse_source_url("ftp://example.com/plan.pdf"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_source_url("file:///etc/passwd"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_parse_source_url_rejects_garbage() {
        assert!(parse_source_url("not a url").is_err());
        assert!(parse_source_url("").is_err());
    }
}
