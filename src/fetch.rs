// src/fetch.rs

//! # Document Download & Content Hashing
//!
//! Fetches the attestation report and derives its SHA-256 content hash. The
//! hash is the identity of the document everywhere downstream: the cache is
//! keyed by it, and the reconciled table carries it as `source_hash`.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::errors::FetchError;

/// A fetched report: raw bytes plus their content hash.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub source_hash: String,
}

/// External capability: retrieve the report bytes for a URL.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError>;
}

/// Hex-encoded SHA-256 of the document body.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Live fetcher: plain GET with a content-type gate. Issuers serve
/// attestations as `application/pdf`, some CDNs as `application/octet-stream`;
/// anything else (an HTML error page, a redirect landing page) must not be
/// hashed and cached as if it were the report.
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
}

impl HttpDocumentFetcher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpDocumentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let request_err = |reason: String| FetchError::Request {
            url: url.to_string(),
            reason,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| request_err(e.to_string()))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if content_type != "application/pdf" && content_type != "application/octet-stream" {
            return Err(FetchError::NotAPdf { url: url.to_string(), content_type });
        }

        let bytes = response.bytes().await.map_err(|e| request_err(e.to_string()))?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }
        let source_hash = sha256_hex(&bytes);
        debug!(bytes = bytes.len(), %source_hash, "document fetched");
        Ok(FetchedDocument { bytes: bytes.to_vec(), source_hash })
    }
}
