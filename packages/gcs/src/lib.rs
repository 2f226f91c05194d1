#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Google Cloud Storage client for the bucket-bridge source side.
//!
//! Talks to the GCS JSON API (`storage/v1`) over plain HTTPS:
//! paginated `objects.list` under a prefix, and buffered `alt=media`
//! object downloads. Works anonymously against public buckets; for
//! private buckets set `GCS_BEARER_TOKEN` to an OAuth2 access token and
//! the client includes it on every request.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `GCS_BEARER_TOKEN` | No | OAuth2 access token for private buckets |
//! | `GCS_ENDPOINT` | No | API base URL override (default `https://storage.googleapis.com`) |
//!
//! Listing is deliberately one network round trip per call: the caller
//! owns the pagination loop and the continuation token, so a scan can
//! report progress between pages.

use bucket_bridge_migrate_models::{ObjectRecord, Page};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Default GCS JSON API base URL.
const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Fields requested from `objects.list`: everything the pipeline
/// needs and nothing else, which keeps large listings small.
const LIST_FIELDS: &str = "items(name,timeCreated,contentType,size),nextPageToken";

/// Errors that can occur talking to GCS.
#[derive(Debug, thiserror::Error)]
pub enum GcsError {
    /// `objects.list` failed.
    #[error("Failed to list gs://{bucket}/{prefix}: {source}")]
    List {
        /// Bucket name.
        bucket: String,
        /// Key prefix being listed.
        prefix: String,
        /// Underlying HTTP or decode error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Object download failed.
    #[error("Failed to download gs://{bucket}/{key}: {source}")]
    Download {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying HTTP error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Object download returned an empty body.
    ///
    /// Treated by callers exactly like a transport failure: the bytes
    /// never arrived, so the attempt did not succeed.
    #[error("Downloaded empty body for gs://{bucket}/{key}")]
    EmptyObject {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },
}

/// One object entry from an `objects.list` response.
///
/// GCS reports `size` as a decimal string, not a JSON number.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedObject {
    name: String,
    time_created: Option<DateTime<Utc>>,
    content_type: Option<String>,
    size: Option<String>,
}

impl ListedObject {
    fn into_record(self) -> ObjectRecord {
        ObjectRecord {
            key: self.name,
            created_at: self.time_created,
            content_type: self.content_type,
            size: self.size.and_then(|s| s.parse().ok()),
        }
    }
}

/// An `objects.list` response page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListedObject>,
    next_page_token: Option<String>,
}

/// Client for listing and downloading objects from one GCS bucket.
pub struct GcsClient {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
}

impl GcsClient {
    /// Creates a client for `bucket` with the default endpoint and no
    /// authentication.
    #[must_use]
    pub fn new(bucket: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            bucket: bucket.to_string(),
            token: None,
        }
    }

    /// Creates a client for `bucket`, reading `GCS_BEARER_TOKEN` and
    /// `GCS_ENDPOINT` from the environment when present.
    #[must_use]
    pub fn from_env(bucket: &str) -> Self {
        let mut client = Self::new(bucket);
        if let Ok(endpoint) = std::env::var("GCS_ENDPOINT") {
            client.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        client.token = std::env::var("GCS_BEARER_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        client
    }

    /// Fetches one page of object metadata under `prefix`.
    ///
    /// Exactly one network round trip. Pass the returned
    /// [`Page::next_token`] back in to fetch the next page; the listing
    /// is exhausted when it comes back `None`.
    ///
    /// # Errors
    ///
    /// Returns [`GcsError::List`] on transport failure, a non-success
    /// HTTP status, or an undecodable response body.
    pub async fn list_page(
        &self,
        prefix: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<Page<ObjectRecord>, GcsError> {
        let url = format!("{}/storage/v1/b/{}/o", self.endpoint, self.bucket);
        let page_size = page_size.to_string();

        let mut request = self.http.get(&url).query(&[
            ("prefix", prefix),
            ("maxResults", page_size.as_str()),
            ("fields", LIST_FIELDS),
        ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        if let Some(bearer) = &self.token {
            request = request.bearer_auth(bearer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.list_error(prefix, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.list_error(prefix, format!("HTTP {status}")));
        }

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| self.list_error(prefix, e))?;

        log::debug!(
            "gs://{}/{prefix}*: page of {} objects (more: {})",
            self.bucket,
            body.items.len(),
            body.next_page_token.is_some()
        );

        Ok(Page {
            items: body.items.into_iter().map(ListedObject::into_record).collect(),
            next_token: body.next_page_token,
        })
    }

    /// Downloads an object's bytes, fully buffered.
    ///
    /// Single attempt; retry policy belongs to the caller, which knows
    /// whether the object is worth retrying at all.
    ///
    /// # Errors
    ///
    /// Returns [`GcsError::Download`] on transport failure or a
    /// non-success HTTP status, and [`GcsError::EmptyObject`] when the
    /// response body is empty.
    pub async fn download(&self, key: &str) -> Result<Vec<u8>, GcsError> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.endpoint,
            self.bucket,
            encode_key(key)
        );

        let mut request = self.http.get(&url).query(&[("alt", "media")]);
        if let Some(bearer) = &self.token {
            request = request.bearer_auth(bearer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.download_error(key, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.download_error(key, format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.download_error(key, e))?;

        if bytes.is_empty() {
            return Err(GcsError::EmptyObject {
                bucket: self.bucket.clone(),
                key: key.to_string(),
            });
        }

        Ok(bytes.to_vec())
    }

    fn list_error(
        &self,
        prefix: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> GcsError {
        GcsError::List {
            bucket: self.bucket.clone(),
            prefix: prefix.to_string(),
            source: source.into(),
        }
    }

    fn download_error(
        &self,
        key: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> GcsError {
        GcsError::Download {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            source: source.into(),
        }
    }
}

/// Percent-encodes an object key for use as a single URL path segment.
///
/// The JSON API requires the full key (slashes included) encoded into
/// one segment. Unreserved characters (RFC 3986 §2.3) pass through.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push('%');
                encoded.push_str(&format!("{byte:02X}"));
            }
        }
    }
    encoded
}
