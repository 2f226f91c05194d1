//! Object-store seams the pipeline is generic over.
//!
//! The classifier, differ, worker pool, and orchestrator never talk to
//! a backend directly — they see a [`SourceObjects`] they can list and
//! download from, and a [`DestObjects`] they can list and upload to.
//! The real implementations wrap [`bucket_bridge_gcs::GcsClient`] and
//! [`bucket_bridge_r2::R2Client`]; tests use in-memory fakes.
//!
//! Clients are constructed once by the caller and passed by reference
//! into each operation — there are no ambient singletons.

use bucket_bridge_gcs::GcsClient;
use bucket_bridge_migrate_models::{ObjectRecord, Page};
use bucket_bridge_r2::R2Client;

use crate::MigrateError;

/// A source bucket: prefix-scoped paginated listing plus buffered
/// object download.
pub trait SourceObjects: Send + Sync {
    /// Fetches one page of object metadata under `prefix`.
    ///
    /// One network round trip; the caller owns the pagination loop and
    /// threads the continuation token back in.
    fn list_objects(
        &self,
        prefix: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Page<ObjectRecord>, MigrateError>> + Send;

    /// Downloads an object's bytes, fully buffered. Single attempt;
    /// the worker pool owns the retry policy.
    fn download_object(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, MigrateError>> + Send;
}

/// A destination bucket: prefix-scoped paginated listing of existing
/// keys plus buffered upload.
pub trait DestObjects: Send + Sync {
    /// Fetches one page of existing object keys under `prefix`.
    fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
        continuation_token: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Page<String>, MigrateError>> + Send;

    /// Writes a fully-buffered object under `key`.
    fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<(), MigrateError>> + Send;
}

impl SourceObjects for GcsClient {
    async fn list_objects(
        &self,
        prefix: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<Page<ObjectRecord>, MigrateError> {
        Ok(self.list_page(prefix, page_size, page_token).await?)
    }

    async fn download_object(&self, key: &str) -> Result<Vec<u8>, MigrateError> {
        Ok(self.download(key).await?)
    }
}

impl DestObjects for R2Client {
    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
        continuation_token: Option<&str>,
    ) -> Result<Page<String>, MigrateError> {
        Ok(self.list_page(prefix, max_keys, continuation_token).await?)
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), MigrateError> {
        Ok(R2Client::put_object(self, key, bytes, content_type).await?)
    }
}

/// Lists every existing destination key under a prefix.
///
/// Drives [`DestObjects::list_objects`] to exhaustion, 1000 keys per
/// page.
///
/// # Errors
///
/// Returns the first listing error encountered.
pub async fn list_all_keys<D: DestObjects>(
    dest: &D,
    prefix: &str,
) -> Result<Vec<String>, MigrateError> {
    let mut keys = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let page = dest
            .list_objects(prefix, 1000, continuation_token.as_deref())
            .await?;
        keys.extend(page.items);

        match page.next_token {
            Some(token) => continuation_token = Some(token),
            None => break,
        }
    }

    Ok(keys)
}

/// Returns `true` when at least one object exists under `prefix` at the
/// destination. One listing call with `max_keys = 1`.
///
/// # Errors
///
/// Returns the listing error, if any.
pub async fn any_key_under<D: DestObjects>(dest: &D, prefix: &str) -> Result<bool, MigrateError> {
    let page = dest.list_objects(prefix, 1, None).await?;
    Ok(!page.items.is_empty())
}


#[cfg(test)]
mod tests {
    use super::fakes::{MemoryDest, MemorySource, record};
    use super::*;

    #[tokio::test]
    async fn source_listing_pages_through_with_tokens() {
        let source = MemorySource::with_objects(vec![
            record("exports/f1/a", None, None),
            record("exports/f1/b", None, None),
            record("exports/f1/c", None, None),
        ]);

        let first = source.list_objects("exports/", 2, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let token = first.next_token.expect("more pages");

        let second = source
            .list_objects("exports/", 2, Some(&token))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn list_all_keys_drains_every_page() {
        let dest = MemoryDest::with_existing(&[
            "exports/f1/a",
            "exports/f1/b",
            "exports/f1/c",
            "exports/f2/a",
        ]);

        let keys = list_all_keys(&dest, "exports/f1/").await.unwrap();
        assert_eq!(keys, vec!["exports/f1/a", "exports/f1/b", "exports/f1/c"]);
    }

    #[tokio::test]
    async fn any_key_under_probes_prefix() {
        let dest = MemoryDest::with_existing(&["exports/f1/a"]);

        assert!(any_key_under(&dest, "exports/f1/").await.unwrap());
        assert!(!any_key_under(&dest, "exports/f2/").await.unwrap());
    }
}
