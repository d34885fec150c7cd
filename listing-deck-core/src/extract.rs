//! Bundle extraction: zip archive → named, typed in-memory files.
//!
//! All entries are decoded concurrently on the blocking pool and joined; the
//! call returns only once every decode has settled. A single failing entry
//! fails the whole call and no partial file list is returned.

use chrono::Utc;
use futures::future::try_join_all;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use zip::ZipArchive;

use crate::config::DEFAULT_NAME_PREFIX;
use crate::contract::AssetFetcher;
use crate::error::{ArchiveDecodeError, ExtractFailure};

/// MIME type assumed for entries whose name does not reveal one.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Extension used for entries whose name carries none.
pub const DEFAULT_EXTENSION: &str = "jpg";

// Upper bound on the up-front buffer reservation; the declared entry size is
// untrusted input.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

type Archive = ZipArchive<Cursor<Arc<[u8]>>>;

/// One file unpacked from an export bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Synthetic, unique name: `<prefix>_<timestamp>_<count>.<ext>`.
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub name_prefix: String,
    /// Count the first extracted file starts from. Callers extracting several
    /// bundles in a row continue the count so names stay unique.
    pub first_index: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            first_index: 0,
        }
    }
}

/// Decode every non-directory entry of a zip archive.
///
/// Result order follows completion order, not the archive's entry order.
pub async fn extract_archive(
    bytes: Vec<u8>,
    options: &ExtractOptions,
) -> Result<Vec<ExtractedFile>, ArchiveDecodeError> {
    let data: Arc<[u8]> = Arc::from(bytes);
    let archive = ZipArchive::new(Cursor::new(data)).map_err(|e| {
        error!(error = ?e, "[EXTRACT][ERROR] Bundle is not a readable archive");
        ArchiveDecodeError::Archive(e)
    })?;

    let entries = archive.len();
    let timestamp = Utc::now().timestamp_millis();
    let counter = Arc::new(AtomicUsize::new(options.first_index));
    let prefix: Arc<str> = Arc::from(options.name_prefix.as_str());
    info!(entries, "[EXTRACT] Decoding archive entries");

    let decodes = (0..entries).map(|index| {
        let mut archive = archive.clone();
        let counter = Arc::clone(&counter);
        let prefix = Arc::clone(&prefix);
        async move {
            tokio::task::spawn_blocking(move || {
                decode_entry(&mut archive, index, &prefix, timestamp, &counter)
            })
            .await
            .map_err(|e| ArchiveDecodeError::Task(e.to_string()))?
        }
    });

    let decoded = try_join_all(decodes).await.map_err(|e| {
        error!(error = ?e, "[EXTRACT][ERROR] Archive extraction failed");
        e
    })?;

    let files: Vec<ExtractedFile> = decoded.into_iter().flatten().collect();
    info!(entries, files = files.len(), "[EXTRACT] Archive extracted");
    Ok(files)
}

/// Download and extract several bundles in order.
///
/// The file counter carries over between bundles so every extracted name is
/// unique within the call.
pub async fn extract_bundles<F>(
    fetcher: &F,
    bundle_urls: &[String],
    name_prefix: &str,
) -> Result<Vec<ExtractedFile>, ExtractFailure>
where
    F: AssetFetcher + ?Sized,
{
    let mut files = Vec::new();
    for url in bundle_urls {
        debug!(url = %url, "[EXTRACT] Downloading bundle");
        let blob = fetcher.fetch(url).await?;
        let options = ExtractOptions {
            name_prefix: name_prefix.to_string(),
            first_index: files.len(),
        };
        files.extend(extract_archive(blob.bytes, &options).await?);
    }
    Ok(files)
}

fn decode_entry(
    archive: &mut Archive,
    index: usize,
    prefix: &str,
    timestamp: i64,
    counter: &AtomicUsize,
) -> Result<Option<ExtractedFile>, ArchiveDecodeError> {
    let mut entry = archive
        .by_index(index)
        .map_err(|source| ArchiveDecodeError::Entry { index, source })?;
    if entry.is_dir() {
        debug!(entry = entry.name(), "Skipping directory entry");
        return Ok(None);
    }

    let entry_name = entry.name().to_string();
    let mut content = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
    entry
        .read_to_end(&mut content)
        .map_err(|source| ArchiveDecodeError::Content {
            name: entry_name.clone(),
            source,
        })?;

    let count = counter.fetch_add(1, Ordering::SeqCst);
    let name = format!(
        "{prefix}_{timestamp}_{count}.{}",
        extension_of(&entry_name)
    );
    let mime_type = mime_type_of(&entry_name);
    debug!(entry = %entry_name, name = %name, mime_type = %mime_type, size = content.len(), "Decoded archive entry");

    Ok(Some(ExtractedFile {
        name,
        mime_type,
        size: content.len() as u64,
        content,
    }))
}

fn extension_of(entry_name: &str) -> &str {
    Path::new(entry_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(DEFAULT_EXTENSION)
}

fn mime_type_of(entry_name: &str) -> String {
    mime_guess::from_path(entry_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_defaults_to_jpg() {
        assert_eq!(extension_of("page-1.png"), "png");
        assert_eq!(extension_of("nested/dir/page-2.mp4"), "mp4");
        assert_eq!(extension_of("page-3"), "jpg");
        assert_eq!(extension_of("trailing."), "jpg");
    }

    #[test]
    fn mime_type_defaults_to_jpeg() {
        assert_eq!(mime_type_of("a.png"), "image/png");
        assert_eq!(mime_type_of("a.svg"), "image/svg+xml");
        assert_eq!(mime_type_of("no_extension"), "image/jpeg");
    }

    #[tokio::test]
    async fn rejects_bytes_that_are_not_an_archive() {
        let err = extract_archive(b"definitely not a zip".to_vec(), &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveDecodeError::Archive(_)), "got {err:?}");
    }
}
