//! # contract: collaborator interfaces for the pipeline
//!
//! The pipeline talks to the outside world only through the traits below:
//! fetching remote bytes, inserting pages into the host design, querying the
//! active design context, requesting an export and saving files locally.
//!
//! ## Implementations
//! - [`crate::download::HttpFetcher`] implements [`AssetFetcher`].
//! - The CLI crate's `DesignApiClient` implements [`DocumentComposer`],
//!   [`ContextProvider`] and [`ExportRequester`] against a REST design host.
//! - [`crate::materialise::LocalFileSaver`] implements [`FileSaver`].
//!
//! ## Mocking & Testing
//! Every trait is annotated for `mockall`; the generated `Mock*` types are
//! exported under the default `test-export-mocks` feature so integration
//! tests can script collaborators deterministically.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::FileType;
use crate::error::{FetchError, HostError, SaveError};

/// One source image to be inserted as a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Opaque identifier, also used as the page title.
    pub id: String,
    /// Absolute URL of the image.
    pub image_url: String,
}

impl Listing {
    pub fn new(id: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image_url: image_url.into(),
        }
    }
}

/// A fetched binary payload and the MIME type it was served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub top: i32,
    pub left: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// An image element placed on a page, with its source embedded as a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageElement {
    pub source: String,
    pub alt_text: Option<String>,
    pub position: Position,
    pub size: Size,
}

/// A page insertion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    pub title: String,
    pub elements: Vec<ImageElement>,
}

/// The active design, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub design_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub accepted_file_types: Vec<FileType>,
}

/// Outcome of an export request as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed { bundle_urls: Vec<String> },
    Failed { reason: String },
    Pending,
}

/// Retrieves remote assets. Exactly one attempt per call.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Blob, FetchError>;
}

/// Mutates the host document, one page at a time.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentComposer: Send + Sync {
    /// Append a page holding the given elements.
    async fn insert_page(&self, page: NewPage) -> Result<(), HostError>;
}

/// Reports the design currently open in the host, if any.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn current_context(&self) -> Result<Option<PageContext>, HostError>;
}

/// Requests an export of the active design and resolves with its outcome.
///
/// Implementations may take arbitrarily long; callers bound the wait.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ExportRequester: Send + Sync {
    async fn request_export(&self, request: ExportRequest) -> Result<ExportOutcome, HostError>;
}

/// Writes a named file to the user's local storage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait FileSaver: Send + Sync {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, SaveError>;
}
