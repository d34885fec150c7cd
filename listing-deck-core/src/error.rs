//! Typed errors for every pipeline stage.
//!
//! Each stage surfaces one coarse-grained error to its caller. The detailed
//! cause travels as the error `source` and is logged where it happens, so the
//! `Display` text of the stage-level errors stays short enough to show a user.

use std::time::Duration;
use thiserror::Error;

use crate::compose::BatchReport;

/// Error type returned by host collaborators (design API, context query, ...).
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// Retrieval of a remote asset failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, timeout, abort).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be read to completion.
    #[error("reading body from {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Conversion between a blob and its data URI failed.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("blob could not be read: {0}")]
    Read(String),

    /// The encode job went away without resolving or rejecting.
    #[error("encode job ended without settling")]
    Abandoned,

    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),
}

/// What went wrong for the listing that stopped a batch.
#[derive(Debug, Error)]
pub enum ListingFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Encode(#[from] EncodingError),

    #[error("page insertion failed: {0}")]
    Insert(#[source] HostError),
}

/// Umbrella error for a failed composition batch.
///
/// Pages inserted before the failure already exist in the host document;
/// they are not rolled back.
#[derive(Debug, Error)]
#[error("Failed to insert images.")]
pub struct CompositionError {
    /// Id of the listing whose fetch, encode or insert failed.
    pub listing_id: String,
    /// Results up to and including the failed listing.
    pub report: BatchReport,
    #[source]
    pub cause: ListingFailure,
}

impl CompositionError {
    /// Titles of the pages inserted before the failure, in order.
    pub fn inserted(&self) -> Vec<&str> {
        self.report.inserted_titles()
    }
}

/// Export request failures, one variant per non-completed outcome.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no active design context")]
    NoActiveContext,

    #[error("design context query failed: {0}")]
    Context(#[source] HostError),

    #[error("export request failed: {0}")]
    Request(#[source] HostError),

    #[error("export failed: {reason}")]
    Failed { reason: String },

    /// The host returned a non-terminal status where a terminal one was due.
    #[error("export did not complete (status: {status})")]
    NotCompleted { status: String },

    #[error("export did not finish within {after:?}")]
    Timeout { after: Duration },

    #[error("export cancelled")]
    Cancelled,
}

/// A bundle is not a valid archive, or one of its entries failed to decode.
#[derive(Debug, Error)]
pub enum ArchiveDecodeError {
    #[error("bundle is not a readable archive: {0}")]
    Archive(#[source] zip::result::ZipError),

    #[error("archive entry {index} could not be opened: {source}")]
    Entry {
        index: usize,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive entry {name} could not be decoded: {source}")]
    Content {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("entry decode task failed: {0}")]
    Task(String),
}

/// Writing a preview handle failed.
#[derive(Debug, Error)]
pub enum MaterialiseError {
    #[error("could not create preview for {name}: {source}")]
    Preview {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not release preview {name}: {source}")]
    Release {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Saving an extracted file to local storage failed.
#[derive(Debug, Error)]
#[error("could not save {name}: {source}")]
pub struct SaveError {
    pub name: String,
    #[source]
    pub source: std::io::Error,
}

/// Errors surfaced by [`crate::session::Session`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Export was requested before any batch composition succeeded.
    #[error("export is only available after images were inserted")]
    ExportNotReady,

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error("Failed to export design.")]
    Export(#[source] ExportError),

    #[error("Failed to extract exported files.")]
    Extract(#[source] ExtractFailure),
}

/// Cause of a failed extraction step: the bundle download or the decode.
#[derive(Debug, Error)]
pub enum ExtractFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] ArchiveDecodeError),
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
pub type ExportResult<T> = std::result::Result<T, ExportError>;
