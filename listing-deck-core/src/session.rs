//! # session: the two-phase pipeline as one state machine
//!
//! ```text
//! Idle → Inserting → InsertedOk → Exporting → ExtractedOk
//!                  ↘ InsertFailed           ↘ ExportFailed
//!                                           ↘ ExtractFailed
//! ```
//!
//! Export is gated on a prior successful batch: it is available from
//! `InsertedOk` and from every state reached through it, and refused from
//! `Idle` and `InsertFailed`. A new insertion may start from any state and
//! resets the gate if it fails.

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::compose::{compose_listings, BatchReport};
use crate::config::{ExportSettings, Layout};
use crate::contract::{AssetFetcher, ContextProvider, DocumentComposer, ExportRequester, Listing};
use crate::error::SessionError;
use crate::export::ExportCoordinator;
use crate::extract::{extract_bundles, ExtractedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Inserting,
    InsertedOk,
    InsertFailed,
    Exporting,
    ExtractedOk,
    ExportFailed,
    ExtractFailed,
}

impl PipelineState {
    /// Whether the export step may start from this state.
    pub fn export_enabled(&self) -> bool {
        matches!(
            self,
            PipelineState::InsertedOk
                | PipelineState::ExtractedOk
                | PipelineState::ExportFailed
                | PipelineState::ExtractFailed
        )
    }

    /// One human-readable status line per state.
    pub fn status_message(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Ready to insert images.",
            PipelineState::Inserting => "Uploading images...",
            PipelineState::InsertedOk => "Images inserted.",
            PipelineState::InsertFailed => "Failed to insert images.",
            PipelineState::Exporting => "Exporting design...",
            PipelineState::ExtractedOk => "Exported files are ready.",
            PipelineState::ExportFailed => "Failed to export design.",
            PipelineState::ExtractFailed => "Failed to extract exported files.",
        }
    }
}

/// The collaborators a session drives.
pub struct Collaborators<'a> {
    pub fetcher: &'a dyn AssetFetcher,
    pub composer: &'a dyn DocumentComposer,
    pub context: &'a dyn ContextProvider,
    pub exporter: &'a dyn ExportRequester,
}

pub struct Session<'a> {
    collaborators: Collaborators<'a>,
    layout: Layout,
    export: ExportSettings,
    state: PipelineState,
}

impl<'a> Session<'a> {
    pub fn new(collaborators: Collaborators<'a>, layout: Layout, export: ExportSettings) -> Self {
        Self {
            collaborators,
            layout,
            export,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        info!(from = ?self.state, to = ?next, "[SESSION] State transition");
        self.state = next;
    }

    /// Insert one page per listing. Fail-fast, see [`compose_listings`].
    pub async fn insert_listings(&mut self, listings: &[Listing]) -> Result<BatchReport, SessionError> {
        self.transition(PipelineState::Inserting);
        let result = compose_listings(
            listings,
            self.collaborators.fetcher,
            self.collaborators.composer,
            self.layout,
        )
        .await;
        match result {
            Ok(report) => {
                self.transition(PipelineState::InsertedOk);
                Ok(report)
            }
            Err(e) => {
                self.transition(PipelineState::InsertFailed);
                Err(SessionError::Composition(e))
            }
        }
    }

    /// Export the design, download every bundle and extract it.
    ///
    /// See [`extract_bundles`] for naming across several bundles.
    pub async fn export_and_extract(
        &mut self,
        cancel: CancellationToken,
    ) -> Result<Vec<ExtractedFile>, SessionError> {
        if !self.state.export_enabled() {
            warn!(state = ?self.state, "[SESSION] Export requested before a successful insertion");
            return Err(SessionError::ExportNotReady);
        }
        self.transition(PipelineState::Exporting);

        let coordinator = ExportCoordinator::new(
            self.collaborators.context,
            self.collaborators.exporter,
            &self.export,
        );
        let bundle_urls = match coordinator.export(cancel).await {
            Ok(urls) => urls,
            Err(e) => {
                self.transition(PipelineState::ExportFailed);
                return Err(SessionError::Export(e));
            }
        };

        let extracted = extract_bundles(
            self.collaborators.fetcher,
            &bundle_urls,
            &self.export.name_prefix,
        )
        .await;
        match extracted {
            Ok(files) => {
                info!(bundles = bundle_urls.len(), files = files.len(), "[SESSION] Export extracted");
                self.transition(PipelineState::ExtractedOk);
                Ok(files)
            }
            Err(e) => {
                error!(error = ?e, "[SESSION][ERROR] Extraction failed");
                self.transition(PipelineState::ExtractFailed);
                Err(SessionError::Extract(e))
            }
        }
    }
}
