//! Batch composition: listing images → pages in the host design.
//!
//! Each listing is fetched, encoded and inserted before the next one starts,
//! so page N exists in the document before page N+1 is requested and at most
//! one decoded image is held at a time.
//!
//! # Error Handling
//! The batch is fail-fast. The first listing whose fetch, encode or insert
//! fails stops the run; later listings are never attempted. The caller gets
//! one [`CompositionError`] whose message is generic, while the underlying
//! cause is logged here and kept as the error source. Pages inserted before
//! the failure stay in the document and are listed in
//! [`CompositionError::inserted`].

use tracing::{error, info};

use crate::config::Layout;
use crate::contract::{AssetFetcher, DocumentComposer, ImageElement, Listing, NewPage, Position, Size};
use crate::encode::encode_data_uri;
use crate::error::{CompositionError, ListingFailure};

/// Per-listing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositionResult {
    Inserted { title: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every listing was inserted.
    Succeeded,
    /// The batch stopped at the last entry of `results`.
    Failed,
}

/// Per-listing results of one batch, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub status: BatchStatus,
    pub results: Vec<CompositionResult>,
}

impl BatchReport {
    pub fn inserted_titles(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(|r| match r {
                CompositionResult::Inserted { title } => Some(title.as_str()),
                CompositionResult::Failed { .. } => None,
            })
            .collect()
    }
}

/// Insert one page per listing, in order, stopping at the first failure.
pub async fn compose_listings<F, C>(
    listings: &[Listing],
    fetcher: &F,
    composer: &C,
    layout: Layout,
) -> Result<BatchReport, CompositionError>
where
    F: AssetFetcher + ?Sized,
    C: DocumentComposer + ?Sized,
{
    info!(count = listings.len(), "[COMPOSE] Starting batch composition");
    let mut results: Vec<CompositionResult> = Vec::with_capacity(listings.len());

    for (position, listing) in listings.iter().enumerate() {
        info!(listing_id = %listing.id, position, "[COMPOSE] Processing listing");
        match compose_one(listing, fetcher, composer, layout).await {
            Ok(title) => {
                info!(listing_id = %listing.id, "[COMPOSE] Page inserted");
                results.push(CompositionResult::Inserted { title });
            }
            Err(cause) => {
                error!(
                    listing_id = %listing.id,
                    image_url = %listing.image_url,
                    position,
                    error = ?cause,
                    "[COMPOSE][ERROR] Listing failed, aborting batch"
                );
                results.push(CompositionResult::Failed {
                    reason: cause.to_string(),
                });
                return Err(CompositionError {
                    listing_id: listing.id.clone(),
                    report: BatchReport {
                        status: BatchStatus::Failed,
                        results,
                    },
                    cause,
                });
            }
        }
    }

    info!(count = results.len(), "[COMPOSE] Batch composition succeeded");
    Ok(BatchReport {
        status: BatchStatus::Succeeded,
        results,
    })
}

async fn compose_one<F, C>(
    listing: &Listing,
    fetcher: &F,
    composer: &C,
    layout: Layout,
) -> Result<String, ListingFailure>
where
    F: AssetFetcher + ?Sized,
    C: DocumentComposer + ?Sized,
{
    let blob = fetcher.fetch(&listing.image_url).await?;
    let encoded = encode_data_uri(blob).await?;

    let title = listing.id.clone();
    let page = NewPage {
        title: title.clone(),
        elements: vec![ImageElement {
            source: encoded.into_string(),
            alt_text: None,
            position: Position {
                top: layout.top,
                left: layout.left,
            },
            size: Size {
                width: layout.width,
                height: layout.height,
            },
        }],
    };
    composer
        .insert_page(page)
        .await
        .map_err(ListingFailure::Insert)?;
    Ok(title)
}
