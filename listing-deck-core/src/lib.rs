#![doc = "listing-deck-core: core pipelines for listing-deck."]

//! This crate holds the asset pipeline behind listing-deck:
//! listing images are fetched, encoded as data URIs and inserted as pages
//! into a host design; later the design is exported and the returned
//! bundles are unpacked into named, previewable files.
//!
//! The host design API is never called directly from here. Every external
//! collaborator is a trait in [`contract`], implemented by the CLI crate for
//! real use and by `mockall` mocks in tests.
//!
//! # Navigation
//! - [`compose::compose_listings`]: sequential, fail-fast batch insertion
//! - [`export::ExportCoordinator`]: context check, export request, bounded wait
//! - [`extract::extract_archive`]: all-or-nothing bundle extraction
//! - [`materialise::materialise`]: previews and save actions
//! - [`session::Session`]: the two-phase state machine tying it together

pub mod compose;
pub mod config;
pub mod contract;
pub mod download;
pub mod encode;
pub mod error;
pub mod export;
pub mod extract;
pub mod materialise;
pub mod session;
