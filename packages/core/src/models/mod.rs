//! Data Models
//!
//! Core data structures shared by the database and service layers:
//!
//! - [`Document`] - the single persisted entity (a node in the notes tree)
//! - [`DocumentPatch`] - sparse attribute update
//! - Operation outcome types (`TrashOutcome`, `RestoreOutcome`, `PurgeOutcome`)

pub mod document;

pub use document::{
    normalize_title, CreateDocumentParams, Document, DocumentPatch, ListOptions, PurgeOutcome,
    RestoreOutcome, TrashOutcome,
};
