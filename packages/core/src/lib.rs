//! Quill Core Business Logic Layer
//!
//! This crate provides the hierarchical document store underlying the Quill
//! notes application: a tree of documents that can be reordered, reparented,
//! trashed with cascade, restored with cascade, and permanently deleted with
//! cascade, while guaranteeing an acyclic parent/child graph and a dense,
//! gap-free sibling ordering at all times.
//!
//! # Architecture
//!
//! - **Single flat table**: every document is one row; hierarchy is an
//!   adjacency list over a nullable `parent_id` (dangling parents tolerated)
//! - **Dense sibling rank**: active siblings under one parent always carry
//!   `sort_order` values `0..k`
//! - **Soft delete with cascade**: trashing keeps the tree shape so restore
//!   can rebuild it; permanent delete always cascades
//! - **libsql**: embedded SQLite-compatible storage; every mutating
//!   operation is one transaction
//!
//! # Modules
//!
//! - [`models`] - data structures (`Document`, patches, operation outcomes)
//! - [`services`] - business logic (`DocumentService`)
//! - [`db`] - database layer with libsql integration

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseError, DatabaseService};
pub use models::{
    CreateDocumentParams, Document, DocumentPatch, ListOptions, PurgeOutcome, RestoreOutcome,
    TrashOutcome,
};
pub use services::{DocumentService, DocumentServiceError};
