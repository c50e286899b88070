//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations, providing
//! detailed error handling for business logic failures.

use crate::db::DatabaseError;
use thiserror::Error;

/// Service operation errors
///
/// Every failure surfaces synchronously with a stable, matchable kind plus a
/// human-readable message. Mutating operations are transactional, so any of
/// these errors implies no partial writes.
#[derive(Error, Debug)]
pub enum DocumentServiceError {
    /// Operation target (or a required referenced document) does not exist
    #[error("Document not found: {id}")]
    NotFound { id: String },

    /// A document was moved into itself
    #[error("Cannot move document {id} into itself")]
    SelfReference { id: String },

    /// A document was moved under one of its own descendants
    #[error("Cannot move document {id} under its descendant {target_id}")]
    DescendantCycle { id: String, target_id: String },

    /// Invalid update operation (e.g., parent change through a raw patch)
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// Transaction bookkeeping failed (begin/commit)
    #[error("Transaction failed: {context}")]
    TransactionFailed { context: String },

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),
}

impl DocumentServiceError {
    /// Create a not-found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a self-reference error
    pub fn self_reference(id: impl Into<String>) -> Self {
        Self::SelfReference { id: id.into() }
    }

    /// Create a descendant-cycle error
    pub fn descendant_cycle(id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::DescendantCycle {
            id: id.into(),
            target_id: target_id.into(),
        }
    }

    /// Create an invalid-update error
    pub fn invalid_update(msg: impl Into<String>) -> Self {
        Self::InvalidUpdate(msg.into())
    }

    /// Create a transaction-failed error
    pub fn transaction_failed(context: impl Into<String>) -> Self {
        Self::TransactionFailed {
            context: context.into(),
        }
    }

    /// Stable machine-readable kind, for the IPC boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::SelfReference { .. } => "SelfReference",
            Self::DescendantCycle { .. } => "DescendantCycle",
            Self::InvalidUpdate(_) => "InvalidUpdate",
            Self::TransactionFailed { .. } => "TransactionFailed",
            Self::Database(_) => "Database",
        }
    }
}
