//! Document Data Structures
//!
//! This module defines the core `Document` struct and the parameter/outcome
//! types used by `DocumentService`.
//!
//! # Architecture
//!
//! - **Single entity**: every node in the notes tree is a `Document`
//! - **Flat table**: documents persist as rows in one `documents` table
//! - **Soft delete**: `deleted_at` marks a document as trashed; tree shape
//!   survives trashing because children keep their `parent_id`
//! - **Dense rank**: `sort_order` ranks a document among its *active*
//!   siblings (same `parent_id`, not trashed) as a contiguous `0..k` range
//!
//! # Examples
//!
//! ```rust
//! use quill_core::models::Document;
//!
//! // A root-level document
//! let doc = Document::new("Reading list".to_string(), String::new(), None, None);
//! assert!(doc.parent_id.is_none());
//! assert_eq!(doc.sort_order, 0);
//!
//! // A child document
//! let child = Document::new(
//!     "2026 fiction".to_string(),
//!     String::new(),
//!     Some(doc.id.clone()),
//!     Some("📚".to_string()),
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Deserialize a double-Option field.
///
/// Distinguishes "field absent" (outer `None`, handled by `#[serde(default)]`)
/// from "field explicitly null" (`Some(None)`).
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// A single document in the notes tree.
///
/// # Fields
///
/// - `id`: opaque unique identifier (UUID v4), immutable after creation
/// - `title`, `content`: text payloads; `content` is an uninterpreted blob
/// - `parent_id`: nullable self-reference; `None` means root level. This is
///   deliberately not a foreign key - a dangling `parent_id` must be
///   tolerated by consumers
/// - `emoji`: optional decorative string
/// - `sort_order`: rank among active siblings (dense `0..k`); for trashed
///   documents it is only a restore hint
/// - `created_at` / `updated_at`: UTC timestamps; `updated_at` changes on
///   every observable mutation and never on a no-op
/// - `deleted_at`: non-null marks the document as trashed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Document title (normalized at creation, see [`normalize_title`])
    pub title: String,

    /// Document body; treated as an opaque blob by this crate
    pub content: String,

    /// Parent document ID; `None` means root level
    pub parent_id: Option<String>,

    /// Optional decorative emoji
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,

    /// Rank among active siblings under the same parent
    pub sort_order: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,

    /// Trash timestamp; `Some` means the document is trashed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Create a new `Document` with an auto-generated UUID.
    ///
    /// The document starts active (`deleted_at = None`) at rank 0; callers
    /// are responsible for opening the rank-0 slot among existing siblings
    /// before persisting (`DocumentService::create` does this atomically).
    pub fn new(
        title: String,
        content: String,
        parent_id: Option<String>,
        emoji: Option<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            parent_id,
            emoji,
            sort_order: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether this document is currently trashed.
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Normalize a user-supplied title.
///
/// Titles are trimmed; the placeholder title `"Untitled"` (any casing) is
/// normalized to the empty string so the UI's placeholder never persists as
/// real content.
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.eq_ignore_ascii_case("untitled") {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Parameters for document creation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentParams {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub parent_id: Option<String>,
    pub emoji: Option<String>,
}

/// Sparse attribute update for a document.
///
/// `emoji` and `parent_id` use the double-`Option` pattern: the outer `None`
/// means "leave unchanged", `Some(None)` means "clear the field".
///
/// A patch carrying `parent_id` is rejected by `DocumentService::update` -
/// parent changes must go through `move_document` so the acyclicity and
/// dense-rank invariants stay protected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_field")]
    pub emoji: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_field")]
    pub parent_id: Option<Option<String>>,
}

/// Options for listing documents
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Page size; clamped to `[1, 500]` (default 100)
    pub limit: Option<i64>,
    /// Row offset; clamped to `>= 0`
    pub offset: Option<i64>,
    /// Include trashed documents in the result
    #[serde(default)]
    pub include_trashed: bool,
}

/// Result of a trash cascade
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashOutcome {
    /// The trash root, as persisted after the cascade
    pub document: Document,
    /// Every document the cascade touched (root first)
    pub trashed_ids: Vec<String>,
}

/// Result of a restore cascade
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    /// The restore root, as persisted after the cascade
    pub document: Document,
    /// Every document the cascade restored (empty for a no-op restore)
    pub restored_ids: Vec<String>,
}

/// Result of a permanent-delete cascade
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeOutcome {
    /// Every row removed, root first
    pub deleted_ids: Vec<String>,
}
