//! Document Service - Hierarchy Management
//!
//! Business logic for the notes tree: create, attribute update, move (reorder
//! and reparent), trash/restore with cascade, and permanent delete with
//! cascade, plus the read operations the application layer consumes.
//!
//! # Invariants
//!
//! Every completed mutating operation leaves the store with:
//!
//! - **Acyclicity**: following `parent_id` from any document never revisits it
//! - **Dense rank**: for every parent, active children carry `sort_order`
//!   values forming exactly `0..k` (trashed documents are excluded; they keep
//!   a legacy rank as a restore hint)
//!
//! Neither invariant is required to hold mid-transaction; every mutating
//! entry point runs on one connection under `BEGIN TRANSACTION`/`COMMIT`
//! with rollback on any error, so failures never leave partial cascades or
//! half-shifted sibling lists behind.

use crate::db::document_store;
use crate::db::sibling_rank::{self, ClampMode};
use crate::db::DatabaseService;
use crate::models::{
    normalize_title, CreateDocumentParams, Document, DocumentPatch, ListOptions, PurgeOutcome,
    RestoreOutcome, TrashOutcome,
};
use crate::services::error::DocumentServiceError;
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Default page size for [`DocumentService::list`]
const DEFAULT_LIST_LIMIT: i64 = 100;

/// Maximum page size for [`DocumentService::list`]
const MAX_LIST_LIMIT: i64 = 500;

/// Service for document CRUD and hierarchy management
///
/// # Examples
///
/// ```no_run
/// use quill_core::db::DatabaseService;
/// use quill_core::services::DocumentService;
/// use quill_core::models::CreateDocumentParams;
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = Arc::new(DatabaseService::new(PathBuf::from("./quill.db")).await?);
///     let service = DocumentService::new(db);
///
///     let doc = service
///         .create(CreateDocumentParams {
///             title: "Inbox".to_string(),
///             ..Default::default()
///         })
///         .await?;
///     println!("Created document: {}", doc.id);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DocumentService {
    db: Arc<DatabaseService>,
}

impl DocumentService {
    /// Create a new `DocumentService` backed by the given database.
    ///
    /// The database handle is passed in explicitly (no ambient global), so
    /// tests can run any number of isolated instances side by side.
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    //
    // READ OPERATIONS
    //

    /// Get a document by id.
    ///
    /// Returns `Ok(None)` for an unknown id - reads never fail on empty
    /// results.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Document>, DocumentServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        Ok(document_store::get(&conn, id).await?)
    }

    /// List documents ordered by `(sort_order ASC, updated_at DESC)`.
    ///
    /// `limit` is clamped to `[1, 500]` (default 100) and `offset` to
    /// `>= 0`; out-of-range paging inputs are corrected, never rejected.
    pub async fn list(&self, options: ListOptions) -> Result<Vec<Document>, DocumentServiceError> {
        let limit = options
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let offset = options.offset.unwrap_or(0).max(0);

        let conn = self.db.connect_with_timeout().await?;
        Ok(document_store::list(&conn, limit, offset, options.include_trashed).await?)
    }

    /// Active children of a parent (`None` = root level) in rank order.
    pub async fn children_of(
        &self,
        parent_id: Option<&str>,
    ) -> Result<Vec<Document>, DocumentServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        Ok(document_store::active_children(&conn, parent_id).await?)
    }

    /// Ids of every document transitively reachable from `id` through
    /// `parent_id` links, at any depth, **including trashed documents** -
    /// structural descent ignores trash state.
    ///
    /// Pure read. Returns an empty set for an unknown id. Terminates on
    /// pathological depth and never revisits a document, so pre-existing
    /// corruption (a parent cycle already on disk) cannot loop forever.
    pub async fn descendants_of(&self, id: &str) -> Result<Vec<String>, DocumentServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        collect_descendants(&conn, id).await
    }

    //
    // MUTATING OPERATIONS
    //

    /// Create a document.
    ///
    /// New documents enter at the top of their sibling list: every existing
    /// active sibling shifts down one rank and the new row takes rank 0,
    /// atomically.
    ///
    /// The title is normalized: surrounding whitespace is trimmed, and the
    /// UI placeholder `"Untitled"` (any casing) becomes the empty string.
    /// `parent_id` is not validated against existing rows - a dangling
    /// parent is legal by design.
    pub async fn create(
        &self,
        params: CreateDocumentParams,
    ) -> Result<Document, DocumentServiceError> {
        let doc = Document::new(
            normalize_title(&params.title),
            params.content,
            params.parent_id,
            params.emoji,
        );

        let conn = self.db.connect_with_timeout().await?;
        begin(&conn).await?;
        let result = async {
            sibling_rank::shift_insert(&conn, doc.parent_id.as_deref(), 0).await?;
            document_store::insert(&conn, &doc).await?;

            // Return the persisted row so timestamps match storage precision
            document_store::get(&conn, &doc.id)
                .await?
                .ok_or_else(|| DocumentServiceError::not_found(&doc.id))
        }
        .await;
        let created = commit_or_rollback(&conn, result).await?;

        tracing::debug!(
            "Created document {} under parent {:?}",
            created.id,
            created.parent_id
        );
        Ok(created)
    }

    /// Update a document's attributes (title, content, emoji).
    ///
    /// A patch carrying a parent change is rejected with `InvalidUpdate`;
    /// parent changes must go through [`move_document`](Self::move_document)
    /// so the acyclicity and dense-rank invariants stay protected.
    ///
    /// A patch with no observable effect returns the document unchanged and
    /// does **not** bump `updated_at`.
    pub async fn update(
        &self,
        id: &str,
        patch: DocumentPatch,
    ) -> Result<Document, DocumentServiceError> {
        if patch.parent_id.is_some() {
            return Err(DocumentServiceError::invalid_update(
                "parentId cannot be changed through update; use move instead",
            ));
        }

        let conn = self.db.connect_with_timeout().await?;
        begin(&conn).await?;
        let result = async {
            let current = document_store::get(&conn, id)
                .await?
                .ok_or_else(|| DocumentServiceError::not_found(id))?;

            let title = match patch.title {
                Some(t) => normalize_title(&t),
                None => current.title.clone(),
            };
            let content = patch.content.unwrap_or_else(|| current.content.clone());
            let emoji = match patch.emoji {
                Some(e) => e,
                None => current.emoji.clone(),
            };

            // No observable change -> no write, updated_at stays put
            if title == current.title && content == current.content && emoji == current.emoji {
                return Ok(current);
            }

            document_store::update_attributes(
                &conn,
                id,
                &title,
                &content,
                emoji.as_deref(),
                Utc::now(),
            )
            .await?;

            document_store::get(&conn, id)
                .await?
                .ok_or_else(|| DocumentServiceError::not_found(id))
        }
        .await;

        commit_or_rollback(&conn, result).await
    }

    /// Move a document to `new_parent` at `target_index`.
    ///
    /// Handles both same-parent reorders and cross-parent moves. Indices are
    /// clamped, never rejected: fractional values are floored, negatives go
    /// to 0, and overshoots land at the end of the destination list.
    ///
    /// Descendants are not touched - they keep referencing the moved
    /// document, so the whole subtree travels implicitly.
    ///
    /// # Errors
    ///
    /// - `NotFound` - `id` does not exist
    /// - `InvalidUpdate` - `id` is trashed; trashed documents sit outside the
    ///   active sibling lists, so they must be restored before they can move
    /// - `SelfReference` - `new_parent` is the document itself
    /// - `DescendantCycle` - `new_parent` is inside the document's subtree
    ///
    /// The cycle check runs inside the move's transaction against current
    /// persisted state, so an earlier move that detached an intermediate
    /// document legitimately makes a previously-rejected move valid. All
    /// failures roll back with no partial rank shifts.
    pub async fn move_document(
        &self,
        id: &str,
        new_parent: Option<&str>,
        target_index: f64,
    ) -> Result<Document, DocumentServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        begin(&conn).await?;
        let result = self.move_in_tx(&conn, id, new_parent, target_index).await;
        commit_or_rollback(&conn, result).await
    }

    async fn move_in_tx(
        &self,
        conn: &libsql::Connection,
        id: &str,
        new_parent: Option<&str>,
        target_index: f64,
    ) -> Result<Document, DocumentServiceError> {
        let doc = document_store::get(conn, id)
            .await?
            .ok_or_else(|| DocumentServiceError::not_found(id))?;

        // A trashed document is not part of any active sibling list; its
        // sort_order is only a restore hint, so the shift arithmetic below
        // would move active siblings around a slot that does not exist.
        if doc.deleted_at.is_some() {
            return Err(DocumentServiceError::invalid_update(
                "trashed documents cannot be moved; restore the document first",
            ));
        }

        assert_no_cycle(conn, id, new_parent).await?;

        let now = Utc::now();

        if doc.parent_id.as_deref() == new_parent {
            // Same-parent reorder
            let count = document_store::active_sibling_count(conn, new_parent).await?;
            let idx = sibling_rank::clamp_index(target_index, count as usize, ClampMode::Within);
            let current = doc.sort_order;

            if idx == current {
                // No-op: do not touch updated_at
                return Ok(doc);
            }

            if idx < current {
                // Everything in [idx, current) steps up to make room below
                sibling_rank::shift_window_up(conn, new_parent, idx, current).await?;
            } else {
                // Everything in (current, idx] steps down to close the gap
                sibling_rank::shift_window_down(conn, new_parent, current, idx).await?;
            }
            document_store::set_rank(conn, id, idx, now).await?;

            tracing::debug!("Reordered document {} from {} to {}", id, current, idx);
        } else {
            // Cross-parent move: close the gap left behind, then open a slot
            // in the destination. Trashed siblings keep their legacy ranks.
            sibling_rank::shift_remove(conn, doc.parent_id.as_deref(), doc.sort_order).await?;

            let count = document_store::active_sibling_count(conn, new_parent).await?;
            let idx = sibling_rank::clamp_index(target_index, count as usize, ClampMode::Insert);

            sibling_rank::shift_insert(conn, new_parent, idx).await?;
            document_store::set_parent_and_rank(conn, id, new_parent, idx, now).await?;

            tracing::debug!(
                "Moved document {} from parent {:?} to parent {:?} at rank {}",
                id,
                doc.parent_id,
                new_parent,
                idx
            );
        }

        document_store::get(conn, id)
            .await?
            .ok_or_else(|| DocumentServiceError::not_found(id))
    }

    /// Trash a document and its entire subtree.
    ///
    /// The full closure (the document plus every transitive descendant,
    /// already-trashed members included) is stamped with `deleted_at = now`,
    /// making repeated trashing idempotent. If the trash root was active,
    /// the gap it leaves among its siblings is closed so their ranks stay
    /// dense. Trashed documents keep their `parent_id`, so the tree shape
    /// survives for a later restore.
    pub async fn trash(&self, id: &str) -> Result<TrashOutcome, DocumentServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        begin(&conn).await?;
        let result = async {
            let doc = document_store::get(&conn, id)
                .await?
                .ok_or_else(|| DocumentServiceError::not_found(id))?;

            let mut closure = vec![id.to_string()];
            closure.extend(collect_descendants(&conn, id).await?);

            let now = Utc::now();
            for member in &closure {
                document_store::set_trashed(&conn, member, now).await?;
            }

            // Close the gap only if the root was active; re-trashing an
            // already-trashed subtree must not disturb sibling ranks.
            if doc.deleted_at.is_none() {
                sibling_rank::shift_remove(&conn, doc.parent_id.as_deref(), doc.sort_order)
                    .await?;
            }

            let document = document_store::get(&conn, id)
                .await?
                .ok_or_else(|| DocumentServiceError::not_found(id))?;

            Ok(TrashOutcome {
                document,
                trashed_ids: closure,
            })
        }
        .await;
        let outcome = commit_or_rollback(&conn, result).await?;

        tracing::info!(
            "Trashed {} document(s) under {}",
            outcome.trashed_ids.len(),
            id
        );
        Ok(outcome)
    }

    /// Restore a trashed document and its still-trashed subtree.
    ///
    /// The walk starts at `id` and only descends into children that are
    /// themselves currently trashed: a child whose trash stamp was already
    /// cleared independently is a branch break, and its own trashed
    /// descendants stay untouched.
    ///
    /// The restore root re-enters its parent's sibling list at
    /// `min(legacy_rank, current_active_sibling_count)` - the stored rank is
    /// only a hint, clamped so a list that shrank while the document was
    /// trashed cannot end up with a gap past its end. Deeper restored
    /// documents keep their legacy ranks, which were dense when the subtree
    /// was trashed.
    ///
    /// Restoring an already-active document is a no-op: the document is
    /// returned unchanged, `updated_at` is not bumped, and the restored id
    /// set is empty.
    pub async fn restore(&self, id: &str) -> Result<RestoreOutcome, DocumentServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        begin(&conn).await?;
        let result = async {
            let doc = document_store::get(&conn, id)
                .await?
                .ok_or_else(|| DocumentServiceError::not_found(id))?;

            if doc.deleted_at.is_none() {
                return Ok(RestoreOutcome {
                    document: doc,
                    restored_ids: Vec::new(),
                });
            }

            // Collect the guarded closure before clearing any stamps, so the
            // walk sees a consistent picture of which branches are broken.
            let mut restored = vec![id.to_string()];
            let mut seen: HashSet<String> = HashSet::from([id.to_string()]);
            let mut queue: VecDeque<String> = VecDeque::from([id.to_string()]);
            while let Some(current) = queue.pop_front() {
                for child in document_store::trashed_child_ids(&conn, &current).await? {
                    if seen.insert(child.clone()) {
                        restored.push(child.clone());
                        queue.push_back(child);
                    }
                }
            }

            // Place the root before clearing stamps: the active-sibling
            // count must not yet include the documents being restored.
            let count =
                document_store::active_sibling_count(&conn, doc.parent_id.as_deref()).await?;
            let rank = doc.sort_order.min(count);
            sibling_rank::shift_insert(&conn, doc.parent_id.as_deref(), rank).await?;

            let now = Utc::now();
            for member in &restored {
                document_store::clear_trashed(&conn, member, now).await?;
            }
            document_store::set_rank(&conn, id, rank, now).await?;

            let document = document_store::get(&conn, id)
                .await?
                .ok_or_else(|| DocumentServiceError::not_found(id))?;

            Ok(RestoreOutcome {
                document,
                restored_ids: restored,
            })
        }
        .await;
        let outcome = commit_or_rollback(&conn, result).await?;

        if !outcome.restored_ids.is_empty() {
            tracing::info!(
                "Restored {} document(s) under {}",
                outcome.restored_ids.len(),
                id
            );
        }
        Ok(outcome)
    }

    /// Permanently delete a document and its entire subtree.
    ///
    /// The closure is computed regardless of trash state - a trashed root
    /// still drags its active descendants along, because they keep
    /// referencing it through `parent_id`. If the root was active, the gap
    /// among its siblings is closed. All rows are removed in one
    /// transaction; there is no non-cascading hard delete.
    pub async fn permanent_delete(&self, id: &str) -> Result<PurgeOutcome, DocumentServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        begin(&conn).await?;
        let result = async {
            let doc = document_store::get(&conn, id)
                .await?
                .ok_or_else(|| DocumentServiceError::not_found(id))?;

            let mut closure = vec![id.to_string()];
            closure.extend(collect_descendants(&conn, id).await?);

            if doc.deleted_at.is_none() {
                sibling_rank::shift_remove(&conn, doc.parent_id.as_deref(), doc.sort_order)
                    .await?;
            }

            for member in &closure {
                document_store::delete_row(&conn, member).await?;
            }

            Ok(PurgeOutcome {
                deleted_ids: closure,
            })
        }
        .await;
        let outcome = commit_or_rollback(&conn, result).await?;

        tracing::info!(
            "Permanently deleted {} document(s) under {}",
            outcome.deleted_ids.len(),
            id
        );
        Ok(outcome)
    }
}

/// Compute the transitive descendant closure of `id` (excluding `id`).
///
/// Explicit worklist BFS over the `parent_id` adjacency - portable across
/// storage engines and testable without recursive SQL. The visited set
/// guards against revisits, so a corrupt on-disk cycle degrades into a
/// truncated walk instead of an infinite loop.
async fn collect_descendants(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Vec<String>, DocumentServiceError> {
    let mut descendants = Vec::new();
    let mut seen: HashSet<String> = HashSet::from([id.to_string()]);
    let mut queue: VecDeque<String> = VecDeque::from([id.to_string()]);

    while let Some(current) = queue.pop_front() {
        for child in document_store::child_ids(conn, &current).await? {
            if seen.insert(child.clone()) {
                descendants.push(child.clone());
                queue.push_back(child);
            }
        }
    }

    Ok(descendants)
}

/// Reject a move that would make `moving_id` its own ancestor.
///
/// Evaluated against current persisted state immediately before the move
/// commits; the caller runs this inside the move's transaction.
async fn assert_no_cycle(
    conn: &libsql::Connection,
    moving_id: &str,
    target_parent: Option<&str>,
) -> Result<(), DocumentServiceError> {
    let Some(target) = target_parent else {
        // Moving to root level can never create a cycle
        return Ok(());
    };

    if target == moving_id {
        return Err(DocumentServiceError::self_reference(moving_id));
    }

    let descendants = collect_descendants(conn, moving_id).await?;
    if descendants.iter().any(|d| d == target) {
        return Err(DocumentServiceError::descendant_cycle(moving_id, target));
    }

    Ok(())
}

/// Begin a transaction on the given connection.
async fn begin(conn: &libsql::Connection) -> Result<(), DocumentServiceError> {
    conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
        DocumentServiceError::transaction_failed(format!("Failed to begin transaction: {}", e))
    })?;
    Ok(())
}

/// Commit on success, roll back on failure.
///
/// Rollback errors are ignored; the original error is surfaced.
async fn commit_or_rollback<T>(
    conn: &libsql::Connection,
    result: Result<T, DocumentServiceError>,
) -> Result<T, DocumentServiceError> {
    match result {
        Ok(value) => {
            conn.execute("COMMIT", ()).await.map_err(|e| {
                DocumentServiceError::transaction_failed(format!(
                    "Failed to commit transaction: {}",
                    e
                ))
            })?;
            Ok(value)
        }
        Err(e) => {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            Err(e)
        }
    }
}

// Comprehensive tests in separate modules
#[cfg(test)]
#[path = "document_service_order_test.rs"]
mod document_service_order_test;

#[cfg(test)]
#[path = "document_service_cascade_test.rs"]
mod document_service_cascade_test;
