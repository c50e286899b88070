//! Document Row Primitives
//!
//! Row-level SQL for the `documents` table: point lookup, insert, attribute
//! and rank updates, soft-delete stamps, row removal, and the ordered scans
//! the hierarchy logic is built on.
//!
//! Every function takes an explicit `&libsql::Connection` rather than opening
//! its own, so a service-level transaction can span any number of primitives
//! on one connection. No business rules live here - cascades, cycle checks,
//! and rank orchestration belong to `DocumentService`.

use crate::db::error::DatabaseError;
use crate::models::Document;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::Row;

/// Column list shared by every SELECT so `row_to_document` sees one shape.
const DOCUMENT_COLUMNS: &str =
    "id, title, content, parent_id, emoji, sort_order, created_at, updated_at, deleted_at";

/// Format a timestamp for storage.
///
/// Fixed-width RFC 3339 with microsecond precision and a `Z` suffix, so
/// lexicographic `ORDER BY updated_at` matches chronological order.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
///
/// Rows written by this crate are RFC 3339; the SQLite
/// `YYYY-MM-DD HH:MM:SS` shape is accepted for rows created by external
/// tooling.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(DatabaseError::row_decode(format!(
        "Unable to parse timestamp '{}' as RFC 3339 or SQLite format",
        s
    )))
}

/// Convert a `documents` row to a [`Document`].
///
/// Expects the [`DOCUMENT_COLUMNS`] column order.
fn row_to_document(row: &Row) -> Result<Document, DatabaseError> {
    let id: String = row
        .get(0)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get id: {}", e)))?;
    let title: String = row
        .get(1)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get title: {}", e)))?;
    let content: String = row
        .get(2)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get content: {}", e)))?;
    let parent_id: Option<String> = row
        .get(3)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get parent_id: {}", e)))?;
    let emoji: Option<String> = row
        .get(4)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get emoji: {}", e)))?;
    let sort_order: i64 = row
        .get(5)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get sort_order: {}", e)))?;
    let created_at_str: String = row
        .get(6)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get created_at: {}", e)))?;
    let updated_at_str: String = row
        .get(7)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get updated_at: {}", e)))?;
    let deleted_at_str: Option<String> = row
        .get(8)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get deleted_at: {}", e)))?;

    Ok(Document {
        id,
        title,
        content,
        parent_id,
        emoji,
        sort_order,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
        deleted_at: deleted_at_str.as_deref().map(parse_timestamp).transpose()?,
    })
}

/// Insert a document row.
pub(crate) async fn insert(
    conn: &libsql::Connection,
    doc: &Document,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents
            (id, title, content, parent_id, emoji, sort_order, created_at, updated_at, deleted_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            doc.id.as_str(),
            doc.title.as_str(),
            doc.content.as_str(),
            doc.parent_id.as_deref(),
            doc.emoji.as_deref(),
            doc.sort_order,
            format_timestamp(doc.created_at),
            format_timestamp(doc.updated_at),
            doc.deleted_at.map(format_timestamp),
        ),
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert document: {}", e)))?;

    Ok(())
}

/// Point lookup by id. Returns `Ok(None)` when the row does not exist.
pub(crate) async fn get(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<Document>, DatabaseError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare get query: {}", e))
        })?;

    let mut rows = stmt.query([id]).await.map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to execute get query: {}", e))
    })?;

    match rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        Some(row) => Ok(Some(row_to_document(&row)?)),
        None => Ok(None),
    }
}

/// Update title/content/emoji and stamp `updated_at`.
///
/// Structural fields (`parent_id`, `sort_order`, `deleted_at`) are never
/// touched here; those go through the dedicated primitives below.
pub(crate) async fn update_attributes(
    conn: &libsql::Connection,
    id: &str,
    title: &str,
    content: &str,
    emoji: Option<&str>,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET title = ?, content = ?, emoji = ?, updated_at = ? WHERE id = ?",
        (title, content, emoji, format_timestamp(updated_at), id),
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to update document: {}", e)))?;

    Ok(())
}

/// Set a document's rank and stamp `updated_at`.
pub(crate) async fn set_rank(
    conn: &libsql::Connection,
    id: &str,
    rank: i64,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET sort_order = ?, updated_at = ? WHERE id = ?",
        (rank, format_timestamp(updated_at), id),
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to set rank: {}", e)))?;

    Ok(())
}

/// Repoint a document to a new parent at the given rank and stamp
/// `updated_at`. Descendants are untouched - they keep referencing the moved
/// document, so the whole subtree travels implicitly.
pub(crate) async fn set_parent_and_rank(
    conn: &libsql::Connection,
    id: &str,
    parent: Option<&str>,
    rank: i64,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET parent_id = ?, sort_order = ?, updated_at = ? WHERE id = ?",
        (parent, rank, format_timestamp(updated_at), id),
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to reparent document: {}", e)))?;

    Ok(())
}

/// Stamp a document as trashed. Re-stamping an already-trashed row is
/// harmless and keeps cascades idempotent.
pub(crate) async fn set_trashed(
    conn: &libsql::Connection,
    id: &str,
    deleted_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let stamp = format_timestamp(deleted_at);
    conn.execute(
        "UPDATE documents SET deleted_at = ?, updated_at = ? WHERE id = ?",
        (stamp.as_str(), stamp.as_str(), id),
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to trash document: {}", e)))?;

    Ok(())
}

/// Clear a document's trash stamp and bump `updated_at`. The legacy
/// `sort_order` is left in place; the caller re-ranks the restore root.
pub(crate) async fn clear_trashed(
    conn: &libsql::Connection,
    id: &str,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET deleted_at = NULL, updated_at = ? WHERE id = ?",
        (format_timestamp(updated_at), id),
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to restore document: {}", e)))?;

    Ok(())
}

/// Remove a row. Returns the number of rows affected (0 when absent).
pub(crate) async fn delete_row(conn: &libsql::Connection, id: &str) -> Result<u64, DatabaseError> {
    let rows_affected = conn
        .execute("DELETE FROM documents WHERE id = ?", [id])
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete document: {}", e)))?;

    Ok(rows_affected)
}

/// Ids of all direct children of a document, trashed or not.
///
/// Structural descent ignores `deleted_at`; trashing a parent leaves the
/// children pointing at it, and cascades must see them.
pub(crate) async fn child_ids(
    conn: &libsql::Connection,
    parent_id: &str,
) -> Result<Vec<String>, DatabaseError> {
    collect_ids(
        conn,
        "SELECT id FROM documents WHERE parent_id = ?",
        parent_id,
    )
    .await
}

/// Ids of direct children that are currently trashed.
///
/// This is the guarded-descent query for restore: an active child is a
/// branch break and its own trashed subtree stays untouched.
pub(crate) async fn trashed_child_ids(
    conn: &libsql::Connection,
    parent_id: &str,
) -> Result<Vec<String>, DatabaseError> {
    collect_ids(
        conn,
        "SELECT id FROM documents WHERE parent_id = ? AND deleted_at IS NOT NULL",
        parent_id,
    )
    .await
}

async fn collect_ids(
    conn: &libsql::Connection,
    sql: &str,
    parent_id: &str,
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(sql).await.map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to prepare children query: {}", e))
    })?;

    let mut rows = stmt.query([parent_id]).await.map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to execute children query: {}", e))
    })?;

    let mut ids = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        let id: String = row
            .get(0)
            .map_err(|e| DatabaseError::row_decode(format!("Failed to get child id: {}", e)))?;
        ids.push(id);
    }

    Ok(ids)
}

/// Number of active siblings under `parent` (`None` = root level).
pub(crate) async fn active_sibling_count(
    conn: &libsql::Connection,
    parent: Option<&str>,
) -> Result<i64, DatabaseError> {
    let mut stmt = conn
        .prepare("SELECT COUNT(*) FROM documents WHERE parent_id IS ? AND deleted_at IS NULL")
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare count query: {}", e))
        })?;

    let mut rows = stmt.query(libsql::params![parent]).await.map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to execute count query: {}", e))
    })?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        .ok_or_else(|| DatabaseError::sql_execution("COUNT query returned no rows"))?;

    row.get(0)
        .map_err(|e| DatabaseError::row_decode(format!("Failed to get count: {}", e)))
}

/// Active children of `parent` (`None` = root level) in rank order.
pub(crate) async fn active_children(
    conn: &libsql::Connection,
    parent: Option<&str>,
) -> Result<Vec<Document>, DatabaseError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM documents
             WHERE parent_id IS ? AND deleted_at IS NULL
             ORDER BY sort_order ASC",
            DOCUMENT_COLUMNS
        ))
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare siblings query: {}", e))
        })?;

    let mut rows = stmt.query(libsql::params![parent]).await.map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to execute siblings query: {}", e))
    })?;

    let mut documents = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        documents.push(row_to_document(&row)?);
    }

    Ok(documents)
}

/// Paged scan of the whole table, ordered by `(sort_order ASC, updated_at
/// DESC)`. The caller clamps `limit` and `offset`.
pub(crate) async fn list(
    conn: &libsql::Connection,
    limit: i64,
    offset: i64,
    include_trashed: bool,
) -> Result<Vec<Document>, DatabaseError> {
    let sql = if include_trashed {
        format!(
            "SELECT {} FROM documents
             ORDER BY sort_order ASC, updated_at DESC
             LIMIT ? OFFSET ?",
            DOCUMENT_COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM documents
             WHERE deleted_at IS NULL
             ORDER BY sort_order ASC, updated_at DESC
             LIMIT ? OFFSET ?",
            DOCUMENT_COLUMNS
        )
    };

    let mut stmt = conn.prepare(&sql).await.map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to prepare list query: {}", e))
    })?;

    let mut rows = stmt.query((limit, offset)).await.map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to execute list query: {}", e))
    })?;

    let mut documents = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        documents.push(row_to_document(&row)?);
    }

    Ok(documents)
}
