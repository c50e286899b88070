//! Sibling Rank Maintenance
//!
//! Dense-rank arithmetic for active siblings: every parent's active children
//! carry `sort_order` values forming exactly `0..k`, no gaps, no duplicates.
//! All gap-open/gap-close arithmetic lives here; higher-level operations must
//! route through these primitives instead of re-deriving offsets.
//!
//! The SQL shift primitives operate on a caller-supplied connection so they
//! compose into the caller's transaction. Trashed siblings are never touched;
//! they keep their legacy rank as a restore hint.

use crate::db::error::DatabaseError;

/// How to clamp a requested index against a sibling list of size `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampMode {
    /// Inserting a new member: valid positions are `[0, n]`
    /// (`n` = append at end).
    Insert,
    /// Reordering an existing member within the list: valid positions are
    /// `[0, n-1]` (`0` for an empty list).
    Within,
}

/// Clamp a requested index to a valid rank.
///
/// Fractional indices are floored before clamping; negative (and NaN)
/// indices clamp to 0. Out-of-range requests are clamped, never rejected.
pub fn clamp_index(index: f64, sibling_count: usize, mode: ClampMode) -> i64 {
    // `as i64` saturates, so an absurdly large float clamps at the upper
    // bound below rather than wrapping.
    let floored = if index.is_nan() { 0 } else { index.floor() as i64 };

    let upper = match mode {
        ClampMode::Insert => sibling_count as i64,
        ClampMode::Within => (sibling_count as i64 - 1).max(0),
    };

    floored.clamp(0, upper)
}

/// Open a slot at `at_index`: increment `sort_order` of every active sibling
/// of `parent` with `sort_order >= at_index`.
pub(crate) async fn shift_insert(
    conn: &libsql::Connection,
    parent: Option<&str>,
    at_index: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET sort_order = sort_order + 1
         WHERE parent_id IS ? AND deleted_at IS NULL AND sort_order >= ?",
        (parent, at_index),
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to open rank slot: {}", e)))?;

    Ok(())
}

/// Close the slot at `from_index`: decrement `sort_order` of every active
/// sibling of `parent` with `sort_order > from_index`.
pub(crate) async fn shift_remove(
    conn: &libsql::Connection,
    parent: Option<&str>,
    from_index: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET sort_order = sort_order - 1
         WHERE parent_id IS ? AND deleted_at IS NULL AND sort_order > ?",
        (parent, from_index),
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to close rank slot: {}", e)))?;

    Ok(())
}

/// Shift the half-open window `[lo, hi)` up by one.
///
/// Used by same-parent reorders moving a sibling to a lower index: everything
/// between the target slot and the old slot steps up.
pub(crate) async fn shift_window_up(
    conn: &libsql::Connection,
    parent: Option<&str>,
    lo: i64,
    hi: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET sort_order = sort_order + 1
         WHERE parent_id IS ? AND deleted_at IS NULL
           AND sort_order >= ? AND sort_order < ?",
        (parent, lo, hi),
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to shift rank window up: {}", e)))?;

    Ok(())
}

/// Shift the half-open window `(lo, hi]` down by one.
///
/// Used by same-parent reorders moving a sibling to a higher index.
pub(crate) async fn shift_window_down(
    conn: &libsql::Connection,
    parent: Option<&str>,
    lo: i64,
    hi: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET sort_order = sort_order - 1
         WHERE parent_id IS ? AND deleted_at IS NULL
           AND sort_order > ? AND sort_order <= ?",
        (parent, lo, hi),
    )
    .await
    .map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to shift rank window down: {}", e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_insert_bounds() {
        assert_eq!(clamp_index(0.0, 3, ClampMode::Insert), 0);
        assert_eq!(clamp_index(3.0, 3, ClampMode::Insert), 3); // append at end
        assert_eq!(clamp_index(7.0, 3, ClampMode::Insert), 3);
        assert_eq!(clamp_index(0.0, 0, ClampMode::Insert), 0);
    }

    #[test]
    fn test_clamp_within_bounds() {
        assert_eq!(clamp_index(0.0, 3, ClampMode::Within), 0);
        assert_eq!(clamp_index(2.0, 3, ClampMode::Within), 2);
        assert_eq!(clamp_index(3.0, 3, ClampMode::Within), 2);
        assert_eq!(clamp_index(99.0, 3, ClampMode::Within), 2);
    }

    #[test]
    fn test_clamp_within_degenerate_lists() {
        assert_eq!(clamp_index(5.0, 0, ClampMode::Within), 0);
        assert_eq!(clamp_index(5.0, 1, ClampMode::Within), 0);
    }

    #[test]
    fn test_clamp_floors_fractional() {
        assert_eq!(clamp_index(1.9, 5, ClampMode::Insert), 1);
        assert_eq!(clamp_index(2.0001, 5, ClampMode::Within), 2);
    }

    #[test]
    fn test_clamp_negative_and_nan() {
        assert_eq!(clamp_index(-1.0, 5, ClampMode::Insert), 0);
        assert_eq!(clamp_index(-0.5, 5, ClampMode::Within), 0);
        assert_eq!(clamp_index(f64::NAN, 5, ClampMode::Insert), 0);
    }

    #[test]
    fn test_clamp_saturates_huge_values() {
        assert_eq!(clamp_index(f64::INFINITY, 4, ClampMode::Insert), 4);
        assert_eq!(clamp_index(1e300, 4, ClampMode::Within), 3);
        assert_eq!(clamp_index(f64::NEG_INFINITY, 4, ClampMode::Insert), 0);
    }
}
