//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Connection management and idempotent schema initialization
//! - Row-level primitives for the `documents` table
//! - Dense-rank maintenance for sibling ordering
//!
//! # Architecture
//!
//! Everything persists in a single flat `documents` table. Hierarchy is an
//! adjacency list over `parent_id` (no foreign key - dangling parents are
//! legal), and sibling order is a dense integer rank maintained by the
//! `sibling_rank` primitives. Multi-row operations run inside explicit
//! transactions opened by the service layer on a single connection.

mod database;
pub(crate) mod document_store;
mod error;
pub mod sibling_rank;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use sibling_rank::{clamp_index, ClampMode};
