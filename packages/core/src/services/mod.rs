//! Business Services
//!
//! This module contains the core business logic:
//!
//! - `DocumentService` - document CRUD, sibling ordering, and the
//!   trash/restore/delete cascades
//!
//! Services coordinate between the database layer and the application,
//! implementing business rules and orchestrating multi-row transactional
//! operations.

pub mod document_service;
pub mod error;

pub use document_service::DocumentService;
pub use error::DocumentServiceError;
