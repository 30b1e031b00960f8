//! Error types for the stowage core.
//!
//! Planners recover locally from "nothing fits" situations by returning
//! `None`; every other failure surfaces as a [`CoreError`] with a
//! human-readable message.

use thiserror::Error;

use crate::store::StoreError;

/// Core error kinds.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced item, container, or zone does not exist.
    #[error("{entity} with id '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// An entity with this id already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing required field, malformed value, or out-of-range argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A placement would leave the container bounds or overlap another item.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// No container or orientation accommodates the item.
    #[error("no fit: {0}")]
    NoFit(String),

    /// The operation is not allowed in the item's current state.
    #[error("domain violation: {0}")]
    DomainViolation(String),

    /// Propagated from the backing store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
