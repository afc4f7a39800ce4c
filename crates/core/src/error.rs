//! Error types for the tether runtime
//!
//! This module defines all error types returned by runtime operations.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every error is a local, recoverable condition: a failed mutation leaves
//! the runtime unchanged and emits no notification.

use crate::handle::{AttributeHandle, Handle, Identity, ObjectHandle, ObserverId};
use crate::value::{Mask, ValueKind};
use thiserror::Error;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the tether runtime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Handle was never minted, already released, or names the wrong kind of entity
    #[error("Unknown handle: {0}")]
    UnknownHandle(Handle),

    /// Object handle does not name a live object
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectHandle),

    /// Observer id is not registered
    #[error("Unknown observer: {0}")]
    UnknownObserver(ObserverId),

    /// Identity is already bound to a live object
    #[error("Duplicate identity: {0}")]
    DuplicateIdentity(Identity),

    /// Optimistic identity reassignment lost the race
    #[error("Stale identity: expected {expected}, current {actual}")]
    StaleIdentity {
        /// Identity the caller believed was current
        expected: Identity,
        /// Identity actually bound to the handle
        actual: Identity,
    },

    /// Write of a different kind than the cell holds
    #[error("Kind mismatch on attribute {attribute}: stored {stored}, written {written}")]
    KindMismatch {
        /// Attribute whose cell rejected the write
        attribute: AttributeHandle,
        /// Kind currently stored
        stored: ValueKind,
        /// Kind of the rejected value
        written: ValueKind,
    },

    /// Identical (superior, attribute, subordinate) link already exists
    #[error("Duplicate link: {superior} -[{attribute}]-> {subordinate}")]
    DuplicateLink {
        /// Superior endpoint
        superior: ObjectHandle,
        /// Relationship kind
        attribute: AttributeHandle,
        /// Subordinate endpoint
        subordinate: ObjectHandle,
    },

    /// Type definition would break the single-parent tree
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// All named-state bits are assigned
    #[error("State space exhausted: all {capacity} state bits are defined")]
    StateSpaceExhausted {
        /// Number of bits available
        capacity: u32,
    },

    /// Mask written to a cell carries bits with no defined state name
    #[error("Undefined state bits on attribute {attribute}: {bits:#x}", bits = .undefined.bits())]
    UndefinedState {
        /// Attribute whose cell rejected the write
        attribute: AttributeHandle,
        /// Bits of the written mask that no state owns
        undefined: Mask,
    },

    /// Configuration could not be read, parsed or validated
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Short, stable name of the error kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::UnknownHandle(_) => "UnknownHandle",
            Error::UnknownObject(_) => "UnknownObject",
            Error::UnknownObserver(_) => "UnknownObserver",
            Error::DuplicateIdentity(_) => "DuplicateIdentity",
            Error::StaleIdentity { .. } => "StaleIdentity",
            Error::KindMismatch { .. } => "KindMismatch",
            Error::DuplicateLink { .. } => "DuplicateLink",
            Error::InvalidHierarchy(_) => "InvalidHierarchy",
            Error::StateSpaceExhausted { .. } => "StateSpaceExhausted",
            Error::UndefinedState { .. } => "UndefinedState",
            Error::InvalidConfig(_) => "InvalidConfig",
        }
    }

    /// True for errors caused by a handle that does not name a live entity
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            Error::UnknownHandle(_) | Error::UnknownObject(_) | Error::UnknownObserver(_)
        )
    }
}
