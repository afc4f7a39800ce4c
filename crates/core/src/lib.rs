//! Core types for the tether object runtime
//!
//! This crate defines the foundational types used throughout the system:
//! - Handle, ObjectHandle, AttributeHandle, LinkHandle, ObjectType: process-local ids
//! - Identity: globally unique object identity (UUID)
//! - Value / ValueKind: typed attribute cell contents
//! - Mask: named-state bit set
//! - Locality: write-authority classification
//! - Event / EventMask: change notifications and their categories
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod handle;
pub mod locality;
pub mod value;

pub use error::{Error, Result};
pub use event::{Change, Event, EventMask, LinkEnds, ObjectRef};
pub use handle::{
    AttributeHandle, Handle, HandleAllocator, Identity, LinkHandle, ObjectHandle, ObjectType,
    ObserverId,
};
pub use locality::Locality;
pub use value::{CounterRange, Mask, Matrix, Value, ValueKind, Vector};
