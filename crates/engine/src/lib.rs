//! Object runtime engine
//!
//! This crate composes the components of the runtime:
//! - Identity registry: handle ↔ identity binding
//! - Definitions: named attribute handles and named states
//! - Type hierarchy: single-parent object types
//! - Attribute store: typed per-object cells with change detection
//! - Link graph: attribute-tagged edges between objects
//! - Locality tracker: per-object write authority
//! - Dispatch: filtered, ordered, reentrant-safe observer notification
//!
//! [`Runtime`] is the only entry point that mutates state. Everything is
//! single-threaded: a runtime belongs to one owner thread.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attributes;
pub mod config;
pub mod definitions;
pub mod dispatch;
pub mod hierarchy;
pub mod identity;
pub mod links;
pub mod locality;
pub mod runtime;
pub mod store;

pub use config::{RuntimeConfig, CONFIG_FILE_NAME};
pub use definitions::{Interned, STATE_SEPARATOR};
pub use dispatch::{
    AttributeFilter, AttributeWriter, Command, DispatchContext, ObjectObserver, Subscription,
};
pub use links::Link;
pub use runtime::Runtime;
pub use store::Store;

pub use tether_core::{
    AttributeHandle, Change, CounterRange, Error, Event, EventMask, Handle, Identity, LinkEnds,
    LinkHandle, Locality, Mask, Matrix, ObjectHandle, ObjectRef, ObjectType, ObserverId, Result,
    Value, ValueKind, Vector,
};
