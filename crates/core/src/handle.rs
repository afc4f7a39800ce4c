//! Handle and identity types
//!
//! This module defines the foundational identifiers:
//! - Handle: process-local, non-zero integer naming a runtime entity
//! - ObjectHandle / AttributeHandle / LinkHandle / ObjectType: typed handles
//! - Identity: globally unique identifier (UUID) bound to an object handle
//! - ObserverId: subscription identifier returned by the dispatcher
//! - HandleAllocator: the single source of fresh handles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use uuid::Uuid;

/// Process-local opaque identifier for a runtime entity
///
/// Handles are never zero; "no handle" is expressed with `Option<Handle>`.
/// A handle is never reused for the lifetime of the allocator that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(NonZeroU64);

impl Handle {
    /// Create a handle from a raw value, `None` for zero
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Raw integer value of this handle
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Handle);

        impl $name {
            /// Wrap an untyped handle
            #[inline]
            pub const fn from_handle(handle: Handle) -> Self {
                Self(handle)
            }

            /// The untyped handle
            #[inline]
            pub const fn handle(self) -> Handle {
                self.0
            }

            /// Raw integer value
            #[inline]
            pub const fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl From<$name> for Handle {
            fn from(h: $name) -> Handle {
                h.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_handle!(
    /// Handle of a live (or dying) object
    ObjectHandle
);

typed_handle!(
    /// Handle minted by the definitions table for a named attribute slot
    AttributeHandle
);

typed_handle!(
    /// Handle of a directed link between two objects
    LinkHandle
);

typed_handle!(
    /// Node in the object type hierarchy
    ObjectType
);

/// Globally unique identity of an object
///
/// An Identity is a wrapper around a UUID. Each live object has exactly one
/// current identity and no two live objects share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(Uuid);

impl Identity {
    /// Create a new random identity using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an identity from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Create an identity from a UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an identity from a string representation
    ///
    /// Accepts standard UUID format (with or without hyphens).
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the raw bytes of this identity
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

impl ObserverId {
    /// Create an observer id from its raw value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw integer value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Monotonic handle source
///
/// One allocator is shared by objects, attribute handles, links and object
/// types, so a handle value names at most one entity ever.
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    next: NonZeroU64,
}

impl HandleAllocator {
    /// Create an allocator whose first handle is 1
    pub fn new() -> Self {
        Self {
            next: NonZeroU64::MIN,
        }
    }

    /// Mint a fresh handle
    pub fn mint(&mut self) -> Handle {
        let handle = Handle(self.next);
        self.next = self.next.saturating_add(1);
        handle
    }

    /// Number of handles minted so far
    pub fn minted(&self) -> u64 {
        self.next.get() - 1
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
