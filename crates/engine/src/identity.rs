//! Identity registry
//!
//! Binds process-local object handles to globally unique identities, 1:1.
//! Both directions resolve in O(1). A handle keeps its binding until it is
//! released; the identity it held may then be bound again.

use rustc_hash::FxHashMap;
use tether_core::{Error, HandleAllocator, Identity, ObjectHandle, Result};
use tracing::debug;

/// Handle ↔ identity map
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    by_handle: FxHashMap<ObjectHandle, Identity>,
    by_identity: FxHashMap<Identity, ObjectHandle>,
}

impl IdentityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a handle bound to `identity`
    ///
    /// # Errors
    ///
    /// `DuplicateIdentity` if the identity is bound to a live handle.
    pub fn create(&mut self, alloc: &mut HandleAllocator, identity: Identity) -> Result<ObjectHandle> {
        if self.by_identity.contains_key(&identity) {
            return Err(Error::DuplicateIdentity(identity));
        }
        let handle = ObjectHandle::from_handle(alloc.mint());
        self.by_handle.insert(handle, identity);
        self.by_identity.insert(identity, handle);
        debug!(target: "tether::identity", object = %handle, %identity, "Identity bound");
        Ok(handle)
    }

    /// Current identity of `handle`
    pub fn resolve(&self, handle: ObjectHandle) -> Result<Identity> {
        self.by_handle
            .get(&handle)
            .copied()
            .ok_or(Error::UnknownHandle(handle.handle()))
    }

    /// Handle currently bound to `identity`
    pub fn lookup(&self, identity: &Identity) -> Option<ObjectHandle> {
        self.by_identity.get(identity).copied()
    }

    /// Rebind `handle` from `previous` to `identity`
    ///
    /// The swap happens only if `previous` is the current binding.
    ///
    /// # Errors
    ///
    /// - `UnknownHandle` if the handle is not bound
    /// - `StaleIdentity` if `previous` is not the current binding
    /// - `DuplicateIdentity` if `identity` is bound to another handle
    pub fn reassign(&mut self, handle: ObjectHandle, identity: Identity, previous: Identity) -> Result<()> {
        let current = self.resolve(handle)?;
        if current != previous {
            return Err(Error::StaleIdentity {
                expected: previous,
                actual: current,
            });
        }
        if current == identity {
            return Ok(());
        }
        if self.by_identity.contains_key(&identity) {
            return Err(Error::DuplicateIdentity(identity));
        }
        self.by_identity.remove(&current);
        self.by_identity.insert(identity, handle);
        self.by_handle.insert(handle, identity);
        debug!(target: "tether::identity", object = %handle, %identity, previous = %current, "Identity reassigned");
        Ok(())
    }

    /// Invalidate `handle`, returning the identity it held
    pub fn release(&mut self, handle: ObjectHandle) -> Result<Identity> {
        let identity = self
            .by_handle
            .remove(&handle)
            .ok_or(Error::UnknownHandle(handle.handle()))?;
        self.by_identity.remove(&identity);
        debug!(target: "tether::identity", object = %handle, %identity, "Identity released");
        Ok(identity)
    }

    /// True if `handle` is bound
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    /// Number of bound handles
    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    /// True if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}
