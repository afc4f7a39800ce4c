//! Definitions table
//!
//! Interns names so the rest of the runtime compares integers:
//! - named attribute handles ("position", "state", link kinds, ...)
//! - named states, each owning one bit of the [`Mask`] space
//!
//! Definitions are idempotent: defining a name twice returns the first
//! result and reports it as [`Interned::Existing`], so no second
//! notification is raised.

use rustc_hash::FxHashMap;
use tether_core::{AttributeHandle, Error, HandleAllocator, Mask, Result};
use tracing::debug;

/// Separator accepted by [`Definitions::lookup_state`] and produced by
/// [`Definitions::lookup_state_name`]
pub const STATE_SEPARATOR: &str = " | ";

/// Result of an idempotent definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interned<T> {
    /// Name was new; a definition event is due
    New(T),
    /// Name was already defined
    Existing(T),
}

impl<T: Copy> Interned<T> {
    /// The interned value
    pub fn get(&self) -> T {
        match self {
            Interned::New(v) | Interned::Existing(v) => *v,
        }
    }

    /// True if this call created the definition
    pub fn is_new(&self) -> bool {
        matches!(self, Interned::New(_))
    }
}

/// Name ↔ handle and name ↔ state-bit tables
#[derive(Debug)]
pub struct Definitions {
    named: FxHashMap<String, AttributeHandle>,
    named_order: Vec<(AttributeHandle, String)>,
    handle_names: FxHashMap<AttributeHandle, usize>,
    states: Vec<String>,
    state_bits: FxHashMap<String, u32>,
    state_capacity: u32,
}

impl Definitions {
    /// Create a table with room for `state_capacity` named states
    ///
    /// The capacity is clamped to the width of [`Mask`].
    pub fn new(state_capacity: u32) -> Self {
        Self {
            named: FxHashMap::default(),
            named_order: Vec::new(),
            handle_names: FxHashMap::default(),
            states: Vec::new(),
            state_bits: FxHashMap::default(),
            state_capacity: state_capacity.min(Mask::BITS),
        }
    }

    // ========== Named handles ==========

    /// Intern `name` as an attribute handle
    pub fn define_named_handle(&mut self, alloc: &mut HandleAllocator, name: &str) -> Interned<AttributeHandle> {
        if let Some(handle) = self.named.get(name) {
            return Interned::Existing(*handle);
        }
        let handle = AttributeHandle::from_handle(alloc.mint());
        self.named.insert(name.to_string(), handle);
        self.handle_names.insert(handle, self.named_order.len());
        self.named_order.push((handle, name.to_string()));
        debug!(target: "tether::defs", %handle, name, "Named handle defined");
        Interned::New(handle)
    }

    /// Handle interned for `name`
    pub fn lookup_named_handle(&self, name: &str) -> Option<AttributeHandle> {
        self.named.get(name).copied()
    }

    /// Name interned for `handle`
    pub fn named_handle_name(&self, handle: AttributeHandle) -> Option<&str> {
        self.handle_names
            .get(&handle)
            .map(|&index| self.named_order[index].1.as_str())
    }

    /// True if `handle` was minted by this table
    pub fn is_named_handle(&self, handle: AttributeHandle) -> bool {
        self.handle_names.contains_key(&handle)
    }

    /// Named handles in definition order
    pub fn named_handles(&self) -> impl Iterator<Item = (AttributeHandle, &str)> {
        self.named_order.iter().map(|(h, n)| (*h, n.as_str()))
    }

    // ========== Named states ==========

    /// Assign the next free state bit to `name`
    ///
    /// # Errors
    ///
    /// `StateSpaceExhausted` when every bit is taken and `name` is new.
    pub fn define_state(&mut self, name: &str) -> Result<Interned<u32>> {
        if let Some(bit) = self.state_bits.get(name) {
            return Ok(Interned::Existing(*bit));
        }
        let bit = self.states.len() as u32;
        if bit >= self.state_capacity {
            return Err(Error::StateSpaceExhausted {
                capacity: self.state_capacity,
            });
        }
        self.states.push(name.to_string());
        self.state_bits.insert(name.to_string(), bit);
        debug!(target: "tether::defs", bit, name, "State defined");
        Ok(Interned::New(bit))
    }

    /// Bit index of the state `name`
    pub fn state_bit(&self, name: &str) -> Option<u32> {
        self.state_bits.get(name).copied()
    }

    /// Mask for a state name or a `|`-separated list of names
    ///
    /// Unknown names contribute nothing, so probing an undefined name yields
    /// the empty mask instead of an error.
    pub fn lookup_state(&self, names: &str) -> Mask {
        names
            .split('|')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .filter_map(|n| self.state_bits.get(n))
            .filter_map(|&bit| Mask::bit(bit))
            .fold(Mask::EMPTY, |acc, m| acc | m)
    }

    /// Names of the defined bits in `mask`, ascending, joined with `" | "`
    ///
    /// Bits without a defined name are skipped; the empty mask yields `""`.
    pub fn lookup_state_name(&self, mask: Mask) -> String {
        mask.bit_indices()
            .filter_map(|bit| self.states.get(bit as usize))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(STATE_SEPARATOR)
    }

    /// States in definition (= bit) order
    pub fn states(&self) -> impl Iterator<Item = (Mask, &str)> {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(bit, name)| Mask::bit(bit as u32).map(|m| (m, name.as_str())))
    }

    /// Union of every defined state bit
    pub fn defined_states(&self) -> Mask {
        self.states().fold(Mask::EMPTY, |acc, (mask, _)| acc | mask)
    }

    /// Maximum number of named states
    pub fn state_capacity(&self) -> u32 {
        self.state_capacity
    }
}
