//! Object locality
//!
//! Locality records which subsystem holds write authority for an object.
//! The runtime stores and reports it; enforcing it is the caller's job.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authority classification of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locality {
    /// Authority not yet established
    #[default]
    Unknown,
    /// Owned by this process (simulation may originate writes)
    Local,
    /// Owned elsewhere (network layer applies writes)
    Remote,
}

impl Locality {
    /// Display name
    pub const fn name(&self) -> &'static str {
        match self {
            Locality::Unknown => "Unknown",
            Locality::Local => "Local",
            Locality::Remote => "Remote",
        }
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
