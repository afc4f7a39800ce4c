//! Tether - handle-addressed object runtime
//!
//! Tether stores typed attribute cells on objects identified by process-local
//! handles and globally unique identities, links objects into a directed
//! graph, and notifies subscribed observers of every change synchronously and
//! in order.
//!
//! # Quick Start
//!
//! ```
//! use tether::{AttributeWriter, DispatchContext, Event, Identity, Locality, Runtime};
//!
//! let mut rt = Runtime::new();
//! let unit = rt.define_type("unit", None)?;
//! let health = rt.define_named_handle("health");
//!
//! rt.activate_global_object_observer(|event: &Event, _: &mut DispatchContext<'_>| {
//!     println!("{:?}", event);
//! });
//!
//! let tank = rt.create_object(Identity::new(), unit, Locality::Local)?;
//! rt.set_scalar(tank, health, 100.0)?;
//! assert_eq!(rt.store().scalar(tank, health), Some(100.0));
//! # Ok::<(), tether::Error>(())
//! ```
//!
//! # Architecture
//!
//! All mutations go through [`Runtime`]. Observers read state through
//! [`Store`] and queue further mutations on their [`DispatchContext`]; those
//! are applied after the current notification has reached every observer.

// Re-export the public API from tether-engine
pub use tether_engine::*;
