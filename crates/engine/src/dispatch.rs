//! Observer dispatch
//!
//! Observers register with a [`Subscription`] (category mask, optional
//! object-type scope, optional attribute filter) and receive every matching
//! [`Event`] synchronously, in registration order.
//!
//! ## Reentrancy
//!
//! A callback gets a [`DispatchContext`]: read-only access to the [`Store`]
//! and a queue of deferred [`Command`]s. Commands queued while one event is
//! being delivered are applied after every observer has seen that event, and
//! their own events go to the back of the runtime's FIFO queue. The store is
//! never mutated under an observer's feet and the call stack stays flat.
//!
//! ## Isolation
//!
//! A panicking callback is caught, logged and its queued commands discarded;
//! delivery continues with the next observer.

use crate::store::Store;
use smallvec::SmallVec;
use std::panic::{self, AssertUnwindSafe};
use tether_core::{
    AttributeHandle, Event, EventMask, Identity, LinkHandle, Locality, Mask, Matrix, ObjectHandle,
    ObjectType, ObserverId, Value, Vector,
};
use tracing::{error, info};

/// A change-notification subscriber
pub trait ObjectObserver {
    /// Called once per matching event
    fn notify(&mut self, event: &Event, ctx: &mut DispatchContext<'_>);
}

impl<F> ObjectObserver for F
where
    F: FnMut(&Event, &mut DispatchContext<'_>),
{
    fn notify(&mut self, event: &Event, ctx: &mut DispatchContext<'_>) {
        self(event, ctx)
    }
}

/// Attribute handles an observer is restricted to
pub type AttributeFilter = SmallVec<[AttributeHandle; 4]>;

/// Filter deciding which events an observer receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Event categories delivered
    pub mask: EventMask,
    /// Restrict object events to this type and its descendants
    pub object_type: Option<ObjectType>,
    /// Restrict attribute and link events to these handles
    ///
    /// Events that concern no attribute (create, destroy, identity,
    /// locality, definitions) are not affected.
    pub attributes: Option<AttributeFilter>,
    /// Replay every definition to the observer when it subscribes
    pub dump_definitions: bool,
}

impl Subscription {
    /// All events for all objects
    pub fn global() -> Self {
        Self {
            mask: EventMask::ALL,
            object_type: None,
            attributes: None,
            dump_definitions: false,
        }
    }

    /// All events for objects of `object_type` or a descendant type
    pub fn for_type(object_type: ObjectType) -> Self {
        Self {
            object_type: Some(object_type),
            ..Self::global()
        }
    }

    /// Replace the category mask
    pub fn with_mask(mut self, mask: EventMask) -> Self {
        self.mask = mask;
        self
    }

    /// Only deliver attribute and link events for `attributes`
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = AttributeHandle>) -> Self {
        self.attributes = Some(attributes.into_iter().collect());
        self
    }

    /// Request a definitions dump at subscription time
    pub fn with_definitions_dump(mut self) -> Self {
        self.dump_definitions = true;
        self
    }

    /// True if `event` passes this filter
    ///
    /// Definition events ignore the type scope. Link events match when
    /// either endpoint is in scope.
    pub fn matches(&self, event: &Event, store: &Store) -> bool {
        if !self.mask.intersects(event.mask()) {
            return false;
        }
        if let (Some(filter), Some(attribute)) = (&self.attributes, event.attribute()) {
            if !filter.contains(&attribute) {
                return false;
            }
        }
        let Some(scope) = self.object_type else {
            return true;
        };
        if event.is_definition() {
            return true;
        }
        event
            .subjects()
            .into_iter()
            .flatten()
            .any(|object| store.is_object_of_type(object, scope))
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::global()
    }
}

/// A mutation queued for later application
///
/// Commands are what observers issue through [`DispatchContext`]; they can
/// also be submitted directly with `Runtime::submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Create an object
    CreateObject {
        /// Identity to bind
        identity: Identity,
        /// Concrete type
        object_type: ObjectType,
        /// Initial locality
        locality: Locality,
    },
    /// Destroy an object
    DestroyObject(ObjectHandle),
    /// Rebind an object to a new identity
    ReassignIdentity {
        /// Object
        object: ObjectHandle,
        /// New identity
        identity: Identity,
        /// Identity the caller believes is current
        previous: Identity,
    },
    /// Change locality
    SetLocality {
        /// Object
        object: ObjectHandle,
        /// New locality
        locality: Locality,
    },
    /// Write a cell
    SetAttribute {
        /// Object
        object: ObjectHandle,
        /// Attribute slot
        attribute: AttributeHandle,
        /// Value to store
        value: Value,
    },
    /// Add to a counter cell
    AddToCounter {
        /// Object
        object: ObjectHandle,
        /// Counter attribute
        attribute: AttributeHandle,
        /// Signed increment
        delta: i64,
    },
    /// Collapse a counter's range onto its value
    ResetCounterRange {
        /// Object
        object: ObjectHandle,
        /// Counter attribute
        attribute: AttributeHandle,
    },
    /// Delete a cell
    RemoveAttribute {
        /// Object
        object: ObjectHandle,
        /// Attribute slot
        attribute: AttributeHandle,
    },
    /// Add a link
    Link {
        /// Source endpoint
        superior: ObjectHandle,
        /// Relationship kind
        attribute: AttributeHandle,
        /// Target endpoint
        subordinate: ObjectHandle,
    },
    /// Remove a link
    Unlink(LinkHandle),
    /// Replace a link's attribute object
    UpdateLinkAttributeObject {
        /// Link
        link: LinkHandle,
        /// New attribute object, `None` to clear
        attribute_object: Option<ObjectHandle>,
    },
}

impl Command {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateObject { .. } => "create_object",
            Command::DestroyObject(_) => "destroy_object",
            Command::ReassignIdentity { .. } => "reassign_identity",
            Command::SetLocality { .. } => "set_locality",
            Command::SetAttribute { .. } => "set_attribute",
            Command::AddToCounter { .. } => "add_to_counter",
            Command::ResetCounterRange { .. } => "reset_counter_range",
            Command::RemoveAttribute { .. } => "remove_attribute",
            Command::Link { .. } => "link",
            Command::Unlink(_) => "unlink",
            Command::UpdateLinkAttributeObject { .. } => "update_link_attribute_object",
        }
    }
}

/// Typed cell mutators shared by the runtime and the dispatch context
///
/// Implementors provide [`set_attribute`](Self::set_attribute); each typed
/// setter wraps its argument in the matching [`Value`] variant.
pub trait AttributeWriter {
    /// What a write returns: a result on the runtime, nothing when deferred
    type Output;

    /// Write any value kind
    fn set_attribute(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: Value) -> Self::Output;

    /// Write a scalar cell
    fn set_scalar(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: f64) -> Self::Output {
        self.set_attribute(object, attribute, Value::Scalar(value))
    }

    /// Write a vector cell
    fn set_vector(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: Vector) -> Self::Output {
        self.set_attribute(object, attribute, Value::Vector(value))
    }

    /// Write a matrix cell
    fn set_matrix(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: Matrix) -> Self::Output {
        self.set_attribute(object, attribute, Value::Matrix(value))
    }

    /// Write a text cell
    fn set_text(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: impl Into<String>) -> Self::Output {
        self.set_attribute(object, attribute, Value::Text(value.into()))
    }

    /// Write a data cell
    fn set_data(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: impl Into<Vec<u8>>) -> Self::Output {
        self.set_attribute(object, attribute, Value::Data(value.into()))
    }

    /// Write a counter cell
    fn set_counter(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: i64) -> Self::Output {
        self.set_attribute(object, attribute, Value::Counter(value))
    }

    /// Write a state mask cell
    fn set_mask(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: Mask) -> Self::Output {
        self.set_attribute(object, attribute, Value::Mask(value))
    }

    /// Write a flag cell
    fn set_flag(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: bool) -> Self::Output {
        self.set_attribute(object, attribute, Value::Flag(value))
    }

    /// Write a time stamp cell
    fn set_time_stamp(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: f64) -> Self::Output {
        self.set_attribute(object, attribute, Value::TimeStamp(value))
    }

    /// Write an alternate type cell
    fn set_alternate_type(
        &mut self,
        object: ObjectHandle,
        attribute: AttributeHandle,
        value: ObjectType,
    ) -> Self::Output {
        self.set_attribute(object, attribute, Value::AlternateType(value))
    }
}

/// What an observer can do while handling an event
pub struct DispatchContext<'a> {
    store: &'a Store,
    observer: ObserverId,
    commands: &'a mut Vec<Command>,
    unsubscribed: &'a mut Vec<ObserverId>,
}

impl<'a> DispatchContext<'a> {
    /// Current runtime state
    pub fn store(&self) -> &'a Store {
        self.store
    }

    /// Id of the observer being called
    pub fn observer(&self) -> ObserverId {
        self.observer
    }

    /// Queue a mutation for after the current event
    pub fn defer(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Remove an observer; it receives nothing further, including the
    /// remainder of the current event
    pub fn unsubscribe(&mut self, observer: ObserverId) {
        self.unsubscribed.push(observer);
    }

    /// Remove the observer being called
    pub fn unsubscribe_self(&mut self) {
        let id = self.observer;
        self.unsubscribe(id);
    }

    /// Queue [`Command::CreateObject`]
    pub fn create_object(&mut self, identity: Identity, object_type: ObjectType, locality: Locality) {
        self.defer(Command::CreateObject {
            identity,
            object_type,
            locality,
        });
    }

    /// Queue [`Command::DestroyObject`]
    pub fn destroy_object(&mut self, object: ObjectHandle) {
        self.defer(Command::DestroyObject(object));
    }

    /// Queue [`Command::ReassignIdentity`]
    pub fn reassign_identity(&mut self, object: ObjectHandle, identity: Identity, previous: Identity) {
        self.defer(Command::ReassignIdentity {
            object,
            identity,
            previous,
        });
    }

    /// Queue [`Command::SetLocality`]
    pub fn set_locality(&mut self, object: ObjectHandle, locality: Locality) {
        self.defer(Command::SetLocality { object, locality });
    }

    /// Queue [`Command::AddToCounter`]
    pub fn add_to_counter(&mut self, object: ObjectHandle, attribute: AttributeHandle, delta: i64) {
        self.defer(Command::AddToCounter {
            object,
            attribute,
            delta,
        });
    }

    /// Queue [`Command::ResetCounterRange`]
    pub fn reset_counter_range(&mut self, object: ObjectHandle, attribute: AttributeHandle) {
        self.defer(Command::ResetCounterRange { object, attribute });
    }

    /// Queue [`Command::RemoveAttribute`]
    pub fn remove_attribute(&mut self, object: ObjectHandle, attribute: AttributeHandle) {
        self.defer(Command::RemoveAttribute { object, attribute });
    }

    /// Queue [`Command::Link`]
    pub fn link(&mut self, superior: ObjectHandle, attribute: AttributeHandle, subordinate: ObjectHandle) {
        self.defer(Command::Link {
            superior,
            attribute,
            subordinate,
        });
    }

    /// Queue [`Command::Unlink`]
    pub fn unlink(&mut self, link: LinkHandle) {
        self.defer(Command::Unlink(link));
    }

    /// Queue [`Command::UpdateLinkAttributeObject`]
    pub fn update_link_attribute_object(&mut self, link: LinkHandle, attribute_object: Option<ObjectHandle>) {
        self.defer(Command::UpdateLinkAttributeObject {
            link,
            attribute_object,
        });
    }
}

impl AttributeWriter for DispatchContext<'_> {
    type Output = ();

    fn set_attribute(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: Value) {
        self.defer(Command::SetAttribute {
            object,
            attribute,
            value,
        });
    }
}

struct Entry {
    id: ObserverId,
    subscription: Subscription,
    observer: Box<dyn ObjectObserver>,
    active: bool,
}

/// Registered observers in subscription order
pub(crate) struct ObserverRegistry {
    entries: Vec<Entry>,
    next_id: u64,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    pub(crate) fn subscribe(&mut self, observer: Box<dyn ObjectObserver>, subscription: Subscription) -> ObserverId {
        let id = ObserverId::from_raw(self.next_id);
        self.next_id += 1;
        info!(
            target: "tether::dispatch",
            observer = %id,
            mask = ?subscription.mask,
            object_type = ?subscription.object_type,
            attributes = ?subscription.attributes,
            "Observer subscribed"
        );
        self.entries.push(Entry {
            id,
            subscription,
            observer,
            active: true,
        });
        id
    }

    /// Deactivate `id`; returns false if it is not registered
    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id && e.active) {
            Some(entry) => {
                entry.active = false;
                info!(target: "tether::dispatch", observer = %id, "Observer unsubscribed");
                true
            }
            None => false,
        }
    }

    pub(crate) fn subscription_mut(&mut self, id: ObserverId) -> Option<&mut Subscription> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id && e.active)
            .map(|e| &mut e.subscription)
    }

    pub(crate) fn subscription(&self, id: ObserverId) -> Option<Subscription> {
        self.entries
            .iter()
            .find(|e| e.id == id && e.active)
            .map(|e| e.subscription.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.active).count()
    }

    /// Deliver `event` to every matching observer in subscription order
    ///
    /// Commands queued by callbacks are appended to `commands`.
    pub(crate) fn deliver(&mut self, event: &Event, store: &Store, commands: &mut Vec<Command>) {
        let mut index = 0;
        while index < self.entries.len() {
            let entry = &mut self.entries[index];
            index += 1;
            if !entry.active || !entry.subscription.matches(event, store) {
                continue;
            }
            let unsubscribed = Self::invoke(entry, event, store, commands);
            for id in unsubscribed {
                self.unsubscribe(id);
            }
        }
        self.entries.retain(|e| e.active);
    }

    /// Deliver `event` to one observer, applying its filter
    ///
    /// Returns false once the observer is no longer registered.
    pub(crate) fn deliver_to(
        &mut self,
        id: ObserverId,
        event: &Event,
        store: &Store,
        commands: &mut Vec<Command>,
    ) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id && e.active) else {
            return false;
        };
        if entry.subscription.matches(event, store) {
            let unsubscribed = Self::invoke(entry, event, store, commands);
            for other in unsubscribed {
                self.unsubscribe(other);
            }
            self.entries.retain(|e| e.active);
        }
        self.entries.iter().any(|e| e.id == id)
    }

    fn invoke(
        entry: &mut Entry,
        event: &Event,
        store: &Store,
        commands: &mut Vec<Command>,
    ) -> Vec<ObserverId> {
        let mark = commands.len();
        let mut unsubscribed = Vec::new();
        let mut ctx = DispatchContext {
            store,
            observer: entry.id,
            commands: &mut *commands,
            unsubscribed: &mut unsubscribed,
        };
        let observer = entry.observer.as_mut();
        if let Err(e) = panic::catch_unwind(AssertUnwindSafe(|| observer.notify(event, &mut ctx))) {
            error!(
                target: "tether::dispatch",
                observer = %entry.id,
                "Observer panicked: {:?}",
                e.downcast_ref::<&str>()
                    .copied()
                    .or_else(|| e.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("(non-string panic)")
            );
            commands.truncate(mark);
            unsubscribed.clear();
        }
        unsubscribed
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}
