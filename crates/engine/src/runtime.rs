//! Runtime context
//!
//! [`Runtime`] composes the [`Store`] with the observer registry and the
//! dispatch queue. It is the only type with public mutators.
//!
//! Every mutator follows the same sequence:
//! 1. validate and apply the change to the store
//! 2. queue the resulting notifications
//! 3. drain the queue: deliver each event to matching observers, apply the
//!    commands they deferred, repeat until empty
//!
//! The call returns after step 3, so every observer has seen the change and
//! all of its consequences. A failed mutation queues nothing.
//!
//! `max_dispatch_work` bounds how many observer-deferred commands one
//! mutation may apply. Commands past the bound are rejected and logged. Every
//! notification already queued is still delivered.

use crate::config::RuntimeConfig;
use crate::dispatch::{AttributeWriter, Command, ObjectObserver, ObserverRegistry, Subscription};
use crate::store::{Store, Work, WorkQueue};
use tether_core::{
    AttributeHandle, Change, Error, Event, EventMask, Identity, LinkHandle, Locality, Mask,
    ObjectHandle, ObjectType, ObserverId, Result, Value,
};
use tracing::{info, warn};

/// The object runtime
#[derive(Debug)]
pub struct Runtime {
    config: RuntimeConfig,
    store: Store,
    observers: ObserverRegistry,
    queue: WorkQueue,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Runtime with default configuration
    pub fn new() -> Self {
        Self::build(RuntimeConfig::default())
    }

    /// Runtime with `config`
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `config` fails validation.
    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RuntimeConfig) -> Self {
        info!(
            target: "tether::runtime",
            state_capacity = config.state_capacity,
            max_dispatch_work = config.max_dispatch_work,
            "Runtime created"
        );
        Self {
            store: Store::new(config.state_capacity),
            observers: ObserverRegistry::new(),
            queue: WorkQueue::new(),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Read access to all runtime state
    pub fn store(&self) -> &Store {
        &self.store
    }

    // ========== Definitions ==========

    /// Intern `name` as an attribute handle; idempotent
    pub fn define_named_handle(&mut self, name: &str) -> AttributeHandle {
        let handle = self.store.define_named_handle(name, &mut self.queue);
        self.drain(&mut 0);
        handle
    }

    /// Assign the next state bit to `name`; idempotent
    ///
    /// # Errors
    ///
    /// `StateSpaceExhausted` when every bit is taken.
    pub fn define_state(&mut self, name: &str) -> Result<u32> {
        self.run(|store, out| store.define_state(name, out))
    }

    /// Define an object type under `parent` (`None` = root)
    pub fn define_type(&mut self, name: &str, parent: Option<ObjectType>) -> Result<ObjectType> {
        self.run(|store, out| store.define_type(name, parent, out))
    }

    /// Move a type under a new parent
    ///
    /// # Errors
    ///
    /// `InvalidHierarchy` if the move would create a cycle.
    pub fn reparent_type(&mut self, object_type: ObjectType, parent: Option<ObjectType>) -> Result<()> {
        self.run(|store, out| store.reparent_type(object_type, parent, out))
    }

    /// Mask for a state name or `|`-separated names
    pub fn lookup_state(&self, names: &str) -> Mask {
        self.store.lookup_state(names)
    }

    /// Names of the defined bits in `mask`
    pub fn lookup_state_name(&self, mask: Mask) -> String {
        self.store.lookup_state_name(mask)
    }

    /// True if `candidate_ancestor` is `object_type` or one of its ancestors
    pub fn is_of_type(&self, object_type: ObjectType, candidate_ancestor: ObjectType) -> bool {
        self.store.is_of_type(object_type, candidate_ancestor)
    }

    // ========== Objects ==========

    /// Create an object bound to `identity`
    ///
    /// # Errors
    ///
    /// - `DuplicateIdentity` if `identity` is live
    /// - `UnknownHandle` if `object_type` is not defined
    pub fn create_object(
        &mut self,
        identity: Identity,
        object_type: ObjectType,
        locality: Locality,
    ) -> Result<ObjectHandle> {
        self.run(|store, out| store.create_object(identity, object_type, locality, out))
    }

    /// Destroy an object
    ///
    /// Link attribute-object references to it are cleared and incident links
    /// removed before the destroy notification. Its cells stay readable until
    /// that notification has been delivered.
    pub fn destroy_object(&mut self, object: ObjectHandle) -> Result<()> {
        self.run(|store, out| store.destroy_object(object, out))
    }

    /// Rebind `object` from `previous` to `identity`
    ///
    /// # Errors
    ///
    /// `StaleIdentity` if `previous` is not the current identity.
    pub fn reassign_identity(&mut self, object: ObjectHandle, identity: Identity, previous: Identity) -> Result<()> {
        self.run(|store, out| store.reassign_identity(object, identity, previous, out))
    }

    /// Change the locality of `object`
    pub fn set_locality(&mut self, object: ObjectHandle, locality: Locality) -> Result<Change<Locality>> {
        self.run(|store, out| store.set_locality(object, locality, out))
    }

    // ========== Attributes ==========

    /// Add `delta` to a counter cell, starting from 0 if unset
    ///
    /// Returns the new value; the addition saturates.
    pub fn add_to_counter(&mut self, object: ObjectHandle, attribute: AttributeHandle, delta: i64) -> Result<i64> {
        self.run(|store, out| store.add_to_counter(object, attribute, delta, out))
    }

    /// Collapse a counter's range onto its current value
    pub fn reset_counter_range(&mut self, object: ObjectHandle, attribute: AttributeHandle) -> Result<()> {
        self.run(|store, out| store.reset_counter_range(object, attribute, out))
    }

    /// Delete a cell, returning the value it held
    pub fn remove_attribute(&mut self, object: ObjectHandle, attribute: AttributeHandle) -> Result<Option<Value>> {
        self.run(|store, out| store.remove_attribute(object, attribute, out))
    }

    // ========== Links ==========

    /// Add the edge `superior -[attribute]-> subordinate`
    ///
    /// # Errors
    ///
    /// - `UnknownObject` if either endpoint is not live
    /// - `UnknownHandle` if `attribute` is not a named handle
    /// - `DuplicateLink` if the triple exists
    pub fn link(
        &mut self,
        superior: ObjectHandle,
        attribute: AttributeHandle,
        subordinate: ObjectHandle,
    ) -> Result<LinkHandle> {
        self.run(|store, out| store.link(superior, attribute, subordinate, out))
    }

    /// Remove an edge
    pub fn unlink(&mut self, link: LinkHandle) -> Result<()> {
        self.run(|store, out| store.unlink(link, out))
    }

    /// Replace the attribute object of an edge
    pub fn update_link_attribute_object(
        &mut self,
        link: LinkHandle,
        attribute_object: Option<ObjectHandle>,
    ) -> Result<Change<ObjectHandle>> {
        self.run(|store, out| store.update_link_attribute_object(link, attribute_object, out))
    }

    /// Apply a [`Command`] immediately
    pub fn submit(&mut self, command: Command) -> Result<()> {
        self.run(|store, out| store.apply(command, out))
    }

    // ========== Observers ==========

    /// Register `observer` with `subscription`
    ///
    /// If the subscription asks for it, every definition is replayed to the
    /// new observer before this returns.
    pub fn subscribe<O>(&mut self, observer: O, subscription: Subscription) -> ObserverId
    where
        O: ObjectObserver + 'static,
    {
        let dump_definitions = subscription.dump_definitions;
        let id = self.observers.subscribe(Box::new(observer), subscription);
        if dump_definitions {
            let events = self.store.replay_definitions();
            self.replay_to(id, events);
        }
        id
    }

    /// Register an observer for every event on every object
    pub fn activate_global_object_observer<O>(&mut self, observer: O) -> ObserverId
    where
        O: ObjectObserver + 'static,
    {
        self.subscribe(observer, Subscription::global())
    }

    /// Register an observer for objects of `object_type` and its descendants
    ///
    /// # Errors
    ///
    /// `UnknownHandle` if `object_type` is not defined.
    pub fn activate_type_observer<O>(&mut self, observer: O, object_type: ObjectType) -> Result<ObserverId>
    where
        O: ObjectObserver + 'static,
    {
        self.require_type(object_type)?;
        Ok(self.subscribe(observer, Subscription::for_type(object_type)))
    }

    /// Remove an observer
    pub fn unsubscribe(&mut self, observer: ObserverId) -> Result<()> {
        if self.observers.unsubscribe(observer) {
            Ok(())
        } else {
            Err(Error::UnknownObserver(observer))
        }
    }

    /// Replace an observer's category mask
    pub fn set_observer_mask(&mut self, observer: ObserverId, mask: EventMask) -> Result<()> {
        let subscription = self
            .observers
            .subscription_mut(observer)
            .ok_or(Error::UnknownObserver(observer))?;
        subscription.mask = mask;
        Ok(())
    }

    /// Replace an observer's type scope (`None` = all objects)
    pub fn set_observer_type_filter(&mut self, observer: ObserverId, object_type: Option<ObjectType>) -> Result<()> {
        if let Some(t) = object_type {
            self.require_type(t)?;
        }
        let subscription = self
            .observers
            .subscription_mut(observer)
            .ok_or(Error::UnknownObserver(observer))?;
        subscription.object_type = object_type;
        Ok(())
    }

    /// Restrict an observer's attribute and link events to `attributes`
    /// (`None` = every attribute)
    ///
    /// # Errors
    ///
    /// - `UnknownObserver` if `observer` is not registered
    /// - `UnknownHandle` if a handle is not a named handle
    pub fn set_observer_attribute_filter(
        &mut self,
        observer: ObserverId,
        attributes: Option<&[AttributeHandle]>,
    ) -> Result<()> {
        if let Some(handle) = attributes
            .into_iter()
            .flatten()
            .find(|a| self.store.definitions().named_handle_name(**a).is_none())
        {
            return Err(Error::UnknownHandle(handle.handle()));
        }
        let subscription = self
            .observers
            .subscription_mut(observer)
            .ok_or(Error::UnknownObserver(observer))?;
        subscription.attributes = attributes.map(|a| a.iter().copied().collect());
        Ok(())
    }

    /// Current filter of an observer
    pub fn subscription(&self, observer: ObserverId) -> Option<Subscription> {
        self.observers.subscription(observer)
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Replay the current state of `object` to one observer
    ///
    /// The observer's filter applies; nothing is sent to other observers.
    ///
    /// # Errors
    ///
    /// `UnknownObserver` or `UnknownObject`.
    pub fn dump_all_object_attributes(&mut self, object: ObjectHandle, observer: ObserverId) -> Result<()> {
        self.require_observer(observer)?;
        let events = self.store.replay_object(object)?;
        self.replay_to(observer, events);
        Ok(())
    }

    /// Replay every definition to one observer
    pub fn dump_definitions(&mut self, observer: ObserverId) -> Result<()> {
        self.require_observer(observer)?;
        let events = self.store.replay_definitions();
        self.replay_to(observer, events);
        Ok(())
    }

    // ========== Dispatch ==========

    fn run<T>(&mut self, mutation: impl FnOnce(&mut Store, &mut WorkQueue) -> Result<T>) -> Result<T> {
        let result = mutation(&mut self.store, &mut self.queue);
        self.drain(&mut 0);
        result
    }

    fn replay_to(&mut self, observer: ObserverId, events: Vec<Event>) {
        let mut applied = 0;
        let mut commands = Vec::new();
        for event in &events {
            if !self
                .observers
                .deliver_to(observer, event, &self.store, &mut commands)
            {
                break;
            }
            self.apply_commands(&mut commands, &mut applied);
        }
        self.apply_commands(&mut commands, &mut applied);
        self.drain(&mut applied);
    }

    /// Deliver and release everything queued
    ///
    /// `applied` counts deferred commands applied so far for the current
    /// top-level mutation.
    fn drain(&mut self, applied: &mut usize) {
        let mut commands = Vec::new();
        while let Some(work) = self.queue.pop_front() {
            match work {
                Work::Notify(event) => {
                    self.observers.deliver(&event, &self.store, &mut commands);
                    self.apply_commands(&mut commands, applied);
                }
                Work::Release(object) => self.store.release(object),
            }
        }
    }

    fn apply_commands(&mut self, commands: &mut Vec<Command>, applied: &mut usize) {
        let limit = self.config.max_dispatch_work;
        for command in commands.drain(..) {
            let name = command.name();
            if *applied >= limit {
                warn!(
                    target: "tether::dispatch",
                    command = name,
                    limit,
                    "Deferred mutation rejected: dispatch work bound exceeded"
                );
                continue;
            }
            *applied += 1;
            if let Err(e) = self.store.apply(command, &mut self.queue) {
                warn!(target: "tether::dispatch", command = name, error = %e, "Deferred mutation rejected");
            }
        }
    }

    fn require_observer(&self, observer: ObserverId) -> Result<()> {
        self.observers
            .subscription(observer)
            .map(drop)
            .ok_or(Error::UnknownObserver(observer))
    }

    fn require_type(&self, object_type: ObjectType) -> Result<()> {
        if self.store.types().contains(object_type) {
            Ok(())
        } else {
            Err(Error::UnknownHandle(object_type.handle()))
        }
    }
}

impl AttributeWriter for Runtime {
    type Output = Result<Change<Value>>;

    /// Write a cell
    ///
    /// # Errors
    ///
    /// - `UnknownObject` if `object` is not live
    /// - `UnknownHandle` if `attribute` is not a named handle
    /// - `KindMismatch` if the cell holds another kind
    fn set_attribute(&mut self, object: ObjectHandle, attribute: AttributeHandle, value: Value) -> Self::Output {
        self.run(|store, out| store.write_attribute(object, attribute, value, out))
    }
}
