//! Object store
//!
//! The [`Store`] owns every piece of runtime state except the observers:
//! handle allocator, identities, definitions, type hierarchy, object records,
//! attribute cells, links and localities.
//!
//! ## Mutation protocol
//!
//! Mutators are crate-private. Each one validates first and only then
//! changes state, so a failed call leaves the store untouched. Accepted
//! changes are described as [`Work`] pushed onto the caller's queue; the
//! runtime drains that queue through the observers.
//!
//! Destroying an object marks it dead immediately (further writes fail with
//! `UnknownObject`) but keeps its record and cells until the queued
//! [`Work::Release`] that follows its destroy notification, so observers can
//! still read its final state.

use crate::attributes::{AttributeStore, BoundChange};
use crate::definitions::Definitions;
use crate::dispatch::Command;
use crate::hierarchy::TypeHierarchy;
use crate::identity::IdentityRegistry;
use crate::links::{Link, LinkGraph, LinkList};
use crate::locality::LocalityTracker;
use std::collections::{BTreeMap, VecDeque};
use tether_core::{
    AttributeHandle, Change, CounterRange, Error, Event, HandleAllocator, Identity, LinkEnds,
    LinkHandle, Locality, Mask, Matrix, ObjectHandle, ObjectRef, ObjectType, Result, Value,
    ValueKind, Vector,
};
use tracing::{debug, info};

/// Unit of dispatch work
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Work {
    /// Deliver an event to every matching observer
    Notify(Event),
    /// Free the storage of a destroyed object
    Release(ObjectHandle),
}

pub(crate) type WorkQueue = VecDeque<Work>;

#[derive(Debug, Clone)]
struct ObjectRecord {
    identity: Identity,
    object_type: ObjectType,
    live: bool,
}

/// All runtime state reachable from observers
#[derive(Debug)]
pub struct Store {
    alloc: HandleAllocator,
    identities: IdentityRegistry,
    definitions: Definitions,
    types: TypeHierarchy,
    objects: BTreeMap<ObjectHandle, ObjectRecord>,
    attributes: AttributeStore,
    links: LinkGraph,
    localities: LocalityTracker,
}

impl Store {
    pub(crate) fn new(state_capacity: u32) -> Self {
        Self {
            alloc: HandleAllocator::new(),
            identities: IdentityRegistry::new(),
            definitions: Definitions::new(state_capacity),
            types: TypeHierarchy::new(),
            objects: BTreeMap::new(),
            attributes: AttributeStore::new(),
            links: LinkGraph::new(),
            localities: LocalityTracker::new(),
        }
    }

    // ========== Component access ==========

    /// Definitions table
    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Type hierarchy
    pub fn types(&self) -> &TypeHierarchy {
        &self.types
    }

    /// Link graph
    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    // ========== Definitions reads ==========

    /// Handle interned for `name`
    pub fn lookup_named_handle(&self, name: &str) -> Option<AttributeHandle> {
        self.definitions.lookup_named_handle(name)
    }

    /// Mask for a state name or `|`-separated names; empty if undefined
    pub fn lookup_state(&self, names: &str) -> Mask {
        self.definitions.lookup_state(names)
    }

    /// Names of the defined bits in `mask`
    pub fn lookup_state_name(&self, mask: Mask) -> String {
        self.definitions.lookup_state_name(mask)
    }

    /// Type interned for `name`
    pub fn lookup_type(&self, name: &str) -> Option<ObjectType> {
        self.types.lookup_type(name)
    }

    /// True if `candidate_ancestor` is `object_type` or one of its ancestors
    pub fn is_of_type(&self, object_type: ObjectType, candidate_ancestor: ObjectType) -> bool {
        self.types.is_of_type(object_type, candidate_ancestor)
    }

    // ========== Object reads ==========

    /// True if `object` exists and is not being destroyed
    pub fn is_live(&self, object: ObjectHandle) -> bool {
        self.objects.get(&object).is_some_and(|r| r.live)
    }

    /// Live objects in creation order
    pub fn objects(&self) -> impl Iterator<Item = ObjectHandle> + '_ {
        self.objects
            .iter()
            .filter(|(_, r)| r.live)
            .map(|(h, _)| *h)
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.identities.len()
    }

    /// Concrete type of `object` (also during its destroy notification)
    pub fn object_type(&self, object: ObjectHandle) -> Option<ObjectType> {
        self.objects.get(&object).map(|r| r.object_type)
    }

    /// True if `object`'s type is `object_type` or a descendant of it
    pub fn is_object_of_type(&self, object: ObjectHandle, object_type: ObjectType) -> bool {
        self.object_type(object)
            .is_some_and(|t| self.types.is_of_type(t, object_type))
    }

    /// Current identity of `object` (also during its destroy notification)
    pub fn identity(&self, object: ObjectHandle) -> Option<Identity> {
        self.objects.get(&object).map(|r| r.identity)
    }

    /// Live object bound to `identity`
    pub fn lookup_object(&self, identity: &Identity) -> Option<ObjectHandle> {
        self.identities.lookup(identity)
    }

    /// Locality of `object`
    pub fn locality(&self, object: ObjectHandle) -> Option<Locality> {
        self.objects
            .contains_key(&object)
            .then(|| self.localities.get(object))
    }

    // ========== Attribute reads ==========

    /// Stored value of (`object`, `attribute`)
    pub fn attribute(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<&Value> {
        self.attributes.get(object, attribute)
    }

    /// Stored cells of `object`, ascending by attribute handle
    pub fn attributes(&self, object: ObjectHandle) -> impl Iterator<Item = (AttributeHandle, &Value)> {
        self.attributes.cells(object).map(|(a, c)| (a, c.value()))
    }

    /// Scalar cell
    pub fn scalar(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<f64> {
        self.attribute(object, attribute).and_then(Value::as_scalar)
    }

    /// Vector cell
    pub fn vector(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<Vector> {
        self.attribute(object, attribute).and_then(Value::as_vector)
    }

    /// Matrix cell
    pub fn matrix(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<Matrix> {
        self.attribute(object, attribute)
            .and_then(Value::as_matrix)
            .copied()
    }

    /// Text cell
    pub fn text(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<&str> {
        self.attribute(object, attribute).and_then(Value::as_text)
    }

    /// Data cell
    pub fn data(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<&[u8]> {
        self.attribute(object, attribute).and_then(Value::as_data)
    }

    /// Counter cell
    pub fn counter(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<i64> {
        self.attribute(object, attribute).and_then(Value::as_counter)
    }

    /// Running range of a counter cell
    pub fn counter_range(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<CounterRange> {
        self.attributes
            .cell(object, attribute)
            .and_then(|c| c.range())
    }

    /// State mask cell
    pub fn mask(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<Mask> {
        self.attribute(object, attribute).and_then(Value::as_mask)
    }

    /// Flag cell
    pub fn flag(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<bool> {
        self.attribute(object, attribute).and_then(Value::as_flag)
    }

    /// Time stamp cell
    pub fn time_stamp(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<f64> {
        self.attribute(object, attribute)
            .and_then(Value::as_time_stamp)
    }

    /// Alternate type cell
    pub fn alternate_type(&self, object: ObjectHandle, attribute: AttributeHandle) -> Option<ObjectType> {
        self.attribute(object, attribute)
            .and_then(Value::as_alternate_type)
    }

    // ========== Link reads ==========

    /// Edge by handle
    pub fn link_info(&self, link: LinkHandle) -> Option<&Link> {
        self.links.get(link)
    }

    /// Edge matching the triple
    pub fn lookup_link(
        &self,
        superior: ObjectHandle,
        attribute: AttributeHandle,
        subordinate: ObjectHandle,
    ) -> Option<LinkHandle> {
        self.links.lookup(superior, attribute, subordinate)
    }

    /// Subordinates of `superior` over `attribute`
    pub fn subordinates(&self, superior: ObjectHandle, attribute: AttributeHandle) -> Vec<ObjectHandle> {
        self.links.subordinates(superior, attribute)
    }

    /// Superiors of `subordinate` over `attribute`
    pub fn superiors(&self, subordinate: ObjectHandle, attribute: AttributeHandle) -> Vec<ObjectHandle> {
        self.links.superiors(subordinate, attribute)
    }

    /// Edges incident to `object`
    pub fn links_of(&self, object: ObjectHandle) -> LinkList {
        self.links.incident(object)
    }

    // ========== Replay ==========

    /// Events that rebuild the current state of `object` from nothing
    ///
    /// Order: creation (with current identity and locality), cells ascending
    /// by attribute handle (counters followed by their range), links where
    /// the object is superior, then links where it is subordinate.
    pub fn replay_object(&self, object: ObjectHandle) -> Result<Vec<Event>> {
        let record = self.live_record(object)?;
        let object_ref = ObjectRef {
            object,
            identity: record.identity,
        };
        let mut events = vec![Event::ObjectCreated {
            object: object_ref,
            object_type: record.object_type,
            locality: self.localities.get(object),
        }];

        for (attribute, cell) in self.attributes.cells(object) {
            events.push(Event::AttributeUpdated {
                object: object_ref,
                attribute,
                value: cell.value().clone(),
                previous: None,
            });
            if let Some(range) = cell.range() {
                events.push(Event::CounterMinimum {
                    object: object_ref,
                    attribute,
                    value: range.minimum,
                    previous: None,
                });
                events.push(Event::CounterMaximum {
                    object: object_ref,
                    attribute,
                    value: range.maximum,
                    previous: None,
                });
            }
        }

        let incident: Vec<&Link> = self
            .links
            .incident(object)
            .iter()
            .filter_map(|l| self.links.get(*l))
            .collect();
        let as_superior = incident.iter().filter(|l| l.superior == object);
        let as_subordinate = incident
            .iter()
            .filter(|l| l.subordinate == object && l.superior != object);
        for link in as_superior.chain(as_subordinate) {
            let ends = self.link_ends(link)?;
            events.push(Event::Linked(ends));
            if let Some(attr_obj) = link.attribute_object {
                events.push(Event::LinkAttributeObjectChanged {
                    ends,
                    attribute_object: Some(self.object_ref(attr_obj)?),
                    previous: None,
                });
            }
        }
        Ok(events)
    }

    /// Events announcing every definition: named handles, states, then types
    pub fn replay_definitions(&self) -> Vec<Event> {
        let named = self
            .definitions
            .named_handles()
            .map(|(handle, name)| Event::NamedHandleDefined {
                handle,
                name: name.to_string(),
            });
        let states = self
            .definitions
            .states()
            .map(|(mask, name)| Event::StateDefined {
                mask,
                name: name.to_string(),
            });
        let types = self
            .types
            .types()
            .map(|(object_type, name, parent)| Event::ObjectTypeDefined {
                object_type,
                name: name.to_string(),
                parent,
            });
        named.chain(states).chain(types).collect()
    }

    // ========== Definition mutators ==========

    pub(crate) fn define_named_handle(&mut self, name: &str, out: &mut WorkQueue) -> AttributeHandle {
        let interned = self.definitions.define_named_handle(&mut self.alloc, name);
        if interned.is_new() {
            out.push_back(Work::Notify(Event::NamedHandleDefined {
                handle: interned.get(),
                name: name.to_string(),
            }));
        }
        interned.get()
    }

    pub(crate) fn define_state(&mut self, name: &str, out: &mut WorkQueue) -> Result<u32> {
        let interned = self.definitions.define_state(name)?;
        if interned.is_new() {
            if let Some(mask) = Mask::bit(interned.get()) {
                out.push_back(Work::Notify(Event::StateDefined {
                    mask,
                    name: name.to_string(),
                }));
            }
        }
        Ok(interned.get())
    }

    pub(crate) fn define_type(
        &mut self,
        name: &str,
        parent: Option<ObjectType>,
        out: &mut WorkQueue,
    ) -> Result<ObjectType> {
        let interned = self.types.define_type(&mut self.alloc, name, parent)?;
        if interned.is_new() {
            out.push_back(Work::Notify(Event::ObjectTypeDefined {
                object_type: interned.get(),
                name: name.to_string(),
                parent,
            }));
        }
        Ok(interned.get())
    }

    pub(crate) fn reparent_type(
        &mut self,
        object_type: ObjectType,
        parent: Option<ObjectType>,
        out: &mut WorkQueue,
    ) -> Result<()> {
        let previous = self.types.set_parent(object_type, parent)?;
        if previous != parent {
            let name = self.types.type_name(object_type).unwrap_or_default().to_string();
            out.push_back(Work::Notify(Event::ObjectTypeDefined {
                object_type,
                name,
                parent,
            }));
        }
        Ok(())
    }

    // ========== Object mutators ==========

    pub(crate) fn create_object(
        &mut self,
        identity: Identity,
        object_type: ObjectType,
        locality: Locality,
        out: &mut WorkQueue,
    ) -> Result<ObjectHandle> {
        if !self.types.contains(object_type) {
            return Err(Error::UnknownHandle(object_type.handle()));
        }
        let object = self.identities.create(&mut self.alloc, identity)?;
        self.objects.insert(
            object,
            ObjectRecord {
                identity,
                object_type,
                live: true,
            },
        );
        self.attributes.insert_object(object);
        self.localities.insert(object, locality);
        info!(target: "tether::runtime", %object, %identity, %object_type, %locality, "Object created");
        out.push_back(Work::Notify(Event::ObjectCreated {
            object: ObjectRef { object, identity },
            object_type,
            locality,
        }));
        Ok(object)
    }

    pub(crate) fn destroy_object(&mut self, object: ObjectHandle, out: &mut WorkQueue) -> Result<()> {
        let identity = self.live_record(object)?.identity;

        for link in self.links.referencing(object) {
            if let Change::Set { previous } = self.links.set_attribute_object(link, None)? {
                if let Some(ends) = self.links.get(link).copied() {
                    let ends = self.link_ends(&ends)?;
                    let previous = previous.map(|p| self.object_ref(p)).transpose()?;
                    out.push_back(Work::Notify(Event::LinkAttributeObjectChanged {
                        ends,
                        attribute_object: None,
                        previous,
                    }));
                }
            }
        }
        for link in self.links.incident(object) {
            let removed = self.links.unlink(link)?;
            let ends = self.link_ends(&removed)?;
            out.push_back(Work::Notify(Event::Unlinked(ends)));
        }

        self.identities.release(object)?;
        if let Some(record) = self.objects.get_mut(&object) {
            record.live = false;
        }
        info!(target: "tether::runtime", %object, %identity, "Object destroyed");
        out.push_back(Work::Notify(Event::ObjectDestroyed {
            object: ObjectRef { object, identity },
        }));
        out.push_back(Work::Release(object));
        Ok(())
    }

    pub(crate) fn release(&mut self, object: ObjectHandle) {
        self.objects.remove(&object);
        self.attributes.remove_object(object);
        self.localities.remove(object);
        debug!(target: "tether::runtime", %object, "Object storage released");
    }

    pub(crate) fn reassign_identity(
        &mut self,
        object: ObjectHandle,
        identity: Identity,
        previous: Identity,
        out: &mut WorkQueue,
    ) -> Result<()> {
        self.live_record(object)?;
        self.identities.reassign(object, identity, previous)?;
        if identity == previous {
            return Ok(());
        }
        if let Some(record) = self.objects.get_mut(&object) {
            record.identity = identity;
        }
        out.push_back(Work::Notify(Event::IdentityChanged {
            object: ObjectRef { object, identity },
            previous,
        }));
        Ok(())
    }

    pub(crate) fn set_locality(
        &mut self,
        object: ObjectHandle,
        locality: Locality,
        out: &mut WorkQueue,
    ) -> Result<Change<Locality>> {
        let identity = self.live_record(object)?.identity;
        let change = self.localities.set(object, locality);
        if let Change::Set {
            previous: Some(previous),
        } = change
        {
            debug!(target: "tether::runtime", %object, %locality, %previous, "Locality changed");
            out.push_back(Work::Notify(Event::LocalityChanged {
                object: ObjectRef { object, identity },
                locality,
                previous,
            }));
        }
        Ok(change)
    }

    // ========== Attribute mutators ==========

    pub(crate) fn write_attribute(
        &mut self,
        object: ObjectHandle,
        attribute: AttributeHandle,
        value: Value,
        out: &mut WorkQueue,
    ) -> Result<Change<Value>> {
        let object_ref = self.writable(object, attribute)?;
        if let Value::Mask(mask) = &value {
            let undefined = *mask & !self.definitions.defined_states();
            if undefined.is_set() {
                return Err(Error::UndefinedState { attribute, undefined });
            }
        }
        let write = self.attributes.write(object, attribute, value.clone())?;
        if let Change::Set { previous } = &write.change {
            debug!(target: "tether::attr", %object, %attribute, kind = %value.kind(), "Attribute written");
            out.push_back(Work::Notify(Event::AttributeUpdated {
                object: object_ref,
                attribute,
                value,
                previous: previous.clone(),
            }));
            Self::push_range(object_ref, attribute, write.minimum, write.maximum, out);
        }
        Ok(write.change)
    }

    pub(crate) fn add_to_counter(
        &mut self,
        object: ObjectHandle,
        attribute: AttributeHandle,
        delta: i64,
        out: &mut WorkQueue,
    ) -> Result<i64> {
        self.writable(object, attribute)?;
        let current = match self.attributes.get(object, attribute) {
            None => 0,
            Some(Value::Counter(c)) => *c,
            Some(other) => {
                return Err(Error::KindMismatch {
                    attribute,
                    stored: other.kind(),
                    written: ValueKind::Counter,
                })
            }
        };
        let next = current.saturating_add(delta);
        self.write_attribute(object, attribute, Value::Counter(next), out)?;
        Ok(next)
    }

    pub(crate) fn reset_counter_range(
        &mut self,
        object: ObjectHandle,
        attribute: AttributeHandle,
        out: &mut WorkQueue,
    ) -> Result<()> {
        let object_ref = self.writable(object, attribute)?;
        let (minimum, maximum) = self.attributes.reset_counter_range(object, attribute)?;
        Self::push_range(object_ref, attribute, minimum, maximum, out);
        Ok(())
    }

    pub(crate) fn remove_attribute(
        &mut self,
        object: ObjectHandle,
        attribute: AttributeHandle,
        out: &mut WorkQueue,
    ) -> Result<Option<Value>> {
        let object_ref = self.writable(object, attribute)?;
        let removed = self.attributes.remove(object, attribute)?;
        if let Some(previous) = &removed {
            debug!(target: "tether::attr", %object, %attribute, "Attribute removed");
            out.push_back(Work::Notify(Event::AttributeRemoved {
                object: object_ref,
                attribute,
                previous: previous.clone(),
            }));
        }
        Ok(removed)
    }

    // ========== Link mutators ==========

    pub(crate) fn link(
        &mut self,
        superior: ObjectHandle,
        attribute: AttributeHandle,
        subordinate: ObjectHandle,
        out: &mut WorkQueue,
    ) -> Result<LinkHandle> {
        self.live_record(superior)?;
        self.live_record(subordinate)?;
        self.require_named(attribute)?;
        let handle = self
            .links
            .link(&mut self.alloc, superior, attribute, subordinate)?;
        let ends = self.link_ends_for(handle)?;
        out.push_back(Work::Notify(Event::Linked(ends)));
        Ok(handle)
    }

    pub(crate) fn unlink(&mut self, link: LinkHandle, out: &mut WorkQueue) -> Result<()> {
        let removed = self.links.unlink(link)?;
        let ends = self.link_ends(&removed)?;
        out.push_back(Work::Notify(Event::Unlinked(ends)));
        Ok(())
    }

    pub(crate) fn update_link_attribute_object(
        &mut self,
        link: LinkHandle,
        attribute_object: Option<ObjectHandle>,
        out: &mut WorkQueue,
    ) -> Result<Change<ObjectHandle>> {
        if self.links.get(link).is_none() {
            return Err(Error::UnknownHandle(link.handle()));
        }
        let next = attribute_object
            .map(|o| {
                self.live_record(o).map(|r| ObjectRef {
                    object: o,
                    identity: r.identity,
                })
            })
            .transpose()?;
        let change = self.links.set_attribute_object(link, attribute_object)?;
        if let Change::Set { previous } = &change {
            let ends = self.link_ends_for(link)?;
            let previous = previous.map(|p| self.object_ref(p)).transpose()?;
            debug!(target: "tether::link", %link, "Link attribute object changed");
            out.push_back(Work::Notify(Event::LinkAttributeObjectChanged {
                ends,
                attribute_object: next,
                previous,
            }));
        }
        Ok(change)
    }

    // ========== Commands ==========

    pub(crate) fn apply(&mut self, command: Command, out: &mut WorkQueue) -> Result<()> {
        match command {
            Command::CreateObject {
                identity,
                object_type,
                locality,
            } => self
                .create_object(identity, object_type, locality, out)
                .map(drop),
            Command::DestroyObject(object) => self.destroy_object(object, out),
            Command::ReassignIdentity {
                object,
                identity,
                previous,
            } => self.reassign_identity(object, identity, previous, out),
            Command::SetLocality { object, locality } => {
                self.set_locality(object, locality, out).map(drop)
            }
            Command::SetAttribute {
                object,
                attribute,
                value,
            } => self.write_attribute(object, attribute, value, out).map(drop),
            Command::AddToCounter {
                object,
                attribute,
                delta,
            } => self.add_to_counter(object, attribute, delta, out).map(drop),
            Command::ResetCounterRange { object, attribute } => {
                self.reset_counter_range(object, attribute, out)
            }
            Command::RemoveAttribute { object, attribute } => {
                self.remove_attribute(object, attribute, out).map(drop)
            }
            Command::Link {
                superior,
                attribute,
                subordinate,
            } => self.link(superior, attribute, subordinate, out).map(drop),
            Command::Unlink(link) => self.unlink(link, out),
            Command::UpdateLinkAttributeObject {
                link,
                attribute_object,
            } => self
                .update_link_attribute_object(link, attribute_object, out)
                .map(drop),
        }
    }

    // ========== Helpers ==========

    fn live_record(&self, object: ObjectHandle) -> Result<&ObjectRecord> {
        self.objects
            .get(&object)
            .filter(|r| r.live)
            .ok_or(Error::UnknownObject(object))
    }

    fn require_named(&self, attribute: AttributeHandle) -> Result<()> {
        if self.definitions.is_named_handle(attribute) {
            Ok(())
        } else {
            Err(Error::UnknownHandle(attribute.handle()))
        }
    }

    fn writable(&self, object: ObjectHandle, attribute: AttributeHandle) -> Result<ObjectRef> {
        let identity = self.live_record(object)?.identity;
        self.require_named(attribute)?;
        Ok(ObjectRef { object, identity })
    }

    fn object_ref(&self, object: ObjectHandle) -> Result<ObjectRef> {
        self.objects
            .get(&object)
            .map(|r| ObjectRef {
                object,
                identity: r.identity,
            })
            .ok_or(Error::UnknownObject(object))
    }

    fn link_ends(&self, link: &Link) -> Result<LinkEnds> {
        Ok(LinkEnds {
            link: link.handle,
            attribute: link.attribute,
            superior: self.object_ref(link.superior)?,
            subordinate: self.object_ref(link.subordinate)?,
        })
    }

    fn link_ends_for(&self, link: LinkHandle) -> Result<LinkEnds> {
        let edge = self
            .links
            .get(link)
            .ok_or(Error::UnknownHandle(link.handle()))?;
        self.link_ends(edge)
    }

    fn push_range(
        object: ObjectRef,
        attribute: AttributeHandle,
        minimum: Option<BoundChange>,
        maximum: Option<BoundChange>,
        out: &mut WorkQueue,
    ) {
        if let Some(min) = minimum {
            out.push_back(Work::Notify(Event::CounterMinimum {
                object,
                attribute,
                value: min.value,
                previous: min.previous,
            }));
        }
        if let Some(max) = maximum {
            out.push_back(Work::Notify(Event::CounterMaximum {
                object,
                attribute,
                value: max.value,
                previous: max.previous,
            }));
        }
    }
}
