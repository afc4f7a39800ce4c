//! Shared test utilities for the engine integration suites.
//!
//! Import via `mod common;` from any test file.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tether_engine::{
    AttributeHandle, CounterRange, DispatchContext, Event, Identity, LinkHandle, Locality,
    ObjectHandle, ObjectObserver, ObjectType, Runtime, Store, Value,
};

/// Route runtime logs to the test harness; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// ============================================================================
// Event recording
// ============================================================================

/// Shared event log; hand out [`Recorder`]s with [`EventLog::observer`].
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer appending every delivered event to this log
    pub fn observer(&self) -> Recorder {
        Recorder(Rc::clone(&self.0))
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// `AttributeUpdated` events for one cell, as (value, previous)
    pub fn updates(&self, object: ObjectHandle, attribute: AttributeHandle) -> Vec<(Value, Option<Value>)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::AttributeUpdated {
                    object: o,
                    attribute: a,
                    value,
                    previous,
                } if o.object == object && *a == attribute => Some((value.clone(), previous.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Observer recording into an [`EventLog`]
pub struct Recorder(Rc<RefCell<Vec<Event>>>);

impl ObjectObserver for Recorder {
    fn notify(&mut self, event: &Event, _ctx: &mut DispatchContext<'_>) {
        self.0.borrow_mut().push(event.clone());
    }
}

/// Short label per event variant, for order assertions
pub fn label(event: &Event) -> &'static str {
    match event {
        Event::ObjectCreated { .. } => "created",
        Event::ObjectDestroyed { .. } => "destroyed",
        Event::IdentityChanged { .. } => "identity",
        Event::LocalityChanged { .. } => "locality",
        Event::AttributeUpdated { .. } => "updated",
        Event::AttributeRemoved { .. } => "removed",
        Event::CounterMinimum { .. } => "minimum",
        Event::CounterMaximum { .. } => "maximum",
        Event::Linked(_) => "linked",
        Event::Unlinked(_) => "unlinked",
        Event::LinkAttributeObjectChanged { .. } => "link_attribute",
        Event::NamedHandleDefined { .. } => "named_handle",
        Event::StateDefined { .. } => "state",
        Event::ObjectTypeDefined { .. } => "type",
    }
}

pub fn labels(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(label).collect()
}

// ============================================================================
// Mirror: state rebuilt from notifications only
// ============================================================================

/// What an observer can reconstruct from the events it received
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorState {
    pub objects: BTreeMap<ObjectHandle, (Identity, ObjectType, Locality)>,
    pub cells: BTreeMap<(ObjectHandle, AttributeHandle), Value>,
    pub ranges: BTreeMap<(ObjectHandle, AttributeHandle), CounterRange>,
    pub links: BTreeMap<LinkHandle, (ObjectHandle, AttributeHandle, ObjectHandle, Option<ObjectHandle>)>,
}

impl MirrorState {
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::ObjectCreated {
                object,
                object_type,
                locality,
            } => {
                self.objects
                    .insert(object.object, (object.identity, *object_type, *locality));
            }
            Event::ObjectDestroyed { object } => {
                let o = object.object;
                self.objects.remove(&o);
                self.cells.retain(|(owner, _), _| *owner != o);
                self.ranges.retain(|(owner, _), _| *owner != o);
            }
            Event::IdentityChanged { object, .. } => {
                if let Some(entry) = self.objects.get_mut(&object.object) {
                    entry.0 = object.identity;
                }
            }
            Event::LocalityChanged { object, locality, .. } => {
                if let Some(entry) = self.objects.get_mut(&object.object) {
                    entry.2 = *locality;
                }
            }
            Event::AttributeUpdated {
                object,
                attribute,
                value,
                ..
            } => {
                self.cells.insert((object.object, *attribute), value.clone());
            }
            Event::AttributeRemoved { object, attribute, .. } => {
                self.cells.remove(&(object.object, *attribute));
                self.ranges.remove(&(object.object, *attribute));
            }
            Event::CounterMinimum {
                object,
                attribute,
                value,
                ..
            } => {
                self.ranges
                    .entry((object.object, *attribute))
                    .or_insert_with(|| CounterRange::at(*value))
                    .minimum = *value;
            }
            Event::CounterMaximum {
                object,
                attribute,
                value,
                ..
            } => {
                self.ranges
                    .entry((object.object, *attribute))
                    .or_insert_with(|| CounterRange::at(*value))
                    .maximum = *value;
            }
            Event::Linked(ends) => {
                self.links.insert(
                    ends.link,
                    (ends.superior.object, ends.attribute, ends.subordinate.object, None),
                );
            }
            Event::Unlinked(ends) => {
                self.links.remove(&ends.link);
            }
            Event::LinkAttributeObjectChanged {
                ends,
                attribute_object,
                ..
            } => {
                if let Some(link) = self.links.get_mut(&ends.link) {
                    link.3 = attribute_object.map(|r| r.object);
                }
            }
            Event::NamedHandleDefined { .. }
            | Event::StateDefined { .. }
            | Event::ObjectTypeDefined { .. } => {}
        }
    }

    /// Snapshot read directly from the store
    pub fn from_store(store: &Store) -> Self {
        let mut state = MirrorState::default();
        let mut links = BTreeSet::new();
        for o in store.objects() {
            state.objects.insert(
                o,
                (
                    store.identity(o).unwrap(),
                    store.object_type(o).unwrap(),
                    store.locality(o).unwrap(),
                ),
            );
            for (a, value) in store.attributes(o) {
                state.cells.insert((o, a), value.clone());
                if let Some(range) = store.counter_range(o, a) {
                    state.ranges.insert((o, a), range);
                }
            }
            links.extend(store.links_of(o));
        }
        for l in links {
            let link = store.link_info(l).unwrap();
            state.links.insert(
                l,
                (link.superior, link.attribute, link.subordinate, link.attribute_object),
            );
        }
        state
    }
}

/// Observer maintaining a [`MirrorState`]
#[derive(Clone, Default)]
pub struct Mirror(Rc<RefCell<MirrorState>>);

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(&self) -> MirrorObserver {
        MirrorObserver(Rc::clone(&self.0))
    }

    pub fn state(&self) -> MirrorState {
        self.0.borrow().clone()
    }
}

pub struct MirrorObserver(Rc<RefCell<MirrorState>>);

impl ObjectObserver for MirrorObserver {
    fn notify(&mut self, event: &Event, _ctx: &mut DispatchContext<'_>) {
        self.0.borrow_mut().apply(event);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Runtime with a small type tree and a few named handles
pub struct World {
    pub rt: Runtime,
    pub vehicle: ObjectType,
    pub tank: ObjectType,
    pub building: ObjectType,
    pub health: AttributeHandle,
    pub ammo: AttributeHandle,
    pub name: AttributeHandle,
    pub parent: AttributeHandle,
}

impl World {
    pub fn new() -> Self {
        let mut rt = Runtime::new();
        let vehicle = rt.define_type("vehicle", None).unwrap();
        let tank = rt.define_type("tank", Some(vehicle)).unwrap();
        let building = rt.define_type("building", None).unwrap();
        let health = rt.define_named_handle("health");
        let ammo = rt.define_named_handle("ammo");
        let name = rt.define_named_handle("name");
        let parent = rt.define_named_handle("parent");
        Self {
            rt,
            vehicle,
            tank,
            building,
            health,
            ammo,
            name,
            parent,
        }
    }

    pub fn spawn(&mut self, object_type: ObjectType) -> ObjectHandle {
        self.rt
            .create_object(Identity::new(), object_type, Locality::Local)
            .unwrap()
    }
}
