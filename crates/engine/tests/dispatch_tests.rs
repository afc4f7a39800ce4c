//! Observer dispatch: ordering, filtering, reentrancy, isolation and replay.

mod common;

use common::{labels, EventLog, Mirror, MirrorState, World};
use std::cell::RefCell;
use std::rc::Rc;
use tether_engine::{
    AttributeHandle, AttributeWriter, DispatchContext, Error, Event, EventMask, Identity, Locality,
    ObserverId, Runtime, RuntimeConfig, Subscription, Value,
};

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn observers_called_in_subscription_order() {
    let mut w = World::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for tag in 0..3 {
        let order = Rc::clone(&order);
        w.rt.subscribe(
            move |_: &Event, _: &mut DispatchContext<'_>| order.borrow_mut().push(tag),
            Subscription::global().with_mask(EventMask::CREATE),
        );
    }
    w.spawn(w.tank);
    w.spawn(w.tank);
    assert_eq!(*order.borrow(), vec![0, 1, 2, 0, 1, 2]);
}

#[test]
fn deferred_mutations_run_after_current_event() {
    let mut w = World::new();
    let (health, ammo, name) = (w.health, w.ammo, w.name);
    let o = w.spawn(w.tank);

    // first observer reacts to health by writing ammo then name
    w.rt.subscribe(
        move |event: &Event, ctx: &mut DispatchContext<'_>| {
            if let Event::AttributeUpdated { object, attribute, .. } = event {
                if *attribute == health {
                    ctx.set_counter(object.object, ammo, 5);
                    ctx.set_text(object.object, name, "ready");
                }
            }
        },
        Subscription::global(),
    );
    let log = EventLog::new();
    w.rt.subscribe(log.observer(), Subscription::global().with_mask(EventMask::ATTRIBUTES));

    w.rt.set_scalar(o, health, 1.0).unwrap();

    // the later observer still sees health first, then the deferred writes in order
    let written: Vec<_> = log
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::AttributeUpdated { attribute, .. } => Some(*attribute),
            _ => None,
        })
        .collect();
    assert_eq!(written, vec![health, ammo, name]);
    assert_eq!(
        labels(&log.events()),
        vec!["updated", "updated", "minimum", "maximum", "updated"]
    );
    // everything settled before set_scalar returned
    assert_eq!(w.rt.store().text(o, name), Some("ready"));
}

#[test]
fn cascading_reactions_are_fifo() {
    let mut w = World::new();
    let ammo = w.ammo;
    let a = w.spawn(w.tank);
    let b = w.spawn(w.tank);

    // every counter write on `a` bumps `b`, every write on `b` below 3 bumps `a`
    w.rt.subscribe(
        move |event: &Event, ctx: &mut DispatchContext<'_>| {
            if let Event::AttributeUpdated {
                object,
                value: Value::Counter(v),
                ..
            } = event
            {
                if object.object == a {
                    ctx.add_to_counter(b, ammo, 1);
                } else if *v < 3 {
                    ctx.add_to_counter(a, ammo, 1);
                }
            }
        },
        Subscription::global().with_mask(EventMask::COUNTER),
    );
    let log = EventLog::new();
    w.rt.subscribe(log.observer(), Subscription::global().with_mask(EventMask::COUNTER));

    w.rt.add_to_counter(a, ammo, 1).unwrap();

    let trace: Vec<_> = log
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::AttributeUpdated {
                object,
                value: Value::Counter(v),
                ..
            } => Some((object.object == a, *v)),
            _ => None,
        })
        .collect();
    assert_eq!(
        trace,
        vec![(true, 1), (false, 1), (true, 2), (false, 2), (true, 3), (false, 3)]
    );
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn type_observer_sees_descendants_only() {
    let mut w = World::new();
    let vehicles = EventLog::new();
    let tanks = EventLog::new();
    w.rt.activate_type_observer(vehicles.observer(), w.vehicle).unwrap();
    w.rt.activate_type_observer(tanks.observer(), w.tank).unwrap();

    let v = w.spawn(w.vehicle);
    let t = w.spawn(w.tank);
    let b = w.spawn(w.building);
    w.rt.set_scalar(b, w.health, 1.0).unwrap();

    let created = |log: &EventLog| {
        log.events()
            .iter()
            .filter_map(|e| match e {
                Event::ObjectCreated { object, .. } => Some(object.object),
                _ => None,
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(created(&vehicles), vec![v, t]);
    assert_eq!(created(&tanks), vec![t]);
}

#[test]
fn category_mask_selects_events() {
    let mut w = World::new();
    let o = w.spawn(w.tank);
    let log = EventLog::new();
    let id = w.rt.subscribe(log.observer(), Subscription::global().with_mask(EventMask::SCALAR));

    w.rt.set_scalar(o, w.health, 1.0).unwrap();
    w.rt.set_text(o, w.name, "x").unwrap();
    w.rt.set_locality(o, Locality::Remote).unwrap();
    assert_eq!(log.take().len(), 1);

    w.rt.set_observer_mask(id, EventMask::TEXT | EventMask::LOCALITY).unwrap();
    w.rt.set_scalar(o, w.health, 2.0).unwrap();
    w.rt.set_text(o, w.name, "y").unwrap();
    w.rt.set_locality(o, Locality::Local).unwrap();
    assert_eq!(labels(&log.take()), vec!["updated", "locality"]);
    assert_eq!(w.rt.subscription(id).unwrap().mask, EventMask::TEXT | EventMask::LOCALITY);
}

#[test]
fn type_filter_can_be_changed() {
    let mut w = World::new();
    let log = EventLog::new();
    let id = w.rt.subscribe(log.observer(), Subscription::global().with_mask(EventMask::CREATE));
    w.rt.set_observer_type_filter(id, Some(w.building)).unwrap();
    w.spawn(w.tank);
    assert!(log.is_empty());
    w.spawn(w.building);
    assert_eq!(log.len(), 1);
    w.rt.set_observer_type_filter(id, None).unwrap();
    w.spawn(w.tank);
    assert_eq!(log.len(), 2);
}

#[test]
fn attribute_filter_selects_handles() {
    let mut w = World::new();
    let log = EventLog::new();
    let id = w.rt.subscribe(log.observer(), Subscription::global().with_attributes([w.health]));
    let o = w.spawn(w.tank);
    let other = w.spawn(w.tank);

    w.rt.set_scalar(o, w.health, 1.0).unwrap();
    w.rt.add_to_counter(o, w.ammo, 3).unwrap();
    w.rt.set_text(o, w.name, "x").unwrap();
    let link = w.rt.link(o, w.parent, other).unwrap();
    assert_eq!(labels(&log.events()), vec!["created", "created", "updated"]);
    assert_eq!(log.take()[2].attribute(), Some(w.health));

    // link events filter on the relationship kind
    w.rt.set_observer_attribute_filter(id, Some(&[w.health, w.parent])).unwrap();
    w.rt.unlink(link).unwrap();
    w.rt.set_text(o, w.name, "y").unwrap();
    assert_eq!(labels(&log.take()), vec!["unlinked"]);

    w.rt.set_observer_attribute_filter(id, None).unwrap();
    w.rt.set_text(o, w.name, "z").unwrap();
    assert_eq!(labels(&log.take()), vec!["updated"]);
    assert_eq!(w.rt.subscription(id).unwrap().attributes, None);

    let bogus = AttributeHandle::from_handle(w.tank.handle());
    assert_eq!(
        w.rt.set_observer_attribute_filter(id, Some(&[bogus])),
        Err(Error::UnknownHandle(w.tank.handle()))
    );
}

#[test]
fn definition_events_reach_type_observers() {
    let mut w = World::new();
    let log = EventLog::new();
    w.rt.activate_type_observer(log.observer(), w.building).unwrap();
    w.rt.define_named_handle("armor");
    w.rt.define_type("bunker", Some(w.building)).unwrap();
    assert_eq!(labels(&log.events()), vec!["named_handle", "type"]);
}

#[test]
fn reparent_changes_type_scope() {
    let mut w = World::new();
    let log = EventLog::new();
    w.rt.activate_type_observer(log.observer(), w.building).unwrap();
    let t = w.spawn(w.tank);
    assert!(log.is_empty());

    w.rt.reparent_type(w.vehicle, Some(w.building)).unwrap();
    assert_eq!(labels(&log.take()), vec!["type"]);
    assert!(w.rt.is_of_type(w.tank, w.building));
    w.rt.set_scalar(t, w.health, 1.0).unwrap();
    assert_eq!(labels(&log.take()), vec!["updated"]);

    assert!(matches!(
        w.rt.reparent_type(w.building, Some(w.tank)),
        Err(Error::InvalidHierarchy(_))
    ));
}

// ============================================================================
// Unsubscribe and isolation
// ============================================================================

#[test]
fn unsubscribe_during_dispatch_drops_pending_delivery() {
    let mut w = World::new();
    let victim = Rc::new(RefCell::new(None::<ObserverId>));
    let target = Rc::clone(&victim);
    w.rt.subscribe(
        move |_: &Event, ctx: &mut DispatchContext<'_>| {
            if let Some(id) = *target.borrow() {
                ctx.unsubscribe(id);
            }
        },
        Subscription::global().with_mask(EventMask::CREATE),
    );
    let log = EventLog::new();
    let id = w.rt.subscribe(log.observer(), Subscription::global());
    *victim.borrow_mut() = Some(id);

    w.spawn(w.tank);
    assert!(log.is_empty());
    assert_eq!(w.rt.observer_count(), 1);
    assert_eq!(w.rt.unsubscribe(id), Err(Error::UnknownObserver(id)));
}

#[test]
fn observer_can_unsubscribe_itself() {
    let mut w = World::new();
    let calls = Rc::new(RefCell::new(0));
    let count = Rc::clone(&calls);
    w.rt.subscribe(
        move |_: &Event, ctx: &mut DispatchContext<'_>| {
            *count.borrow_mut() += 1;
            ctx.unsubscribe_self();
        },
        Subscription::global(),
    );
    w.spawn(w.tank);
    w.spawn(w.tank);
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn panicking_observer_does_not_stop_dispatch() {
    common::init_tracing();
    let mut w = World::new();
    let health = w.health;
    w.rt.subscribe(
        move |event: &Event, ctx: &mut DispatchContext<'_>| {
            if let Event::ObjectCreated { object, .. } = event {
                // queued before the panic, discarded with it
                ctx.set_scalar(object.object, health, 99.0);
                panic!("inspector crashed");
            }
        },
        Subscription::global(),
    );
    let log = EventLog::new();
    w.rt.subscribe(log.observer(), Subscription::global());

    let o = w.spawn(w.tank);
    assert_eq!(labels(&log.events()), vec!["created"]);
    assert_eq!(w.rt.store().scalar(o, health), None);
    // the observer stays registered
    assert_eq!(w.rt.observer_count(), 2);
}

#[test]
fn work_bound_never_drops_notifications() {
    let config = RuntimeConfig {
        max_dispatch_work: 4,
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::with_config(config).unwrap();
    let unit = rt.define_type("unit", None).unwrap();
    let member = rt.define_named_handle("member");
    let hub = rt.create_object(Identity::new(), unit, Locality::Local).unwrap();
    for _ in 0..10 {
        let spoke = rt.create_object(Identity::new(), unit, Locality::Local).unwrap();
        rt.link(hub, member, spoke).unwrap();
    }
    let log = EventLog::new();
    rt.subscribe(log.observer(), Subscription::global());

    rt.destroy_object(hub).unwrap();
    let mut expected = vec!["unlinked"; 10];
    expected.push("destroyed");
    assert_eq!(labels(&log.events()), expected);
    assert!(!rt.store().is_live(hub));
    assert!(rt.store().subordinates(hub, member).is_empty());
}

#[test]
fn work_bound_rejects_excess_deferred_commands() {
    let config = RuntimeConfig {
        max_dispatch_work: 4,
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::with_config(config).unwrap();
    let unit = rt.define_type("unit", None).unwrap();
    let hub = rt.create_object(Identity::new(), unit, Locality::Local).unwrap();

    // each create asks for one more create
    rt.subscribe(
        move |event: &Event, ctx: &mut DispatchContext<'_>| {
            if matches!(event, Event::ObjectCreated { .. }) {
                ctx.create_object(Identity::new(), unit, Locality::Local);
            }
        },
        Subscription::global(),
    );
    let log = EventLog::new();
    rt.subscribe(log.observer(), Subscription::global().with_mask(EventMask::CREATE));

    rt.create_object(Identity::new(), unit, Locality::Local).unwrap();
    // the caller's create plus four deferred ones
    assert_eq!(log.take().len(), 5);
    assert_eq!(rt.store().object_count(), 6);

    // the allowance is per top-level mutation
    rt.destroy_object(hub).unwrap();
    rt.create_object(Identity::new(), unit, Locality::Local).unwrap();
    assert_eq!(log.take().len(), 5);
}

// ============================================================================
// Replay
// ============================================================================

#[test]
fn dump_replays_object_in_stable_order() {
    let mut w = World::new();
    let o = w.spawn(w.tank);
    let other = w.spawn(w.tank);
    let value = w.spawn(w.building);
    w.rt.set_text(o, w.name, "alpha").unwrap();
    w.rt.set_scalar(o, w.health, 3.0).unwrap();
    w.rt.add_to_counter(o, w.ammo, 7).unwrap();
    let down = w.rt.link(o, w.parent, other).unwrap();
    w.rt.link(other, w.parent, o).unwrap();
    w.rt.update_link_attribute_object(down, Some(value)).unwrap();
    w.rt.set_locality(o, Locality::Remote).unwrap();

    let log = EventLog::new();
    let id = w.rt.subscribe(log.observer(), Subscription::global());
    w.rt.dump_all_object_attributes(o, id).unwrap();

    let events = log.events();
    assert_eq!(
        labels(&events),
        vec![
            "created",
            "updated",
            "updated",
            "minimum",
            "maximum",
            "updated",
            "linked",
            "link_attribute",
            "linked",
        ]
    );
    // health < ammo < name in handle order
    let attrs: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::AttributeUpdated { attribute, previous, .. } => {
                assert!(previous.is_none());
                Some(*attribute)
            }
            _ => None,
        })
        .collect();
    assert_eq!(attrs, vec![w.health, w.ammo, w.name]);
    assert!(matches!(
        events[0],
        Event::ObjectCreated {
            locality: Locality::Remote,
            ..
        }
    ));
}

#[test]
fn dump_goes_to_one_observer_and_respects_its_mask() {
    let mut w = World::new();
    let o = w.spawn(w.tank);
    w.rt.set_scalar(o, w.health, 1.0).unwrap();
    w.rt.set_text(o, w.name, "n").unwrap();

    let bystander = EventLog::new();
    w.rt.subscribe(bystander.observer(), Subscription::global());
    let log = EventLog::new();
    let id = w.rt.subscribe(log.observer(), Subscription::global().with_mask(EventMask::TEXT));
    w.rt.dump_all_object_attributes(o, id).unwrap();

    assert!(bystander.is_empty());
    assert_eq!(log.updates(o, w.name), vec![(Value::Text("n".into()), None)]);
    assert_eq!(log.len(), 1);
}

#[test]
fn dump_of_destroyed_object_fails() {
    let mut w = World::new();
    let o = w.spawn(w.tank);
    let log = EventLog::new();
    let id = w.rt.subscribe(log.observer(), Subscription::global());
    w.rt.destroy_object(o).unwrap();
    log.take();
    assert_eq!(w.rt.dump_all_object_attributes(o, id), Err(Error::UnknownObject(o)));
    assert!(log.is_empty());
}

#[test]
fn definitions_dump_at_subscription() {
    let mut rt = Runtime::new();
    let unit = rt.define_type("unit", None).unwrap();
    rt.define_state("Active").unwrap();
    rt.define_named_handle("health");
    rt.define_type("tank", Some(unit)).unwrap();
    rt.define_named_handle("ammo");

    let log = EventLog::new();
    rt.subscribe(log.observer(), Subscription::global().with_definitions_dump());
    let events = log.take();
    assert_eq!(
        labels(&events),
        vec!["named_handle", "named_handle", "state", "type", "type"]
    );
    match &events[4] {
        Event::ObjectTypeDefined { name, parent, .. } => {
            assert_eq!(name, "tank");
            assert_eq!(*parent, Some(unit));
        }
        other => panic!("unexpected {:?}", other),
    }

    // explicit dump later gives the same sequence
    let id = rt.subscribe(log.observer(), Subscription::global().with_mask(EventMask::DEFINITIONS));
    rt.dump_definitions(id).unwrap();
    // both observers share the log; only the second one was dumped to
    assert_eq!(labels(&log.take()).len(), 5);
}

#[test]
fn late_subscriber_converges_after_dump() {
    let mut w = World::new();
    let early = Mirror::new();
    w.rt.subscribe(early.observer(), Subscription::global());

    let a = w.spawn(w.tank);
    let b = w.spawn(w.building);
    let c = w.spawn(w.vehicle);
    w.rt.set_scalar(a, w.health, 1.0).unwrap();
    w.rt.set_scalar(a, w.health, 4.0).unwrap();
    w.rt.add_to_counter(b, w.ammo, -2).unwrap();
    w.rt.add_to_counter(b, w.ammo, 5).unwrap();
    let l = w.rt.link(a, w.parent, b).unwrap();
    w.rt.link(b, w.parent, c).unwrap();
    w.rt.update_link_attribute_object(l, Some(c)).unwrap();
    w.rt.set_locality(c, Locality::Remote).unwrap();
    w.rt
        .reassign_identity(a, Identity::new(), w.rt.store().identity(a).unwrap())
        .unwrap();
    w.rt.destroy_object(c).unwrap();

    let late = Mirror::new();
    let id = w.rt.subscribe(late.observer(), Subscription::global());
    let live: Vec<_> = w.rt.store().objects().collect();
    for o in live {
        w.rt.dump_all_object_attributes(o, id).unwrap();
    }

    let truth = MirrorState::from_store(w.rt.store());
    assert_eq!(early.state(), truth);
    assert_eq!(late.state(), truth);
}
