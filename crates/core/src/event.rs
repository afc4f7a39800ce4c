//! Change notifications
//!
//! Every accepted mutation produces one or more [`Event`]s. Observers select
//! the events they care about with an [`EventMask`] and, optionally, an
//! object-type scope.
//!
//! ## Categories
//!
//! Each event carries exactly one category bit. The grouped constants
//! (`OBJECT_LIFECYCLE`, `ATTRIBUTES`, `LINKS`, `DEFINITIONS`, `ALL`) are the
//! masks plugins normally subscribe with.

use crate::handle::{AttributeHandle, Identity, LinkHandle, ObjectHandle, ObjectType};
use crate::locality::Locality;
use crate::value::{Mask, Value, ValueKind};
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Set of event categories an observer subscribes to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventMask: u32 {
        /// Object created
        const CREATE = 1 << 0;
        /// Object destroyed
        const DESTROY = 1 << 1;
        /// Object identity reassigned
        const IDENTITY = 1 << 2;
        /// Object locality changed
        const LOCALITY = 1 << 3;
        /// Attribute cell removed
        const REMOVE_ATTRIBUTE = 1 << 4;
        /// Scalar cell written
        const SCALAR = 1 << 5;
        /// Vector cell written
        const VECTOR = 1 << 6;
        /// Matrix cell written
        const MATRIX = 1 << 7;
        /// Text cell written
        const TEXT = 1 << 8;
        /// Data cell written
        const DATA = 1 << 9;
        /// Counter cell written
        const COUNTER = 1 << 10;
        /// Counter running minimum lowered
        const COUNTER_MINIMUM = 1 << 11;
        /// Counter running maximum raised
        const COUNTER_MAXIMUM = 1 << 12;
        /// State mask written
        const STATE = 1 << 13;
        /// Flag written
        const FLAG = 1 << 14;
        /// Time stamp written
        const TIME_STAMP = 1 << 15;
        /// Alternate type written
        const ALTERNATE_TYPE = 1 << 16;
        /// Link created
        const LINK = 1 << 17;
        /// Link removed
        const UNLINK = 1 << 18;
        /// Link attribute object changed
        const LINK_ATTRIBUTE = 1 << 19;
        /// Named attribute handle defined
        const DEFINE_NAMED_HANDLE = 1 << 20;
        /// Named state defined
        const DEFINE_STATE = 1 << 21;
        /// Object type defined
        const DEFINE_OBJECT_TYPE = 1 << 22;

        /// Create, destroy, identity and locality events
        const OBJECT_LIFECYCLE = Self::CREATE.bits()
            | Self::DESTROY.bits()
            | Self::IDENTITY.bits()
            | Self::LOCALITY.bits();
        /// Every attribute-cell event
        const ATTRIBUTES = Self::REMOVE_ATTRIBUTE.bits()
            | Self::SCALAR.bits()
            | Self::VECTOR.bits()
            | Self::MATRIX.bits()
            | Self::TEXT.bits()
            | Self::DATA.bits()
            | Self::COUNTER.bits()
            | Self::COUNTER_MINIMUM.bits()
            | Self::COUNTER_MAXIMUM.bits()
            | Self::STATE.bits()
            | Self::FLAG.bits()
            | Self::TIME_STAMP.bits()
            | Self::ALTERNATE_TYPE.bits();
        /// Every link event
        const LINKS = Self::LINK.bits() | Self::UNLINK.bits() | Self::LINK_ATTRIBUTE.bits();
        /// Every object event
        const OBJECTS = Self::OBJECT_LIFECYCLE.bits() | Self::ATTRIBUTES.bits() | Self::LINKS.bits();
        /// Every definition event
        const DEFINITIONS = Self::DEFINE_NAMED_HANDLE.bits()
            | Self::DEFINE_STATE.bits()
            | Self::DEFINE_OBJECT_TYPE.bits();
        /// Everything
        const ALL = Self::OBJECTS.bits() | Self::DEFINITIONS.bits();
    }
}

impl EventMask {
    /// Category bit of a write to a cell of `kind`
    pub const fn for_kind(kind: ValueKind) -> EventMask {
        match kind {
            ValueKind::Scalar => EventMask::SCALAR,
            ValueKind::Vector => EventMask::VECTOR,
            ValueKind::Matrix => EventMask::MATRIX,
            ValueKind::Text => EventMask::TEXT,
            ValueKind::Data => EventMask::DATA,
            ValueKind::Counter => EventMask::COUNTER,
            ValueKind::Mask => EventMask::STATE,
            ValueKind::Flag => EventMask::FLAG,
            ValueKind::TimeStamp => EventMask::TIME_STAMP,
            ValueKind::AlternateType => EventMask::ALTERNATE_TYPE,
        }
    }
}

/// An object handle together with its identity at event time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Process-local handle
    pub object: ObjectHandle,
    /// Identity bound to the handle when the event was raised
    pub identity: Identity,
}

/// Both endpoints of a link, as reported in link events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkEnds {
    /// Link handle
    pub link: LinkHandle,
    /// Relationship kind
    pub attribute: AttributeHandle,
    /// Superior endpoint
    pub superior: ObjectRef,
    /// Subordinate endpoint
    pub subordinate: ObjectRef,
}

/// Outcome of a mutation that may be suppressed as a no-op
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    /// New value equals the stored one; nothing stored, nothing notified
    Unchanged,
    /// Value stored; `previous` is `None` on first write
    Set {
        /// Value replaced by this write
        previous: Option<T>,
    },
}

impl<T> Change<T> {
    /// True if the mutation was applied
    pub fn is_changed(&self) -> bool {
        matches!(self, Change::Set { .. })
    }

    /// Previous value of an applied mutation
    pub fn previous(&self) -> Option<&T> {
        match self {
            Change::Set { previous } => previous.as_ref(),
            Change::Unchanged => None,
        }
    }
}

/// A single change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Object created
    ObjectCreated {
        /// New object
        object: ObjectRef,
        /// Concrete type
        object_type: ObjectType,
        /// Initial locality
        locality: Locality,
    },
    /// Object destroyed; its cells are still readable during this event
    ObjectDestroyed {
        /// Destroyed object
        object: ObjectRef,
    },
    /// Object bound to a new identity
    IdentityChanged {
        /// Object with its new identity
        object: ObjectRef,
        /// Identity before the change
        previous: Identity,
    },
    /// Object locality changed
    LocalityChanged {
        /// Object
        object: ObjectRef,
        /// New locality
        locality: Locality,
        /// Locality before the change
        previous: Locality,
    },
    /// Attribute cell written
    AttributeUpdated {
        /// Owning object
        object: ObjectRef,
        /// Attribute slot
        attribute: AttributeHandle,
        /// New value
        value: Value,
        /// Value before the write, `None` on first write
        previous: Option<Value>,
    },
    /// Attribute cell removed
    AttributeRemoved {
        /// Owning object
        object: ObjectRef,
        /// Attribute slot
        attribute: AttributeHandle,
        /// Value the cell held
        previous: Value,
    },
    /// Counter running minimum lowered
    CounterMinimum {
        /// Owning object
        object: ObjectRef,
        /// Counter attribute
        attribute: AttributeHandle,
        /// New minimum
        value: i64,
        /// Minimum before the write
        previous: Option<i64>,
    },
    /// Counter running maximum raised
    CounterMaximum {
        /// Owning object
        object: ObjectRef,
        /// Counter attribute
        attribute: AttributeHandle,
        /// New maximum
        value: i64,
        /// Maximum before the write
        previous: Option<i64>,
    },
    /// Link created
    Linked(LinkEnds),
    /// Link removed
    Unlinked(LinkEnds),
    /// Link attribute object replaced
    LinkAttributeObjectChanged {
        /// The link
        ends: LinkEnds,
        /// New attribute object
        attribute_object: Option<ObjectRef>,
        /// Attribute object before the change
        previous: Option<ObjectRef>,
    },
    /// Named attribute handle defined
    NamedHandleDefined {
        /// Minted handle
        handle: AttributeHandle,
        /// Interned name
        name: String,
    },
    /// Named state defined
    StateDefined {
        /// Single-bit mask of the state
        mask: Mask,
        /// Interned name
        name: String,
    },
    /// Object type defined or re-parented
    ObjectTypeDefined {
        /// The type
        object_type: ObjectType,
        /// Interned name
        name: String,
        /// Parent type, `None` under the root
        parent: Option<ObjectType>,
    },
}

impl Event {
    /// Category bit of this event
    pub fn mask(&self) -> EventMask {
        match self {
            Event::ObjectCreated { .. } => EventMask::CREATE,
            Event::ObjectDestroyed { .. } => EventMask::DESTROY,
            Event::IdentityChanged { .. } => EventMask::IDENTITY,
            Event::LocalityChanged { .. } => EventMask::LOCALITY,
            Event::AttributeUpdated { value, .. } => EventMask::for_kind(value.kind()),
            Event::AttributeRemoved { .. } => EventMask::REMOVE_ATTRIBUTE,
            Event::CounterMinimum { .. } => EventMask::COUNTER_MINIMUM,
            Event::CounterMaximum { .. } => EventMask::COUNTER_MAXIMUM,
            Event::Linked(_) => EventMask::LINK,
            Event::Unlinked(_) => EventMask::UNLINK,
            Event::LinkAttributeObjectChanged { .. } => EventMask::LINK_ATTRIBUTE,
            Event::NamedHandleDefined { .. } => EventMask::DEFINE_NAMED_HANDLE,
            Event::StateDefined { .. } => EventMask::DEFINE_STATE,
            Event::ObjectTypeDefined { .. } => EventMask::DEFINE_OBJECT_TYPE,
        }
    }

    /// Objects this event is about, used for type-scoped filtering
    ///
    /// Definition events have no subject.
    pub fn subjects(&self) -> [Option<ObjectHandle>; 2] {
        match self {
            Event::ObjectCreated { object, .. }
            | Event::ObjectDestroyed { object }
            | Event::IdentityChanged { object, .. }
            | Event::LocalityChanged { object, .. }
            | Event::AttributeUpdated { object, .. }
            | Event::AttributeRemoved { object, .. }
            | Event::CounterMinimum { object, .. }
            | Event::CounterMaximum { object, .. } => [Some(object.object), None],
            Event::Linked(ends)
            | Event::Unlinked(ends)
            | Event::LinkAttributeObjectChanged { ends, .. } => {
                [Some(ends.superior.object), Some(ends.subordinate.object)]
            }
            Event::NamedHandleDefined { .. }
            | Event::StateDefined { .. }
            | Event::ObjectTypeDefined { .. } => [None, None],
        }
    }

    /// Attribute handle this event concerns
    ///
    /// The cell's attribute for attribute events, the relationship kind for
    /// link events, `None` otherwise.
    pub fn attribute(&self) -> Option<AttributeHandle> {
        match self {
            Event::AttributeUpdated { attribute, .. }
            | Event::AttributeRemoved { attribute, .. }
            | Event::CounterMinimum { attribute, .. }
            | Event::CounterMaximum { attribute, .. } => Some(*attribute),
            Event::Linked(ends)
            | Event::Unlinked(ends)
            | Event::LinkAttributeObjectChanged { ends, .. } => Some(ends.attribute),
            _ => None,
        }
    }

    /// True for definition events
    pub fn is_definition(&self) -> bool {
        EventMask::DEFINITIONS.contains(self.mask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleAllocator;

    fn object_ref(alloc: &mut HandleAllocator) -> ObjectRef {
        ObjectRef {
            object: ObjectHandle::from_handle(alloc.mint()),
            identity: Identity::new(),
        }
    }

    #[test]
    fn test_groups_are_disjoint() {
        assert!(!EventMask::OBJECT_LIFECYCLE.intersects(EventMask::ATTRIBUTES));
        assert!(!EventMask::ATTRIBUTES.intersects(EventMask::LINKS));
        assert!(!EventMask::OBJECTS.intersects(EventMask::DEFINITIONS));
        assert_eq!(EventMask::ALL, EventMask::all());
    }

    #[test]
    fn test_kind_masks_are_attribute_masks() {
        for kind in [
            ValueKind::Scalar,
            ValueKind::Vector,
            ValueKind::Matrix,
            ValueKind::Text,
            ValueKind::Data,
            ValueKind::Counter,
            ValueKind::Mask,
            ValueKind::Flag,
            ValueKind::TimeStamp,
            ValueKind::AlternateType,
        ] {
            assert!(EventMask::ATTRIBUTES.contains(EventMask::for_kind(kind)));
        }
        assert_eq!(EventMask::for_kind(ValueKind::Mask), EventMask::STATE);
    }

    #[test]
    fn test_event_mask_follows_value_kind() {
        let mut alloc = HandleAllocator::new();
        let event = Event::AttributeUpdated {
            object: object_ref(&mut alloc),
            attribute: AttributeHandle::from_handle(alloc.mint()),
            value: Value::Flag(true),
            previous: None,
        };
        assert_eq!(event.mask(), EventMask::FLAG);
        assert!(!event.is_definition());
    }

    #[test]
    fn test_link_subjects() {
        let mut alloc = HandleAllocator::new();
        let superior = object_ref(&mut alloc);
        let subordinate = object_ref(&mut alloc);
        let ends = LinkEnds {
            link: LinkHandle::from_handle(alloc.mint()),
            attribute: AttributeHandle::from_handle(alloc.mint()),
            superior,
            subordinate,
        };
        assert_eq!(
            Event::Linked(ends).subjects(),
            [Some(superior.object), Some(subordinate.object)]
        );
        assert_eq!(Event::Unlinked(ends).attribute(), Some(ends.attribute));
    }

    #[test]
    fn test_definition_has_no_subject() {
        let event = Event::StateDefined {
            mask: Mask::bit(0).unwrap(),
            name: "Active".into(),
        };
        assert_eq!(event.subjects(), [None, None]);
        assert_eq!(event.attribute(), None);
        assert!(event.is_definition());
    }

    #[test]
    fn test_change_accessors() {
        let unchanged: Change<i64> = Change::Unchanged;
        assert!(!unchanged.is_changed());
        let set = Change::Set { previous: Some(3) };
        assert!(set.is_changed());
        assert_eq!(set.previous(), Some(&3));
    }
}
