//! Link graph
//!
//! Directed, attribute-tagged edges between objects. Each edge may also
//! point at a third "attribute object" carrying a value for the relation.
//!
//! Indexes kept in step with the edge table:
//! - (superior, attribute, subordinate) → link, for duplicate detection
//! - object → incident links, for cascading unlink on destroy
//! - object → links using it as attribute object, for clearing on destroy

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use tether_core::{AttributeHandle, Change, Error, HandleAllocator, LinkHandle, ObjectHandle, Result};
use tracing::debug;

/// Handles collected from an index, usually few per object
pub type LinkList = SmallVec<[LinkHandle; 4]>;

/// One directed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Edge handle
    pub handle: LinkHandle,
    /// Relationship kind
    pub attribute: AttributeHandle,
    /// Source endpoint
    pub superior: ObjectHandle,
    /// Target endpoint
    pub subordinate: ObjectHandle,
    /// Optional value object
    pub attribute_object: Option<ObjectHandle>,
}

type Triple = (ObjectHandle, AttributeHandle, ObjectHandle);

/// Edge table and its indexes
#[derive(Debug, Default)]
pub struct LinkGraph {
    links: BTreeMap<LinkHandle, Link>,
    by_triple: FxHashMap<Triple, LinkHandle>,
    incident: FxHashMap<ObjectHandle, BTreeSet<LinkHandle>>,
    attribute_refs: FxHashMap<ObjectHandle, BTreeSet<LinkHandle>>,
}

impl LinkGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the edge `superior -[attribute]-> subordinate`
    ///
    /// Endpoint liveness is checked by the caller.
    ///
    /// # Errors
    ///
    /// `DuplicateLink` if the identical triple exists.
    pub fn link(
        &mut self,
        alloc: &mut HandleAllocator,
        superior: ObjectHandle,
        attribute: AttributeHandle,
        subordinate: ObjectHandle,
    ) -> Result<LinkHandle> {
        let triple = (superior, attribute, subordinate);
        if self.by_triple.contains_key(&triple) {
            return Err(Error::DuplicateLink {
                superior,
                attribute,
                subordinate,
            });
        }
        let handle = LinkHandle::from_handle(alloc.mint());
        self.links.insert(
            handle,
            Link {
                handle,
                attribute,
                superior,
                subordinate,
                attribute_object: None,
            },
        );
        self.by_triple.insert(triple, handle);
        self.incident.entry(superior).or_default().insert(handle);
        self.incident.entry(subordinate).or_default().insert(handle);
        debug!(target: "tether::link", link = %handle, %superior, %attribute, %subordinate, "Linked");
        Ok(handle)
    }

    /// Remove an edge, returning it
    pub fn unlink(&mut self, handle: LinkHandle) -> Result<Link> {
        let link = self
            .links
            .remove(&handle)
            .ok_or(Error::UnknownHandle(handle.handle()))?;
        self.by_triple
            .remove(&(link.superior, link.attribute, link.subordinate));
        for end in [link.superior, link.subordinate] {
            Self::unindex(&mut self.incident, end, handle);
        }
        if let Some(attr_obj) = link.attribute_object {
            Self::unindex(&mut self.attribute_refs, attr_obj, handle);
        }
        debug!(target: "tether::link", link = %handle, "Unlinked");
        Ok(link)
    }

    /// Replace the attribute object of an edge
    ///
    /// Attribute-object liveness is checked by the caller.
    pub fn set_attribute_object(
        &mut self,
        handle: LinkHandle,
        attribute_object: Option<ObjectHandle>,
    ) -> Result<Change<ObjectHandle>> {
        let link = self
            .links
            .get_mut(&handle)
            .ok_or(Error::UnknownHandle(handle.handle()))?;
        if link.attribute_object == attribute_object {
            return Ok(Change::Unchanged);
        }
        let previous = std::mem::replace(&mut link.attribute_object, attribute_object);
        if let Some(prev) = previous {
            Self::unindex(&mut self.attribute_refs, prev, handle);
        }
        if let Some(next) = attribute_object {
            self.attribute_refs.entry(next).or_default().insert(handle);
        }
        Ok(Change::Set { previous })
    }

    /// Edge by handle
    pub fn get(&self, handle: LinkHandle) -> Option<&Link> {
        self.links.get(&handle)
    }

    /// Edge matching the triple
    pub fn lookup(
        &self,
        superior: ObjectHandle,
        attribute: AttributeHandle,
        subordinate: ObjectHandle,
    ) -> Option<LinkHandle> {
        self.by_triple
            .get(&(superior, attribute, subordinate))
            .copied()
    }

    /// Edges with `object` as either endpoint, ascending
    pub fn incident(&self, object: ObjectHandle) -> LinkList {
        self.incident
            .get(&object)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Edges using `object` as attribute object, ascending
    pub fn referencing(&self, object: ObjectHandle) -> LinkList {
        self.attribute_refs
            .get(&object)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Subordinates of `superior` over `attribute`, in link order
    pub fn subordinates(&self, superior: ObjectHandle, attribute: AttributeHandle) -> Vec<ObjectHandle> {
        self.incident_links(superior)
            .filter(|l| l.superior == superior && l.attribute == attribute)
            .map(|l| l.subordinate)
            .collect()
    }

    /// Superiors of `subordinate` over `attribute`, in link order
    pub fn superiors(&self, subordinate: ObjectHandle, attribute: AttributeHandle) -> Vec<ObjectHandle> {
        self.incident_links(subordinate)
            .filter(|l| l.subordinate == subordinate && l.attribute == attribute)
            .map(|l| l.superior)
            .collect()
    }

    /// All edge handles, ascending
    pub fn iter(&self) -> impl Iterator<Item = LinkHandle> + '_ {
        self.links.keys().copied()
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True if there are no edges
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn incident_links(&self, object: ObjectHandle) -> impl Iterator<Item = &Link> {
        self.incident
            .get(&object)
            .into_iter()
            .flatten()
            .filter_map(|h| self.links.get(h))
    }

    fn unindex(
        index: &mut FxHashMap<ObjectHandle, BTreeSet<LinkHandle>>,
        object: ObjectHandle,
        handle: LinkHandle,
    ) {
        if let Some(set) = index.get_mut(&object) {
            set.remove(&handle);
            if set.is_empty() {
                index.remove(&object);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        alloc: HandleAllocator,
        graph: LinkGraph,
        a: ObjectHandle,
        b: ObjectHandle,
        c: ObjectHandle,
        kind: AttributeHandle,
    }

    fn fixture() -> Fixture {
        let mut alloc = HandleAllocator::new();
        let a = ObjectHandle::from_handle(alloc.mint());
        let b = ObjectHandle::from_handle(alloc.mint());
        let c = ObjectHandle::from_handle(alloc.mint());
        let kind = AttributeHandle::from_handle(alloc.mint());
        Fixture {
            alloc,
            graph: LinkGraph::new(),
            a,
            b,
            c,
            kind,
        }
    }

    #[test]
    fn test_link_and_lookup() {
        let mut f = fixture();
        let l = f.graph.link(&mut f.alloc, f.a, f.kind, f.b).unwrap();
        assert_eq!(f.graph.lookup(f.a, f.kind, f.b), Some(l));
        assert_eq!(f.graph.lookup(f.b, f.kind, f.a), None);
        assert_eq!(f.graph.subordinates(f.a, f.kind), vec![f.b]);
        assert_eq!(f.graph.superiors(f.b, f.kind), vec![f.a]);
    }

    #[test]
    fn test_duplicate_link_rejected() {
        let mut f = fixture();
        f.graph.link(&mut f.alloc, f.a, f.kind, f.b).unwrap();
        assert!(matches!(
            f.graph.link(&mut f.alloc, f.a, f.kind, f.b),
            Err(Error::DuplicateLink { .. })
        ));
        // reverse direction is a different edge
        f.graph.link(&mut f.alloc, f.b, f.kind, f.a).unwrap();
        assert_eq!(f.graph.len(), 2);
    }

    #[test]
    fn test_unlink_cleans_indexes() {
        let mut f = fixture();
        let l = f.graph.link(&mut f.alloc, f.a, f.kind, f.b).unwrap();
        f.graph.set_attribute_object(l, Some(f.c)).unwrap();
        let removed = f.graph.unlink(l).unwrap();
        assert_eq!(removed.attribute_object, Some(f.c));
        assert!(f.graph.incident(f.a).is_empty());
        assert!(f.graph.incident(f.b).is_empty());
        assert!(f.graph.referencing(f.c).is_empty());
        assert_eq!(f.graph.unlink(l), Err(Error::UnknownHandle(l.handle())));
        // triple is free again
        f.graph.link(&mut f.alloc, f.a, f.kind, f.b).unwrap();
    }

    #[test]
    fn test_attribute_object_change() {
        let mut f = fixture();
        let l = f.graph.link(&mut f.alloc, f.a, f.kind, f.b).unwrap();
        assert_eq!(
            f.graph.set_attribute_object(l, Some(f.c)).unwrap(),
            Change::Set { previous: None }
        );
        assert_eq!(f.graph.set_attribute_object(l, Some(f.c)).unwrap(), Change::Unchanged);
        assert_eq!(f.graph.referencing(f.c).as_slice(), &[l]);
        assert_eq!(
            f.graph.set_attribute_object(l, None).unwrap(),
            Change::Set { previous: Some(f.c) }
        );
        assert!(f.graph.referencing(f.c).is_empty());
    }

    #[test]
    fn test_self_link_indexed_once() {
        let mut f = fixture();
        let l = f.graph.link(&mut f.alloc, f.a, f.kind, f.a).unwrap();
        assert_eq!(f.graph.incident(f.a).as_slice(), &[l]);
        f.graph.unlink(l).unwrap();
        assert!(f.graph.incident(f.a).is_empty());
    }
}
