//! Object type hierarchy
//!
//! A single-parent tree of named object types. Types without a parent hang
//! off the implicit root. `is_of_type` walks the parent chain and is
//! reflexive, so a type-scoped observer matches the type itself and all of
//! its descendants.

use crate::definitions::Interned;
use rustc_hash::FxHashMap;
use tether_core::{Error, HandleAllocator, ObjectType, Result};
use tracing::debug;

#[derive(Debug, Clone)]
struct TypeNode {
    name: String,
    parent: Option<ObjectType>,
}

/// Tree of object types
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    nodes: FxHashMap<ObjectType, TypeNode>,
    by_name: FxHashMap<String, ObjectType>,
    order: Vec<ObjectType>,
}

impl TypeHierarchy {
    /// Create an empty hierarchy
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name` under `parent` (`None` = root)
    ///
    /// Redefining a name with the same parent returns the existing type.
    ///
    /// # Errors
    ///
    /// - `UnknownHandle` if `parent` is not a defined type
    /// - `InvalidHierarchy` if `name` exists under a different parent
    pub fn define_type(
        &mut self,
        alloc: &mut HandleAllocator,
        name: &str,
        parent: Option<ObjectType>,
    ) -> Result<Interned<ObjectType>> {
        if let Some(p) = parent {
            self.require(p)?;
        }
        if let Some(&existing) = self.by_name.get(name) {
            let current = self.nodes.get(&existing).and_then(|n| n.parent);
            if current != parent {
                return Err(Error::InvalidHierarchy(format!(
                    "type '{}' is already defined with a different parent",
                    name
                )));
            }
            return Ok(Interned::Existing(existing));
        }
        let object_type = ObjectType::from_handle(alloc.mint());
        self.nodes.insert(
            object_type,
            TypeNode {
                name: name.to_string(),
                parent,
            },
        );
        self.by_name.insert(name.to_string(), object_type);
        self.order.push(object_type);
        debug!(target: "tether::types", %object_type, name, "Object type defined");
        Ok(Interned::New(object_type))
    }

    /// Move `object_type` under `parent`
    ///
    /// Returns the previous parent.
    ///
    /// # Errors
    ///
    /// - `UnknownHandle` if either type is undefined
    /// - `InvalidHierarchy` if `parent` is `object_type` or one of its descendants
    pub fn set_parent(&mut self, object_type: ObjectType, parent: Option<ObjectType>) -> Result<Option<ObjectType>> {
        self.require(object_type)?;
        if let Some(p) = parent {
            self.require(p)?;
            if self.is_of_type(p, object_type) {
                return Err(Error::InvalidHierarchy(format!(
                    "type {} cannot become its own ancestor",
                    object_type
                )));
            }
        }
        let node = self
            .nodes
            .get_mut(&object_type)
            .ok_or(Error::UnknownHandle(object_type.handle()))?;
        let previous = std::mem::replace(&mut node.parent, parent);
        debug!(target: "tether::types", %object_type, ?parent, "Object type re-parented");
        Ok(previous)
    }

    /// True if `candidate_ancestor` is `object_type` or one of its ancestors
    ///
    /// False whenever either type is undefined.
    pub fn is_of_type(&self, object_type: ObjectType, candidate_ancestor: ObjectType) -> bool {
        if !self.nodes.contains_key(&candidate_ancestor) {
            return false;
        }
        let mut current = Some(object_type);
        while let Some(t) = current {
            if t == candidate_ancestor {
                return true;
            }
            current = match self.nodes.get(&t) {
                Some(node) => node.parent,
                None => return false,
            };
        }
        false
    }

    /// Type interned for `name`
    pub fn lookup_type(&self, name: &str) -> Option<ObjectType> {
        self.by_name.get(name).copied()
    }

    /// Name of `object_type`
    pub fn type_name(&self, object_type: ObjectType) -> Option<&str> {
        self.nodes.get(&object_type).map(|n| n.name.as_str())
    }

    /// Parent of `object_type`; `None` for root children and undefined types
    pub fn parent(&self, object_type: ObjectType) -> Option<ObjectType> {
        self.nodes.get(&object_type).and_then(|n| n.parent)
    }

    /// Chain from `object_type` up to its root-level ancestor, inclusive
    pub fn ancestry(&self, object_type: ObjectType) -> Vec<ObjectType> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&object_type).map(|_| object_type);
        while let Some(t) = current {
            chain.push(t);
            current = self.parent(t);
        }
        chain
    }

    /// True if `object_type` is defined
    pub fn contains(&self, object_type: ObjectType) -> bool {
        self.nodes.contains_key(&object_type)
    }

    /// Types in definition order with their name and parent
    pub fn types(&self) -> impl Iterator<Item = (ObjectType, &str, Option<ObjectType>)> {
        self.order.iter().filter_map(move |t| {
            self.nodes
                .get(t)
                .map(|node| (*t, node.name.as_str(), node.parent))
        })
    }

    /// Number of defined types
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no type is defined
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn require(&self, object_type: ObjectType) -> Result<()> {
        if self.nodes.contains_key(&object_type) {
            Ok(())
        } else {
            Err(Error::UnknownHandle(object_type.handle()))
        }
    }
}
