//! Type registry.
//!
//! Derives query vocabulary (labels, relationship type names, property names)
//! from entity metadata, memoized per distinct type. Registration happens on
//! demand the first time a type is seen; steady-state lookups take the read
//! lock only. The registry is an explicit object owned by whoever owns the
//! compilation sessions, typically one per process or one per test. There is
//! no hidden static.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::entity::{Entity, EntityKind, EntityMeta, NodeEntity};

mod errors;
pub use errors::RegistryError;

/// Allocates a fresh instance of a registered concrete type for polymorphic
/// binding.
pub type EntityFactory = fn() -> Box<dyn Entity>;

/// Cached metadata for a node type.
#[derive(Debug, Clone)]
pub struct RegisteredNode {
    pub type_name: &'static str,
    /// Ancestor labels first, own label last.
    pub labels: Vec<String>,
    /// Declared query property names.
    pub properties: Vec<&'static str>,
}

/// Cached metadata for a relationship type.
#[derive(Debug, Clone)]
pub struct RegisteredRelationship {
    pub type_name: &'static str,
    pub rel_type: String,
    pub properties: Vec<&'static str>,
}

/// One instantiable candidate of an abstract family.
#[derive(Clone)]
pub struct ResolvedImplementation {
    pub node: Arc<RegisteredNode>,
    pub factory: EntityFactory,
}

impl std::fmt::Debug for ResolvedImplementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResolvedImplementation({})", self.node.type_name)
    }
}

struct RegisteredAbstract {
    base: ResolvedImplementation,
    implementers: Vec<ResolvedImplementation>,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<usize, Arc<RegisteredNode>>,
    relationships: HashMap<usize, Arc<RegisteredRelationship>>,
    /// Registration order is preserved: when two bases match an equal label
    /// count, the first registered wins.
    abstracts: Vec<RegisteredAbstract>,
}

/// Process-wide, read-mostly type metadata cache.
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Labels of a node type without an instance (type-level chain walk). A
/// `Handle<T>`, `Vec<T>` or bare `T` all yield the same list.
pub fn labels_of<T: NodeEntity>() -> Vec<String> {
    labels_for_meta(T::static_meta())
}

/// Ancestor-first label list for a node metadata record.
pub fn labels_for_meta(meta: &'static EntityMeta) -> Vec<String> {
    meta.tag_chain().into_iter().map(String::from).collect()
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a live node value, memoized by type. Idempotent.
    pub fn register_node(&self, entity: &dyn Entity) -> Result<Arc<RegisteredNode>, RegistryError> {
        let meta = entity.meta();
        if meta.kind != EntityKind::Node {
            return Err(RegistryError::NotANode(meta.type_name));
        }
        let key = meta.key();
        if let Some(found) = self.inner.read().expect("registry lock").nodes.get(&key) {
            return Ok(found.clone());
        }
        let registered = Arc::new(RegisteredNode {
            type_name: meta.type_name,
            labels: labels_for_meta(meta),
            properties: entity.properties().into_iter().map(|(name, _)| name).collect(),
        });
        log::debug!(
            "registry: node type '{}' -> labels {:?}",
            meta.type_name,
            registered.labels
        );
        let mut inner = self.inner.write().expect("registry lock");
        Ok(inner.nodes.entry(key).or_insert(registered).clone())
    }

    /// Register a live relationship value, memoized by type. Idempotent.
    pub fn register_relationship(
        &self,
        entity: &dyn Entity,
    ) -> Result<Arc<RegisteredRelationship>, RegistryError> {
        let meta = entity.meta();
        if meta.kind != EntityKind::Relationship {
            return Err(RegistryError::NotARelationship(meta.type_name));
        }
        let key = meta.key();
        if let Some(found) = self
            .inner
            .read()
            .expect("registry lock")
            .relationships
            .get(&key)
        {
            return Ok(found.clone());
        }
        let registered = Arc::new(RegisteredRelationship {
            type_name: meta.type_name,
            rel_type: meta.tag.to_string(),
            properties: entity.properties().into_iter().map(|(name, _)| name).collect(),
        });
        log::debug!(
            "registry: relationship type '{}' -> {}",
            meta.type_name,
            registered.rel_type
        );
        let mut inner = self.inner.write().expect("registry lock");
        Ok(inner.relationships.entry(key).or_insert(registered).clone())
    }

    /// Labels of a live node value, registering on demand.
    pub fn node_labels(&self, entity: &dyn Entity) -> Result<Vec<String>, RegistryError> {
        Ok(self.register_node(entity)?.labels.clone())
    }

    /// Relationship type name of a live value, registering on demand.
    pub fn relationship_type(&self, entity: &dyn Entity) -> Result<String, RegistryError> {
        Ok(self.register_relationship(entity)?.rel_type.clone())
    }

    /// Register `A` as an abstract base. `A` itself is instantiable and wins
    /// resolution when a label set matches the base labels exactly.
    pub fn register_abstract<A>(&self) -> Result<(), RegistryError>
    where
        A: NodeEntity + Default + 'static,
    {
        let instance = A::default();
        let node = self.register_node(&instance)?;
        let mut inner = self.inner.write().expect("registry lock");
        if inner
            .abstracts
            .iter()
            .any(|a| a.base.node.type_name == node.type_name)
        {
            return Ok(());
        }
        inner.abstracts.push(RegisteredAbstract {
            base: ResolvedImplementation {
                node,
                factory: || Box::new(A::default()),
            },
            implementers: Vec::new(),
        });
        Ok(())
    }

    /// Register `T` as a concrete implementer of abstract base `A`.
    pub fn register_implementation<A, T>(&self) -> Result<(), RegistryError>
    where
        A: NodeEntity + Default + 'static,
        T: NodeEntity + Default + 'static,
    {
        let instance = T::default();
        let node = self.register_node(&instance)?;
        let base_name = A::static_meta().type_name;
        let mut inner = self.inner.write().expect("registry lock");
        let entry = inner
            .abstracts
            .iter_mut()
            .find(|a| a.base.node.type_name == base_name)
            .ok_or(RegistryError::AbstractNotRegistered(base_name))?;
        if entry
            .implementers
            .iter()
            .any(|c| c.node.type_name == node.type_name)
        {
            return Ok(());
        }
        entry.implementers.push(ResolvedImplementation {
            node,
            factory: || Box::new(T::default()),
        });
        Ok(())
    }

    /// Polymorphic resolution: find the concrete type for a runtime label set.
    ///
    /// Among registered abstract bases whose own labels are a subset of
    /// `labels`, the one with the largest matching count wins (closest
    /// ancestor; equal counts fall back to registration order). If that
    /// base's label count already equals the input count the base itself is
    /// the answer; otherwise the first implementer fully contained in
    /// `labels` is taken.
    pub fn concrete_implementation(
        &self,
        labels: &[String],
    ) -> Result<ResolvedImplementation, RegistryError> {
        let inner = self.inner.read().expect("registry lock");
        let mut best: Option<&RegisteredAbstract> = None;
        for abstract_entry in &inner.abstracts {
            let base_labels = &abstract_entry.base.node.labels;
            if !is_subset(base_labels, labels) {
                continue;
            }
            match best {
                Some(current) if current.base.node.labels.len() >= base_labels.len() => {}
                _ => best = Some(abstract_entry),
            }
        }
        let Some(found) = best else {
            return Err(RegistryError::NoAbstractBase(labels.join(", ")));
        };
        if found.base.node.labels.len() == labels.len() {
            log::debug!(
                "registry: label set [{}] resolved to base '{}'",
                labels.join(", "),
                found.base.node.type_name
            );
            return Ok(found.base.clone());
        }
        for implementer in &found.implementers {
            if is_subset(&implementer.node.labels, labels) {
                log::debug!(
                    "registry: label set [{}] resolved to implementer '{}'",
                    labels.join(", "),
                    implementer.node.type_name
                );
                return Ok(implementer.clone());
            }
        }
        Err(RegistryError::NoConcreteImplementation {
            base: found.base.node.type_name,
            labels: labels.join(", "),
        })
    }
}

fn is_subset(subset: &[String], superset: &[String]) -> bool {
    subset.iter().all(|l| superset.contains(l))
}
