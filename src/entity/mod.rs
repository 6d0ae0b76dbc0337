//! Entity metadata and handles.
//!
//! Domain types stay plain structs; a declarative macro
//! (`impl_node_entity!` / `impl_relationship_entity!`) attaches the static
//! metadata the registry walks (label/type tag plus ancestor chain) and the
//! instance surface the scope and binder use (property enumeration, property
//! assignment, field addresses).
//!
//! Queries are built over `Handle<T>` values. A handle is a cheap clonable
//! reference; its allocation address is the identity the scope keys on, and
//! the same handle is written through when results are bound.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::binder::BindError;
use crate::value::Value;

mod macros;

/// Whether a domain type occupies node or relationship positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Relationship,
}

/// Static metadata for one domain type.
///
/// `tag` is the type's own label (nodes) or relationship type name. `parent`
/// links to the ancestor's metadata; the full label list of a node is the
/// ancestor chain walked depth-first, ancestors first, own tag last.
pub struct EntityMeta {
    pub type_name: &'static str,
    pub kind: EntityKind,
    pub tag: &'static str,
    pub parent: Option<fn() -> &'static EntityMeta>,
}

impl EntityMeta {
    /// Stable identity of this metadata record (statics have fixed addresses).
    pub fn key(&'static self) -> usize {
        self as *const EntityMeta as usize
    }

    /// Ancestor-first tag chain, ending with this type's own tag.
    pub fn tag_chain(&'static self) -> Vec<&'static str> {
        let mut chain = Vec::new();
        collect_tags(self, &mut chain);
        chain
    }
}

fn collect_tags(meta: &'static EntityMeta, out: &mut Vec<&'static str>) {
    if let Some(parent) = meta.parent {
        collect_tags(parent(), out);
    }
    if !meta.tag.is_empty() {
        out.push(meta.tag);
    }
}

impl fmt::Debug for EntityMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMeta")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("tag", &self.tag)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// Type-level access to an entity's metadata (no instance required).
pub trait HasMeta {
    fn static_meta() -> &'static EntityMeta;
}

/// Instance surface of a domain value.
///
/// Implemented by the entity macros; hand implementations only need to keep
/// `properties`, `set_property` and `field_addresses` consistent with each
/// other (same declared property names).
pub trait Entity: Any {
    fn meta(&self) -> &'static EntityMeta;

    /// Declared property name paired with the field's current value.
    fn properties(&self) -> Vec<(&'static str, Value)>;

    /// Assign one property from a record value. Returns `Ok(false)` when the
    /// property name is not declared on this type.
    fn set_property(&mut self, prop: &str, value: &Value) -> Result<bool, BindError>;

    /// Declared property name paired with the address of its backing field
    /// within this instance. Powers `&value.field`-style references.
    fn field_addresses(&self) -> Vec<(&'static str, usize)>;

    /// Structural fallback: overlay a JSON object onto this value via serde.
    fn merge_json(&mut self, patch: serde_json::Value) -> Result<(), BindError>;

    /// Custom unmarshal contract. A type that wants full control over how a
    /// record value populates it returns `Some(result)` here; the default
    /// opts out and the binder proceeds with its normal path.
    fn custom_unmarshal(&mut self, value: &Value) -> Option<Result<(), BindError>> {
        let _ = value;
        None
    }

    /// Custom marshal contract: the value that stands in for this instance
    /// when its properties substitute as a parameter. The default opts out
    /// and the scope derives a map of the non-zero declared properties.
    fn custom_marshal(&self) -> Option<Value> {
        None
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Marker for node types.
pub trait NodeEntity: Entity + HasMeta {}

/// Marker for relationship types.
pub trait RelationshipEntity: Entity + HasMeta {}

/// Caller-owned handle to a domain value.
///
/// Cloning shares the same underlying value; the shared allocation address is
/// the identity used for name reuse and parameter deduplication.
pub struct Handle<T: Entity> {
    cell: Rc<RefCell<T>>,
}

impl<T: Entity> Handle<T> {
    pub fn new(value: T) -> Self {
        Handle {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    pub fn get(&self) -> Ref<'_, T> {
        self.cell.borrow()
    }

    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.cell.borrow_mut()
    }

    /// Replace the held value.
    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.cell) as *const () as usize
    }

    /// Type-erased form stored in the scope and in bind targets.
    pub fn erased(&self) -> EntityRef {
        EntityRef {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Entity> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Entity + fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:?})", self.cell.borrow())
    }
}

/// Type-erased entity handle.
#[derive(Clone)]
pub struct EntityRef {
    cell: Rc<RefCell<dyn Entity>>,
}

impl EntityRef {
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.cell) as *const () as usize
    }

    pub fn borrow(&self) -> Ref<'_, dyn Entity> {
        self.cell.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, dyn Entity> {
        self.cell.borrow_mut()
    }

    pub fn meta(&self) -> &'static EntityMeta {
        self.cell.borrow().meta()
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntityRef({} @ {:#x})",
            self.meta().type_name,
            self.addr()
        )
    }
}

/// Address of one field inside a registered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub(crate) addr: usize,
}

impl FieldRef {
    pub fn addr(&self) -> usize {
        self.addr
    }
}

/// Capture a reference to one field of a handled entity, for use as a
/// projection item or bind target (`field_ref(&p, |p| &p.name)` stands in
/// for `&p.name`).
pub fn field_ref<T: Entity, F>(handle: &Handle<T>, select: impl FnOnce(&T) -> &F) -> FieldRef {
    let guard = handle.get();
    let addr = select(&guard) as *const F as usize;
    FieldRef { addr }
}
