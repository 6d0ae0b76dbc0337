//! Binder: populates domain values from returned records.
//!
//! The inverse of compilation. The writer records, per result column, the
//! target that should receive it; `bind` performs type coercion, polymorphic
//! node resolution and recursive list/struct population into that target.
//!
//! Attempt order, first match wins:
//! 1. generic value slot - assign directly
//! 2. node/relationship result - custom unmarshal contract, else polymorphic
//!    resolution for abstract targets, else recurse into the property map
//! 3. native scalar kinds - custom contract, then `FromValue` coercion
//! 4. list results recurse element-wise with depth matching
//! 5. permissive primitive casts
//! 6. structural serde fallback, last resort

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use crate::entity::{Entity, EntityMeta, EntityRef, NodeEntity};
use crate::registry::Registry;
use crate::value::Value;

mod errors;
mod from_value;

pub use errors::BindError;
pub use from_value::FromValue;

/// Generic "any" slot: receives whatever the column holds, unconverted.
#[derive(Clone, Default)]
pub struct ValueSlot {
    cell: Rc<RefCell<Value>>,
}

impl ValueSlot {
    pub fn new() -> Self {
        ValueSlot::default()
    }

    pub fn get(&self) -> Value {
        self.cell.borrow().clone()
    }
}

impl std::fmt::Debug for ValueSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValueSlot({:?})", self.cell.borrow())
    }
}

trait EntitySlice {
    fn meta(&self) -> &'static EntityMeta;
    fn clear(&mut self);
    fn append(&mut self, registry: &Registry, value: &Value) -> Result<(), BindError>;
}

impl<T: NodeEntity + Default + 'static> EntitySlice for Vec<T> {
    fn meta(&self) -> &'static EntityMeta {
        T::static_meta()
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn append(&mut self, registry: &Registry, value: &Value) -> Result<(), BindError> {
        let mut item = T::default();
        populate_entity(registry, &mut item, value)?;
        self.push(item);
        Ok(())
    }
}

/// Caller-owned handle to a `Vec<T>` of entities, bindable as a list target.
pub struct VecHandle<T> {
    cell: Rc<RefCell<Vec<T>>>,
}

impl<T: NodeEntity + Default + 'static> VecHandle<T> {
    pub fn new() -> Self {
        VecHandle {
            cell: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn get(&self) -> Ref<'_, Vec<T>> {
        self.cell.borrow()
    }

    pub fn erased(&self) -> EntityListRef {
        EntityListRef {
            cell: self.cell.clone(),
        }
    }
}

impl<T: NodeEntity + Default + 'static> Default for VecHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for VecHandle<T> {
    fn clone(&self) -> Self {
        VecHandle {
            cell: self.cell.clone(),
        }
    }
}

/// Type-erased entity list target.
#[derive(Clone)]
pub struct EntityListRef {
    cell: Rc<RefCell<dyn EntitySlice>>,
}

impl EntityListRef {
    pub fn element_meta(&self) -> &'static EntityMeta {
        self.cell.borrow().meta()
    }
}

impl std::fmt::Debug for EntityListRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityListRef({})", self.element_meta().type_name)
    }
}

/// Polymorphic target: allocated on bind by resolving the result's label set
/// against the registered implementations of the abstract base.
#[derive(Clone)]
pub struct AbstractHandle {
    base: &'static EntityMeta,
    cell: Rc<RefCell<Option<Box<dyn Entity>>>>,
}

impl AbstractHandle {
    pub fn new<A: NodeEntity>() -> Self {
        AbstractHandle {
            base: A::static_meta(),
            cell: Rc::new(RefCell::new(None)),
        }
    }

    pub fn base_meta(&self) -> &'static EntityMeta {
        self.base
    }

    pub fn get(&self) -> Ref<'_, Option<Box<dyn Entity>>> {
        self.cell.borrow()
    }

    pub fn get_mut(&self) -> RefMut<'_, Option<Box<dyn Entity>>> {
        self.cell.borrow_mut()
    }

    /// Borrow the resolved value downcast to a concrete type, if it is one.
    pub fn with_concrete<T: Entity, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.cell.borrow();
        guard
            .as_ref()
            .and_then(|boxed| boxed.as_any().downcast_ref::<T>())
            .map(f)
    }
}

impl std::fmt::Debug for AbstractHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AbstractHandle(base = {})", self.base.type_name)
    }
}

/// A bindable slot attachable to a projection item.
#[derive(Debug, Clone)]
pub enum BindSlot {
    Value(ValueSlot),
    EntityList(EntityListRef),
    Abstract(AbstractHandle),
}

impl From<&ValueSlot> for BindSlot {
    fn from(slot: &ValueSlot) -> Self {
        BindSlot::Value(slot.clone())
    }
}

impl<T: NodeEntity + Default + 'static> From<&VecHandle<T>> for BindSlot {
    fn from(handle: &VecHandle<T>) -> Self {
        BindSlot::EntityList(handle.erased())
    }
}

impl From<&AbstractHandle> for BindSlot {
    fn from(handle: &AbstractHandle) -> Self {
        BindSlot::Abstract(handle.clone())
    }
}

/// Where one result column lands.
#[derive(Debug, Clone)]
pub enum BindTarget {
    Value(ValueSlot),
    Entity(EntityRef),
    Field { entity: EntityRef, prop: String },
    EntityList(EntityListRef),
    Abstract(AbstractHandle),
}

impl From<BindSlot> for BindTarget {
    fn from(slot: BindSlot) -> Self {
        match slot {
            BindSlot::Value(s) => BindTarget::Value(s),
            BindSlot::EntityList(l) => BindTarget::EntityList(l),
            BindSlot::Abstract(a) => BindTarget::Abstract(a),
        }
    }
}

/// Bind one result value into its target.
pub fn bind(registry: &Registry, value: &Value, target: &BindTarget) -> Result<(), BindError> {
    match target {
        BindTarget::Value(slot) => {
            *slot.cell.borrow_mut() = value.clone();
            Ok(())
        }
        BindTarget::Entity(entity) => populate_entity(registry, &mut *entity.borrow_mut(), value),
        BindTarget::Field { entity, prop } => {
            let mut guard = entity.borrow_mut();
            let type_name = guard.meta().type_name;
            match guard.set_property(prop, value)? {
                true => Ok(()),
                false => Err(BindError::UnknownProperty {
                    prop: prop.clone(),
                    type_name,
                }),
            }
        }
        BindTarget::EntityList(list) => bind_entity_list(registry, value, list),
        BindTarget::Abstract(handle) => bind_abstract(registry, value, handle),
    }
}

/// Populate a concrete entity from a node/relationship/map result.
pub(crate) fn populate_entity(
    _registry: &Registry,
    entity: &mut dyn Entity,
    value: &Value,
) -> Result<(), BindError> {
    if let Some(result) = entity.custom_unmarshal(value) {
        return result;
    }
    let props: &HashMap<String, Value> = match value {
        Value::Node(n) => &n.properties,
        Value::Relationship(r) => &r.properties,
        Value::Map(m) => m,
        Value::Null => return Ok(()),
        other => {
            return Err(BindError::Coercion {
                got: other.kind_name(),
                want: entity.meta().type_name,
            });
        }
    };
    let mut leftover: Option<serde_json::Map<String, serde_json::Value>> = None;
    for (key, val) in props {
        if !entity.set_property(key, val)? {
            // not a declared property; hand the remainder to the structural
            // fallback in one pass
            leftover
                .get_or_insert_with(serde_json::Map::new)
                .insert(key.clone(), val.to_json());
        }
    }
    if let Some(patch) = leftover {
        log::debug!(
            "binder: structural fallback for {} undeclared keys on '{}'",
            patch.len(),
            entity.meta().type_name
        );
        entity.merge_json(serde_json::Value::Object(patch))?;
    }
    Ok(())
}

fn bind_entity_list(
    registry: &Registry,
    value: &Value,
    list: &EntityListRef,
) -> Result<(), BindError> {
    let mut guard = list.cell.borrow_mut();
    match value {
        // absence is an empty list
        Value::Null => Ok(()),
        Value::List(items) => {
            guard.clear();
            for (i, item) in items.iter().enumerate() {
                guard
                    .append(registry, item)
                    .map_err(|e| e.for_key(&i.to_string()))?;
            }
            Ok(())
        }
        // single row where the caller expects a slice: a one-element list.
        // Rows accumulate across repeated binds of the same target.
        single @ (Value::Node(_) | Value::Relationship(_) | Value::Map(_)) => {
            guard.append(registry, single)
        }
        other => Err(BindError::DepthMismatch {
            got: other.kind_name(),
        }),
    }
}

fn bind_abstract(
    registry: &Registry,
    value: &Value,
    handle: &AbstractHandle,
) -> Result<(), BindError> {
    let node = match value {
        Value::Node(n) => n,
        Value::Null => return Ok(()),
        other => {
            return Err(BindError::Coercion {
                got: other.kind_name(),
                want: handle.base.type_name,
            });
        }
    };
    let resolved = registry.concrete_implementation(&node.labels)?;
    log::debug!(
        "binder: labels {:?} resolved to '{}' for abstract base '{}'",
        node.labels,
        resolved.node.type_name,
        handle.base.type_name
    );
    let mut concrete = (resolved.factory)();
    populate_entity(registry, concrete.as_mut(), value)?;
    *handle.cell.borrow_mut() = Some(concrete);
    Ok(())
}
