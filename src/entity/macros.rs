//! Declarative entity registration macros.
//!
//! Domain structs derive `Default`, `Serialize` and `Deserialize` and list
//! their query-visible properties once:
//!
//! ```ignore
//! #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
//! pub struct Person {
//!     pub name: String,
//!     pub age: i64,
//! }
//!
//! impl_node_entity! {
//!     Person, label = "Person", extends = Organism, props {
//!         name => "name",
//!         age => "age",
//!     }
//! }
//! ```
//!
//! `extends` names another entity type; its tag chain prefixes this type's
//! labels. Fields of an embedded base struct are listed through their path
//! (`base.kind => "kind"`).

/// Implement `Entity` + `NodeEntity` for a node struct.
#[macro_export]
macro_rules! impl_node_entity {
    ($ty:ident, label = $label:literal, extends = $parent:ty, props { $($($field:ident).+ => $prop:literal),* $(,)? }) => {
        $crate::impl_entity_common!($ty, $crate::entity::EntityKind::Node, $label,
            Some(<$parent as $crate::entity::HasMeta>::static_meta),
            props { $($($field).+ => $prop),* });
        impl $crate::entity::NodeEntity for $ty {}
    };
    ($ty:ident, label = $label:literal, props { $($($field:ident).+ => $prop:literal),* $(,)? }) => {
        $crate::impl_entity_common!($ty, $crate::entity::EntityKind::Node, $label, None,
            props { $($($field).+ => $prop),* });
        impl $crate::entity::NodeEntity for $ty {}
    };
}

/// Implement `Entity` + `RelationshipEntity` for a relationship struct.
#[macro_export]
macro_rules! impl_relationship_entity {
    ($ty:ident, rel_type = $rel:literal, props { $($($field:ident).+ => $prop:literal),* $(,)? }) => {
        $crate::impl_entity_common!($ty, $crate::entity::EntityKind::Relationship, $rel, None,
            props { $($($field).+ => $prop),* });
        impl $crate::entity::RelationshipEntity for $ty {}
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! impl_entity_common {
    ($ty:ident, $kind:expr, $tag:literal, $parent:expr,
     props { $($($field:ident).+ => $prop:literal),* }) => {
        impl $crate::entity::HasMeta for $ty {
            fn static_meta() -> &'static $crate::entity::EntityMeta {
                static META: $crate::entity::EntityMeta = $crate::entity::EntityMeta {
                    type_name: stringify!($ty),
                    kind: $kind,
                    tag: $tag,
                    parent: $parent,
                };
                &META
            }
        }

        impl $crate::entity::Entity for $ty {
            fn meta(&self) -> &'static $crate::entity::EntityMeta {
                <Self as $crate::entity::HasMeta>::static_meta()
            }

            fn properties(&self) -> Vec<(&'static str, $crate::value::Value)> {
                vec![$(($prop, $crate::value::Value::from(self.$($field).+.clone()))),*]
            }

            fn set_property(
                &mut self,
                prop: &str,
                value: &$crate::value::Value,
            ) -> Result<bool, $crate::binder::BindError> {
                match prop {
                    $($prop => {
                        self.$($field).+ = $crate::binder::FromValue::from_value(value)
                            .map_err(|e| e.for_key($prop))?;
                        Ok(true)
                    })*
                    _ => Ok(false),
                }
            }

            fn field_addresses(&self) -> Vec<(&'static str, usize)> {
                vec![$(($prop, &self.$($field).+ as *const _ as usize)),*]
            }

            fn merge_json(
                &mut self,
                patch: ::serde_json::Value,
            ) -> Result<(), $crate::binder::BindError> {
                let mut base = ::serde_json::to_value(&*self).map_err(|e| {
                    $crate::binder::BindError::Structural(e.to_string())
                })?;
                if let (Some(base_map), Some(patch_map)) = (base.as_object_mut(), patch.as_object())
                {
                    for (k, v) in patch_map {
                        base_map.insert(k.clone(), v.clone());
                    }
                }
                *self = ::serde_json::from_value(base).map_err(|e| {
                    $crate::binder::BindError::Structural(e.to_string())
                })?;
                Ok(())
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    };
}
