//! Graphweld - typed Cypher query construction and object binding
//!
//! This crate compiles chains of typed clause-building calls into Cypher text
//! and maps result rows back onto the same domain values:
//! - Pattern model for node/relationship chains
//! - Type registry deriving labels and relationship types from entity metadata
//! - Scope (per-query symbol table) with parameter deduplication
//! - Clause writer emitting well-formed Cypher
//! - Binder populating domain values from returned records

pub mod binder;
pub mod entity;
pub mod executor;
pub mod pattern;
pub mod registry;
pub mod scope;
pub mod value;
pub mod writer;

pub use binder::{
    bind, AbstractHandle, BindError, BindSlot, BindTarget, FromValue, ValueSlot, VecHandle,
};
pub use entity::{
    field_ref, Entity, EntityKind, EntityMeta, EntityRef, FieldRef, Handle, HasMeta, NodeEntity,
    RelationshipEntity,
};
pub use executor::{execute, ExecuteError, QueryRunner, Row, RunnerError};
pub use pattern::{node, paths, Direction, Pattern, Patterns};
pub use registry::{Registry, RegistryError};
pub use scope::{
    cmp, cond, expr, param, props, qual, CompileError, Condition, Identifier, Member, Props, Scope,
};
pub use value::{NodeValue, RelationshipValue, Value};
pub use writer::{
    CompiledQuery, CypherWriter, MatchItem, MergeOptions, RemoveItem, SetItem,
};
