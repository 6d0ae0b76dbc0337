use thiserror::Error;

use crate::registry::RegistryError;

/// Structural compile errors.
///
/// These are accumulated on the session (first error wins) while the chain is
/// being built and surfaced once, at the terminal `compile()` call.
/// Registry configuration errors pass through unchanged so the message still
/// names the missing registration step.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("variable '{name}' is already bound to a different value")]
    AlreadyBound { name: String },

    #[error("value is already registered as parameter '{existing}' and cannot be renamed to '{requested}'")]
    ParameterRebound { existing: String, requested: String },

    #[error("identifier '{0}' was never registered in this scope or an ancestor scope")]
    UnknownIdentifier(String),

    #[error("field reference does not belong to any registered entity; register the owning value first")]
    UnregisteredField,

    #[error("invalid variable name '{0}'")]
    InvalidName(String),

    #[error("invalid property key '{0}'")]
    InvalidPropertyKey(String),

    #[error("projection item needs a name or alias to be referenced")]
    UnnamedProjectionItem,

    #[error("{subclause} declared by more than one {clause} item")]
    MergeConflict {
        clause: &'static str,
        subclause: &'static str,
    },

    #[error("WHERE is not allowed as a RETURN subclause; move the filter to a WITH clause")]
    WhereInReturn,

    #[error("relationship pattern expects a relationship value, got node type '{0}'")]
    MismatchedRelationship(&'static str),

    #[error("node pattern expects a node value, got relationship type '{0}'")]
    MismatchedNode(&'static str),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
