use thiserror::Error;

use crate::registry::RegistryError;

/// Binding/coercion errors. Unlike structural compile errors these are
/// returned immediately: binding runs once per record at execution time and
/// gains nothing from deferral.
#[derive(Debug, Clone, Error)]
pub enum BindError {
    #[error("missing result key '{0}'")]
    MissingKey(String),

    #[error("cannot coerce {got} into {want}")]
    Coercion {
        got: &'static str,
        want: &'static str,
    },

    #[error("property '{prop}' is not declared on '{type_name}'")]
    UnknownProperty {
        prop: String,
        type_name: &'static str,
    },

    #[error("for key '{key}': {source}")]
    Key {
        key: String,
        #[source]
        source: Box<BindError>,
    },

    #[error("list nesting mismatch: cannot fit {got} into list target")]
    DepthMismatch { got: &'static str },

    #[error("structural unmarshal failed: {0}")]
    Structural(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl BindError {
    /// Wrap with the offending key.
    pub fn for_key(self, key: &str) -> BindError {
        BindError::Key {
            key: key.to_string(),
            source: Box::new(self),
        }
    }
}
