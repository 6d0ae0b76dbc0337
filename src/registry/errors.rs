use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    #[error("type '{0}' is not a node type (relationship used in node position?)")]
    NotANode(&'static str),

    #[error("type '{0}' is not a relationship type (node used in relationship position?)")]
    NotARelationship(&'static str),

    #[error("abstract base '{0}' is not registered; call Registry::register_abstract::<{0}>() first")]
    AbstractNotRegistered(&'static str),

    #[error("no abstract base matches label set [{0}]; register the base type with Registry::register_abstract before binding polymorphic results")]
    NoAbstractBase(String),

    #[error("no concrete implementation of '{base}' matches label set [{labels}]; register the implementing type with Registry::register_implementation")]
    NoConcreteImplementation { base: &'static str, labels: String },
}
