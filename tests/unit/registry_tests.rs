use graphweld::registry::{labels_of, Registry, RegistryError};
use graphweld::Entity;

use crate::fixtures::{ActedIn, Dog, Human, Movie, Organism, Person};

#[test]
fn test_label_chain_is_ancestor_first() {
    assert_eq!(labels_of::<Person>(), vec!["Person"]);
    assert_eq!(labels_of::<Human>(), vec!["Organism", "Human"]);
    assert_eq!(labels_of::<Dog>(), vec!["Organism", "Dog"]);
}

#[test]
fn test_node_registration_is_memoized() {
    let registry = Registry::new();
    let first = registry.register_node(&Person::default()).unwrap();
    let second = registry.register_node(&Person::default()).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(first.properties, vec!["name", "age"]);
}

#[test]
fn test_relationship_type_from_tag() {
    let registry = Registry::new();
    let rel_type = registry.relationship_type(&ActedIn::default()).unwrap();
    assert_eq!(rel_type, "ACTED_IN");
}

#[test]
fn test_kind_mismatch_is_rejected() {
    let registry = Registry::new();
    assert!(matches!(
        registry.register_node(&ActedIn::default()),
        Err(RegistryError::NotANode("ActedIn"))
    ));
    assert!(matches!(
        registry.register_relationship(&Person::default()),
        Err(RegistryError::NotARelationship("Person"))
    ));
}

fn polymorphic_registry() -> Registry {
    let registry = Registry::new();
    registry.register_abstract::<Organism>().unwrap();
    registry.register_implementation::<Organism, Human>().unwrap();
    registry.register_implementation::<Organism, Dog>().unwrap();
    registry
}

#[test]
fn test_exact_base_labels_resolve_to_base() {
    let registry = polymorphic_registry();
    let resolved = registry
        .concrete_implementation(&["Organism".to_string()])
        .unwrap();
    assert_eq!(resolved.node.type_name, "Organism");
}

#[test]
fn test_implementer_resolution_by_label_subset() {
    let registry = polymorphic_registry();
    let resolved = registry
        .concrete_implementation(&["Organism".to_string(), "Human".to_string()])
        .unwrap();
    assert_eq!(resolved.node.type_name, "Human");

    let resolved = registry
        .concrete_implementation(&["Dog".to_string(), "Organism".to_string()])
        .unwrap();
    assert_eq!(resolved.node.type_name, "Dog");
}

#[test]
fn test_factory_allocates_concrete_instance() {
    let registry = polymorphic_registry();
    let resolved = registry
        .concrete_implementation(&["Organism".to_string(), "Dog".to_string()])
        .unwrap();
    let instance = (resolved.factory)();
    assert_eq!(instance.meta().type_name, "Dog");
}

#[test]
fn test_unmatched_labels_are_errors() {
    let registry = polymorphic_registry();
    assert!(matches!(
        registry.concrete_implementation(&["Mineral".to_string()]),
        Err(RegistryError::NoAbstractBase(_))
    ));
    assert!(matches!(
        registry.concrete_implementation(&["Organism".to_string(), "Cat".to_string()]),
        Err(RegistryError::NoConcreteImplementation { base: "Organism", .. })
    ));
}

#[test]
fn test_implementation_requires_registered_base() {
    let registry = Registry::new();
    assert!(matches!(
        registry.register_implementation::<Organism, Human>(),
        Err(RegistryError::AbstractNotRegistered("Organism"))
    ));
}
