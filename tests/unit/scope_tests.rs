use graphweld::scope::{param, CompileError, Identifier, Position, Scope};
use graphweld::{field_ref, Handle, Registry, Value};

use crate::fixtures::{ActedIn, Person};

#[test]
fn test_name_introduced_then_reused() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let first = scope
        .register(&registry, &Identifier::from("p"), Position::NodePattern)
        .unwrap();
    assert!(first.is_new);
    assert_eq!(first.name, "p");

    let second = scope
        .register(&registry, &Identifier::from("p"), Position::NodePattern)
        .unwrap();
    assert!(!second.is_new);
}

#[test]
fn test_expression_position_rejects_unknown_names() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let err = scope
        .register(&registry, &Identifier::from("ghost"), Position::Expression)
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownIdentifier(name) if name == "ghost"));
}

#[test]
fn test_invalid_names_are_rejected() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let err = scope
        .register(&registry, &Identifier::from("not a name"), Position::NodePattern)
        .unwrap_err();
    assert!(matches!(err, CompileError::InvalidName(_)));
}

#[test]
fn test_anonymous_params_count_up() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let first = scope
        .register(&registry, &param(5), Position::Expression)
        .unwrap();
    assert_eq!(first.name, "$v0");
    let second = scope
        .register(&registry, &param("x"), Position::Expression)
        .unwrap();
    assert_eq!(second.name, "$v1");
    assert_eq!(scope.params().get("v0"), Some(&Value::Integer(5)));
    assert_eq!(scope.params().get("v1"), Some(&Value::String("x".into())));
}

#[test]
fn test_named_param_rebind_with_different_value_fails() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    scope
        .register(&registry, &param(1).named("a"), Position::Expression)
        .unwrap();
    // same value is idempotent
    scope
        .register(&registry, &param(1).named("a"), Position::Expression)
        .unwrap();
    let err = scope
        .register(&registry, &param(2).named("a"), Position::Expression)
        .unwrap_err();
    assert!(matches!(err, CompileError::ParameterRebound { .. }));
}

#[test]
fn test_entity_gets_synthesized_name_and_labels() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let p = Handle::new(Person::default());
    let member = scope
        .register(&registry, &Identifier::from(&p), Position::NodePattern)
        .unwrap();
    assert!(member.is_new);
    assert_eq!(member.name, "person");
    assert_eq!(member.label_expr.as_deref(), Some(":Person"));
    // default instance has only zero-valued fields, so no property block
    assert!(member.props_text.is_none());
}

#[test]
fn test_synthesized_names_avoid_collisions() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let a = Handle::new(Person::default());
    let b = Handle::new(Person::default());
    let first = scope
        .register(&registry, &Identifier::from(&a), Position::NodePattern)
        .unwrap();
    let second = scope
        .register(&registry, &Identifier::from(&b), Position::NodePattern)
        .unwrap();
    assert_eq!(first.name, "person");
    assert_eq!(second.name, "person1");
}

#[test]
fn test_relationship_name_from_type_tag() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let r = Handle::new(ActedIn::default());
    let member = scope
        .register(&registry, &Identifier::from(&r), Position::RelationshipPattern)
        .unwrap();
    assert_eq!(member.name, "actedIn");
    assert_eq!(member.label_expr.as_deref(), Some(":ACTED_IN"));
}

#[test]
fn test_kind_position_mismatch() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let p = Handle::new(Person::default());
    let r = Handle::new(ActedIn::default());
    assert!(matches!(
        scope.register(&registry, &Identifier::from(&r), Position::NodePattern),
        Err(CompileError::MismatchedNode("ActedIn"))
    ));
    assert!(matches!(
        scope.register(&registry, &Identifier::from(&p), Position::RelationshipPattern),
        Err(CompileError::MismatchedRelationship("Person"))
    ));
}

#[test]
fn test_nonzero_props_substitute_as_one_map_param() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let p = Handle::new(Person {
        name: "Bob".into(),
        age: 0,
    });
    let member = scope
        .register(&registry, &Identifier::from(&p).named("p"), Position::NodePattern)
        .unwrap();
    assert_eq!(member.props_text.as_deref(), Some("$v0"));
    match scope.params().get("v0") {
        Some(Value::Map(m)) => {
            assert_eq!(m.get("name"), Some(&Value::String("Bob".into())));
            // zero-valued age is left out of the parameter map
            assert!(!m.contains_key("age"));
        }
        other => panic!("expected map parameter, got {:?}", other),
    }
}

#[test]
fn test_same_value_reuses_canonical_name() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let p = Handle::new(Person::default());
    scope
        .register(&registry, &Identifier::from(&p).named("p"), Position::NodePattern)
        .unwrap();
    // second occurrence under a different requested name: canonical name is
    // kept and the request becomes an alias
    let again = scope
        .register(&registry, &Identifier::from(&p).named("q"), Position::NodePattern)
        .unwrap();
    assert!(!again.is_new);
    assert_eq!(again.name, "p");
    assert_eq!(again.alias.as_deref(), Some("q"));
}

#[test]
fn test_name_collision_across_values() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let a = Handle::new(Person::default());
    let b = Handle::new(Person::default());
    scope
        .register(&registry, &Identifier::from(&a).named("p"), Position::NodePattern)
        .unwrap();
    let err = scope
        .register(&registry, &Identifier::from(&b).named("p"), Position::NodePattern)
        .unwrap_err();
    assert!(matches!(err, CompileError::AlreadyBound { name } if name == "p"));
}

#[test]
fn test_field_reference_renders_as_qualified_property() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let p = Handle::new(Person::default());
    scope
        .register(&registry, &Identifier::from(&p).named("p"), Position::NodePattern)
        .unwrap();
    let member = scope
        .register(
            &registry,
            &Identifier::from(field_ref(&p, |p| &p.name)),
            Position::Expression,
        )
        .unwrap();
    assert_eq!(member.name, "p.name");
    assert_eq!(member.field_prop.as_deref(), Some("name"));
}

#[test]
fn test_field_of_unregistered_value_fails() {
    let registry = Registry::new();
    let mut scope = Scope::new();
    let p = Handle::new(Person::default());
    let err = scope
        .register(
            &registry,
            &Identifier::from(field_ref(&p, |p| &p.age)),
            Position::Expression,
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::UnregisteredField));
}

#[test]
fn test_first_error_wins() {
    let mut scope = Scope::new();
    scope.fail(CompileError::WhereInReturn);
    scope.fail(CompileError::UnregisteredField);
    assert!(matches!(scope.take_error(), Some(CompileError::WhereInReturn)));
    assert!(scope.take_error().is_none());
}
