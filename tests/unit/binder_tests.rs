use std::collections::HashMap;

use test_case::test_case;

use graphweld::binder::{bind, AbstractHandle, BindError, BindTarget, ValueSlot, VecHandle};
use graphweld::{FromValue, Handle, NodeValue, Registry, RelationshipValue, Value};

use crate::fixtures::{Dog, Human, Movie, Organism, Person};

fn person_node(name: &str, age: i64) -> Value {
    let mut properties = HashMap::new();
    properties.insert("name".to_string(), Value::String(name.to_string()));
    properties.insert("age".to_string(), Value::Integer(age));
    Value::Node(NodeValue {
        element_id: format!("n-{}", name),
        labels: vec!["Person".to_string()],
        properties,
    })
}

#[test_case(Value::Integer(7), 7 ; "integer passes through")]
#[test_case(Value::String("7".into()), 7 ; "numeric string parses")]
#[test_case(Value::Bool(true), 1 ; "bool widens")]
#[test_case(Value::Float(7.9), 7 ; "float truncates")]
#[test_case(Value::Null, 0 ; "null is the zero value")]
fn test_int_coercions(value: Value, want: i64) {
    let got: i64 = FromValue::from_value(&value).unwrap();
    assert_eq!(got, want);
}

#[test]
fn test_value_slot_takes_anything() {
    let registry = Registry::new();
    let slot = ValueSlot::new();
    bind(&registry, &Value::Integer(42), &BindTarget::Value(slot.clone())).unwrap();
    assert_eq!(slot.get(), Value::Integer(42));
}

#[test]
fn test_entity_populated_from_node() {
    let registry = Registry::new();
    let p = Handle::new(Person::default());
    bind(
        &registry,
        &person_node("Bob", 42),
        &BindTarget::Entity(p.erased()),
    )
    .unwrap();
    assert_eq!(p.get().name, "Bob");
    assert_eq!(p.get().age, 42);
}

#[test]
fn test_entity_populated_from_map() {
    let registry = Registry::new();
    let p = Handle::new(Person::default());
    let mut m = HashMap::new();
    m.insert("name".to_string(), Value::String("Ada".into()));
    bind(&registry, &Value::Map(m), &BindTarget::Entity(p.erased())).unwrap();
    assert_eq!(p.get().name, "Ada");
    assert_eq!(p.get().age, 0);
}

#[test]
fn test_null_leaves_entity_untouched() {
    let registry = Registry::new();
    let p = Handle::new(Person {
        name: "kept".into(),
        age: 7,
    });
    bind(&registry, &Value::Null, &BindTarget::Entity(p.erased())).unwrap();
    assert_eq!(p.get().name, "kept");
}

#[test]
fn test_undeclared_keys_fall_through_silently() {
    let registry = Registry::new();
    let p = Handle::new(Person::default());
    let mut properties = HashMap::new();
    properties.insert("name".to_string(), Value::String("Bob".into()));
    properties.insert("nickname".to_string(), Value::String("bobby".into()));
    let node = Value::Node(NodeValue {
        element_id: "n-1".into(),
        labels: vec!["Person".into()],
        properties,
    });
    // "nickname" is not declared on Person; the structural fallback ignores it
    bind(&registry, &node, &BindTarget::Entity(p.erased())).unwrap();
    assert_eq!(p.get().name, "Bob");
}

#[test]
fn test_field_target_coerces() {
    let registry = Registry::new();
    let p = Handle::new(Person::default());
    let target = BindTarget::Field {
        entity: p.erased(),
        prop: "age".to_string(),
    };
    bind(&registry, &Value::String("42".into()), &target).unwrap();
    assert_eq!(p.get().age, 42);

    let err = bind(&registry, &Value::String("old".into()), &target).unwrap_err();
    assert!(matches!(err, BindError::Key { .. }));
}

#[test]
fn test_unknown_field_target_is_an_error() {
    let registry = Registry::new();
    let p = Handle::new(Person::default());
    let target = BindTarget::Field {
        entity: p.erased(),
        prop: "nope".to_string(),
    };
    assert!(matches!(
        bind(&registry, &Value::Integer(1), &target),
        Err(BindError::UnknownProperty { .. })
    ));
}

#[test]
fn test_relationship_populated_from_value() {
    use crate::fixtures::ActedIn;
    let registry = Registry::new();
    let r = Handle::new(ActedIn::default());
    let mut properties = HashMap::new();
    properties.insert("role".to_string(), Value::String("Neo".into()));
    let rel = Value::Relationship(RelationshipValue {
        element_id: "r-1".into(),
        rel_type: "ACTED_IN".into(),
        properties,
        ..Default::default()
    });
    bind(&registry, &rel, &BindTarget::Entity(r.erased())).unwrap();
    assert_eq!(r.get().role, "Neo");
}

#[test]
fn test_list_target_replaces_from_list_value() {
    let registry = Registry::new();
    let people: VecHandle<Person> = VecHandle::new();
    let rows = Value::List(vec![person_node("a", 1), person_node("b", 2)]);
    bind(&registry, &rows, &BindTarget::EntityList(people.erased())).unwrap();
    assert_eq!(people.get().len(), 2);
    assert_eq!(people.get()[1].name, "b");

    // a later list bind replaces, not appends
    let rows = Value::List(vec![person_node("c", 3)]);
    bind(&registry, &rows, &BindTarget::EntityList(people.erased())).unwrap();
    assert_eq!(people.get().len(), 1);
    assert_eq!(people.get()[0].name, "c");
}

#[test]
fn test_list_target_accumulates_single_rows() {
    let registry = Registry::new();
    let people: VecHandle<Person> = VecHandle::new();
    let target = BindTarget::EntityList(people.erased());
    bind(&registry, &person_node("a", 1), &target).unwrap();
    bind(&registry, &person_node("b", 2), &target).unwrap();
    assert_eq!(people.get().len(), 2);
}

#[test]
fn test_list_target_rejects_scalars() {
    let registry = Registry::new();
    let people: VecHandle<Movie> = VecHandle::new();
    assert!(matches!(
        bind(
            &registry,
            &Value::Integer(9),
            &BindTarget::EntityList(people.erased())
        ),
        Err(BindError::DepthMismatch { got: "integer" })
    ));
}

fn organism_node(labels: &[&str], extra: &[(&str, Value)]) -> Value {
    let mut properties = HashMap::new();
    properties.insert("alive".to_string(), Value::Bool(true));
    for (k, v) in extra {
        properties.insert((*k).to_string(), v.clone());
    }
    Value::Node(NodeValue {
        element_id: "n-poly".into(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        properties,
    })
}

#[test]
fn test_abstract_target_resolves_concrete_type() {
    let registry = Registry::new();
    registry.register_abstract::<Organism>().unwrap();
    registry.register_implementation::<Organism, Human>().unwrap();
    registry.register_implementation::<Organism, Dog>().unwrap();

    let target = AbstractHandle::new::<Organism>();
    let node = organism_node(
        &["Organism", "Dog"],
        &[("breed", Value::String("husky".into()))],
    );
    bind(&registry, &node, &BindTarget::Abstract(target.clone())).unwrap();
    let breed = target.with_concrete::<Dog, _>(|d| d.breed.clone());
    assert_eq!(breed.as_deref(), Some("husky"));
    assert_eq!(target.with_concrete::<Dog, _>(|d| d.base.alive), Some(true));
    // it did not resolve to the sibling type
    assert!(target.with_concrete::<Human, _>(|h| h.name.clone()).is_none());
}

#[test]
fn test_abstract_target_without_registration_fails() {
    let registry = Registry::new();
    let target = AbstractHandle::new::<Organism>();
    let node = organism_node(&["Organism", "Dog"], &[]);
    assert!(matches!(
        bind(&registry, &node, &BindTarget::Abstract(target)),
        Err(BindError::Registry(_))
    ));
}
