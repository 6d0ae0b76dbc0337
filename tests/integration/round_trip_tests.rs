use std::collections::HashMap;

use graphweld::executor::{execute, ExecuteError};
use graphweld::scope::{param, Identifier};
use graphweld::writer::CypherWriter;
use graphweld::{field_ref, node, Handle, NodeValue, Registry, Value, ValueSlot, VecHandle};

use crate::fixtures::{ActedIn, Movie, Person};
use crate::runner::{row, FakeRunner};

fn movie_node(title: &str, released: i64) -> Value {
    let mut properties = HashMap::new();
    properties.insert("title".to_string(), Value::String(title.to_string()));
    properties.insert("released".to_string(), Value::Integer(released));
    Value::Node(NodeValue {
        element_id: format!("m-{}", title),
        labels: vec!["Movie".to_string()],
        properties,
    })
}

#[test]
fn test_field_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let registry = Registry::new();
    let p = Handle::new(Person {
        name: "Bob".into(),
        age: 0,
    });
    let mut w = CypherWriter::new(&registry);
    w.write_match(node(Identifier::from(&p).named("p")), false)
        .write_return(vec![field_ref(&p, |p| &p.age).into()]);
    let q = w.compile().unwrap();
    assert_eq!(q.text, "MATCH (p:Person $v0)\nRETURN p.age");

    let mut runner = FakeRunner::returning(vec![row(vec![("p.age", Value::Integer(42))])]);
    let rows = execute(&registry, &mut runner, &q).unwrap();
    assert_eq!(rows.len(), 1);
    // the compiled text and parameters went to the runner verbatim
    assert_eq!(runner.seen_text.as_deref(), Some(q.text.as_str()));
    let params = runner.seen_parameters.unwrap();
    match params.get("v0") {
        Some(Value::Map(m)) => assert_eq!(m.get("name"), Some(&Value::String("Bob".into()))),
        other => panic!("expected map parameter, got {:?}", other),
    }
    // and the row landed back in the same handle the query was built from
    assert_eq!(p.get().age, 42);
    assert_eq!(p.get().name, "Bob");
}

#[test]
fn test_entity_round_trip() -> anyhow::Result<()> {
    let registry = Registry::new();
    let m = Handle::new(Movie::default());
    let mut w = CypherWriter::new(&registry);
    w.write_match(node(Identifier::from(&m).named("m")), false)
        .write_return(vec![Identifier::from(&m)]);
    let q = w.compile()?;
    assert_eq!(q.text, "MATCH (m:Movie)\nRETURN m");

    let mut runner = FakeRunner::returning(vec![row(vec![("m", movie_node("Heat", 1995))])]);
    execute(&registry, &mut runner, &q)?;
    assert_eq!(m.get().title, "Heat");
    assert_eq!(m.get().released, 1995);
    Ok(())
}

#[test]
fn test_list_slot_accumulates_rows() {
    let registry = Registry::new();
    let m = Handle::new(Movie::default());
    let movies: VecHandle<Movie> = VecHandle::new();
    let mut w = CypherWriter::new(&registry);
    w.write_match(node(Identifier::from(&m).named("m")), false)
        .write_return(vec![Identifier::from(&m).bind_to(&movies)]);
    let q = w.compile().unwrap();

    let mut runner = FakeRunner::returning(vec![
        row(vec![("m", movie_node("Heat", 1995))]),
        row(vec![("m", movie_node("Ronin", 1998))]),
    ]);
    execute(&registry, &mut runner, &q).unwrap();
    let collected = movies.get();
    assert_eq!(collected.len(), 2);
    assert_eq!(collected[0].title, "Heat");
    assert_eq!(collected[1].title, "Ronin");
}

#[test]
fn test_value_slot_holds_last_row() {
    let registry = Registry::new();
    let count = ValueSlot::new();
    let mut w = CypherWriter::new(&registry);
    w.write_match(node("n"), false)
        .write_return(vec![graphweld::expr("count(n)")
            .aliased("total")
            .bind_to(&count)]);
    let q = w.compile().unwrap();
    assert_eq!(q.text, "MATCH (n)\nRETURN count(n) AS total");

    let mut runner = FakeRunner::returning(vec![row(vec![("total", Value::Integer(12))])]);
    execute(&registry, &mut runner, &q).unwrap();
    assert_eq!(count.get(), Value::Integer(12));
}

#[test]
fn test_missing_column_is_a_bind_error() {
    let registry = Registry::new();
    let m = Handle::new(Movie::default());
    let mut w = CypherWriter::new(&registry);
    w.write_match(node(Identifier::from(&m).named("m")), false)
        .write_return(vec![Identifier::from(&m)]);
    let q = w.compile().unwrap();

    let mut runner = FakeRunner::returning(vec![row(vec![("other", Value::Null)])]);
    let err = execute(&registry, &mut runner, &q).unwrap_err();
    assert!(matches!(err, ExecuteError::Bind { row: 0, .. }));
}

#[test]
fn test_runner_failure_propagates() {
    let registry = Registry::new();
    let mut w = CypherWriter::new(&registry);
    w.write_match(node("n"), false)
        .write_return(vec![Identifier::from("n")]);
    let q = w.compile().unwrap();

    let mut runner = FakeRunner {
        fail_with: Some("connection refused".to_string()),
        ..Default::default()
    };
    let err = execute(&registry, &mut runner, &q).unwrap_err();
    assert!(matches!(err, ExecuteError::Runner(_)));
}

#[test]
fn test_relationship_chain_parameters() {
    let registry = Registry::new();
    let p = Handle::new(Person {
        name: "Keanu".into(),
        age: 0,
    });
    let r = Handle::new(ActedIn { role: "Neo".into() });
    let m = Handle::new(Movie {
        title: "The Matrix".into(),
        released: 1999,
    });
    let mut w = CypherWriter::new(&registry);
    w.write_create(
        node(Identifier::from(&p).named("p"))
            .to(Identifier::from(&r).named("r"), Identifier::from(&m).named("m")),
    )
    .write_return(vec![Identifier::from(&r)]);
    let q = w.compile().unwrap();
    assert_eq!(
        q.text,
        "CREATE (p:Person $v0)-[r:ACTED_IN $v1]->(m:Movie $v2)\nRETURN r"
    );
    // each value contributes exactly one map parameter
    assert_eq!(q.parameters.len(), 3);
    match q.parameters.get("v1") {
        Some(Value::Map(props)) => {
            assert_eq!(props.get("role"), Some(&Value::String("Neo".into())))
        }
        other => panic!("expected map parameter, got {:?}", other),
    }
}

#[test]
fn test_create_then_update_flow() {
    use graphweld::writer::{MergeOptions, SetItem};

    let registry = Registry::new();
    let p = Handle::new(Person {
        name: "Ada".into(),
        age: 0,
    });
    let mut w = CypherWriter::new(&registry);
    w.write_merge(
        node(Identifier::from(&p).named("p")),
        MergeOptions::new().on_create(vec![SetItem::assign(
            field_ref(&p, |p| &p.age),
            param(36),
        )]),
    )
    .write_return(vec![Identifier::from(&p)]);
    let q = w.compile().unwrap();
    assert_eq!(
        q.text,
        "MERGE (p:Person $v0)\nON CREATE\n  SET p.age = $v1\nRETURN p"
    );

    let mut properties = HashMap::new();
    properties.insert("name".to_string(), Value::String("Ada".into()));
    properties.insert("age".to_string(), Value::Integer(36));
    let node_value = Value::Node(NodeValue {
        element_id: "p-ada".into(),
        labels: vec!["Person".into()],
        properties,
    });
    let mut runner = FakeRunner::returning(vec![row(vec![("p", node_value)])]);
    execute(&registry, &mut runner, &q).unwrap();
    assert_eq!(p.get().age, 36);
}
