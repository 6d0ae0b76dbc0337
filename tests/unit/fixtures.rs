//! Shared domain types for the test suites.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: i64,
}

graphweld::impl_node_entity! {
    Person, label = "Person", props {
        name => "name",
        age => "age",
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub title: String,
    pub released: i64,
}

graphweld::impl_node_entity! {
    Movie, label = "Movie", props {
        title => "title",
        released => "released",
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActedIn {
    pub role: String,
}

graphweld::impl_relationship_entity! {
    ActedIn, rel_type = "ACTED_IN", props {
        role => "role",
    }
}

// Polymorphic family: Organism is an instantiable base, Human and Dog extend
// it and carry its label in front of their own.

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organism {
    pub alive: bool,
}

graphweld::impl_node_entity! {
    Organism, label = "Organism", props {
        alive => "alive",
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Human {
    pub base: Organism,
    pub name: String,
}

graphweld::impl_node_entity! {
    Human, label = "Human", extends = Organism, props {
        base.alive => "alive",
        name => "name",
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dog {
    pub base: Organism,
    pub breed: String,
}

graphweld::impl_node_entity! {
    Dog, label = "Dog", extends = Organism, props {
        base.alive => "alive",
        breed => "breed",
    }
}
