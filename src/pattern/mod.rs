//! Pattern model.
//!
//! A `Pattern` is a singly linked chain of node occurrences joined by
//! relationship descriptors. It carries no rendering or typing concerns; the
//! writer consults the scope and registry when it walks a chain. A pattern
//! may also stand as a boolean condition (existence check) inside WHERE.

use crate::scope::Identifier;

/// Relationship direction between two adjacent nodes in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Undirected,
}

/// Link from a node to the next node in the chain. Exactly one direction and
/// exactly one next node, by construction.
#[derive(Debug, Clone)]
pub struct RelationshipLink {
    pub direction: Direction,
    pub value: Identifier,
    pub next: Box<PatternNode>,
}

/// One node occurrence within a chain.
#[derive(Debug, Clone)]
pub struct PatternNode {
    /// Bound domain value, name, or `Identifier::None` for anonymous.
    pub value: Identifier,
    /// Path name; only meaningful on the head of a chain.
    pub path_name: Option<String>,
    pub relationship: Option<RelationshipLink>,
}

/// A chain of node/relationship occurrences.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub(crate) head: PatternNode,
}

/// Start a chain with a single node occurrence.
pub fn node(value: impl Into<Identifier>) -> Pattern {
    Pattern {
        head: PatternNode {
            value: value.into(),
            path_name: None,
            relationship: None,
        },
    }
}

impl Pattern {
    /// Append an outgoing relationship and its target node at the tail.
    pub fn to(mut self, rel: impl Into<Identifier>, next: impl Into<Identifier>) -> Self {
        self.append(Direction::Outgoing, rel.into(), next.into());
        self
    }

    /// Append an incoming relationship and its source node at the tail.
    #[allow(clippy::should_implement_trait)]
    pub fn from(mut self, rel: impl Into<Identifier>, next: impl Into<Identifier>) -> Self {
        self.append(Direction::Incoming, rel.into(), next.into());
        self
    }

    /// Append an undirected relationship and its peer node at the tail.
    pub fn related(mut self, rel: impl Into<Identifier>, next: impl Into<Identifier>) -> Self {
        self.append(Direction::Undirected, rel.into(), next.into());
        self
    }

    /// Tag the head of the chain with a path name.
    pub fn named(mut self, path_name: impl Into<String>) -> Self {
        self.head.path_name = Some(path_name.into());
        self
    }

    pub fn head(&self) -> &PatternNode {
        &self.head
    }

    fn append(&mut self, direction: Direction, rel: Identifier, next: Identifier) {
        let tail = Self::tail_mut(&mut self.head);
        tail.relationship = Some(RelationshipLink {
            direction,
            value: rel,
            next: Box::new(PatternNode {
                value: next,
                path_name: None,
                relationship: None,
            }),
        });
    }

    fn tail_mut(node: &mut PatternNode) -> &mut PatternNode {
        match node.relationship {
            Some(ref mut link) => Self::tail_mut(&mut link.next),
            None => node,
        }
    }
}

/// An ordered group of independent chains, for clauses that accept multiple
/// comma-separated patterns.
#[derive(Debug, Clone)]
pub struct Patterns(pub Vec<Pattern>);

/// Group independent chains.
pub fn paths(patterns: impl IntoIterator<Item = Pattern>) -> Patterns {
    Patterns(patterns.into_iter().collect())
}

impl From<Pattern> for Patterns {
    fn from(p: Pattern) -> Self {
        Patterns(vec![p])
    }
}
