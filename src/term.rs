use indexmap::{IndexMap, IndexSet};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::vocab::{NUMERIC_DATATYPES, XSD_DECIMAL, XSD_DOUBLE, XSD_INTEGER, XSD_STRING};

/// A literal value with its datatype IRI
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Literal {
    /// The lexical form (e.g. `"65"`, `"A"`)
    pub lexical: String,
    /// The datatype IRI (e.g. `xsd:integer`)
    pub datatype: String,
}

impl Literal {
    /// A plain `xsd:string` literal
    pub fn string(value: impl Into<String>) -> Self {
        Self::typed(value, XSD_STRING)
    }

    /// An `xsd:integer` literal
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), XSD_INTEGER)
    }

    /// An `xsd:decimal` literal
    #[must_use]
    pub fn decimal(value: f64) -> Self {
        Self::typed(value.to_string(), XSD_DECIMAL)
    }

    /// A literal with an explicit datatype
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: datatype.into(),
        }
    }

    /// Numeric value, if the datatype is numeric and the lexical form parses
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        if NUMERIC_DATATYPES.contains(&self.datatype.as_str()) {
            self.lexical.trim().parse().ok()
        } else {
            None
        }
    }

    /// The lexical form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.lexical
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.datatype.as_str() {
            XSD_STRING => write!(f, "{:?}", self.lexical),
            XSD_INTEGER | XSD_DECIMAL | XSD_DOUBLE => write!(f, "{}", self.lexical),
            dt => write!(f, "{:?}^^<{dt}>", self.lexical),
        }
    }
}

/// A term of the N3 node algebra
///
/// The algebra is closed: every match site handles all five kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Node {
    /// A literal value (e.g. `"A"`, `65`)
    Literal(Literal),
    /// An IRI (e.g. `http://example.com/a`)
    Iri(String),
    /// A universally quantified variable (e.g. `?x`)
    Variable(String),
    /// An anonymous node (e.g. `_:b0`)
    BlankNode(String),
    /// A quoted set of triples
    Formula(Formula),
}

impl Node {
    /// An IRI node
    pub fn iri(iri: impl Into<String>) -> Self {
        Node::Iri(iri.into())
    }

    /// A plain string literal node
    pub fn literal(value: impl Into<String>) -> Self {
        Node::Literal(Literal::string(value))
    }

    /// An integer literal node
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Node::Literal(Literal::integer(value))
    }

    /// A variable node
    pub fn var(name: impl Into<String>) -> Self {
        Node::Variable(name.into())
    }

    /// A blank node
    pub fn blank(label: impl Into<String>) -> Self {
        Node::BlankNode(label.into())
    }

    /// A formula node built from triples
    pub fn formula(triples: impl IntoIterator<Item = Triple>) -> Self {
        Node::Formula(triples.into_iter().collect())
    }

    /// True for variables
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self, Node::Variable(_))
    }

    /// True for blank nodes
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::BlankNode(_))
    }

    /// True for variables and blank nodes, i.e. positions that can be bound
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self, Node::Variable(_) | Node::BlankNode(_))
    }

    /// The formula, if this node is one
    #[must_use]
    pub fn as_formula(&self) -> Option<&Formula> {
        match self {
            Node::Formula(formula) => Some(formula),
            _ => None,
        }
    }

    /// The literal, if this node is one
    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Node::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// The IRI string, if this node is one
    #[must_use]
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Node::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Collects every variable and blank node, descending into formulas
    pub fn collect_pattern_nodes(&self, out: &mut IndexSet<Node>) {
        match self {
            Node::Variable(_) | Node::BlankNode(_) => {
                out.insert(self.clone());
            }
            Node::Formula(formula) => {
                for triple in formula {
                    triple.collect_pattern_nodes(out);
                }
            }
            Node::Literal(_) | Node::Iri(_) => {}
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(literal) => write!(f, "{literal}"),
            Node::Iri(iri) => write!(f, "<{iri}>"),
            Node::Variable(name) => write!(f, "?{name}"),
            Node::BlankNode(label) => write!(f, "_:{label}"),
            Node::Formula(formula) => write!(f, "{formula}"),
        }
    }
}

/// A (subject, predicate, object) statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triple {
    /// Subject position
    pub subject: Node,
    /// Predicate position
    pub predicate: Node,
    /// Object position
    pub object: Node,
}

impl Triple {
    /// Creates a triple
    #[must_use]
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// The three positions in subject, predicate, object order
    #[must_use]
    pub fn positions(&self) -> [&Node; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// Builds a triple by mapping every position
    #[must_use]
    pub fn map(&self, mut f: impl FnMut(&Node) -> Node) -> Triple {
        Triple::new(f(&self.subject), f(&self.predicate), f(&self.object))
    }

    /// Collects every variable and blank node, descending into formulas
    pub fn collect_pattern_nodes(&self, out: &mut IndexSet<Node>) {
        for node in self.positions() {
            node.collect_pattern_nodes(out);
        }
    }

    /// True when some top-level position holds a variable
    #[must_use]
    pub fn has_variables(&self) -> bool {
        self.positions().iter().any(|node| node.is_variable())
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// An unordered set of triples
///
/// Backed by a `BTreeSet` so that equality, hashing and iteration order do
/// not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Formula {
    triples: BTreeSet<Triple>,
}

impl Formula {
    /// An empty formula
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a triple, returning true if it was not already present
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Number of triples
    #[must_use]
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// True when the formula holds no triples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Membership test
    #[must_use]
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Iterates the triples in canonical order
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }
}

impl FromIterator<Triple> for Formula {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Formula {
    type Item = &'a Triple;
    type IntoIter = std::collections::btree_set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

impl IntoIterator for Formula {
    type Item = Triple;
    type IntoIter = std::collections::btree_set::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{ ")?;
        for (idx, triple) in self.iter().enumerate() {
            if idx > 0 {
                write!(f, " . ")?;
            }
            write!(f, "{triple}")?;
        }
        write!(f, " }}")
    }
}

/// A store lookup template; `None` positions are wildcards
pub type Mask = [Option<Node>; 3];

/// The mask that matches every triple
pub const WILDCARD: Mask = [None, None, None];

/// Variable and blank-node bindings produced by matching
pub type Bindings = IndexMap<Node, Node>;
