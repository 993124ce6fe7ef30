//! Body instantiation: turning match bindings into new triples.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::rule::Rule;
use crate::term::{Bindings, Formula, Node, Triple};

/// Label prefix of generated blank nodes
pub const FRESH_PREFIX: &str = "sk";

/// Deterministic fresh node for an unbound body variable or blank node
///
/// The label is a digest of the conclusion the node belongs to, the node
/// itself and the sorted bindings of the firing. Re-firing a rule with the
/// same bindings reproduces the same node; another conclusion or other
/// bindings yield another node.
#[must_use]
pub fn fresh_node(scope: &Formula, node: &Node, bindings: &Bindings) -> Node {
    let mut pairs: Vec<(&Node, &Node)> = bindings.iter().collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    hasher.update(scope.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(node.to_string().as_bytes());
    for (key, value) in pairs {
        hasher.update([0u8]);
        hasher.update(key.to_string().as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_string().as_bytes());
    }
    let digest = hasher.finalize();
    Node::BlankNode(format!("{FRESH_PREFIX}{}", hex::encode(&digest[..12])))
}

/// Replaces bound variables and blank nodes, descending into formulas
///
/// Unbound ones are left untouched.
#[must_use]
pub fn substitute(node: &Node, bindings: &Bindings) -> Node {
    match node {
        Node::Variable(_) | Node::BlankNode(_) => {
            bindings.get(node).cloned().unwrap_or_else(|| node.clone())
        }
        Node::Formula(formula) => Node::Formula(substitute_formula(formula, bindings)),
        Node::Literal(_) | Node::Iri(_) => node.clone(),
    }
}

/// [`substitute`] applied to every triple of a formula
#[must_use]
pub fn substitute_formula(formula: &Formula, bindings: &Bindings) -> Formula {
    formula
        .iter()
        .map(|triple| triple.map(|inner| substitute(inner, bindings)))
        .collect()
}

/// Instantiates one clause of the conclusion `scope`
///
/// A top-level variable or blank node without a binding becomes a fresh
/// node; inside quoted formulas unbound ones stay quoted.
#[must_use]
pub fn assign(scope: &Formula, clause: &Triple, bindings: &Bindings) -> Triple {
    clause.map(|node| {
        if node.is_pattern() && !bindings.contains_key(node) {
            fresh_node(scope, node, bindings)
        } else {
            substitute(node, bindings)
        }
    })
}

/// Extends the bindings with a fresh node for every unbound top-level
/// variable or blank node of the body
#[must_use]
pub fn instantiate_blank_nodes(body: &Formula, bindings: &Bindings) -> Bindings {
    let mut extended = bindings.clone();
    for clause in body {
        for node in clause.positions() {
            if node.is_pattern() && !extended.contains_key(node) {
                extended.insert(node.clone(), fresh_node(body, node, bindings));
            }
        }
    }
    extended
}

/// The triples produced by one firing of the rule
///
/// A variable body must resolve to a formula, whose triples are emitted
/// verbatim.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] when a variable body is unbound or bound
/// to something other than a formula.
pub fn fire_rule(rule: &Rule, bindings: &Bindings) -> Result<Vec<Triple>> {
    match &rule.body {
        Node::Formula(body) => Ok(body
            .iter()
            .map(|clause| assign(body, clause, bindings))
            .collect()),
        Node::Variable(_) => match bindings.get(&rule.body) {
            Some(Node::Formula(body)) => Ok(body.iter().cloned().collect()),
            other => Err(Error::TypeMismatch {
                context: format!("body of `{rule}`"),
                node: other.unwrap_or(&rule.body).to_string(),
            }),
        },
        Node::Literal(_) | Node::Iri(_) | Node::BlankNode(_) => {
            Err(rule.malformed("body must be a formula or a variable"))
        }
    }
}
