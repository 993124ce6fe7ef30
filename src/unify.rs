use indexmap::IndexSet;
use smallvec::{smallvec, SmallVec};

use crate::builtins;
use crate::store::FactStore;
use crate::term::{Bindings, Mask, Node, Triple};

/// Zero or more extended bindings; almost always zero or one
pub type Solutions = SmallVec<[Bindings; 1]>;

/// Unifies one pattern node with one candidate node
///
/// Variables and blank nodes in the pattern bind to the candidate unless
/// already bound to something else. A formula pattern only unifies with a
/// formula candidate, by matching its clauses against the candidate's
/// triples. A candidate that is itself a variable never matches.
#[must_use]
pub fn bind_node(pattern: &Node, node: &Node, bindings: &Bindings) -> Solutions {
    if node.is_variable() {
        return Solutions::new();
    }
    match pattern {
        Node::Literal(_) | Node::Iri(_) => {
            if pattern == node {
                smallvec![bindings.clone()]
            } else {
                Solutions::new()
            }
        }
        Node::Variable(_) | Node::BlankNode(_) => match bindings.get(pattern) {
            Some(bound) if bound == node => smallvec![bindings.clone()],
            Some(_) => Solutions::new(),
            None => {
                let mut extended = bindings.clone();
                extended.insert(pattern.clone(), node.clone());
                smallvec![extended]
            }
        },
        Node::Formula(patterns) => match node {
            Node::Formula(candidate) => {
                Matches::quoted(patterns.iter().cloned().collect(), candidate, bindings.clone())
                    .collect()
            }
            _ => Solutions::new(),
        },
    }
}

/// Unifies a rule clause with a candidate fact, position by position
#[must_use]
pub fn bind(clause: &Triple, fact: &Triple, bindings: &Bindings) -> Solutions {
    let mut solutions: Solutions = smallvec![bindings.clone()];
    for (pattern, node) in clause.positions().into_iter().zip(fact.positions()) {
        solutions = solutions
            .iter()
            .flat_map(|partial| bind_node(pattern, node, partial))
            .collect();
        if solutions.is_empty() {
            break;
        }
    }
    solutions
}

fn mask_node(node: &Node, bindings: &Bindings) -> Option<Node> {
    match node {
        Node::Variable(_) | Node::BlankNode(_) => bindings
            .get(node)
            .filter(|value| !matches!(value, Node::Formula(_)))
            .cloned(),
        Node::Formula(_) => None,
        Node::Literal(_) | Node::Iri(_) => Some(node.clone()),
    }
}

/// Turns a clause into a store lookup template
///
/// Bound variables and blank nodes are replaced by their value; unbound
/// ones and formulas become wildcards.
#[must_use]
pub fn mask(clause: &Triple, bindings: &Bindings) -> Mask {
    [
        mask_node(&clause.subject, bindings),
        mask_node(&clause.predicate, bindings),
        mask_node(&clause.object, bindings),
    ]
}

/// The concrete value of a node under the bindings, if it has one
#[must_use]
pub fn resolve<'a>(node: &'a Node, bindings: &'a Bindings) -> Option<&'a Node> {
    if node.is_pattern() {
        bindings.get(node)
    } else {
        Some(node)
    }
}

/// Lazy depth-first conjunctive match of clauses against a store
///
/// Every call to [`match_rule`] starts a fresh search; an exhausted
/// sequence cannot be resumed. The search keeps an explicit stack of
/// `(clause index, bindings)` frames, so long clause chains do not grow the
/// call stack. Bindings are copied on extension, never mutated in place.
pub struct Matches<'a> {
    clauses: Vec<Triple>,
    store: &'a dyn FactStore,
    stack: Vec<(usize, Bindings)>,
    builtins: bool,
}

impl<'a> Matches<'a> {
    fn new(clauses: Vec<Triple>, store: &'a dyn FactStore, bindings: Bindings, builtins: bool) -> Self {
        Self {
            clauses,
            store,
            stack: vec![(0, bindings)],
            builtins,
        }
    }

    /// Matching inside a quoted formula is purely structural
    fn quoted(clauses: Vec<Triple>, store: &'a dyn FactStore, bindings: Bindings) -> Self {
        Self::new(clauses, store, bindings, false)
    }

    fn extend(&self, clause: &Triple, bindings: &Bindings) -> Solutions {
        if self.builtins {
            if let Some(builtin) = builtins::lookup(&clause.predicate) {
                return (builtin.eval)(&clause.subject, &clause.object, bindings, self.store);
            }
        }
        let mask = mask(clause, bindings);
        self.store
            .query(&mask)
            .flat_map(|fact| bind(clause, fact, bindings))
            .collect()
    }
}

impl Iterator for Matches<'_> {
    type Item = Bindings;

    fn next(&mut self) -> Option<Bindings> {
        while let Some((depth, bindings)) = self.stack.pop() {
            let Some(clause) = self.clauses.get(depth) else {
                return Some(bindings);
            };
            let extensions = self.extend(clause, &bindings);
            // Reversed so the first extension is explored first
            self.stack
                .extend(extensions.into_iter().rev().map(|ext| (depth + 1, ext)));
        }
        None
    }
}

impl std::fmt::Debug for Matches<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matches")
            .field("clauses", &self.clauses)
            .field("pending", &self.stack.len())
            .field("builtins", &self.builtins)
            .finish_non_exhaustive()
    }
}

/// Enumerates every binding that satisfies all clauses, in clause order
///
/// Builtin predicates are computed instead of looked up in the store.
pub fn match_rule(clauses: Vec<Triple>, store: &dyn FactStore, bindings: Bindings) -> Matches<'_> {
    Matches::new(clauses, store, bindings, true)
}

pub(crate) fn is_resolvable(node: &Node, bound: &IndexSet<Node>) -> bool {
    !node.is_pattern() || bound.contains(node)
}

/// Orders head clauses for evaluation
///
/// Store clauses with the most fixed positions come first; a builtin is
/// scheduled only once the clauses producing its inputs have been placed.
/// `bound` holds the variables already bound by the caller.
#[must_use]
pub fn order_clauses(clauses: &[Triple], bound: &IndexSet<Node>) -> Vec<Triple> {
    let mut bound = bound.clone();
    let mut remaining: Vec<&Triple> = clauses.iter().collect();
    let mut ordered = Vec::with_capacity(clauses.len());

    while !remaining.is_empty() {
        let best_store = remaining
            .iter()
            .enumerate()
            .filter(|(_, clause)| !builtins::is_builtin(&clause.predicate))
            .map(|(idx, clause)| {
                let fixed = clause
                    .positions()
                    .iter()
                    .filter(|node| is_resolvable(node, &bound))
                    .count();
                (idx, fixed)
            })
            // max_by_key keeps the last maximum; reverse to keep the first
            .rev()
            .max_by_key(|&(_, fixed)| fixed)
            .map(|(idx, _)| idx);

        let pick = best_store
            .or_else(|| {
                remaining.iter().position(|clause| {
                    builtins::lookup(&clause.predicate)
                        .is_some_and(|builtin| builtin.inputs_ready(clause, &bound, &remaining))
                })
            })
            .unwrap_or(0);

        let clause = remaining.remove(pick);
        clause.collect_pattern_nodes(&mut bound);
        ordered.push(clause.clone());
    }
    ordered
}
