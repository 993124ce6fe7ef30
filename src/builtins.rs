//! The fixed table of computed predicates.
//!
//! A builtin takes the subject and object patterns of its clause plus the
//! current bindings and returns zero or more extended bindings. Builtins
//! never touch the fact store except to read it; an operand that is
//! unresolved or of the wrong kind simply yields no solution.

use indexmap::IndexSet;
use smallvec::smallvec;
use std::fmt;

use crate::fire::substitute_formula;
use crate::store::FactStore;
use crate::term::{Bindings, Literal, Node, Triple};
use crate::unify::{is_resolvable, match_rule, order_clauses, resolve, Solutions};
use crate::vocab::{
    LOG_INCLUDES, LOG_NOT_INCLUDES, MATH_GREATER_THAN, MATH_LESS_THAN, MATH_NOT_GREATER_THAN,
    MATH_NOT_LESS_THAN, STRING_NOT_GREATER_THAN, STRING_NOT_LESS_THAN, STRING_ORD, XSD_STRING,
};

/// Signature shared by every builtin: subject, object, bindings, ambient facts
pub type BuiltinFn = fn(&Node, &Node, &Bindings, &dyn FactStore) -> Solutions;

/// Which operands must be resolvable before the builtin can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inputs {
    /// Subject and object
    Both,
    /// Subject or object
    Either,
    /// The scope formula (subject); the object pattern is an output
    Scope,
    /// The scope formula, and every object variable shared with other clauses
    NegatedScope,
}

/// A registered builtin predicate
#[derive(Clone, Copy)]
pub struct Builtin {
    /// The predicate IRI
    pub iri: &'static str,
    /// The relation
    pub eval: BuiltinFn,
    inputs: Inputs,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("iri", &self.iri)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

static BUILTINS: [Builtin; 9] = [
    Builtin {
        iri: MATH_GREATER_THAN,
        eval: math_greater_than,
        inputs: Inputs::Both,
    },
    Builtin {
        iri: MATH_LESS_THAN,
        eval: math_less_than,
        inputs: Inputs::Both,
    },
    Builtin {
        iri: MATH_NOT_LESS_THAN,
        eval: math_not_less_than,
        inputs: Inputs::Both,
    },
    Builtin {
        iri: MATH_NOT_GREATER_THAN,
        eval: math_not_greater_than,
        inputs: Inputs::Both,
    },
    Builtin {
        iri: STRING_NOT_LESS_THAN,
        eval: string_not_less_than,
        inputs: Inputs::Both,
    },
    Builtin {
        iri: STRING_NOT_GREATER_THAN,
        eval: string_not_greater_than,
        inputs: Inputs::Both,
    },
    Builtin {
        iri: STRING_ORD,
        eval: string_ord,
        inputs: Inputs::Either,
    },
    Builtin {
        iri: LOG_INCLUDES,
        eval: log_includes,
        inputs: Inputs::Scope,
    },
    Builtin {
        iri: LOG_NOT_INCLUDES,
        eval: log_not_includes,
        inputs: Inputs::NegatedScope,
    },
];

/// The builtin registered for a predicate, if any
#[must_use]
pub fn lookup(predicate: &Node) -> Option<&'static Builtin> {
    let iri = predicate.as_iri()?;
    BUILTINS.iter().find(|builtin| builtin.iri == iri)
}

/// True when the predicate is computed rather than stored
#[must_use]
pub fn is_builtin(predicate: &Node) -> bool {
    lookup(predicate).is_some()
}

impl Builtin {
    /// True when the clause can run given the already `bound` nodes
    ///
    /// `remaining` holds the clauses not yet scheduled, the clause itself
    /// included.
    #[must_use]
    pub fn inputs_ready(&self, clause: &Triple, bound: &IndexSet<Node>, remaining: &[&Triple]) -> bool {
        let (subject, object) = (&clause.subject, &clause.object);
        match self.inputs {
            Inputs::Both => is_resolvable(subject, bound) && is_resolvable(object, bound),
            Inputs::Either => is_resolvable(subject, bound) || is_resolvable(object, bound),
            Inputs::Scope => scope_ready(clause, bound, remaining),
            Inputs::NegatedScope => {
                let mut shared = IndexSet::new();
                object.collect_pattern_nodes(&mut shared);
                scope_ready(clause, bound, remaining)
                    && shared.iter().all(|node| {
                        bound.contains(node) || !mentioned_elsewhere(node, clause, remaining)
                    })
            }
        }
    }
}

/// An unbound scope variable nobody else produces stands for the ambient facts
fn scope_ready(clause: &Triple, bound: &IndexSet<Node>, remaining: &[&Triple]) -> bool {
    is_resolvable(&clause.subject, bound) || !mentioned_elsewhere(&clause.subject, clause, remaining)
}

fn mentioned_elsewhere(node: &Node, clause: &Triple, remaining: &[&Triple]) -> bool {
    remaining
        .iter()
        .filter(|other| **other != clause)
        .any(|other| {
            let mut nodes = IndexSet::new();
            other.collect_pattern_nodes(&mut nodes);
            nodes.contains(node)
        })
}

fn literal<'a>(node: &'a Node, bindings: &'a Bindings) -> Option<&'a Literal> {
    resolve(node, bindings)?.as_literal()
}

fn numbers(s: &Node, o: &Node, bindings: &Bindings) -> Option<(f64, f64)> {
    Some((literal(s, bindings)?.as_number()?, literal(o, bindings)?.as_number()?))
}

fn strings<'a>(s: &'a Node, o: &'a Node, bindings: &'a Bindings) -> Option<(&'a str, &'a str)> {
    Some((literal(s, bindings)?.as_str(), literal(o, bindings)?.as_str()))
}

fn holds(condition: Option<bool>, bindings: &Bindings) -> Solutions {
    if condition == Some(true) {
        smallvec![bindings.clone()]
    } else {
        Solutions::new()
    }
}

fn math_greater_than(s: &Node, o: &Node, bindings: &Bindings, _: &dyn FactStore) -> Solutions {
    holds(numbers(s, o, bindings).map(|(s, o)| s > o), bindings)
}

fn math_less_than(s: &Node, o: &Node, bindings: &Bindings, _: &dyn FactStore) -> Solutions {
    holds(numbers(s, o, bindings).map(|(s, o)| s < o), bindings)
}

fn math_not_less_than(s: &Node, o: &Node, bindings: &Bindings, _: &dyn FactStore) -> Solutions {
    holds(numbers(s, o, bindings).map(|(s, o)| s >= o), bindings)
}

fn math_not_greater_than(s: &Node, o: &Node, bindings: &Bindings, _: &dyn FactStore) -> Solutions {
    holds(numbers(s, o, bindings).map(|(s, o)| s <= o), bindings)
}

fn string_not_less_than(s: &Node, o: &Node, bindings: &Bindings, _: &dyn FactStore) -> Solutions {
    holds(strings(s, o, bindings).map(|(s, o)| s >= o), bindings)
}

fn string_not_greater_than(s: &Node, o: &Node, bindings: &Bindings, _: &dyn FactStore) -> Solutions {
    holds(strings(s, o, bindings).map(|(s, o)| s <= o), bindings)
}

fn single_char(literal: &Literal) -> Option<char> {
    if literal.datatype != XSD_STRING {
        return None;
    }
    let mut chars = literal.lexical.chars();
    let ch = chars.next()?;
    chars.next().is_none().then_some(ch)
}

fn code_point(literal: &Literal) -> Option<u32> {
    literal
        .as_number()
        .and_then(|_| literal.lexical.trim().parse().ok())
}

fn bind_to(pattern: &Node, value: Node, bindings: &Bindings) -> Solutions {
    if !pattern.is_pattern() {
        return Solutions::new();
    }
    let mut extended = bindings.clone();
    extended.insert(pattern.clone(), value);
    smallvec![extended]
}

/// `?code string:ord "A"` binds `?code` to 65, and the reverse
fn string_ord(s: &Node, o: &Node, bindings: &Bindings, _: &dyn FactStore) -> Solutions {
    let subject = resolve(s, bindings);
    match resolve(o, bindings) {
        Some(object) => {
            let Some(ch) = object.as_literal().and_then(single_char) else {
                return Solutions::new();
            };
            let code = u32::from(ch);
            match subject {
                Some(subject) => holds(
                    subject.as_literal().and_then(code_point).map(|c| c == code),
                    bindings,
                ),
                None => bind_to(s, Node::integer(i64::from(code)), bindings),
            }
        }
        None => {
            let Some(ch) = subject
                .and_then(Node::as_literal)
                .and_then(code_point)
                .and_then(char::from_u32)
            else {
                return Solutions::new();
            };
            bind_to(o, Node::literal(ch.to_string()), bindings)
        }
    }
}

/// `scope log:includes { patterns }`
///
/// An unbound scope variable stands for the ambient facts; a formula scope
/// is searched with the current bindings substituted into it.
fn log_includes(s: &Node, o: &Node, bindings: &Bindings, ambient: &dyn FactStore) -> Solutions {
    let Some(Node::Formula(patterns)) = resolve(o, bindings) else {
        return Solutions::new();
    };
    let bound: IndexSet<Node> = bindings.keys().cloned().collect();
    let clauses = order_clauses(&patterns.iter().cloned().collect::<Vec<_>>(), &bound);

    let substituted;
    let scope: &dyn FactStore = match resolve(s, bindings) {
        None => ambient,
        Some(Node::Formula(formula)) => {
            substituted = substitute_formula(formula, bindings);
            &substituted
        }
        Some(_) => return Solutions::new(),
    };
    match_rule(clauses, scope, bindings.clone()).collect()
}

/// Succeeds, leaving the bindings unchanged, when `log:includes` would fail
fn log_not_includes(s: &Node, o: &Node, bindings: &Bindings, ambient: &dyn FactStore) -> Solutions {
    if resolve(o, bindings).and_then(Node::as_formula).is_none() {
        return Solutions::new();
    }
    holds(Some(log_includes(s, o, bindings, ambient).is_empty()), bindings)
}
