use std::fmt;

use crate::error::{Error, Result};
use crate::term::{Formula, Node, Triple};
use crate::vocab::{LOG_IMPLIED_BY, LOG_IMPLIES, LOG_NOT_INCLUDES};

/// Which way an implication was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// `{head} => {body}`
    Forward,
    /// `{body} <= {head}`
    Backward,
}

/// An implication rule
///
/// The head is the condition matched against facts and the body is the
/// conclusion instantiated for every match. Either side may be a bare
/// variable that resolves to a formula through the match bindings, but not
/// both at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rule {
    /// The condition (a formula, or a variable bound to one)
    pub head: Node,
    /// How the rule was written
    pub direction: Direction,
    /// The conclusion (a formula, or a variable bound to one)
    pub body: Node,
}

impl Rule {
    /// A forward rule `{head} => {body}`
    pub fn new(
        head: impl IntoIterator<Item = Triple>,
        body: impl IntoIterator<Item = Triple>,
    ) -> Self {
        Self {
            head: Node::formula(head),
            direction: Direction::Forward,
            body: Node::formula(body),
        }
    }

    /// Builds a rule from explicit sides
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRule`] when a side is neither a formula nor
    /// a variable, or when both sides are variables.
    pub fn with_sides(head: Node, direction: Direction, body: Node) -> Result<Self> {
        let rule = Self {
            head,
            direction,
            body,
        };
        let side_ok = |node: &Node| matches!(node, Node::Formula(_) | Node::Variable(_));
        if !side_ok(&rule.head) || !side_ok(&rule.body) {
            return Err(rule.malformed("both sides must be formulas or variables"));
        }
        if rule.head.is_variable() && rule.body.is_variable() {
            return Err(rule.malformed("at most one side may be a variable"));
        }
        Ok(rule)
    }

    /// Recognises `(head log:implies body)` and `(body log:impliedBy head)`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRule`] for any other predicate or for
    /// sides of the wrong kind.
    pub fn from_triple(triple: &Triple) -> Result<Self> {
        match triple.predicate.as_iri() {
            Some(LOG_IMPLIES) => Self::with_sides(
                triple.subject.clone(),
                Direction::Forward,
                triple.object.clone(),
            ),
            Some(LOG_IMPLIED_BY) => Self::with_sides(
                triple.object.clone(),
                Direction::Backward,
                triple.subject.clone(),
            ),
            _ => Err(Error::MalformedRule {
                rule: triple.to_string(),
                reason: "predicate is neither log:implies nor log:impliedBy".to_string(),
            }),
        }
    }

    /// The rule as the triple it was read from
    #[must_use]
    pub fn to_triple(&self) -> Triple {
        match self.direction {
            Direction::Forward => Triple::new(
                self.head.clone(),
                Node::iri(LOG_IMPLIES),
                self.body.clone(),
            ),
            Direction::Backward => Triple::new(
                self.body.clone(),
                Node::iri(LOG_IMPLIED_BY),
                self.head.clone(),
            ),
        }
    }

    /// The head formula
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] when the head is a variable, which
    /// can only be resolved by an enclosing binding.
    pub fn head_formula(&self) -> Result<&Formula> {
        self.head.as_formula().ok_or_else(|| Error::TypeMismatch {
            context: format!("head of `{self}`"),
            node: self.head.to_string(),
        })
    }

    /// The body formula, or `None` when the body is a variable
    #[must_use]
    pub fn body_formula(&self) -> Option<&Formula> {
        self.body.as_formula()
    }

    /// True when some head clause is a negation-as-failure marker
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.head
            .as_formula()
            .is_some_and(|head| head.iter().any(is_negation_marker))
    }

    pub(crate) fn malformed(&self, reason: &str) -> Error {
        Error::MalformedRule {
            rule: self.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(&self, reason: impl Into<String>) -> Error {
        Error::Unsupported {
            rule: self.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Forward => write!(f, "{} => {}", self.head, self.body),
            Direction::Backward => write!(f, "{} <= {}", self.body, self.head),
        }
    }
}

/// True for `?v log:notIncludes { ... }`
///
/// A formula subject makes the clause an ordinary builtin call instead.
#[must_use]
pub fn is_negation_marker(clause: &Triple) -> bool {
    clause.predicate.as_iri() == Some(LOG_NOT_INCLUDES)
        && clause.subject.is_pattern()
        && matches!(clause.object, Node::Formula(_))
}

/// True for triples whose predicate is an implication
#[must_use]
pub fn is_rule_triple(triple: &Triple) -> bool {
    matches!(
        triple.predicate.as_iri(),
        Some(LOG_IMPLIES | LOG_IMPLIED_BY)
    )
}

/// Partitions a parsed document into rules and facts
///
/// # Errors
///
/// Returns [`Error::MalformedRule`] when an implication has sides of the
/// wrong kind.
pub fn split_rules_and_facts(
    triples: impl IntoIterator<Item = Triple>,
) -> Result<(Vec<Rule>, Vec<Triple>)> {
    let mut rules = Vec::new();
    let mut facts = Vec::new();
    for triple in triples {
        if is_rule_triple(&triple) {
            let rule = Rule::from_triple(&triple)?;
            if !rules.contains(&rule) {
                rules.push(rule);
            }
        } else {
            facts.push(triple);
        }
    }
    Ok((rules, facts))
}
