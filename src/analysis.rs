//! Offline inspection of rule sets: strata, dependencies and readable
//! rendering.

use indexmap::{IndexMap, IndexSet};
use std::fmt::Write;

use crate::dependency::DependencyGraph;
use crate::rule::{Direction, Rule};
use crate::stratify::{stratify, StratumKind};
use crate::term::{Formula, Node, Triple};

/// The strata of `rules` in evaluation order
#[must_use]
pub fn stratify_rules(rules: &[Rule]) -> Vec<IndexSet<Rule>> {
    let graph = DependencyGraph::build(rules);
    stratify(rules, &graph)
        .into_iter()
        .map(|stratum| stratum.rules.iter().map(|&idx| rules[idx].clone()).collect())
        .collect()
}

/// For every rule, the rules whose conclusions can feed it
#[must_use]
pub fn rule_dependencies(rules: &[Rule]) -> IndexMap<Rule, IndexSet<Rule>> {
    let graph = DependencyGraph::build(rules);
    rules
        .iter()
        .enumerate()
        .map(|(idx, rule)| {
            let feeders = graph
                .depends_on(idx)
                .iter()
                .map(|&producer| rules[producer].clone())
                .collect();
            (rule.clone(), feeders)
        })
        .collect()
}

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Renders nodes with blank nodes renamed in order of appearance
#[derive(Default)]
struct Printer {
    blank_nodes: IndexMap<String, String>,
}

impl Printer {
    fn blank(&mut self, label: &str) -> String {
        let next = self.blank_nodes.len();
        self.blank_nodes
            .entry(label.to_string())
            .or_insert_with(|| {
                let letter = char::from(ALPHABET[next % ALPHABET.len()]);
                match next / ALPHABET.len() {
                    0 => letter.to_string(),
                    round => format!("{letter}{round}"),
                }
            })
            .clone()
    }

    fn node(&mut self, out: &mut String, node: &Node) {
        match node {
            Node::BlankNode(label) => {
                let name = self.blank(label);
                let _ = write!(out, "_:{name}");
            }
            Node::Formula(formula) => self.formula(out, formula),
            Node::Literal(_) | Node::Iri(_) | Node::Variable(_) => {
                let _ = write!(out, "{node}");
            }
        }
    }

    fn triple(&mut self, out: &mut String, triple: &Triple) {
        self.node(out, &triple.subject);
        out.push(' ');
        self.node(out, &triple.predicate);
        out.push(' ');
        self.node(out, &triple.object);
    }

    fn formula(&mut self, out: &mut String, formula: &Formula) {
        if formula.is_empty() {
            out.push_str("{}");
            return;
        }
        out.push_str("{ ");
        for (idx, triple) in formula.iter().enumerate() {
            if idx > 0 {
                out.push_str(" . ");
            }
            self.triple(out, triple);
        }
        out.push_str(" }");
    }
}

/// Renders a rule as N3, naming its blank nodes `_:a`, `_:b`, ...
///
/// Names are assigned per call, so generated labels such as hashed fresh
/// nodes print the same way in every rule of the same shape.
#[must_use]
pub fn print_rule(rule: &Rule) -> String {
    let mut printer = Printer::default();
    let mut out = String::new();
    let (first, arrow, second) = match rule.direction {
        Direction::Forward => (&rule.head, "=>", &rule.body),
        Direction::Backward => (&rule.body, "<=", &rule.head),
    };
    printer.node(&mut out, first);
    let _ = write!(out, " {arrow} ");
    printer.node(&mut out, second);
    out
}

/// Renders a set of triples as N3 with per-call blank node names
#[must_use]
pub fn print_triples<'a>(triples: impl IntoIterator<Item = &'a Triple>) -> String {
    let mut printer = Printer::default();
    let mut out = String::new();
    for triple in triples {
        printer.triple(&mut out, triple);
        out.push_str(" .\n");
    }
    out
}

/// One stratum as it appears in [`strata_report`]
#[cfg(feature = "serde")]
#[derive(Debug, serde::Serialize)]
struct StratumReport {
    level: usize,
    kind: StratumKind,
    rules: Vec<String>,
}

/// The strata of `rules` as pretty-printed JSON
///
/// # Errors
///
/// Returns the serializer error, which does not occur for this shape.
#[cfg(feature = "serde")]
pub fn strata_report(rules: &[Rule]) -> serde_json::Result<String> {
    let graph = DependencyGraph::build(rules);
    let report: Vec<StratumReport> = stratify(rules, &graph)
        .into_iter()
        .enumerate()
        .map(|(level, stratum)| StratumReport {
            level,
            kind: stratum.kind,
            rules: stratum.rules.iter().map(|&idx| print_rule(&rules[idx])).collect(),
        })
        .collect();
    serde_json::to_string_pretty(&report)
}

/// How each rule would be evaluated, keyed by its rendering
#[must_use]
pub fn rule_kinds(rules: &[Rule]) -> IndexMap<String, StratumKind> {
    let graph = DependencyGraph::build(rules);
    stratify(rules, &graph)
        .into_iter()
        .flat_map(|stratum| {
            let kind = stratum.kind;
            stratum
                .rules
                .into_iter()
                .map(move |idx| (print_rule(&rules[idx]), kind))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(name: &str) -> Node {
        Node::iri(format!("http://example.com/{name}"))
    }

    fn link(from: &str, to: &str) -> Rule {
        Rule::new(
            [Triple::new(Node::var("x"), ex(from), Node::var("y"))],
            [Triple::new(Node::var("x"), ex(to), Node::var("y"))],
        )
    }

    #[test]
    fn test_stratify_rules_returns_rules() {
        let rules = vec![link("q", "r"), link("p", "q")];
        let strata = stratify_rules(&rules);
        assert_eq!(strata.len(), 2);
        assert!(strata[0].contains(&rules[1]));
        assert!(strata[1].contains(&rules[0]));
    }

    #[test]
    fn test_rule_dependencies() {
        let rules = vec![link("q", "r"), link("p", "q")];
        let deps = rule_dependencies(&rules);
        assert_eq!(deps[&rules[0]].iter().collect::<Vec<_>>(), vec![&rules[1]]);
        assert!(deps[&rules[1]].is_empty());
    }

    #[test]
    fn test_print_rule_names_blank_nodes_per_call() {
        let rule = Rule::new(
            [Triple::new(Node::var("x"), ex("p"), Node::blank("sk0123abcd"))],
            [Triple::new(Node::blank("sk0123abcd"), ex("q"), Node::blank("other"))],
        );
        let printed = print_rule(&rule);
        assert_eq!(
            printed,
            "{ ?x <http://example.com/p> _:a } => { _:a <http://example.com/q> _:b }"
        );
        // A second call starts naming from scratch
        assert_eq!(print_rule(&rule), printed);
    }

    #[test]
    fn test_print_backward_rule() {
        let rule = Rule::with_sides(
            Node::formula([Triple::new(Node::var("x"), ex("p"), ex("o"))]),
            Direction::Backward,
            Node::formula([]),
        )
        .unwrap();
        assert_eq!(print_rule(&rule), "{} <= { ?x <http://example.com/p> <http://example.com/o> }");
    }

    #[test]
    fn test_print_triples() {
        let triples = [
            Triple::new(Node::blank("z"), ex("p"), Node::blank("y")),
            Triple::new(Node::blank("y"), ex("p"), Node::blank("z")),
        ];
        assert_eq!(
            print_triples(&triples),
            "_:a <http://example.com/p> _:b .\n_:b <http://example.com/p> _:a .\n"
        );
    }

    #[test]
    fn test_rule_kinds() {
        let rules = vec![link("p", "p2"), link("q", "q")];
        let kinds = rule_kinds(&rules);
        assert_eq!(kinds[&print_rule(&rules[0])], StratumKind::Simple);
        assert_eq!(kinds[&print_rule(&rules[1])], StratumKind::Recursive);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_strata_report_is_json() {
        let rules = vec![link("q", "r"), link("p", "q")];
        let report = strata_report(&rules).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[0]["kind"], "Simple");
        assert_eq!(value[1]["level"], 1);
    }
}
