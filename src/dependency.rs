//! Which rules can feed which.
//!
//! A rule's head (its condition) depends on another rule's body (its
//! conclusion) when some pairing of body clauses onto head clauses is
//! structurally possible. Builtin clauses compute rather than store facts,
//! so they never take part in a pairing.

use indexmap::{IndexMap, IndexSet};
use std::ops::ControlFlow;

use crate::builtins::is_builtin;
use crate::rule::{is_negation_marker, Rule};
use crate::term::{Formula, Node, Triple};
use crate::vocab::LOG_INCLUDES;

/// Body blank node to head blank node, kept injective
pub type BlankNodeMap = IndexMap<Node, Node>;

/// True when a body node can be produced to match a head node
///
/// Body blank nodes must map consistently (and injectively) onto head blank
/// nodes across a whole pairing, so unrelated fresh nodes are never
/// confused.
pub fn node_depends(body_node: &Node, head_node: &Node, bnodes: &mut BlankNodeMap) -> bool {
    match (body_node, head_node) {
        (Node::BlankNode(_), Node::BlankNode(_)) => match bnodes.get(body_node) {
            Some(mapped) => mapped == head_node,
            None if bnodes.values().any(|mapped| mapped == head_node) => false,
            None => {
                bnodes.insert(body_node.clone(), head_node.clone());
                true
            }
        },
        (Node::BlankNode(_) | Node::Variable(_), _)
        | (_, Node::Variable(_) | Node::BlankNode(_)) => true,
        (Node::Formula(body), Node::Formula(head)) => formula_depends(body, head),
        (Node::Literal(_) | Node::Iri(_) | Node::Formula(_), _) => body_node == head_node,
    }
}

/// A quoted body formula feeds a quoted head formula when every head
/// clause can be paired onto it
fn formula_depends(body: &Formula, head: &Formula) -> bool {
    let head: Vec<Triple> = head.iter().cloned().collect();
    let body: Vec<Triple> = body.iter().cloned().collect();
    search(&head, &body, &BlankNodeMap::new(), &mut |residual| {
        if residual.is_empty() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .is_break()
}

/// Position-wise [`node_depends`]
pub fn depends(body_triple: &Triple, head_triple: &Triple, bnodes: &mut BlankNodeMap) -> bool {
    body_triple
        .positions()
        .into_iter()
        .zip(head_triple.positions())
        .all(|(body_node, head_node)| node_depends(body_node, head_node, bnodes))
}

fn without(clauses: &[Triple], idx: usize) -> Vec<Triple> {
    let mut rest = clauses.to_vec();
    rest.remove(idx);
    rest
}

/// Backtracking enumeration of residuals; `visit` may stop the search
fn search(
    head: &[Triple],
    body: &[Triple],
    bnodes: &BlankNodeMap,
    visit: &mut dyn FnMut(Formula) -> ControlFlow<()>,
) -> ControlFlow<()> {
    if body.is_empty() {
        visit(head.iter().cloned().collect())?;
    }
    if head.is_empty() {
        // Leftover body clauses sharing blank nodes cannot be produced alone
        if bnodes.is_empty() {
            visit(Formula::new())?;
        }
        return ControlFlow::Continue(());
    }
    for (body_idx, body_triple) in body.iter().enumerate() {
        for (head_idx, head_triple) in head.iter().enumerate() {
            let mut paired = bnodes.clone();
            if depends(body_triple, head_triple, &mut paired) {
                search(
                    &without(head, head_idx),
                    &without(body, body_idx),
                    &paired,
                    visit,
                )?;
            }
        }
    }
    ControlFlow::Continue(())
}

/// Every distinct set of head clauses left unconsumed by a consistent
/// pairing of body clauses onto head clauses
///
/// Each head clause is consumed at most once. An empty body leaves the
/// whole head; no pairing at all yields nothing.
#[must_use]
pub fn clause_dependencies(head: &[Triple], body: &[Triple]) -> Vec<Formula> {
    let mut residuals = IndexSet::new();
    let _ = search(head, body, &BlankNodeMap::new(), &mut |residual| {
        residuals.insert(residual);
        ControlFlow::Continue(())
    });
    residuals.into_iter().collect()
}

fn mentions(clause: &Triple, node: &Node) -> bool {
    let mut nodes = IndexSet::new();
    clause.collect_pattern_nodes(&mut nodes);
    nodes.contains(node)
}

/// The head clauses that consume stored facts
///
/// Builtin clauses are dropped. A negation marker, and a `log:includes`
/// over the ambient facts, contribute the clauses of their formula.
#[must_use]
pub fn dependency_clauses(head: &Formula) -> Vec<Triple> {
    let mut clauses = Vec::new();
    for clause in head {
        let ambient_includes = clause.predicate.as_iri() == Some(LOG_INCLUDES)
            && clause.subject.is_pattern()
            && !head
                .iter()
                .any(|other| other != clause && mentions(other, &clause.subject));
        match clause.object.as_formula() {
            Some(inner) if is_negation_marker(clause) || ambient_includes => clauses.extend(
                inner
                    .iter()
                    .filter(|c| !is_builtin(&c.predicate))
                    .cloned(),
            ),
            _ if is_builtin(&clause.predicate) => {}
            _ => clauses.push(clause.clone()),
        }
    }
    clauses
}

/// True when facts produced by `body` could satisfy part of `head`
///
/// A variable body can produce anything; a variable head cannot be
/// analysed and depends on nothing. Neither does a head that reads no
/// stored facts, such as one made only of builtins.
#[must_use]
pub fn head_depends_on_body(head: &Node, body: &Node) -> bool {
    let Some(head) = head.as_formula() else {
        return false;
    };
    let head = dependency_clauses(head);
    if head.is_empty() {
        return false;
    }
    match body {
        Node::Formula(body) if body.is_empty() => false,
        Node::Formula(body) => {
            let body: Vec<Triple> = body.iter().cloned().collect();
            search(&head, &body, &BlankNodeMap::new(), &mut |_| ControlFlow::Break(())).is_break()
        }
        Node::Variable(_) => true,
        Node::Literal(_) | Node::Iri(_) | Node::BlankNode(_) => false,
    }
}

/// The candidates whose conclusions can feed `rule`'s condition
pub fn firing_rules<'r>(rule: &Rule, candidates: &'r [Rule]) -> Vec<&'r Rule> {
    candidates
        .iter()
        .filter(|candidate| head_depends_on_body(&rule.head, &candidate.body))
        .collect()
}

/// Rule dependency graph over indices into a rule slice
///
/// `depends_on[y]` lists the rules whose output can feed rule `y`;
/// `triggers[x]` is the reverse view.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    depends_on: Vec<Vec<usize>>,
    triggers: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Analyses every ordered pair of rules, self-pairs included
    #[must_use]
    pub fn build(rules: &[Rule]) -> Self {
        let mut depends_on = vec![Vec::new(); rules.len()];
        let mut triggers = vec![Vec::new(); rules.len()];
        for (consumer, rule) in rules.iter().enumerate() {
            for (producer, candidate) in rules.iter().enumerate() {
                if head_depends_on_body(&rule.head, &candidate.body) {
                    depends_on[consumer].push(producer);
                    triggers[producer].push(consumer);
                }
            }
        }
        Self {
            depends_on,
            triggers,
        }
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.depends_on.len()
    }

    /// True when there are no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depends_on.is_empty()
    }

    /// Rules whose output can feed `rule`
    #[must_use]
    pub fn depends_on(&self, rule: usize) -> &[usize] {
        &self.depends_on[rule]
    }

    /// Rules `rule`'s output can feed
    #[must_use]
    pub fn triggers(&self, rule: usize) -> &[usize] {
        &self.triggers[rule]
    }

    /// True when the rule can feed itself
    #[must_use]
    pub fn is_self_dependent(&self, rule: usize) -> bool {
        self.depends_on[rule].contains(&rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{LOG_NOT_INCLUDES, MATH_GREATER_THAN, STRING_ORD};

    fn ex(name: &str) -> Node {
        Node::iri(format!("http://example.com/{name}"))
    }

    fn t(s: Node, p: Node, o: Node) -> Triple {
        Triple::new(s, p, o)
    }

    fn lit_triple() -> Triple {
        t(Node::literal("a"), Node::literal("b"), Node::literal("c"))
    }

    fn lit_triple2() -> Triple {
        t(Node::literal("a"), Node::literal("b"), Node::literal("d"))
    }

    fn residuals(head: &[Triple], body: &[Triple]) -> IndexSet<Formula> {
        clause_dependencies(head, body).into_iter().collect()
    }

    fn formula(triples: &[Triple]) -> Formula {
        triples.iter().cloned().collect()
    }

    #[test]
    fn test_node_depends_constants() {
        let mut map = BlankNodeMap::new();
        assert!(!node_depends(&ex("a"), &ex("b"), &mut map));
        assert!(node_depends(&ex("a"), &ex("a"), &mut map));
        assert!(!node_depends(&Node::literal("a"), &Node::literal("b"), &mut map));
        assert!(node_depends(&Node::literal("a"), &Node::literal("a"), &mut map));
    }

    #[test]
    fn test_node_depends_patterns() {
        let mut map = BlankNodeMap::new();
        assert!(node_depends(&Node::var("a"), &Node::var("b"), &mut map));
        assert!(node_depends(&Node::var("a"), &ex("a"), &mut map));
        assert!(node_depends(&ex("a"), &Node::var("b"), &mut map));
        assert!(node_depends(&Node::var("a"), &Node::blank("a"), &mut map));
        assert!(node_depends(&Node::blank("a"), &Node::var("a"), &mut map));
        assert!(node_depends(&Node::blank("a"), &Node::literal("a"), &mut map));
        assert!(node_depends(&Node::literal("a"), &Node::blank("a"), &mut map));
        assert!(map.is_empty());
    }

    #[test]
    fn test_node_depends_blank_node_mapping() {
        let (a, b, c) = (Node::blank("a"), Node::blank("b"), Node::blank("c"));

        let mut map = BlankNodeMap::new();
        assert!(node_depends(&a, &b, &mut map));
        assert_eq!(map.get(&a), Some(&b));

        let mut map: BlankNodeMap = [(b.clone(), a.clone())].into_iter().collect();
        assert!(node_depends(&a, &b, &mut map));

        let mut map: BlankNodeMap = [(a.clone(), c.clone())].into_iter().collect();
        assert!(!node_depends(&a, &b, &mut map));

        // Two body blank nodes may not collapse onto one head blank node
        let mut map: BlankNodeMap = [(c, b.clone())].into_iter().collect();
        assert!(!node_depends(&a, &b, &mut map));
    }

    #[test]
    fn test_depends() {
        let mut map = BlankNodeMap::new();
        let var_triple = t(Node::var("a"), Node::literal("b"), Node::literal("c"));
        let bn_triple = t(Node::blank("a"), Node::literal("b"), Node::literal("c"));

        assert!(!depends(&lit_triple(), &lit_triple2(), &mut map));
        assert!(depends(&lit_triple(), &lit_triple(), &mut map));
        assert!(depends(&lit_triple(), &var_triple, &mut map));
        assert!(!depends(&lit_triple2(), &var_triple, &mut map));
        assert!(depends(&lit_triple(), &bn_triple, &mut map));
        assert!(!depends(&lit_triple2(), &bn_triple, &mut map));
    }

    #[test]
    fn test_clause_dependencies_same_literals() {
        let expected: IndexSet<Formula> = [Formula::new()].into_iter().collect();
        assert_eq!(residuals(&[lit_triple()], &[lit_triple()]), expected);
        // Extra body clauses are irrelevant once the head is consumed
        assert_eq!(residuals(&[lit_triple()], &[lit_triple(), lit_triple2()]), expected);
    }

    #[test]
    fn test_clause_dependencies_extra_literals_in_head() {
        let expected: IndexSet<Formula> = [formula(&[lit_triple2()])].into_iter().collect();
        assert_eq!(residuals(&[lit_triple(), lit_triple2()], &[lit_triple()]), expected);
    }

    #[test]
    fn test_clause_dependencies_empty_body_leaves_whole_head() {
        let head = [lit_triple(), lit_triple2()];
        let expected: IndexSet<Formula> = [formula(&head)].into_iter().collect();
        assert_eq!(residuals(&head, &[]), expected);
    }

    #[test]
    fn test_clause_dependencies_enumerates_every_pairing() {
        let (x, y, z) = (Node::var("x"), Node::var("y"), Node::var("z"));
        let first = t(x, ex("p"), y.clone());
        let second = t(y, ex("p"), z);
        let body = [t(Node::var("s"), ex("p"), Node::var("o"))];

        let expected: IndexSet<Formula> = [formula(&[second.clone()]), formula(&[first.clone()])]
            .into_iter()
            .collect();
        assert_eq!(residuals(&[first, second], &body), expected);
    }

    #[test]
    fn test_clause_dependencies_blank_node_consistency() {
        let body = [t(Node::blank("a"), ex("p"), Node::blank("a"))];
        let split_head = [t(Node::blank("x"), ex("p"), Node::blank("y"))];
        assert!(residuals(&split_head, &body).is_empty());

        let same_head = [t(Node::blank("x"), ex("p"), Node::blank("x"))];
        assert_eq!(residuals(&same_head, &body).len(), 1);

        let two_body = [t(Node::blank("a"), ex("p"), Node::blank("b"))];
        assert!(residuals(&same_head, &two_body).is_empty());
    }

    #[test]
    fn test_clause_dependencies_unpairable_body_clause() {
        let (a, b, c) = (Node::var("a"), Node::var("b"), Node::var("c"));
        let body = [
            t(Node::blank("a"), ex("type"), ex("B")),
            t(Node::blank("a"), ex("start"), b.clone()),
            t(Node::blank("a"), ex("end"), c.clone()),
        ];
        let head = [
            t(a.clone(), ex("start"), b),
            t(a.clone(), ex("end"), c),
            t(a, ex("value"), Node::literal("a")),
        ];
        assert!(clause_dependencies(&head, &body).is_empty());
    }

    #[test]
    fn test_head_depends_on_body_ignores_builtins() {
        let head = Node::formula([t(Node::var("x"), Node::iri(MATH_GREATER_THAN), Node::integer(3))]);
        let body = Node::formula([t(Node::integer(5), Node::iri(MATH_GREATER_THAN), Node::integer(3))]);
        assert!(!head_depends_on_body(&head, &body));
        assert!(!head_depends_on_body(&head, &Node::var("f")));
        assert!(!head_depends_on_body(&Node::formula(Vec::<Triple>::new()), &body));
    }

    #[test]
    fn test_builtin_only_rule_is_not_self_dependent() {
        let rule = Rule::new(
            [t(Node::var("c"), Node::iri(STRING_ORD), Node::literal("A"))],
            [t(ex("a"), ex("code"), Node::var("c"))],
        );
        let graph = DependencyGraph::build(&[rule]);
        assert!(!graph.is_self_dependent(0));
    }

    #[test]
    fn test_head_depends_on_negated_content() {
        let x = Node::var("x");
        let negated = Node::formula([t(x.clone(), ex("type"), ex("Y"))]);
        let head = Node::formula([
            t(x.clone(), ex("type"), ex("X")),
            t(Node::blank("scope"), Node::iri(LOG_NOT_INCLUDES), negated),
        ]);
        let producer = Node::formula([t(ex("a"), ex("type"), ex("Y"))]);
        let unrelated = Node::formula([t(ex("a"), ex("color"), ex("Y"))]);

        assert!(head_depends_on_body(&head, &producer));
        assert!(!head_depends_on_body(&head, &unrelated));
    }

    #[test]
    fn test_head_depends_on_nested_formula() {
        let quoted_head = Node::formula([t(Node::var("w"), ex("a"), ex("Cat"))]);
        let head = Node::formula([t(Node::var("s"), ex("says"), quoted_head)]);
        let cat = Node::formula([t(ex("tom"), ex("a"), ex("Cat"))]);
        let dog = Node::formula([t(ex("rex"), ex("a"), ex("Dog"))]);

        assert!(head_depends_on_body(
            &head,
            &Node::formula([t(ex("alice"), ex("says"), cat)])
        ));
        assert!(!head_depends_on_body(
            &head,
            &Node::formula([t(ex("alice"), ex("says"), dog)])
        ));
    }

    #[test]
    fn test_variable_sides() {
        let head = Node::formula([lit_triple()]);
        assert!(head_depends_on_body(&head, &Node::var("f")));
        assert!(!head_depends_on_body(&Node::var("h"), &head));
    }

    #[test]
    fn test_dependency_graph() {
        let (x, y) = (Node::var("x"), Node::var("y"));
        let base = Rule::new(
            [t(x.clone(), ex("next"), y.clone())],
            [t(x.clone(), ex("reach"), y.clone())],
        );
        let step = Rule::new(
            [t(x.clone(), ex("reach"), y.clone()), t(y.clone(), ex("next"), Node::var("z"))],
            [t(x, ex("reach"), Node::var("z"))],
        );
        let rules = vec![base, step];
        let graph = DependencyGraph::build(&rules);

        assert!(graph.depends_on(0).is_empty());
        assert_eq!(graph.depends_on(1), &[0, 1]);
        assert_eq!(graph.triggers(0), &[1]);
        assert!(graph.is_self_dependent(1));
        assert!(!graph.is_self_dependent(0));
        assert_eq!(firing_rules(&rules[1], &rules).len(), 2);
    }
}
