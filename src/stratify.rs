//! Stratification of a rule set.
//!
//! Strongly connected components of the dependency graph become strata,
//! emitted so that every stratum a rule depends on comes first.

use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

use crate::dependency::DependencyGraph;
use crate::rule::Rule;

/// How a stratum has to be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StratumKind {
    /// One rule that cannot feed itself: a single pass
    Simple,
    /// One rule with negation-as-failure in its head
    Negative,
    /// One rule that feeds itself: guarded fixpoint rounds
    Recursive,
    /// Several rules feeding each other
    Mutual,
}

/// One strongly connected component of the rule dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stratum {
    /// Indices into the rule slice, ascending
    pub rules: Vec<usize>,
    /// Evaluation strategy
    pub kind: StratumKind,
}

#[derive(Default)]
struct Tarjan {
    index: IndexMap<usize, usize>,
    low: IndexMap<usize, usize>,
    stack: Vec<usize>,
    on_stack: IndexSet<usize>,
    components: Vec<Vec<usize>>,
}

impl Tarjan {
    fn visit(&mut self, rule: usize, graph: &DependencyGraph) {
        let index = self.index.len();
        self.index.insert(rule, index);
        self.low.insert(rule, index);
        self.stack.push(rule);
        self.on_stack.insert(rule);

        for &dependency in graph.depends_on(rule) {
            if !self.index.contains_key(&dependency) {
                self.visit(dependency, graph);
                let low = self.low[&rule].min(self.low[&dependency]);
                self.low.insert(rule, low);
            } else if self.on_stack.contains(&dependency) {
                let low = self.low[&rule].min(self.index[&dependency]);
                self.low.insert(rule, low);
            }
        }

        if self.low[&rule] == self.index[&rule] {
            let mut component = Vec::new();
            while let Some(top) = self.stack.pop() {
                self.on_stack.swap_remove(&top);
                component.push(top);
                if top == rule {
                    break;
                }
            }
            component.sort_unstable();
            self.components.push(component);
        }
    }
}

/// Tarjan's strongly connected components over `depends_on` edges
///
/// A component is emitted only after every component it depends on.
#[must_use]
pub fn components(graph: &DependencyGraph) -> Vec<Vec<usize>> {
    let mut tarjan = Tarjan::default();
    for rule in 0..graph.len() {
        if !tarjan.index.contains_key(&rule) {
            tarjan.visit(rule, graph);
        }
    }
    tarjan.components
}

/// Strata of `rules` in evaluation order, each classified
#[must_use]
pub fn stratify(rules: &[Rule], graph: &DependencyGraph) -> Vec<Stratum> {
    components(graph)
        .into_iter()
        .map(|members| {
            let kind = match members.as_slice() {
                [rule] if graph.is_self_dependent(*rule) => StratumKind::Recursive,
                [rule] if rules[*rule].is_negative() => StratumKind::Negative,
                [_] => StratumKind::Simple,
                _ => StratumKind::Mutual,
            };
            Stratum {
                rules: members,
                kind,
            }
        })
        .collect()
}

/// Shortest trigger path from `start` to the nearest rule accepted by
/// `target`, excluding `start`
fn nearest(
    start: usize,
    members: &[usize],
    graph: &DependencyGraph,
    target: impl Fn(usize) -> bool,
) -> Option<Vec<usize>> {
    let mut previous: IndexMap<usize, usize> = IndexMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(rule) = queue.pop_front() {
        for &next in graph.triggers(rule) {
            if next == start || !members.contains(&next) || previous.contains_key(&next) {
                continue;
            }
            previous.insert(next, rule);
            if target(next) {
                let mut path = vec![next];
                let mut cursor = next;
                while let Some(&before) = previous.get(&cursor) {
                    if before == start {
                        break;
                    }
                    path.push(before);
                    cursor = before;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

/// A walk over trigger edges that visits every rule of a mutual stratum
///
/// Each rule in the walk is fed by the rule before it. The walk starts at
/// the lowest rule and greedily moves to the nearest unvisited one. Returns
/// `None` when some member cannot be reached.
#[must_use]
pub fn evaluation_walk(members: &[usize], graph: &DependencyGraph) -> Option<Vec<usize>> {
    let (&first, _) = members.split_first()?;
    let mut walk = vec![first];
    let mut visited = IndexSet::from([first]);
    while visited.len() < members.len() {
        let current = *walk.last()?;
        let path = nearest(current, members, graph, |rule| !visited.contains(&rule))?;
        visited.extend(path.iter().copied());
        walk.extend(path);
    }
    Some(walk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Node, Triple};
    use crate::vocab::LOG_NOT_INCLUDES;

    fn ex(name: &str) -> Node {
        Node::iri(format!("http://example.com/{name}"))
    }

    /// `{?x from ?y} => {?x to ?y}`
    fn link(from: &str, to: &str) -> Rule {
        Rule::new(
            [Triple::new(Node::var("x"), ex(from), Node::var("y"))],
            [Triple::new(Node::var("x"), ex(to), Node::var("y"))],
        )
    }

    fn kinds(strata: &[Stratum]) -> Vec<StratumKind> {
        strata.iter().map(|stratum| stratum.kind).collect()
    }

    #[test]
    fn test_acyclic_rules_give_singleton_strata_in_dependency_order() {
        // Listed consumer first
        let rules = vec![link("q", "r"), link("p", "q"), link("r", "s")];
        let graph = DependencyGraph::build(&rules);
        let strata = stratify(&rules, &graph);

        let order: Vec<Vec<usize>> = strata.iter().map(|s| s.rules.clone()).collect();
        assert_eq!(order, vec![vec![1], vec![0], vec![2]]);
        assert!(kinds(&strata).iter().all(|kind| *kind == StratumKind::Simple));
    }

    #[test]
    fn test_self_recursive_rule() {
        let rules = vec![Rule::new(
            [
                Triple::new(Node::var("x"), ex("reach"), Node::var("y")),
                Triple::new(Node::var("y"), ex("next"), Node::var("z")),
            ],
            [Triple::new(Node::var("x"), ex("reach"), Node::var("z"))],
        )];
        let graph = DependencyGraph::build(&rules);
        assert_eq!(kinds(&stratify(&rules, &graph)), vec![StratumKind::Recursive]);
    }

    #[test]
    fn test_cycle_forms_one_mutual_stratum() {
        let rules = vec![link("a", "b"), link("b", "c"), link("c", "a"), link("c", "d")];
        let graph = DependencyGraph::build(&rules);
        let strata = stratify(&rules, &graph);

        assert_eq!(strata.len(), 2);
        assert_eq!(strata[0].rules, vec![0, 1, 2]);
        assert_eq!(strata[0].kind, StratumKind::Mutual);
        assert_eq!(strata[1].rules, vec![3]);
    }

    #[test]
    fn test_negative_stratum() {
        let negated = Node::formula([Triple::new(Node::var("x"), ex("type"), ex("Y"))]);
        let rules = vec![Rule::new(
            [
                Triple::new(Node::var("x"), ex("type"), ex("X")),
                Triple::new(Node::blank("scope"), Node::iri(LOG_NOT_INCLUDES), negated),
            ],
            [Triple::new(Node::var("x"), ex("status"), ex("Plain"))],
        )];
        let graph = DependencyGraph::build(&rules);
        assert_eq!(kinds(&stratify(&rules, &graph)), vec![StratumKind::Negative]);
    }

    #[test]
    fn test_negation_orders_producer_first() {
        let negated = Node::formula([Triple::new(Node::var("x"), ex("type"), ex("Y"))]);
        let consumer = Rule::new(
            [
                Triple::new(Node::var("x"), ex("type"), ex("X")),
                Triple::new(Node::blank("scope"), Node::iri(LOG_NOT_INCLUDES), negated),
            ],
            [Triple::new(Node::var("x"), ex("status"), ex("Plain"))],
        );
        let producer = Rule::new(
            [Triple::new(Node::var("x"), ex("special"), ex("yes"))],
            [Triple::new(Node::var("x"), ex("type"), ex("Y"))],
        );
        let rules = vec![consumer, producer];
        let graph = DependencyGraph::build(&rules);
        let order: Vec<Vec<usize>> = stratify(&rules, &graph).into_iter().map(|s| s.rules).collect();
        assert_eq!(order, vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_evaluation_walk_covers_every_member() {
        let rules = vec![link("a", "b"), link("b", "c"), link("c", "a")];
        let graph = DependencyGraph::build(&rules);
        assert_eq!(evaluation_walk(&[0, 1, 2], &graph), Some(vec![0, 1, 2]));
        assert_eq!(evaluation_walk(&[], &graph), None);
    }

    #[test]
    fn test_evaluation_walk_revisits_to_reach_branches() {
        // 0 feeds 1 and 2; 2 only returns to 0 through 3
        let rules = vec![link("a", "b"), link("b", "a"), link("b", "a2"), link("a2", "a")];
        let graph = DependencyGraph::build(&rules);
        let members = vec![0, 1, 2, 3];
        let walk = evaluation_walk(&members, &graph).unwrap();

        assert_eq!(walk[0], 0);
        assert!(members.iter().all(|rule| walk.contains(rule)));
        for step in walk.windows(2) {
            assert!(graph.triggers(step[0]).contains(&step[1]));
        }
    }
}
