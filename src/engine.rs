use indexmap::IndexSet;
use log::{debug, trace, warn};

use crate::config::Config;
use crate::dependency::{clause_dependencies, dependency_clauses, DependencyGraph};
use crate::error::Result;
use crate::fire::fire_rule;
use crate::rule::{is_negation_marker, is_rule_triple, split_rules_and_facts, Rule};
use crate::store::{FactStore, Graph};
use crate::stratify::{evaluation_walk, stratify, Stratum, StratumKind};
use crate::term::{Bindings, Formula, Node, Triple};
use crate::unify::{match_rule, order_clauses, Matches};

fn clause_matches<'a>(
    facts: &'a dyn FactStore,
    clauses: impl IntoIterator<Item = Triple>,
    config: &Config,
) -> Matches<'a> {
    let clauses: Vec<Triple> = clauses.into_iter().collect();
    let clauses = if config.reorder_clauses {
        order_clauses(&clauses, &IndexSet::new())
    } else {
        clauses
    };
    match_rule(clauses, facts, Bindings::new())
}

/// One conjunctive pass: every triple the rule derives from `facts`
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`](crate::Error::TypeMismatch) when a side
/// of the rule is a variable that does not resolve to a formula.
pub fn single_rule(facts: &dyn FactStore, rule: &Rule, config: &Config) -> Result<IndexSet<Triple>> {
    let head = rule.head_formula()?;
    let mut derived = IndexSet::new();
    for bindings in clause_matches(facts, head.iter().cloned(), config) {
        derived.extend(fire_rule(rule, &bindings)?);
    }
    Ok(derived)
}

/// Splits a negative rule into its positive and non-negative variants
///
/// The positive rule replaces every negation marker by the negated clauses;
/// the non-negative rule drops the markers. Both keep the conclusion.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`](crate::Error::TypeMismatch) for a
/// variable head.
pub fn create_positive_rule(rule: &Rule) -> Result<(Rule, Rule)> {
    let mut positive = Formula::new();
    let mut non_negative = Formula::new();
    for clause in rule.head_formula()? {
        match clause.object.as_formula() {
            Some(negated) if is_negation_marker(clause) => {
                for inner in negated {
                    positive.insert(inner.clone());
                }
            }
            _ => {
                positive.insert(clause.clone());
                non_negative.insert(clause.clone());
            }
        }
    }
    let variant = |head: Formula| Rule {
        head: Node::Formula(head),
        direction: rule.direction,
        body: rule.body.clone(),
    };
    Ok((variant(positive), variant(non_negative)))
}

/// Negation-as-failure: what the rule derives without its negated
/// condition, minus what it would derive were the condition to hold
///
/// Positive matches are projected onto the variables of the non-negative
/// head before firing, so both sides mint the same fresh nodes.
///
/// # Errors
///
/// Propagates firing errors.
pub fn negative_rule(facts: &dyn FactStore, rule: &Rule, config: &Config) -> Result<IndexSet<Triple>> {
    let (positive, non_negative) = create_positive_rule(rule)?;
    let candidates = single_rule(facts, &non_negative, config)?;

    let mut shared = IndexSet::new();
    for clause in non_negative.head_formula()? {
        clause.collect_pattern_nodes(&mut shared);
    }
    let mut blocked = IndexSet::new();
    for bindings in clause_matches(facts, positive.head_formula()?.iter().cloned(), config) {
        let projected: Bindings = bindings
            .into_iter()
            .filter(|(node, _)| shared.contains(node))
            .collect();
        blocked.extend(fire_rule(&positive, &projected)?);
    }
    trace!(
        "negative rule {rule}: {} candidates, {} blocked",
        candidates.len(),
        blocked.len()
    );
    Ok(candidates.difference(&blocked).cloned().collect())
}

/// Guard and rest of `consumer`'s head with respect to `producer`'s body
fn split_guard(producer: &Rule, consumer: &Rule) -> Result<(Formula, Formula)> {
    let body: Vec<Triple> = producer
        .body_formula()
        .ok_or_else(|| producer.unsupported("recursion through a variable conclusion"))?
        .iter()
        .cloned()
        .collect();
    let head = dependency_clauses(consumer.head_formula()?);
    let mut residuals = clause_dependencies(&head, &body);
    let guard = match residuals.len() {
        1 => residuals.swap_remove(0),
        found => {
            return Err(consumer.unsupported(format!(
                "expected exactly one dependency pairing, found {found}"
            )))
        }
    };
    let rest = head.into_iter().filter(|clause| !guard.contains(clause)).collect();
    Ok((guard, rest))
}

/// Instances of `clauses` in `facts`
fn instances(facts: &dyn FactStore, clauses: &Formula, config: &Config) -> Result<Graph> {
    if clauses.is_empty() {
        return Ok(Graph::new());
    }
    let echo = Rule::new(clauses.iter().cloned(), clauses.iter().cloned());
    Graph::from_triples(single_rule(facts, &echo, config)?)
}

/// Upper bound on the rounds a guarded rule needs
///
/// One round per guard tuple. Without a guard the rest tuples stand in.
fn round_bound(guard: &Formula, guard_facts: &Graph, rest: &Formula, rest_facts: &Graph) -> usize {
    if guard.is_empty() {
        (rest_facts.len() / rest.len().max(1)).max(1)
    } else {
        guard_facts.len() / guard.len()
    }
}

/// Bounded fixpoint of a rule that can feed itself
///
/// The head splits into the guard, which its own conclusions can never
/// satisfy, and the rest. Rounds run against guard and rest instances only,
/// at most one round per guard tuple, and stop early once a round adds
/// nothing.
///
/// # Errors
///
/// Returns [`Error::Unsupported`](crate::Error::Unsupported) for a negative
/// rule or when the head pairs with the body in more than one way.
pub fn with_guard(facts: &dyn FactStore, rule: &Rule, config: &Config) -> Result<IndexSet<Triple>> {
    if rule.is_negative() {
        return Err(rule.unsupported("negation-as-failure in a recursive rule"));
    }
    if rule.body_formula().is_none() {
        return saturate(facts, rule, config);
    }
    let (guard, rest) = split_guard(rule, rule)?;
    let guard_facts = instances(facts, &guard, config)?;
    let rest_facts = instances(facts, &rest, config)?;
    let rounds = config.rounds(round_bound(&guard, &guard_facts, &rest, &rest_facts));
    debug!(
        "guarded rule {rule}: guard {guard} with {} instances, {rounds} rounds",
        guard_facts.len()
    );

    let mut store = guard_facts;
    store.union_with(&rest_facts)?;
    let mut derived = IndexSet::new();
    for round in 0..rounds {
        let mut added = 0;
        for triple in single_rule(&store, rule, config)? {
            if store.insert(triple.clone())? && !facts.contains(&triple) {
                added += 1;
            }
            derived.insert(triple);
        }
        trace!("round {round} of {rule}: {added} new triples");
        if added == 0 {
            return Ok(derived);
        }
    }
    if rounds > 0 {
        warn!("round bound {rounds} of {rule} exhausted before a fixpoint");
    }
    Ok(derived)
}

/// Plain fixpoint of a rule whose conclusion is a variable
///
/// Such a rule only re-emits quoted triples already present, so the
/// fixpoint is finite.
fn saturate(facts: &dyn FactStore, rule: &Rule, config: &Config) -> Result<IndexSet<Triple>> {
    let mut store = Graph::new();
    store.union_with(facts)?;
    let mut derived = IndexSet::new();
    let mut round = 0;
    loop {
        if config.round_limit.is_some_and(|limit| round >= limit) {
            warn!("round limit reached for {rule}");
            return Ok(derived);
        }
        round += 1;
        let mut added = 0;
        for triple in single_rule(&store, rule, config)? {
            if store.insert(triple.clone())? {
                added += 1;
            }
            derived.insert(triple);
        }
        trace!("round {round} of {rule}: {added} new triples");
        if added == 0 {
            return Ok(derived);
        }
    }
}

/// Work-list evaluation of several rules feeding each other
///
/// The rules are first ordered as a walk in which every rule is fed by its
/// predecessor; each step of the walk contributes its guard bound to the
/// pass limit. A pass fires the pending rules in walk order and schedules
/// the rules triggered by every rule that grew the closure.
fn mutual_stratum(
    closure: &Graph,
    rules: &[Rule],
    members: &[usize],
    graph: &DependencyGraph,
    config: &Config,
) -> Result<IndexSet<Triple>> {
    let lead = &rules[members[0]];
    if let Some(&negative) = members.iter().find(|&&idx| rules[idx].is_negative()) {
        return Err(rules[negative].unsupported("negation-as-failure in a mutually recursive stratum"));
    }
    let walk = evaluation_walk(members, graph)
        .ok_or_else(|| lead.unsupported("no evaluation walk covers the stratum"))?;

    let mut bound = 0;
    for step in walk.windows(2) {
        let (guard, rest) = split_guard(&rules[step[0]], &rules[step[1]])?;
        let guard_facts = instances(closure, &guard, config)?;
        let rest_facts = instances(closure, &rest, config)?;
        bound += round_bound(&guard, &guard_facts, &rest, &rest_facts);
    }
    let passes = config.rounds(bound);
    debug!("mutual stratum walk {walk:?}: {passes} passes");

    let order: IndexSet<usize> = walk.iter().copied().collect();
    let mut store = closure.clone();
    let mut derived = IndexSet::new();
    let mut pending = order.clone();
    let mut pass = 0;
    while !pending.is_empty() {
        if pass == passes {
            warn!("pass bound {passes} of mutual stratum exhausted before a fixpoint");
            break;
        }
        pass += 1;
        let mut triggered: IndexSet<usize> = IndexSet::new();
        for &idx in &pending {
            let mut added = 0;
            for triple in single_rule(&store, &rules[idx], config)? {
                if store.insert(triple.clone())? {
                    added += 1;
                }
                derived.insert(triple);
            }
            if added > 0 {
                trace!("pass {pass}: rule {idx} added {added}, rescheduling its triggers");
                triggered.extend(
                    graph.triggers(idx).iter().copied().filter(|next| order.contains(next)),
                );
            }
        }
        pending = order.iter().copied().filter(|idx| triggered.contains(idx)).collect();
    }
    Ok(derived)
}

fn evaluate_stratum(
    closure: &Graph,
    rules: &[Rule],
    stratum: &Stratum,
    graph: &DependencyGraph,
    config: &Config,
) -> Result<IndexSet<Triple>> {
    match (stratum.kind, stratum.rules.as_slice()) {
        (StratumKind::Simple, &[idx]) => single_rule(closure, &rules[idx], config),
        (StratumKind::Negative, &[idx]) => negative_rule(closure, &rules[idx], config),
        (StratumKind::Recursive, &[idx]) => with_guard(closure, &rules[idx], config),
        (_, members) => mutual_stratum(closure, rules, members, graph, config),
    }
}

/// Every triple the rules derive from the facts, stratum by stratum
///
/// The result holds all triples produced by firings, which may include
/// some of the input facts.
///
/// # Errors
///
/// Aborts on the first malformed, mistyped or unsupported rule.
pub fn infer(facts: impl IntoIterator<Item = Triple>, rules: &[Rule]) -> Result<IndexSet<Triple>> {
    infer_with_config(facts, rules, &Config::default())
}

/// [`infer`] with explicit evaluation knobs
///
/// # Errors
///
/// Aborts on the first malformed, mistyped or unsupported rule.
pub fn infer_with_config(
    facts: impl IntoIterator<Item = Triple>,
    rules: &[Rule],
    config: &Config,
) -> Result<IndexSet<Triple>> {
    let mut closure = Graph::from_triples(facts)?;
    let graph = DependencyGraph::build(rules);
    let mut derived = IndexSet::new();
    for (level, stratum) in stratify(rules, &graph).iter().enumerate() {
        debug!(
            "stratum {level}: {:?} over rules {:?}",
            stratum.kind, stratum.rules
        );
        for triple in evaluate_stratum(&closure, rules, stratum, &graph, config)? {
            closure.insert(triple.clone())?;
            derived.insert(triple);
        }
    }
    Ok(derived)
}

/// A fact base with rules, materialised on [`run`](Reasoner::run)
#[derive(Debug, Clone, Default)]
pub struct Reasoner {
    facts: Graph,
    rules: Vec<Rule>,
    inferred: IndexSet<Triple>,
    config: Config,
}

impl Reasoner {
    /// Create an empty reasoner with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty reasoner with explicit knobs
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The evaluation knobs
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add a fact to the knowledge base
    ///
    /// Returns true if the fact was new.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`](crate::Error::TypeMismatch) when the
    /// fact holds a bare variable.
    pub fn add_fact(&mut self, fact: Triple) -> Result<bool> {
        self.facts.insert(fact)
    }

    /// Add a rule, ignoring duplicates
    ///
    /// Returns true if the rule was new.
    pub fn add_rule(&mut self, rule: Rule) -> bool {
        if self.rules.contains(&rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// Adds an implication as a rule and anything else as a fact
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRule`](crate::Error::MalformedRule) for an
    /// implication with sides of the wrong kind, or the errors of
    /// [`add_fact`](Self::add_fact).
    pub fn add_triple(&mut self, triple: Triple) -> Result<()> {
        if is_rule_triple(&triple) {
            self.add_rule(Rule::from_triple(&triple)?);
        } else {
            self.add_fact(triple)?;
        }
        Ok(())
    }

    /// Adds a whole parsed document
    ///
    /// # Errors
    ///
    /// Same as [`add_triple`](Self::add_triple); nothing is added when a
    /// rule is malformed.
    pub fn load(&mut self, triples: impl IntoIterator<Item = Triple>) -> Result<()> {
        let (rules, facts) = split_rules_and_facts(triples)?;
        for rule in rules {
            self.add_rule(rule);
        }
        for fact in facts {
            self.add_fact(fact)?;
        }
        Ok(())
    }

    /// Materialises the closure into the fact base
    ///
    /// Returns how many facts were added. Running again without new input
    /// adds nothing.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`infer`].
    pub fn run(&mut self) -> Result<usize> {
        debug!(
            "running {} rules over {} facts",
            self.rules.len(),
            self.facts.len()
        );
        let derived = infer_with_config(self.facts.iter().cloned(), &self.rules, &self.config)?;
        let mut added = 0;
        for triple in derived {
            if self.facts.insert(triple.clone())? {
                self.inferred.insert(triple);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Every fact, asserted or inferred
    #[must_use]
    pub fn facts(&self) -> &Graph {
        &self.facts
    }

    /// The facts added by [`run`](Self::run)
    #[must_use]
    pub fn inferred(&self) -> &IndexSet<Triple> {
        &self.inferred
    }

    /// The rules, in insertion order
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns all variable bindings that make every pattern true
    ///
    /// Builtin predicates may appear in the patterns.
    pub fn query(&self, patterns: impl IntoIterator<Item = Triple>) -> Vec<Bindings> {
        clause_matches(&self.facts, patterns, &self.config).collect()
    }

    /// Returns whether a binding exists
    pub fn ask(&self, patterns: impl IntoIterator<Item = Triple>) -> bool {
        clause_matches(&self.facts, patterns, &self.config)
            .next()
            .is_some()
    }
}
