use indexmap::{IndexMap, IndexSet};

use crate::error::{Error, Result};
use crate::term::{Formula, Mask, Node, Triple, WILDCARD};

/// Pattern-query interface the engine needs from a triple store
///
/// Queries are assumed consistent with the most recent insert; there is no
/// snapshot isolation.
pub trait FactStore {
    /// Adds a triple, returning true if it was not already present
    ///
    /// # Errors
    ///
    /// Stores may reject triples that violate their invariants.
    fn insert(&mut self, triple: Triple) -> Result<bool>;

    /// Returns every triple matching the mask; `None` positions are wildcards
    fn query<'a>(&'a self, mask: &Mask) -> Box<dyn Iterator<Item = &'a Triple> + 'a>;

    /// Number of triples held
    fn len(&self) -> usize;

    /// True when the store holds no triples
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every triple in the store
    fn triples<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Triple> + 'a> {
        self.query(&WILDCARD)
    }

    /// Membership test
    fn contains(&self, triple: &Triple) -> bool {
        let mask = [
            Some(triple.subject.clone()),
            Some(triple.predicate.clone()),
            Some(triple.object.clone()),
        ];
        self.query(&mask).next().is_some()
    }

    /// Inserts every triple of `other`, returning how many were new
    ///
    /// # Errors
    ///
    /// Propagates the first rejected insert.
    fn union_with(&mut self, other: &dyn FactStore) -> Result<usize> {
        let mut added = 0;
        for triple in other.triples() {
            if self.insert(triple.clone())? {
                added += 1;
            }
        }
        Ok(added)
    }
}

/// True when every fixed position of the mask equals the triple's
#[must_use]
pub fn matches_mask(triple: &Triple, mask: &Mask) -> bool {
    triple
        .positions()
        .iter()
        .zip(mask)
        .all(|(node, fixed)| fixed.as_ref().map_or(true, |value| value == *node))
}

/// In-memory fact store indexed by position
///
/// For `(a p b), (a p c), (b q c)` the subject index holds
/// `{a -> [0, 1], b -> [2]}`. Formula values are never indexed; lookups
/// with a formula in the mask fall back to a scan.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    triples: IndexSet<Triple>,
    /// For each position, maps values to offsets into `triples`
    by_position: [IndexMap<Node, Vec<usize>>; 3],
}

impl Graph {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from triples
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if a triple holds a bare variable.
    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Result<Self> {
        let mut graph = Self::new();
        for triple in triples {
            graph.insert(triple)?;
        }
        Ok(graph)
    }

    /// Iterates the triples in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// The triples as a set
    #[must_use]
    pub fn as_set(&self) -> &IndexSet<Triple> {
        &self.triples
    }

    /// Consumes the graph, keeping the triples
    #[must_use]
    pub fn into_set(self) -> IndexSet<Triple> {
        self.triples
    }

    fn index(&mut self, triple: &Triple, offset: usize) {
        for (pos, node) in triple.positions().into_iter().enumerate() {
            if !matches!(node, Node::Formula(_)) {
                self.by_position[pos]
                    .entry(node.clone())
                    .or_default()
                    .push(offset);
            }
        }
    }

    /// Picks the most selective index among the fixed, indexable positions
    ///
    /// `Some(None)` means an indexed value is absent, so nothing can match.
    fn candidates(&self, mask: &Mask) -> Option<Option<&Vec<usize>>> {
        let mut best: Option<Option<&Vec<usize>>> = None;
        for (pos, fixed) in mask.iter().enumerate() {
            let Some(value) = fixed else { continue };
            if matches!(value, Node::Formula(_)) {
                continue;
            }
            let offsets = self.by_position[pos].get(value);
            let size = offsets.map_or(0, Vec::len);
            let better = match best {
                None => true,
                Some(current) => size < current.map_or(0, Vec::len),
            };
            if better {
                best = Some(offsets);
            }
        }
        best
    }
}

impl FactStore for Graph {
    fn insert(&mut self, triple: Triple) -> Result<bool> {
        if triple.has_variables() {
            return Err(Error::TypeMismatch {
                context: "fact store insert".to_string(),
                node: triple.to_string(),
            });
        }
        let (offset, added) = self.triples.insert_full(triple);
        if added {
            if let Some(triple) = self.triples.get_index(offset).cloned() {
                self.index(&triple, offset);
            }
        }
        Ok(added)
    }

    fn query<'a>(&'a self, mask: &Mask) -> Box<dyn Iterator<Item = &'a Triple> + 'a> {
        let mask = mask.clone();
        match self.candidates(&mask) {
            None => Box::new(
                self.triples
                    .iter()
                    .filter(move |triple| matches_mask(triple, &mask)),
            ),
            Some(None) => Box::new(std::iter::empty()),
            Some(Some(offsets)) => Box::new(
                offsets
                    .iter()
                    .filter_map(|&offset| self.triples.get_index(offset))
                    .filter(move |triple| matches_mask(triple, &mask)),
            ),
        }
    }

    fn len(&self) -> usize {
        self.triples.len()
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.triples == other.triples
    }
}

impl Eq for Graph {}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Triple;
    type IntoIter = indexmap::set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

/// Quoted formulas are queried by scanning; they may hold variables
impl FactStore for Formula {
    fn insert(&mut self, triple: Triple) -> Result<bool> {
        Ok(Formula::insert(self, triple))
    }

    fn query<'a>(&'a self, mask: &Mask) -> Box<dyn Iterator<Item = &'a Triple> + 'a> {
        let mask = mask.clone();
        Box::new(self.iter().filter(move |triple| matches_mask(triple, &mask)))
    }

    fn len(&self) -> usize {
        Formula::len(self)
    }
}
