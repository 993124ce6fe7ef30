//! # n3log
//!
//! A stratified forward-chaining rule engine for N3 in Rust.
//!
//! ## Features
//!
//! - Unification over literals, IRIs, variables, blank nodes and quoted
//!   formulas
//! - Stratified evaluation with guarded recursion and mutual recursion
//! - Negation-as-failure through `log:notIncludes`
//! - Deterministic fresh blank nodes, so re-running adds nothing
//! - A fixed set of `math:`, `string:` and `log:` builtins
//!
//! ## Example
//!
//! ```rust
//! use n3log::{Node, Reasoner, Rule, Triple};
//!
//! let ex = |name: &str| Node::iri(format!("http://example.com/{name}"));
//! let mut reasoner = Reasoner::new();
//! reasoner
//!     .add_fact(Triple::new(ex("a"), ex("next"), ex("b")))
//!     .unwrap();
//! reasoner.add_rule(Rule::new(
//!     [Triple::new(Node::var("x"), ex("next"), Node::var("y"))],
//!     [Triple::new(Node::var("y"), ex("prev"), Node::var("x"))],
//! ));
//! reasoner.run().unwrap();
//! assert!(reasoner.ask([Triple::new(ex("b"), ex("prev"), ex("a"))]));
//! ```

/// Debug views of rule sets.
pub mod analysis;
/// Builtin predicates.
pub mod builtins;
/// Evaluation knobs.
pub mod config;
/// Rule dependency analysis.
pub mod dependency;
/// Stratified evaluation.
pub mod engine;
/// Error types.
pub mod error;
/// Rule firing.
pub mod fire;
/// Rules and their recognition.
pub mod rule;
/// Fact storage.
pub mod store;
/// Stratification of rule sets.
pub mod stratify;
/// The node algebra.
pub mod term;
/// Unification and conjunctive matching.
pub mod unify;
/// Reserved IRIs.
pub mod vocab;

pub use config::Config;
pub use engine::{infer, infer_with_config, Reasoner};
pub use error::{Error, Result};
pub use rule::{Direction, Rule};
pub use store::{FactStore, Graph};
pub use term::{Bindings, Formula, Literal, Node, Triple};
