//! Engine errors

/// Fatal conditions that abort an inference call
///
/// Match failures are never errors: they prune the search branch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A triple presented as a rule is not an implication between formulas
    #[error("malformed rule `{rule}`: {reason}")]
    MalformedRule {
        /// The offending rule, rendered as N3
        rule: String,
        /// What is wrong with it
        reason: String,
    },
    /// A node appeared in a position its kind is not allowed in
    #[error("type mismatch in {context}: unexpected `{node}`")]
    TypeMismatch {
        /// Where the node was found
        context: String,
        /// The offending node, rendered as N3
        node: String,
    },
    /// The rule is well formed but its recursive shape cannot be evaluated
    #[error("unsupported rule `{rule}`: {reason}")]
    Unsupported {
        /// The offending rule, rendered as N3
        rule: String,
        /// Which shape is unsupported
        reason: String,
    },
}

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
