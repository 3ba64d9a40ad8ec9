use thiserror::Error;

/// Rejected structural mutations. Callers treat these as no-ops; the store
/// never enters an inconsistent state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown edge: {0}")]
    UnknownEdge(String),

    #[error("self-loops are not allowed: {0}")]
    SelfLoop(String),

    #[error("duplicate edge {from} -> {target} ({label})")]
    DuplicateEdge {
        from: String,
        target: String,
        label: String,
    },
}
