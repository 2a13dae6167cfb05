use thiserror::Error as ThisError;

/// Errors produced by [`crate::node::Node`] and [`crate::node_registry::NodeRegistry`].
#[derive(ThisError, Debug)]
pub enum NodeError {
    #[error("node is already registered")]
    AlreadyExists,
    /// Never constructed: Rust's global allocator aborts on failure rather
    /// than returning it. Kept so this error type covers the same kinds the
    /// node core's interface names.
    #[error("allocation failed")]
    OutOfMemory,
    #[error("creating is not a state a node can be asked to enter")]
    InvalidState,
    #[error("node not found")]
    NotFound,
    #[error("node command failed: {0}")]
    Async(i32),
}

/// Errors produced by [`crate::codec_registry`].
#[derive(ThisError, Debug)]
pub enum RegistryError {
    #[error("no usable {0} plugin was loaded")]
    NotFound(&'static str),
    #[error("too many codecs reported")]
    TooMany,
}
