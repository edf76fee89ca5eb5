use thiserror::Error;

/// Everything that can go wrong while building, applying or deserializing
/// operations. Application errors are raised before the tree is touched, so a
/// failed call never leaves a partially applied change behind.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The operation was built against another document version. This means
    /// a transformation step is missing on the caller's side.
    #[error(
        "Operation was built for document version {operation_version} but the document is at \
         version {document_version}"
    )]
    VersionMismatch {
        document_version: u64,
        operation_version: u64,
    },

    /// The tree is not in the state the operation expects, e.g. an attribute
    /// does not have the declared old value.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Root '{0}' does not exist")]
    RootNotFound(String),

    #[error("Position {0} does not point into the document tree")]
    InvalidPosition(String),

    /// Internal state got out of sync. Never swallow this one.
    #[error("Lost invariant: {0}")]
    LostInvariant(String),

    #[error("Failed to (de)serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}
