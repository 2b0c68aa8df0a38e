use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid tree document: {0}")]
    Syntax(#[from] json5::Error),
    #[error("magnitude attribute '{0}' is not declared in the attribute list")]
    UnknownMagnitude(String),
    #[error("color attribute '{0}' is not declared in the attribute list")]
    UnknownColorAttribute(String),
    #[error("attribute '{attribute}' on node '{node}' has {found} values but the document declares {expected} datasets")]
    DatasetMismatch {
        node: String,
        attribute: String,
        found: usize,
        expected: usize,
    },
    #[error("tree document has no root node")]
    EmptyTree,
}
