use thiserror::Error;

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Term construction error: {0}")]
    Build(#[from] BuildError),

    #[error("Unknown equation: {0}")]
    UnknownEquation(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Calculation cancelled")]
    Cancelled(#[from] Cancelled),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_json::Error),
}

/// Errors raised while building a term tree from construction requests.
/// These are the only hard failures in the core: everything after
/// construction flows through validation issues or invalid values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("{name} expects {expected} argument(s), got {got}")]
    WrongArgCount {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Unbalanced brackets in '{0}'")]
    UnbalancedBrackets(String),

    #[error("Misordered brackets in '{0}'")]
    MisorderedBrackets(String),

    #[error("Empty argument in '{0}'")]
    EmptyArgument(String),

    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Empty term text")]
    EmptyTerm,
}

/// Cooperative-abort marker returned when the cancel token fires
/// mid-evaluation. Control flow, not a failure: the scheduler swallows it
/// at the batch boundary and keeps every result computed before the abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "calculation cancelled")
    }
}

impl std::error::Error for Cancelled {}
