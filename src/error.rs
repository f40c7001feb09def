use thiserror::Error;

/// Errors raised while evaluating a formula tree.
///
/// Evaluation happens lazily on every read of a computed cell, so these
/// surface from whatever call triggered the read (a bulk range read, the
/// serializer, or an update cycle).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("division by zero")]
    DivideByZero,

    #[error("non-numeric operand: {found}")]
    NonNumeric { found: String },

    #[error("cyclic formula reference through cell ({x}, {y})")]
    CyclicFormula { x: usize, y: usize },
}

/// Errors raised by coordinate addressing and bulk range access.
#[derive(Debug, Error)]
pub enum GridError {
    /// The field path, slice pattern, or assigned value type does not match
    /// the grid's fixed addressing schema.
    #[error("invalid addressing: {0}")]
    InvalidAddressing(String),

    /// A nested-sequence assignment does not match the target range extents.
    #[error("shape mismatch: range is {expected_x}x{expected_y}, value is {got_x}x{got_y}")]
    ShapeMismatch {
        expected_x: usize,
        expected_y: usize,
        got_x: usize,
        got_y: usize,
    },

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Errors raised while starting or running the sync server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// One of the two listener ports could not be bound. `channel` names the
    /// failing channel ("http" or "push") so startup reports which one.
    #[error("failed to bind {channel} channel: {source}")]
    Bind {
        channel: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] EvalError),
}
