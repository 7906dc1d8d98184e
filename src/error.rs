use thiserror::Error;

/// Failure of an objective, constraint or derivative evaluation at a point,
/// e.g. a domain violation such as the logarithm of a negative number.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct EvaluationError(pub String);

impl EvaluationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<String> for EvaluationError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

impl From<&str> for EvaluationError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

/// Fatal errors of an SQP solve.
#[derive(Error, Debug)]
pub enum SqpError {
    /// Inconsistent dimensions, bounds or options.
    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    /// An evaluation outside of the line search failed.
    #[error("{what} failed: {source}")]
    Evaluation {
        what: &'static str,
        #[source]
        source: EvaluationError,
    },

    /// The QP subproblem could not be solved.
    #[error("QP solve failed: {0}")]
    QpSolve(String),
}

pub type SqpResult<T> = Result<T, SqpError>;
