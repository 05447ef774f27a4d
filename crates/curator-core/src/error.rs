use curator_lang::EvalError;
use curator_solver::SolutionStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurateError {
    #[error("Query '{label}' failed: {source}")]
    Predicate {
        label: String,
        #[source]
        source: EvalError,
    },
    #[error("Duplicate constraint label: {0}")]
    DuplicateLabel(String),
    #[error("Constraint {index} ('{label}') has an invalid penalty {value}; penalties must be finite and >= 0")]
    InvalidPenalty { index: usize, label: String, value: f64 },
    #[error("Constraint {index} ('{label}') has a non-finite bound")]
    NonFiniteBound { index: usize, label: String },
    #[error("Constraint {index} ('{label}') is relative but its {bound} fraction {value} is outside [0, 1]")]
    FractionOutOfRange {
        index: usize,
        label: String,
        bound: &'static str,
        value: f64,
    },
    #[error("Constraint {index} ('{label}') references unknown constraint {target}")]
    UnknownReference { index: usize, label: String, target: usize },
    #[error("Constraint {index} ('{label}') references itself")]
    SelfReference { index: usize, label: String },
    #[error("Circular reference detected: {0}")]
    CyclicReference(String),
    #[error("Satisfaction matrix has {found} predicates but {expected} constraints were given")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("No feasible selection exists: {0}")]
    Infeasible(String),
    #[error("Solver failed ({status}): {message}")]
    Solver { status: SolutionStatus, message: String },
}
