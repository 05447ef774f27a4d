/// The result of solving an LP problem
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable (empty unless a point was found)
    pub values: Vec<f64>,
    /// Optimal objective value
    pub objective_value: f64,
    /// Pivots (simplex) or Newton steps (interior point) performed
    pub iterations: usize,
    /// Human-readable status message
    pub message: String,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The iteration budget ran out before convergence
    IterationLimit,
    /// Solver encountered an error
    Error,
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Infeasible => write!(f, "infeasible"),
            SolutionStatus::Unbounded => write!(f, "unbounded"),
            SolutionStatus::IterationLimit => write!(f, "iteration limit"),
            SolutionStatus::Error => write!(f, "error"),
        }
    }
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            iterations,
            message: "Optimization terminated successfully.".to_string(),
        }
    }

    pub fn infeasible(iterations: usize, message: impl Into<String>) -> Self {
        Self::failed(SolutionStatus::Infeasible, f64::INFINITY, iterations, message)
    }

    pub fn unbounded(iterations: usize) -> Self {
        Self::failed(
            SolutionStatus::Unbounded,
            f64::NEG_INFINITY,
            iterations,
            "The problem is unbounded.",
        )
    }

    pub fn iteration_limit(iterations: usize) -> Self {
        Self::failed(
            SolutionStatus::IterationLimit,
            f64::NAN,
            iterations,
            format!("Iteration limit reached after {} iterations.", iterations),
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::failed(SolutionStatus::Error, f64::NAN, 0, message)
    }

    fn failed(status: SolutionStatus, objective_value: f64, iterations: usize, message: impl Into<String>) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value,
            iterations,
            message: message.into(),
        }
    }
}
