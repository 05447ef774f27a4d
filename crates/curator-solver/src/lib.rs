mod algorithm;
mod interior;
mod problem;
mod simplex;
mod solution;

pub use algorithm::{Algorithm, UnknownAlgorithm};
pub use interior::InteriorPointSolver;
pub use problem::{Constraint, ConstraintOp, LpProblem, Objective, VariableBounds};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};

/// Anything that can solve an [`LpProblem`].
pub trait LpSolver {
    fn solve(&self, problem: &LpProblem) -> Solution;
}
