use curator_solver::{LpSolver, Solution, SolutionStatus};

use crate::error::CurateError;
use crate::formulate::Formulation;

/// Runs `solver` on a formulation and turns every non-optimal outcome into an error.
///
/// Returns the optimal solution; its objective value is the minimal total
/// weighted violation the relaxation can achieve.
pub fn solve(formulation: &Formulation, solver: &dyn LpSolver) -> Result<Solution, CurateError> {
    let solution = solver.solve(&formulation.problem);
    tracing::debug!(
        status = %solution.status,
        iterations = solution.iterations,
        "solver finished"
    );

    match solution.status {
        SolutionStatus::Optimal => Ok(solution),
        SolutionStatus::Infeasible if formulation.slack_columns.is_none() => {
            tracing::warn!(message = %solution.message, "no feasible selection");
            Err(CurateError::Infeasible(solution.message))
        }
        status => {
            tracing::warn!(%status, message = %solution.message, "solver failed");
            Err(CurateError::Solver {
                status,
                message: solution.message,
            })
        }
    }
}
