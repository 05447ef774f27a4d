use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::Solution;
use crate::LpSolver;

/// Consecutive degenerate pivots tolerated before pricing switches to Bland's rule.
const DEGENERATE_RUN_LIMIT: usize = 50;

/// Two-phase dense-tableau simplex solver
pub struct Solver {
    /// Maximum pivots (both phases together) before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            tolerance: 1e-9,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(message) = problem.validate() {
            return Solution::error(message);
        }

        let mut tableau = self.build_tableau(problem);
        let mut iterations = 0;

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau, &mut iterations) {
                SimplexResult::Optimal => {}
                SimplexResult::Infeasible => {
                    return Solution::infeasible(
                        iterations,
                        "The problem appears to be infeasible.",
                    );
                }
                SimplexResult::IterationLimit => return Solution::iteration_limit(iterations),
                SimplexResult::Unbounded => {
                    return Solution::error("Phase 1 reported an unbounded auxiliary problem.");
                }
            }
        }

        // Phase 2: Optimize
        match self.phase2(&mut tableau, &mut iterations) {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return Solution::unbounded(iterations),
            SimplexResult::IterationLimit => return Solution::iteration_limit(iterations),
            SimplexResult::Infeasible => {
                return Solution::infeasible(iterations, "The problem appears to be infeasible.");
            }
        }

        tracing::debug!(
            rows = tableau.n_rows(),
            columns = tableau.data[0].len() - 1,
            iterations,
            "simplex converged"
        );

        self.extract_solution(&tableau, problem, iterations)
    }

    /// Lays out `problem` in standard form.
    ///
    /// Lower bounds are shifted to zero, finite upper bounds become `<=` rows,
    /// and every row is flipped so that its right-hand side is non-negative.
    fn build_tableau(&self, problem: &LpProblem) -> Tableau {
        let n_vars = problem.num_variables();
        let lower: Vec<f64> = problem.bounds.iter().map(|b| b.lower).collect();

        let mut rows: Vec<(Vec<f64>, ConstraintOp, f64)> = Vec::new();
        for c in &problem.constraints {
            let shift: f64 = c.coefficients.iter().zip(&lower).map(|(a, l)| a * l).sum();
            rows.push((c.coefficients.clone(), c.op, c.rhs - shift));
        }
        for (j, b) in problem.bounds.iter().enumerate() {
            if let Some(upper) = b.upper {
                let mut coefficients = vec![0.0; n_vars];
                coefficients[j] = 1.0;
                rows.push((coefficients, ConstraintOp::Le, upper - b.lower));
            }
        }

        for (coefficients, op, rhs) in &mut rows {
            if *rhs < 0.0 {
                *rhs = -*rhs;
                for a in coefficients.iter_mut() {
                    *a = -*a;
                }
                *op = match *op {
                    ConstraintOp::Le => ConstraintOp::Ge,
                    ConstraintOp::Ge => ConstraintOp::Le,
                    ConstraintOp::Eq => ConstraintOp::Eq,
                };
            }
        }

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, op, _) in &rows {
            match op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let n_rows = rows.len();
        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; n_rows + 1],
            basic_vars: vec![0; n_rows],
            n_vars,
            n_slack,
            n_artificial,
            costs: problem
                .objective
                .coefficients
                .iter()
                .map(|&c| if problem.objective.minimize { c } else { -c })
                .collect(),
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (coefficients, op, rhs)) in rows.into_iter().enumerate() {
            tableau.data[i][..n_vars].copy_from_slice(&coefficients);
            tableau.data[i][total_cols - 1] = rhs;

            match op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau, iterations: &mut usize) -> SimplexResult {
        // Auxiliary objective: minimize the sum of artificial variables
        let n_rows = tableau.n_rows();
        let n_cols = tableau.data[0].len();
        let rhs_col = n_cols - 1;
        let art_start = tableau.artificial_start();
        let rhs_scale = (0..n_rows).map(|i| tableau.data[i][rhs_col]).fold(0.0, f64::max);

        let obj_row = n_rows;
        tableau.data[obj_row].iter_mut().for_each(|v| *v = 0.0);
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[obj_row][j] = 1.0;
        }

        // Price out the basic artificials
        for i in 0..n_rows {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] -= tableau.data[i][j];
                }
            }
        }

        match self.iterate(tableau, rhs_col, iterations) {
            SimplexResult::Optimal => {}
            other => return other,
        }

        let infeasibility = -tableau.data[obj_row][rhs_col];
        if infeasibility > self.tolerance * 1e3 * (1.0 + rhs_scale) {
            tracing::debug!(infeasibility, "phase 1 ended with positive artificial sum");
            return SimplexResult::Infeasible;
        }

        // Drive remaining (zero-level) artificials out of the basis. Rows where
        // no structural or slack column is available are redundant and stay put.
        for i in 0..n_rows {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let mut best: Option<(usize, f64)> = None;
            for j in 0..art_start {
                let magnitude = tableau.data[i][j].abs();
                if magnitude > self.tolerance && best.is_none_or(|(_, m)| magnitude > m) {
                    best = Some((j, magnitude));
                }
            }
            if let Some((col, _)) = best {
                self.pivot(tableau, i, col);
            }
        }

        SimplexResult::Optimal
    }

    fn phase2(&self, tableau: &mut Tableau, iterations: &mut usize) -> SimplexResult {
        let n_rows = tableau.n_rows();
        let n_cols = tableau.data[0].len();
        let obj_row = n_rows;

        tableau.data[obj_row].iter_mut().for_each(|v| *v = 0.0);
        for j in 0..tableau.n_vars {
            tableau.data[obj_row][j] = tableau.costs[j];
        }

        // Make reduced costs of basic variables zero
        for i in 0..n_rows {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[obj_row][basic];
            if ratio.abs() > 0.0 {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        // Exclude artificial variable columns from pivoting
        let exclude_from = tableau.artificial_start();
        self.iterate(tableau, exclude_from, iterations)
    }

    /// Pivots until no column below `allowed_cols` has a negative reduced cost.
    fn iterate(&self, tableau: &mut Tableau, allowed_cols: usize, iterations: &mut usize) -> SimplexResult {
        let rhs_col = tableau.data[0].len() - 1;
        let mut degenerate_run = 0;

        loop {
            if *iterations >= self.max_iterations {
                return SimplexResult::IterationLimit;
            }
            let use_bland = degenerate_run >= DEGENERATE_RUN_LIMIT;
            let Some(pivot_col) = self.find_pivot_column(tableau, allowed_cols, use_bland) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                return SimplexResult::Unbounded;
            };

            if tableau.data[pivot_row][rhs_col].abs() <= self.tolerance {
                degenerate_run += 1;
            } else {
                degenerate_run = 0;
            }

            self.pivot(tableau, pivot_row, pivot_col);
            *iterations += 1;
        }
    }

    fn find_pivot_column(&self, tableau: &Tableau, allowed_cols: usize, use_bland: bool) -> Option<usize> {
        let obj_row = tableau.n_rows();

        if use_bland {
            return (0..allowed_cols).find(|&j| tableau.data[obj_row][j] < -self.tolerance);
        }

        // Most negative reduced cost
        let mut min_val = -self.tolerance;
        let mut min_col = None;
        for j in 0..allowed_cols {
            if tableau.data[obj_row][j] < min_val {
                min_val = tableau.data[obj_row][j];
                min_col = Some(j);
            }
        }
        min_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let n_rows = tableau.n_rows();
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..n_rows {
            let val = tableau.data[i][col];
            if val > self.tolerance {
                let ratio = tableau.data[i][rhs_col].max(0.0) / val;
                let better = match min_row {
                    None => true,
                    Some(r) if (ratio - min_ratio).abs() <= self.tolerance => {
                        tableau.basic_vars[i] < tableau.basic_vars[r]
                    }
                    Some(_) => ratio < min_ratio,
                };
                if better {
                    min_ratio = ratio;
                    min_row = Some(i);
                }
            }
        }

        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;

        // Scale pivot row
        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        // Eliminate column in other rows
        let pivot_row = tableau.data[row].clone();
        for i in 0..n_rows {
            if i != row {
                let factor = tableau.data[i][col];
                if factor != 0.0 {
                    for (v, p) in tableau.data[i].iter_mut().zip(&pivot_row) {
                        *v -= factor * p;
                    }
                }
            }
        }
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem, iterations: usize) -> Solution {
        let n_vars = problem.num_variables();
        let rhs_col = tableau.data[0].len() - 1;

        let mut values: Vec<f64> = problem.bounds.iter().map(|b| b.lower).collect();
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < n_vars {
                values[basic] += tableau.data[i][rhs_col];
            }
        }

        let objective_value = problem.evaluate_objective(&values);
        Solution::optimal(values, objective_value, iterations)
    }
}

impl LpSolver for Solver {
    fn solve(&self, problem: &LpProblem) -> Solution {
        Solver::solve(self, problem)
    }
}

struct Tableau {
    /// Constraint rows followed by the objective (reduced cost) row
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    /// Minimization costs of the structural variables
    costs: Vec<f64>,
}

impl Tableau {
    fn n_rows(&self) -> usize {
        self.basic_vars.len()
    }

    fn artificial_start(&self) -> usize {
        self.n_vars + self.n_slack
    }
}

enum SimplexResult {
    Optimal,
    Unbounded,
    Infeasible,
    IterationLimit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{LpProblem, VariableBounds};
    use crate::solution::SolutionStatus;

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        //   x, y >= 0
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false); // maximize
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 11.0).abs() < 1e-6, "obj = {} (expected 11)", solution.objective_value);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x, y in [0, 3]
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.set_bounds(0, VariableBounds::new(0.0, Some(3.0)));
        problem.set_bounds(1, VariableBounds::new(0.0, Some(3.0)));
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 9.0).abs() < 1e-6, "obj = {} (expected 9)", solution.objective_value);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_negative_rhs_le_row() {
        // -x - y <= -3 (i.e. x + y >= 3), minimize x + 2y with x <= 2
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 2.0], true);
        problem.set_bounds(0, VariableBounds::new(0.0, Some(2.0)));
        problem.add_constraint("cover", vec![-1.0, -1.0], ConstraintOp::Le, -3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 2.0).abs() < 1e-6);
        assert!((solution.values[1] - 1.0).abs() < 1e-6);
        assert!((solution.objective_value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_equality_and_slack() {
        // x0 + x1 - y = 0, y >= 3 - s, minimize s, x in [0,1]
        // Best y is 2, so s = 1.
        let mut problem = LpProblem::new(vec![]);
        let x0 = problem.add_variable("x0", VariableBounds::unit(), 0.0);
        let x1 = problem.add_variable("x1", VariableBounds::unit(), 0.0);
        let y = problem.add_variable("y", VariableBounds::non_negative(), 0.0);
        let s = problem.add_variable("s", VariableBounds::non_negative(), 1.0);

        let mut eq = vec![0.0; 4];
        eq[x0] = 1.0;
        eq[x1] = 1.0;
        eq[y] = -1.0;
        problem.add_constraint("count", eq, ConstraintOp::Eq, 0.0);

        let mut lb = vec![0.0; 4];
        lb[y] = -1.0;
        lb[s] = -1.0;
        problem.add_constraint("min", lb, ConstraintOp::Le, -3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[y] - 2.0).abs() < 1e-6, "y = {}", solution.values[y]);
        assert!((solution.objective_value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lower_bound_shift() {
        // minimize x with x in [2, 5] and x >= 1
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.set_bounds(0, VariableBounds::new(2.0, Some(5.0)));
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_redundant_equalities() {
        // The second row duplicates the first; phase 1 leaves a zero artificial behind.
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 1.0], true);
        problem.add_constraint("a", vec![1.0, 1.0], ConstraintOp::Eq, 2.0);
        problem.add_constraint("b", vec![2.0, 2.0], ConstraintOp::Eq, 4.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] + solution.values[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_unbounded() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], false);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 1.0);

        let solution = Solver::new().solve(&problem);
        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_malformed_problem_is_error() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.add_constraint("bad", vec![1.0, 2.0], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem);
        assert_eq!(solution.status, SolutionStatus::Error);
    }

    #[test]
    fn test_iteration_limit() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![-1.0, -1.0], true);
        problem.add_constraint("sum", vec![1.0, 2.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x", vec![3.0, 1.0], ConstraintOp::Le, 6.0);

        let solution = Solver::new().with_max_iterations(0).solve(&problem);
        assert_eq!(solution.status, SolutionStatus::IterationLimit);
    }
}
