use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::Solution;
use crate::LpSolver;

/// Iterates larger than this are treated as divergence.
const DIVERGENCE_LIMIT: f64 = 1e12;

/// Fraction of the distance to the boundary taken per step.
const STEP_DAMPING: f64 = 0.99;

/// Primal-dual path-following (Mehrotra predictor-corrector) LP solver.
///
/// Faster than [`crate::Solver`] on large problems, but returns an interior
/// point of the optimal face rather than a vertex, accurate to `tolerance`.
pub struct InteriorPointSolver {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for InteriorPointSolver {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-8,
        }
    }
}

impl InteriorPointSolver {
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

    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(message) = problem.validate() {
            return Solution::error(message);
        }

        let sf = StandardForm::from_problem(problem);
        let m = sf.b.len();
        let n = sf.c.len();

        if m == 0 {
            // Only sign constraints: every cost must be non-negative.
            if sf.c.iter().any(|&c| c < -self.tolerance) {
                return Solution::unbounded(0);
            }
            let values = sf.lower.clone();
            let objective_value = problem.evaluate_objective(&values);
            return Solution::optimal(values, objective_value, 0);
        }

        let Some((mut x, mut y, mut s)) = self.starting_point(&sf) else {
            return Solution::error("Normal equations could not be factored at the starting point.");
        };

        let b_norm = norm(&sf.b);
        let c_norm = norm(&sf.c);
        let mut primal_residual = f64::INFINITY;

        for iteration in 0..self.max_iterations {
            let ax = sf.mul(&x);
            let rp: Vec<f64> = sf.b.iter().zip(&ax).map(|(b, v)| b - v).collect();
            let aty = sf.mul_transpose(&y);
            let rd: Vec<f64> = (0..n).map(|j| sf.c[j] - aty[j] - s[j]).collect();

            let xs = dot(&x, &s);
            let mu = xs / n as f64;
            let cx = dot(&sf.c, &x);

            primal_residual = norm(&rp) / (1.0 + b_norm);
            let dual_residual = norm(&rd) / (1.0 + c_norm);
            let gap = xs / (1.0 + cx.abs());

            if primal_residual < self.tolerance && dual_residual < self.tolerance && gap < self.tolerance {
                tracing::debug!(iterations = iteration, gap, "interior point converged");
                let values: Vec<f64> = (0..sf.n_structural).map(|j| sf.lower[j] + x[j]).collect();
                let objective_value = problem.evaluate_objective(&values);
                return Solution::optimal(values, objective_value, iteration);
            }

            // Diverging primal iterates only mean unboundedness once the rows are satisfied
            if max_abs(&x) > DIVERGENCE_LIMIT {
                if primal_residual > self.residual_limit() {
                    return Solution::infeasible(
                        iteration,
                        "Primal iterates diverged without satisfying the constraints; the problem appears to be infeasible.",
                    );
                }
                return Solution::unbounded(iteration);
            }
            if max_abs(&y) > DIVERGENCE_LIMIT || max_abs(&s) > DIVERGENCE_LIMIT {
                return Solution::infeasible(iteration, "Dual iterates diverged; the problem appears to be infeasible.");
            }

            let d: Vec<f64> = (0..n).map(|j| x[j] / s[j]).collect();
            let Some(factor) = cholesky(sf.normal_matrix(&d)) else {
                break;
            };

            // Predictor (affine scaling) direction
            let rc_aff: Vec<f64> = (0..n).map(|j| -x[j] * s[j]).collect();
            let (dx_aff, _, ds_aff) = sf.newton_direction(&factor, &d, &s, &rp, &rd, &rc_aff);

            let alpha_p = max_step(&x, &dx_aff);
            let alpha_d = max_step(&s, &ds_aff);
            let mu_aff = (0..n)
                .map(|j| (x[j] + alpha_p * dx_aff[j]) * (s[j] + alpha_d * ds_aff[j]))
                .sum::<f64>()
                / n as f64;
            let sigma = (mu_aff / mu).powi(3).clamp(0.0, 1.0);

            // Corrector with centering
            let rc: Vec<f64> = (0..n)
                .map(|j| -x[j] * s[j] - dx_aff[j] * ds_aff[j] + sigma * mu)
                .collect();
            let (dx, dy, ds) = sf.newton_direction(&factor, &d, &s, &rp, &rd, &rc);

            let alpha_p = (STEP_DAMPING * max_step(&x, &dx)).min(1.0);
            let alpha_d = (STEP_DAMPING * max_step(&s, &ds)).min(1.0);

            for j in 0..n {
                x[j] += alpha_p * dx[j];
                s[j] += alpha_d * ds[j];
            }
            for i in 0..m {
                y[i] += alpha_d * dy[i];
            }

            if x.iter().chain(&s).chain(&y).any(|v| !v.is_finite()) {
                break;
            }
        }

        if primal_residual > self.residual_limit() {
            Solution::infeasible(
                self.max_iterations,
                format!(
                    "Primal residual {:.3e} did not vanish; the problem appears to be infeasible.",
                    primal_residual
                ),
            )
        } else {
            Solution::iteration_limit(self.max_iterations)
        }
    }

    /// Scaled primal residual above which the rows count as violated.
    fn residual_limit(&self) -> f64 {
        self.tolerance.sqrt() * 1e-2
    }

    /// Mehrotra's heuristic starting point.
    fn starting_point(&self, sf: &StandardForm) -> Option<(Vec<f64>, Vec<f64>, Vec<f64>)> {
        let n = sf.c.len();
        let factor = cholesky(sf.normal_matrix(&vec![1.0; n]))?;

        let x_tilde = sf.mul_transpose(&factor.solve(&sf.b));
        let y = factor.solve(&sf.mul(&sf.c));
        let aty = sf.mul_transpose(&y);
        let s_tilde: Vec<f64> = (0..n).map(|j| sf.c[j] - aty[j]).collect();

        let min_x = x_tilde.iter().copied().fold(f64::INFINITY, f64::min);
        let min_s = s_tilde.iter().copied().fold(f64::INFINITY, f64::min);
        let dx = (-1.5 * min_x).max(0.0);
        let ds = (-1.5 * min_s).max(0.0);

        let mut x: Vec<f64> = x_tilde.iter().map(|v| v + dx).collect();
        let mut s: Vec<f64> = s_tilde.iter().map(|v| v + ds).collect();

        let xs = dot(&x, &s);
        let sum_x: f64 = x.iter().sum();
        let sum_s: f64 = s.iter().sum();
        let shift_x = if sum_s > 0.0 { 0.5 * xs / sum_s } else { 0.0 };
        let shift_s = if sum_x > 0.0 { 0.5 * xs / sum_x } else { 0.0 };

        for v in &mut x {
            *v += shift_x;
            if !(v.is_finite() && *v > 0.0) {
                *v = 1.0;
            }
        }
        for v in &mut s {
            *v += shift_s;
            if !(v.is_finite() && *v > 0.0) {
                *v = 1.0;
            }
        }

        Some((x, y, s))
    }
}

impl LpSolver for InteriorPointSolver {
    fn solve(&self, problem: &LpProblem) -> Solution {
        InteriorPointSolver::solve(self, problem)
    }
}

/// `min c'x  s.t.  Ax = b, x >= 0`, with the original variables first.
struct StandardForm {
    /// Row-major `m x n` matrix
    a: Vec<Vec<f64>>,
    /// Non-zero `(row, value)` entries of each column
    columns: Vec<Vec<(usize, f64)>>,
    b: Vec<f64>,
    c: Vec<f64>,
    n_structural: usize,
    lower: Vec<f64>,
}

impl StandardForm {
    fn from_problem(problem: &LpProblem) -> Self {
        let n_vars = problem.num_variables();
        let sign = if problem.objective.minimize { 1.0 } else { -1.0 };
        let lower: Vec<f64> = problem.bounds.iter().map(|b| b.lower).collect();

        let n_row_slack = problem
            .constraints
            .iter()
            .filter(|c| c.op != ConstraintOp::Eq)
            .count();
        let upper: Vec<(usize, f64)> = problem
            .bounds
            .iter()
            .enumerate()
            .filter_map(|(j, b)| b.upper.map(|u| (j, u - b.lower)))
            .collect();

        let n = n_vars + n_row_slack + upper.len();
        let m = problem.num_constraints() + upper.len();

        let mut a = vec![vec![0.0; n]; m];
        let mut b = vec![0.0; m];
        let mut c = vec![0.0; n];

        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            c[j] = sign * coef;
        }

        let mut slack_idx = n_vars;
        for (i, constraint) in problem.constraints.iter().enumerate() {
            a[i][..n_vars].copy_from_slice(&constraint.coefficients);
            let shift: f64 = constraint.coefficients.iter().zip(&lower).map(|(a, l)| a * l).sum();
            b[i] = constraint.rhs - shift;
            match constraint.op {
                ConstraintOp::Le => {
                    a[i][slack_idx] = 1.0;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    a[i][slack_idx] = -1.0;
                    slack_idx += 1;
                }
                ConstraintOp::Eq => {}
            }
        }

        let first_bound_row = problem.num_constraints();
        for (k, &(j, width)) in upper.iter().enumerate() {
            let row = first_bound_row + k;
            a[row][j] = 1.0;
            a[row][n_vars + n_row_slack + k] = 1.0;
            b[row] = width;
        }

        let mut columns = vec![Vec::new(); n];
        for (i, row) in a.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    columns[j].push((i, v));
                }
            }
        }

        Self {
            a,
            columns,
            b,
            c,
            n_structural: n_vars,
            lower,
        }
    }

    fn mul(&self, x: &[f64]) -> Vec<f64> {
        self.a.iter().map(|row| dot(row, x)).collect()
    }

    fn mul_transpose(&self, y: &[f64]) -> Vec<f64> {
        self.columns
            .iter()
            .map(|col| col.iter().map(|&(i, v)| v * y[i]).sum())
            .collect()
    }

    /// `A diag(d) A'`
    fn normal_matrix(&self, d: &[f64]) -> Vec<Vec<f64>> {
        let m = self.b.len();
        let mut out = vec![vec![0.0; m]; m];
        for (col, &dj) in self.columns.iter().zip(d) {
            for &(i, vi) in col {
                for &(k, vk) in col {
                    if k <= i {
                        out[i][k] += dj * vi * vk;
                    }
                }
            }
        }
        out
    }

    /// Solves the reduced Newton system for complementarity target `rc`.
    fn newton_direction(
        &self,
        factor: &Cholesky,
        d: &[f64],
        s: &[f64],
        rp: &[f64],
        rd: &[f64],
        rc: &[f64],
    ) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let n = d.len();
        let w: Vec<f64> = (0..n).map(|j| d[j] * rd[j] - rc[j] / s[j]).collect();
        let aw = self.mul(&w);
        let rhs: Vec<f64> = rp.iter().zip(&aw).map(|(r, v)| r + v).collect();

        let dy = factor.solve(&rhs);
        let aty = self.mul_transpose(&dy);
        let ds: Vec<f64> = (0..n).map(|j| rd[j] - aty[j]).collect();
        let dx: Vec<f64> = (0..n).map(|j| rc[j] / s[j] - d[j] * ds[j]).collect();
        (dx, dy, ds)
    }
}

/// Lower-triangular Cholesky factor.
struct Cholesky {
    l: Vec<Vec<f64>>,
}

impl Cholesky {
    fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.l.len();
        let mut z = rhs.to_vec();
        for i in 0..n {
            let mut v = z[i];
            for k in 0..i {
                v -= self.l[i][k] * z[k];
            }
            z[i] = v / self.l[i][i];
        }
        for i in (0..n).rev() {
            let mut v = z[i];
            for k in (i + 1)..n {
                v -= self.l[k][i] * z[k];
            }
            z[i] = v / self.l[i][i];
        }
        z
    }
}

/// Factors a symmetric matrix given by its lower triangle.
///
/// Pivots that collapse (linearly dependent rows) are replaced by a huge value,
/// which zeroes the corresponding component of every solve.
fn cholesky(mut m: Vec<Vec<f64>>) -> Option<Cholesky> {
    let n = m.len();
    let max_diag = (0..n).map(|i| m[i][i].abs()).fold(0.0, f64::max).max(1.0);
    let tiny = 1e-14 * max_diag;

    for j in 0..n {
        let mut diag = m[j][j];
        for k in 0..j {
            diag -= m[j][k] * m[j][k];
        }
        if !diag.is_finite() {
            return None;
        }
        if diag <= tiny {
            diag = 1e128;
        }
        let l_jj = diag.sqrt();
        m[j][j] = l_jj;

        for i in (j + 1)..n {
            let mut v = m[i][j];
            for k in 0..j {
                v -= m[i][k] * m[j][k];
            }
            m[i][j] = v / l_jj;
        }
    }

    Some(Cholesky { l: m })
}

fn max_step(v: &[f64], dv: &[f64]) -> f64 {
    v.iter()
        .zip(dv)
        .filter(|&(_, &d)| d < 0.0)
        .map(|(&vi, &d)| -vi / d)
        .fold(1.0, f64::min)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::VariableBounds;
    use crate::solution::SolutionStatus;

    #[test]
    fn test_simple_maximization() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = InteriorPointSolver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal, "{}", solution.message);
        assert!((solution.values[0] - 3.0).abs() < 1e-5, "x = {}", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-5, "y = {}", solution.values[1]);
        assert!((solution.objective_value - 11.0).abs() < 1e-5);
    }

    #[test]
    fn test_bounded_minimization() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.set_bounds(0, VariableBounds::new(0.0, Some(3.0)));
        problem.set_bounds(1, VariableBounds::new(0.0, Some(3.0)));
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);

        let solution = InteriorPointSolver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal, "{}", solution.message);
        assert!((solution.objective_value - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_equality_with_slack_penalty() {
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

        let solution = InteriorPointSolver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal, "{}", solution.message);
        assert!((solution.objective_value - 1.0).abs() < 1e-5);
        assert!((solution.values[y] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_infeasible() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = InteriorPointSolver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_infeasible_with_bounded_variables() {
        // Zero-cost [0, 1] variables whose scaled sums must reach 6 but cannot exceed 4
        let mut problem = LpProblem::new(vec![]);
        for name in ["x0", "x1", "x2"] {
            problem.add_variable(name, VariableBounds::unit(), 0.0);
        }
        problem.add_constraint("a:max", vec![0.0, 0.0, 4.0], ConstraintOp::Le, 10.0);
        problem.add_constraint("b:max", vec![0.0, 4.0, 0.0], ConstraintOp::Le, 10.0);
        problem.add_constraint("a:min", vec![0.0, 0.0, -4.0], ConstraintOp::Le, -6.0);
        problem.add_constraint("b:min", vec![0.0, -4.0, 0.0], ConstraintOp::Le, -6.0);

        let solution = InteriorPointSolver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible, "{}", solution.message);
    }

    #[test]
    fn test_no_constraints() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.set_bounds(0, VariableBounds::new(1.5, None));

        let solution = InteriorPointSolver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.values, vec![1.5]);
    }

    #[test]
    fn test_cholesky_solves_spd_system() {
        // [[4, 2], [2, 3]] x = [2, 1]  =>  x = [0.5, 0]
        let factor = cholesky(vec![vec![4.0, 0.0], vec![2.0, 3.0]]).unwrap();
        let x = factor.solve(&[2.0, 1.0]);
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }
}
