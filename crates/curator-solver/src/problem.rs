/// Represents a linear programming problem
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variable names
    pub variables: Vec<String>,
    /// Per-variable bounds, parallel to `variables`
    pub bounds: Vec<VariableBounds>,
    /// Objective function coefficients (costs)
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

/// Box bounds of a single variable. `upper: None` means unbounded above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableBounds {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl VariableBounds {
    pub fn new(lower: f64, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    /// `[0, 1]`
    pub fn unit() -> Self {
        Self::new(0.0, Some(1.0))
    }

    /// `[0, inf)`
    pub fn non_negative() -> Self {
        Self::new(0.0, None)
    }
}

impl Default for VariableBounds {
    fn default() -> Self {
        Self::non_negative()
    }
}

impl LpProblem {
    /// Creates a minimization problem over non-negative variables with zero costs.
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            bounds: vec![VariableBounds::non_negative(); n],
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    /// Appends a variable and returns its column index.
    ///
    /// Constraints added before this call are padded with a zero coefficient.
    pub fn add_variable(&mut self, name: impl Into<String>, bounds: VariableBounds, cost: f64) -> usize {
        self.variables.push(name.into());
        self.bounds.push(bounds);
        self.objective.coefficients.push(cost);
        for c in &mut self.constraints {
            c.coefficients.push(0.0);
        }
        self.variables.len() - 1
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn set_bounds(&mut self, variable: usize, bounds: VariableBounds) {
        self.bounds[variable] = bounds;
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value of `values` under this problem's cost vector.
    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        self.objective
            .coefficients
            .iter()
            .zip(values)
            .map(|(c, x)| c * x)
            .sum()
    }

    /// Checks shapes and numeric sanity; returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.num_variables();
        if self.bounds.len() != n {
            return Err(format!("{} bounds given for {} variables", self.bounds.len(), n));
        }
        if self.objective.coefficients.len() != n {
            return Err(format!(
                "objective has {} coefficients for {} variables",
                self.objective.coefficients.len(),
                n
            ));
        }
        if self.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("objective has a non-finite coefficient".to_string());
        }
        for (j, b) in self.bounds.iter().enumerate() {
            let upper_ok = b.upper.is_none_or(|u| u.is_finite() && u >= b.lower);
            if !b.lower.is_finite() || !upper_ok {
                return Err(format!("invalid bounds on variable {}: {:?}", self.variables[j], b));
            }
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(format!(
                    "constraint {} has {} coefficients for {} variables",
                    c.name,
                    c.coefficients.len(),
                    n
                ));
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|a| !a.is_finite()) {
                return Err(format!("constraint {} has non-finite data", c.name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_variable_pads_constraints() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.add_constraint("c", vec![1.0], ConstraintOp::Le, 2.0);
        let s = problem.add_variable("s", VariableBounds::non_negative(), 3.0);

        assert_eq!(s, 1);
        assert_eq!(problem.constraints[0].coefficients, vec![1.0, 0.0]);
        assert_eq!(problem.objective.coefficients, vec![0.0, 3.0]);
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.add_constraint("short", vec![1.0], ConstraintOp::Le, 1.0);
        assert!(problem.validate().is_err());

        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_bounds(0, VariableBounds::new(2.0, Some(1.0)));
        assert!(problem.validate().is_err());
    }
}
