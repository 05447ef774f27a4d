use std::str::FromStr;

use curator_solver::{ConstraintOp, LpProblem, VariableBounds};

use crate::bounds::{normalize, Basis};
use crate::constraint::ConstraintSet;
use crate::dedup::UnitMatrix;
use crate::error::CurateError;

/// An LP over selection intensities, ready for a solver.
///
/// Columns `0..n_units` are the per-unit selection intensities in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub problem: LpProblem,
    pub n_units: usize,
    /// Number of constraints encoded; each contributes several LP rows
    pub n_constraints: usize,
    /// Column of each constraint's slack variable; `None` when violations are disallowed
    pub slack_columns: Option<Vec<usize>>,
}

impl Formulation {
    /// Selection intensities from a solver's value vector.
    pub fn unit_values<'a>(&self, values: &'a [f64]) -> &'a [f64] {
        &values[..self.n_units]
    }

    /// Per-constraint slack from a solver's value vector (all zero without slack).
    pub fn slack_values(&self, values: &[f64]) -> Vec<f64> {
        match &self.slack_columns {
            Some(cols) => cols.iter().map(|&c| values[c]).collect(),
            None => vec![0.0; self.n_constraints],
        }
    }
}

/// Encodes a unit matrix and constraint table as an LP that minimizes total
/// weighted violation.
pub trait Formulate {
    fn formulate(
        &self,
        units: &UnitMatrix,
        constraints: &ConstraintSet,
        allow_violations: bool,
    ) -> Result<Formulation, CurateError>;
}

/// Normalizes relative bounds against target bounds, then bounds each
/// constraint's count directly: `min - s <= A x <= max + s`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsoluteBoundaries;

/// Introduces a count variable `y_j = A_j x` per constraint so that relative
/// bounds are enforced against the solved count of the referenced constraint:
/// `min_j y_k - s <= y_j <= max_j y_k + s`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeBoundaries;

impl Formulate for AbsoluteBoundaries {
    fn formulate(
        &self,
        units: &UnitMatrix,
        constraints: &ConstraintSet,
        allow_violations: bool,
    ) -> Result<Formulation, CurateError> {
        check_dimensions(units, constraints)?;
        let bounds = normalize(constraints, Basis::Targets);

        let mut problem = LpProblem::new(Vec::new());
        add_unit_variables(&mut problem, units);
        let slack_columns = allow_violations.then(|| add_slack_variables(&mut problem, constraints));
        let n_vars = problem.num_variables();

        // A x - s <= max
        for (j, c) in constraints.iter().enumerate() {
            let mut coefficients = vec![0.0; n_vars];
            coefficients[..units.n_units()].copy_from_slice(units.row(j));
            if let Some(cols) = &slack_columns {
                coefficients[cols[j]] = -1.0;
            }
            problem.add_constraint(format!("{}:max", c.label), coefficients, ConstraintOp::Le, bounds[j].max as f64);
        }

        // -A x - s <= -min
        for (j, c) in constraints.iter().enumerate() {
            let mut coefficients = vec![0.0; n_vars];
            for (dst, &a) in coefficients.iter_mut().zip(units.row(j)) {
                *dst = -a;
            }
            if let Some(cols) = &slack_columns {
                coefficients[cols[j]] = -1.0;
            }
            problem.add_constraint(format!("{}:min", c.label), coefficients, ConstraintOp::Le, -(bounds[j].min as f64));
        }

        tracing::debug!(
            formulation = "absolute",
            variables = problem.num_variables(),
            rows = problem.num_constraints(),
            "built LP"
        );

        Ok(Formulation {
            problem,
            n_units: units.n_units(),
            n_constraints: constraints.len(),
            slack_columns,
        })
    }
}

impl Formulate for RelativeBoundaries {
    fn formulate(
        &self,
        units: &UnitMatrix,
        constraints: &ConstraintSet,
        allow_violations: bool,
    ) -> Result<Formulation, CurateError> {
        check_dimensions(units, constraints)?;

        let mut problem = LpProblem::new(Vec::new());
        add_unit_variables(&mut problem, units);
        let count_columns: Vec<usize> = constraints
            .iter()
            .map(|c| problem.add_variable(format!("y_{}", c.label), VariableBounds::non_negative(), 0.0))
            .collect();
        let slack_columns = allow_violations.then(|| add_slack_variables(&mut problem, constraints));
        let n_vars = problem.num_variables();

        // A x - y = 0
        for (j, c) in constraints.iter().enumerate() {
            let mut coefficients = vec![0.0; n_vars];
            coefficients[..units.n_units()].copy_from_slice(units.row(j));
            coefficients[count_columns[j]] = -1.0;
            problem.add_constraint(format!("{}:count", c.label), coefficients, ConstraintOp::Eq, 0.0);
        }

        // Upper rows: y_j - s_j <= max_j, or y_j - max_j y_k - s_j <= 0
        for (j, c) in constraints.iter().enumerate() {
            let mut coefficients = vec![0.0; n_vars];
            coefficients[count_columns[j]] = 1.0;
            let rhs = match c.index_ref {
                Some(k) => {
                    coefficients[count_columns[k]] = -c.max;
                    0.0
                }
                None => c.max,
            };
            if let Some(cols) = &slack_columns {
                coefficients[cols[j]] = -1.0;
            }
            problem.add_constraint(format!("{}:max", c.label), coefficients, ConstraintOp::Le, rhs);
        }

        // Lower rows: -y_j - s_j <= -min_j, or -y_j + min_j y_k - s_j <= 0
        for (j, c) in constraints.iter().enumerate() {
            let mut coefficients = vec![0.0; n_vars];
            coefficients[count_columns[j]] = -1.0;
            let rhs = match c.index_ref {
                Some(k) => {
                    coefficients[count_columns[k]] = c.min;
                    0.0
                }
                None => -c.min,
            };
            if let Some(cols) = &slack_columns {
                coefficients[cols[j]] = -1.0;
            }
            problem.add_constraint(format!("{}:min", c.label), coefficients, ConstraintOp::Le, rhs);
        }

        tracing::debug!(
            formulation = "relative",
            variables = problem.num_variables(),
            rows = problem.num_constraints(),
            "built LP"
        );

        Ok(Formulation {
            problem,
            n_units: units.n_units(),
            n_constraints: constraints.len(),
            slack_columns,
        })
    }
}

fn check_dimensions(units: &UnitMatrix, constraints: &ConstraintSet) -> Result<(), CurateError> {
    if units.n_predicates() != constraints.len() {
        return Err(CurateError::DimensionMismatch {
            expected: constraints.len(),
            found: units.n_predicates(),
        });
    }
    Ok(())
}

fn add_unit_variables(problem: &mut LpProblem, units: &UnitMatrix) {
    for u in 0..units.n_units() {
        problem.add_variable(format!("x{}", u), VariableBounds::unit(), 0.0);
    }
}

fn add_slack_variables(problem: &mut LpProblem, constraints: &ConstraintSet) -> Vec<usize> {
    constraints
        .iter()
        .map(|c| {
            problem.add_variable(
                format!("s_{}", c.label),
                VariableBounds::non_negative(),
                c.penalty_per_violation,
            )
        })
        .collect()
}

/// Which encoding to use.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormulationKind {
    Absolute,
    #[default]
    Relative,
}

impl FormulationKind {
    pub fn formulator(self) -> Box<dyn Formulate> {
        match self {
            FormulationKind::Absolute => Box::new(AbsoluteBoundaries),
            FormulationKind::Relative => Box::new(RelativeBoundaries),
        }
    }
}

impl std::fmt::Display for FormulationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormulationKind::Absolute => write!(f, "absolute"),
            FormulationKind::Relative => write!(f, "relative"),
        }
    }
}

impl FromStr for FormulationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "absolute" | "abs" => Ok(FormulationKind::Absolute),
            "relative" | "rel" => Ok(FormulationKind::Relative),
            _ => Err(format!("Unknown formulation '{}' (expected absolute or relative)", s)),
        }
    }
}
