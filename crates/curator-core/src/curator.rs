use curator_lang::Dataset;
use curator_solver::{Algorithm, LpSolver};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constraint::{Constraint, ConstraintSet};
use crate::decode::decode;
use crate::dedup::{Grouping, UnitMatrix};
use crate::error::CurateError;
use crate::features::{build_feature_matrix, SatisfactionMatrix};
use crate::formulate::FormulationKind;
use crate::solve::solve;
use crate::summary::{summarize, Summary};

/// How a run is formulated and solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuratorOptions {
    /// Collapse samples with identical satisfaction signatures before solving
    pub dedup: bool,
    /// Add penalized slack so every constraint can be violated
    pub allow_violations: bool,
    pub formulation: FormulationKind,
    pub algorithm: Algorithm,
}

impl Default for CuratorOptions {
    fn default() -> Self {
        Self {
            dedup: true,
            allow_violations: true,
            formulation: FormulationKind::default(),
            algorithm: Algorithm::default(),
        }
    }
}

impl CuratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_violations(mut self, allow: bool) -> Self {
        self.allow_violations = allow;
        self
    }

    pub fn with_formulation(mut self, formulation: FormulationKind) -> Self {
        self.formulation = formulation;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// Outcome of one successful run.
#[derive(Debug, Clone)]
pub struct Curation {
    /// Inclusion flag per sample, in dataset order
    pub selection: Vec<bool>,
    pub summary: Summary,
    /// Weighted violation the LP relaxation achieved before rounding
    pub theoretical_violation: f64,
    pub solver_message: String,
    pub iterations: usize,
}

impl Curation {
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selection
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect()
    }
}

/// Selects a subset of samples whose predicate counts honor a constraint table.
///
/// The satisfaction matrix is built once; every call to [`Curator::run`]
/// formulates, solves and decodes afresh, so runs are independent.
#[derive(Debug, Clone)]
pub struct Curator {
    matrix: SatisfactionMatrix,
    constraints: ConstraintSet,
    options: CuratorOptions,
}

impl Curator {
    /// Validates `constraints` and evaluates each label as a query over `dataset`.
    pub fn new(dataset: &Dataset, constraints: Vec<Constraint>, options: CuratorOptions) -> Result<Self, CurateError> {
        let constraints = ConstraintSet::new(constraints)?;
        let matrix = build_feature_matrix(dataset, &constraints.labels())?;
        Ok(Self {
            matrix,
            constraints,
            options,
        })
    }

    /// Uses a precomputed matrix whose predicates line up with `constraints`.
    pub fn from_matrix(
        matrix: SatisfactionMatrix,
        constraints: Vec<Constraint>,
        options: CuratorOptions,
    ) -> Result<Self, CurateError> {
        let constraints = ConstraintSet::new(constraints)?;
        if matrix.n_predicates() != constraints.len() {
            return Err(CurateError::DimensionMismatch {
                expected: constraints.len(),
                found: matrix.n_predicates(),
            });
        }
        Ok(Self {
            matrix,
            constraints,
            options,
        })
    }

    pub fn matrix(&self) -> &SatisfactionMatrix {
        &self.matrix
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn options(&self) -> &CuratorOptions {
        &self.options
    }

    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Curation, CurateError> {
        let solver = self.options.algorithm.solver();
        self.run_with_solver(solver.as_ref(), rng)
    }

    /// Same as [`Curator::run`] with a reproducible random source.
    pub fn run_seeded(&self, seed: u64) -> Result<Curation, CurateError> {
        self.run(&mut StdRng::seed_from_u64(seed))
    }

    /// Runs the pipeline with a caller-supplied solver instead of the configured algorithm.
    pub fn run_with_solver<R: Rng + ?Sized>(
        &self,
        solver: &dyn LpSolver,
        rng: &mut R,
    ) -> Result<Curation, CurateError> {
        let grouping = self.options.dedup.then(|| Grouping::from_matrix(&self.matrix));
        let units = match &grouping {
            Some(g) => UnitMatrix::per_group(g, self.matrix.n_predicates()),
            None => UnitMatrix::per_sample(&self.matrix),
        };

        tracing::info!(
            constraints = self.constraints.len(),
            samples = self.matrix.n_samples(),
            units = units.n_units(),
            formulation = %self.options.formulation,
            "curating"
        );
        if let Some(g) = &grouping {
            tracing::debug!(
                groups = g.n_groups(),
                ratio = g.n_groups() as f64 / self.matrix.n_samples().max(1) as f64,
                "deduplicated samples"
            );
        }

        let formulation = self.options.formulation.formulator().formulate(
            &units,
            &self.constraints,
            self.options.allow_violations,
        )?;
        let solution = solve(&formulation, solver)?;
        tracing::info!(message = %solution.message, iterations = solution.iterations, "solved");

        let selection = decode(formulation.unit_values(&solution.values), grouping.as_ref(), rng);
        let summary = summarize(&self.matrix, &self.constraints, &selection);

        let theoretical_violation = solution.objective_value;
        tracing::info!(
            theoretical = theoretical_violation,
            actual = summary.weighted_violation(&self.constraints),
            selected = summary.selected,
            "curation finished"
        );

        Ok(Curation {
            selection,
            summary,
            theoretical_violation,
            solver_message: solution.message,
            iterations: solution.iterations,
        })
    }
}
