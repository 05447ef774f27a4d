//! Constraint-driven sample curation.
//!
//! Each constraint pairs a query with `[min, max]` bounds on how many selected
//! samples must satisfy it, either as counts or as fractions of another
//! constraint's count. The selection problem is relaxed to an LP whose slack
//! variables charge a penalty per unit of violation, solved, and rounded back
//! to a concrete subset.

mod bounds;
mod constraint;
mod curator;
mod decode;
mod dedup;
mod error;
mod features;
mod formulate;
mod solve;
mod summary;

pub use bounds::{normalize, round_count, AbsoluteBounds, Basis};
pub use constraint::{Constraint, ConstraintSet, DEFAULT_PENALTY};
pub use curator::{Curation, Curator, CuratorOptions};
pub use decode::{decode, group_counts};
pub use dedup::{Grouping, UnitMatrix};
pub use error::CurateError;
pub use features::{build_feature_matrix, SatisfactionMatrix};
pub use formulate::{AbsoluteBoundaries, Formulate, Formulation, FormulationKind, RelativeBoundaries};
pub use solve::solve;
pub use summary::{summarize, Summary, SummaryRow};

pub use curator_lang::{Dataset, Value};
pub use curator_solver::Algorithm;
