use std::str::FromStr;

use thiserror::Error;

use crate::{InteriorPointSolver, LpSolver, Solver};

/// Which LP method to run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Exact vertex solution via two-phase simplex
    #[default]
    Simplex,
    /// Faster, tolerance-accurate interior point
    InteriorPoint,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown algorithm '{0}' (expected simplex or interior-point)")]
pub struct UnknownAlgorithm(pub String);

impl Algorithm {
    pub fn solver(self) -> Box<dyn LpSolver> {
        match self {
            Algorithm::Simplex => Box::new(Solver::new()),
            Algorithm::InteriorPoint => Box::new(InteriorPointSolver::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Simplex => "simplex",
            Algorithm::InteriorPoint => "interior-point",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "simplex" | "revised-simplex" => Ok(Algorithm::Simplex),
            "interior-point" | "ipm" => Ok(Algorithm::InteriorPoint),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("revised simplex".parse::<Algorithm>(), Ok(Algorithm::Simplex));
        assert_eq!("interior-point".parse::<Algorithm>(), Ok(Algorithm::InteriorPoint));
        assert_eq!("IPM".parse::<Algorithm>(), Ok(Algorithm::InteriorPoint));
        assert!("highs".parse::<Algorithm>().is_err());
    }
}
