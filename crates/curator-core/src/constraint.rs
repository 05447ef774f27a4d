use std::collections::HashSet;

use crate::error::CurateError;

/// Penalty charged per unit of violation when none is given.
pub const DEFAULT_PENALTY: f64 = 1.0;

/// "Between `min` and `max` selected samples must satisfy query `label`".
///
/// With `index_ref = Some(k)` the bounds are fractions in `[0, 1]` of the
/// number of selected samples satisfying constraint `k`; otherwise they are
/// absolute counts.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub label: String,
    pub min: f64,
    pub max: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub index_ref: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default = "default_penalty"))]
    pub penalty_per_violation: f64,
}

#[cfg(feature = "serde")]
fn default_penalty() -> f64 {
    DEFAULT_PENALTY
}

impl Constraint {
    pub fn new(label: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            label: label.into(),
            min,
            max,
            index_ref: None,
            penalty_per_violation: DEFAULT_PENALTY,
        }
    }

    /// Makes the bounds fractions of constraint `index`'s satisfied count.
    pub fn relative_to(mut self, index: usize) -> Self {
        self.index_ref = Some(index);
        self
    }

    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty_per_violation = penalty;
        self
    }
}

/// A validated, ordered constraint table.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
    /// Every constraint appears after the constraint it references
    order: Vec<usize>,
}

impl ConstraintSet {
    pub fn new(constraints: Vec<Constraint>) -> Result<Self, CurateError> {
        let mut seen = HashSet::new();
        for (index, c) in constraints.iter().enumerate() {
            if !seen.insert(c.label.as_str()) {
                return Err(CurateError::DuplicateLabel(c.label.clone()));
            }
            if !c.min.is_finite() || !c.max.is_finite() {
                return Err(CurateError::NonFiniteBound {
                    index,
                    label: c.label.clone(),
                });
            }
            if !c.penalty_per_violation.is_finite() || c.penalty_per_violation < 0.0 {
                return Err(CurateError::InvalidPenalty {
                    index,
                    label: c.label.clone(),
                    value: c.penalty_per_violation,
                });
            }
            if let Some(target) = c.index_ref {
                if target >= constraints.len() {
                    return Err(CurateError::UnknownReference {
                        index,
                        label: c.label.clone(),
                        target,
                    });
                }
                if target == index {
                    return Err(CurateError::SelfReference {
                        index,
                        label: c.label.clone(),
                    });
                }
                for (bound, value) in [("min", c.min), ("max", c.max)] {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(CurateError::FractionOutOfRange {
                            index,
                            label: c.label.clone(),
                            bound,
                            value,
                        });
                    }
                }
            }
        }

        let order = resolution_order(&constraints)?;
        Ok(Self { constraints, order })
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn get(&self, index: usize) -> &Constraint {
        &self.constraints[index]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.constraints.iter().map(|c| c.label.as_str()).collect()
    }

    /// Indices ordered so that every referenced constraint precedes its referrers.
    pub fn resolution_order(&self) -> &[usize] {
        &self.order
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Each constraint has at most one outgoing reference, so every walk is a chain.
fn resolution_order(constraints: &[Constraint]) -> Result<Vec<usize>, CurateError> {
    let mut marks = vec![Mark::Unvisited; constraints.len()];
    let mut order = Vec::with_capacity(constraints.len());

    for start in 0..constraints.len() {
        let mut chain: Vec<usize> = Vec::new();
        let mut current = Some(start);

        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::Visiting => {
                    let cycle_start = chain.iter().position(|&c| c == i).unwrap_or(0);
                    let mut names: Vec<&str> = chain[cycle_start..]
                        .iter()
                        .map(|&c| constraints[c].label.as_str())
                        .collect();
                    names.push(constraints[i].label.as_str());
                    return Err(CurateError::CyclicReference(names.join(" -> ")));
                }
                Mark::Unvisited => {
                    marks[i] = Mark::Visiting;
                    chain.push(i);
                    current = constraints[i].index_ref;
                }
            }
        }

        for &i in chain.iter().rev() {
            marks[i] = Mark::Done;
            order.push(i);
        }
    }

    Ok(order)
}
