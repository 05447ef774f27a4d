use crate::constraint::ConstraintSet;

/// Integral `[min, max]` sample-count bounds.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteBounds {
    pub min: i64,
    pub max: i64,
}

impl AbsoluteBounds {
    /// How far `count` falls outside the bounds; zero when inside.
    pub fn violation(&self, count: i64) -> i64 {
        (self.min - count).max(count - self.max).max(0)
    }
}

/// What a relative bound is multiplied by.
#[derive(Debug, Clone, Copy)]
pub enum Basis<'a> {
    /// The referenced constraint's own normalized bounds (before solving)
    Targets,
    /// Realized satisfied counts of a concrete selection, one per constraint
    Counts(&'a [usize]),
}

/// Round half to even, as the counts and bounds are always reported.
pub fn round_count(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Converts every constraint's bounds into absolute counts.
///
/// Absolute constraints are rounded as given. A constraint relative to `k`
/// scales its fractions by `basis[k]`: with [`Basis::Targets`] the min is
/// scaled by `k`'s normalized min and the max by `k`'s normalized max,
/// following reference chains in resolution order.
pub fn normalize(constraints: &ConstraintSet, basis: Basis<'_>) -> Vec<AbsoluteBounds> {
    let mut out = vec![AbsoluteBounds { min: 0, max: 0 }; constraints.len()];

    for &i in constraints.resolution_order() {
        let c = constraints.get(i);
        out[i] = match (c.index_ref, basis) {
            (None, _) => AbsoluteBounds {
                min: round_count(c.min),
                max: round_count(c.max),
            },
            (Some(k), Basis::Targets) => AbsoluteBounds {
                min: round_count(c.min * out[k].min as f64),
                max: round_count(c.max * out[k].max as f64),
            },
            (Some(k), Basis::Counts(counts)) => {
                let count = counts[k] as f64;
                AbsoluteBounds {
                    min: round_count(c.min * count),
                    max: round_count(c.max * count),
                }
            }
        };
    }

    out
}
