use std::collections::BTreeMap;

use crate::features::SatisfactionMatrix;

/// Samples partitioned by identical satisfaction signature.
///
/// Groups are ordered lexicographically by signature (`false < true`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    signatures: Vec<Vec<bool>>,
    group_of: Vec<usize>,
    members: Vec<Vec<usize>>,
}

impl Grouping {
    pub fn from_matrix(matrix: &SatisfactionMatrix) -> Self {
        let mut by_signature: BTreeMap<&[bool], Vec<usize>> = BTreeMap::new();
        for sample in 0..matrix.n_samples() {
            by_signature.entry(matrix.signature(sample)).or_default().push(sample);
        }

        let mut group_of = vec![0; matrix.n_samples()];
        let mut signatures = Vec::with_capacity(by_signature.len());
        let mut members = Vec::with_capacity(by_signature.len());
        for (g, (signature, samples)) in by_signature.into_iter().enumerate() {
            for &s in &samples {
                group_of[s] = g;
            }
            signatures.push(signature.to_vec());
            members.push(samples);
        }

        Self {
            signatures,
            group_of,
            members,
        }
    }

    pub fn n_groups(&self) -> usize {
        self.signatures.len()
    }

    pub fn n_samples(&self) -> usize {
        self.group_of.len()
    }

    pub fn signature(&self, group: usize) -> &[bool] {
        &self.signatures[group]
    }

    /// Group index of every original sample.
    pub fn group_of(&self) -> &[usize] {
        &self.group_of
    }

    /// Original sample indices in `group`, ascending.
    pub fn members(&self, group: usize) -> &[usize] {
        &self.members[group]
    }

    pub fn multiplicity(&self, group: usize) -> usize {
        self.members[group].len()
    }

    pub fn multiplicities(&self) -> Vec<usize> {
        self.members.iter().map(Vec::len).collect()
    }
}

/// Coefficients of the LP's sample dimension, predicates x units.
///
/// A unit is either a single sample (coefficient 0/1) or a deduplicated group
/// whose column is scaled by its multiplicity.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitMatrix {
    rows: Vec<Vec<f64>>,
    n_units: usize,
}

impl UnitMatrix {
    pub fn per_sample(matrix: &SatisfactionMatrix) -> Self {
        let rows = (0..matrix.n_predicates())
            .map(|j| {
                (0..matrix.n_samples())
                    .map(|i| if matrix.get(i, j) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect();
        Self {
            rows,
            n_units: matrix.n_samples(),
        }
    }

    pub fn per_group(grouping: &Grouping, n_predicates: usize) -> Self {
        let rows = (0..n_predicates)
            .map(|j| {
                (0..grouping.n_groups())
                    .map(|g| {
                        if grouping.signature(g)[j] {
                            grouping.multiplicity(g) as f64
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            rows,
            n_units: grouping.n_groups(),
        }
    }

    pub fn n_units(&self) -> usize {
        self.n_units
    }

    pub fn n_predicates(&self) -> usize {
        self.rows.len()
    }

    /// Coefficients of predicate `j` over all units.
    pub fn row(&self, predicate: usize) -> &[f64] {
        &self.rows[predicate]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> SatisfactionMatrix {
        SatisfactionMatrix::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec![true, false],
                vec![false, false],
                vec![true, false],
                vec![true, true],
                vec![false, false],
                vec![true, false],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_groups_partition_samples() {
        let m = matrix();
        let grouping = Grouping::from_matrix(&m);

        assert_eq!(grouping.n_groups(), 3);
        assert_eq!(grouping.multiplicities().iter().sum::<usize>(), m.n_samples());
        for sample in 0..m.n_samples() {
            let g = grouping.group_of()[sample];
            assert_eq!(grouping.signature(g), m.signature(sample));
            assert!(grouping.members(g).contains(&sample));
        }
    }

    #[test]
    fn test_groups_sorted_by_signature() {
        let grouping = Grouping::from_matrix(&matrix());

        assert_eq!(grouping.signature(0), &[false, false]);
        assert_eq!(grouping.signature(1), &[true, false]);
        assert_eq!(grouping.signature(2), &[true, true]);
        assert_eq!(grouping.members(1), &[0, 2, 5]);
        assert_eq!(grouping.group_of(), &[1, 0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_group_columns_scaled_by_multiplicity() {
        let m = matrix();
        let grouping = Grouping::from_matrix(&m);
        let units = UnitMatrix::per_group(&grouping, m.n_predicates());

        assert_eq!(units.n_units(), 3);
        assert_eq!(units.row(0), &[0.0, 3.0, 1.0]);
        assert_eq!(units.row(1), &[0.0, 0.0, 1.0]);

        let plain = UnitMatrix::per_sample(&m);
        assert_eq!(plain.n_units(), 6);
        assert_eq!(plain.row(1), &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }
}
