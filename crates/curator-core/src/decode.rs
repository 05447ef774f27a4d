use rand::seq::IndexedRandom;
use rand::Rng;

use crate::bounds::round_count;
use crate::dedup::Grouping;

/// Number of members to include from each group, `round(x_g * m_g)` clamped to `[0, m_g]`.
pub fn group_counts(values: &[f64], grouping: &Grouping) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .take(grouping.n_groups())
        .map(|(g, &x)| {
            let m = grouping.multiplicity(g);
            round_count(x * m as f64).clamp(0, m as i64) as usize
        })
        .collect()
}

/// Turns per-unit selection intensities into a per-sample inclusion vector.
///
/// Without a grouping every value is one sample, rounded to 0 or 1. With a
/// grouping the values are per group, and each group contributes
/// [`group_counts`] members drawn uniformly without replacement.
pub fn decode<R: Rng + ?Sized>(values: &[f64], grouping: Option<&Grouping>, rng: &mut R) -> Vec<bool> {
    let Some(grouping) = grouping else {
        return values.iter().map(|&x| round_count(x) >= 1).collect();
    };

    let mut selection = vec![false; grouping.n_samples()];
    for (g, count) in group_counts(values, grouping).into_iter().enumerate() {
        for &sample in grouping.members(g).choose_multiple(rng, count) {
            selection[sample] = true;
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SatisfactionMatrix;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Groups of 3, 5 and 2 samples.
    fn grouping() -> Grouping {
        let mut rows = Vec::new();
        rows.extend(std::iter::repeat_n(vec![false, false], 3));
        rows.extend(std::iter::repeat_n(vec![true, false], 5));
        rows.extend(std::iter::repeat_n(vec![true, true], 2));
        let matrix = SatisfactionMatrix::from_rows(vec!["a".to_string(), "b".to_string()], rows).unwrap();
        Grouping::from_matrix(&matrix)
    }

    #[test]
    fn test_direct_rounding() {
        let mut rng = StdRng::seed_from_u64(0);
        let selection = decode(&[0.0, 0.49, 0.5, 0.51, 1.0], None, &mut rng);
        // 0.5 rounds to even
        assert_eq!(selection, vec![false, false, false, true, true]);
    }

    #[test]
    fn test_group_counts_rounded_and_clamped() {
        let g = grouping();
        // 3 * 0.5 = 1.5 -> 2, 5 * 0.5 = 2.5 -> 2, 2 * 1.2 clamps to 2
        assert_eq!(group_counts(&[0.5, 0.5, 1.2], &g), vec![2, 2, 2]);
        assert_eq!(group_counts(&[-0.1, 0.0, 1.0], &g), vec![0, 0, 2]);
    }

    #[test]
    fn test_included_members_match_counts() {
        let g = grouping();
        let values = [0.4, 0.7, 0.5];
        let counts = group_counts(&values, &g);

        for seed in 0..20 {
            let selection = decode(&values, Some(&g), &mut StdRng::seed_from_u64(seed));
            assert_eq!(selection.len(), g.n_samples());
            for (group, &count) in counts.iter().enumerate() {
                assert!(count <= g.multiplicity(group));
                let included = g.members(group).iter().filter(|&&s| selection[s]).count();
                assert_eq!(included, count);
            }
        }
    }

    #[test]
    fn test_seeded_decoding_is_reproducible() {
        let g = grouping();
        let values = [0.3, 0.6, 0.5];
        let a = decode(&values, Some(&g), &mut StdRng::seed_from_u64(42));
        let b = decode(&values, Some(&g), &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
