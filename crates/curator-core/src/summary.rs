use std::fmt;

use crate::bounds::{normalize, Basis};
use crate::constraint::ConstraintSet;
use crate::features::SatisfactionMatrix;

/// Realized count and violation of one constraint.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub label: String,
    pub cnt: usize,
    pub min: i64,
    pub max: i64,
    pub violation: i64,
}

/// Ground-truth report of a concrete selection.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
    /// Number of included samples
    pub selected: usize,
}

impl Summary {
    pub fn total_violation(&self) -> i64 {
        self.rows.iter().map(|r| r.violation).sum()
    }

    /// Violation weighted by each constraint's penalty, comparable to the LP objective.
    pub fn weighted_violation(&self, constraints: &ConstraintSet) -> f64 {
        self.rows
            .iter()
            .zip(constraints)
            .map(|(r, c)| r.violation as f64 * c.penalty_per_violation)
            .sum()
    }

    pub fn row(&self, label: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn is_satisfied(&self) -> bool {
        self.rows.iter().all(|r| r.violation == 0)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.rows.iter().map(|r| r.label.len()).max().unwrap_or(0).max(5);
        writeln!(f, "{:width$} {:>8} {:>8} {:>8} {:>10}", "query", "cnt", "min", "max", "violation")?;
        for r in &self.rows {
            writeln!(
                f,
                "{:width$} {:>8} {:>8} {:>8} {:>10}",
                r.label, r.cnt, r.min, r.max, r.violation
            )?;
        }
        write!(
            f,
            "selected {} samples, total violation {}",
            self.selected,
            self.total_violation()
        )
    }
}

/// Counts what `selection` satisfies and checks it against bounds normalized
/// to those realized counts.
pub fn summarize(matrix: &SatisfactionMatrix, constraints: &ConstraintSet, selection: &[bool]) -> Summary {
    let counts = matrix.column_counts(selection);
    let bounds = normalize(constraints, Basis::Counts(&counts));

    let rows = constraints
        .iter()
        .zip(counts.iter().zip(&bounds))
        .map(|(c, (&cnt, b))| SummaryRow {
            label: c.label.clone(),
            cnt,
            min: b.min,
            max: b.max,
            violation: b.violation(cnt as i64),
        })
        .collect();

    Summary {
        rows,
        selected: selection.iter().filter(|&&s| s).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;

    /// `all` holds everywhere, `smoker` for samples 0, 2, 4.
    fn matrix() -> SatisfactionMatrix {
        let rows = (0..6).map(|i| vec![true, i % 2 == 0]).collect();
        SatisfactionMatrix::from_rows(vec!["all".to_string(), "smoker".to_string()], rows).unwrap()
    }

    #[test]
    fn test_relative_bounds_use_realized_counts() {
        let constraints = ConstraintSet::new(vec![
            Constraint::new("all", 4.0, 4.0),
            Constraint::new("smoker", 0.5, 0.5).relative_to(0).with_penalty(2.0),
        ])
        .unwrap();
        let selection = [true, true, true, false, true, true];

        let summary = summarize(&matrix(), &constraints, &selection);

        assert_eq!(summary.selected, 5);
        assert_eq!(
            summary.rows[0],
            SummaryRow {
                label: "all".to_string(),
                cnt: 5,
                min: 4,
                max: 4,
                violation: 1
            }
        );
        // half of 5 realized rounds to 2; three smokers selected
        assert_eq!(summary.rows[1].min, 2);
        assert_eq!(summary.rows[1].cnt, 3);
        assert_eq!(summary.rows[1].violation, 1);
        assert_eq!(summary.total_violation(), 2);
        assert_eq!(summary.weighted_violation(&constraints), 3.0);
        assert!(!summary.is_satisfied());
    }

    #[test]
    fn test_display_table() {
        let constraints = ConstraintSet::new(vec![Constraint::new("all", 0.0, 6.0)]).unwrap();
        let summary = summarize(&matrix(), &constraints, &[true; 6]);

        let text = summary.to_string();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("query      cnt      min      max  violation"));
        assert_eq!(lines.next(), Some("all          6        0        6          0"));
        assert_eq!(lines.next(), Some("selected 6 samples, total violation 0"));
        assert_eq!(summary.row("all").map(|r| r.cnt), Some(6));
    }
}
