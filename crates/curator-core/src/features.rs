use curator_lang::{evaluate, Dataset};

use crate::error::CurateError;

/// `rows[i][j]` is true iff sample `i` satisfies predicate `j`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatisfactionMatrix {
    labels: Vec<String>,
    rows: Vec<Vec<bool>>,
}

impl SatisfactionMatrix {
    /// Builds a matrix from per-sample rows. Every row must have one entry per label.
    pub fn from_rows(labels: Vec<String>, rows: Vec<Vec<bool>>) -> Result<Self, CurateError> {
        if let Some(bad) = rows.iter().find(|r| r.len() != labels.len()) {
            return Err(CurateError::DimensionMismatch {
                expected: labels.len(),
                found: bad.len(),
            });
        }
        Ok(Self { labels, rows })
    }

    /// Builds a matrix from per-predicate columns of equal length.
    pub fn from_columns(labels: Vec<String>, columns: Vec<Vec<bool>>) -> Result<Self, CurateError> {
        if columns.len() != labels.len() {
            return Err(CurateError::DimensionMismatch {
                expected: labels.len(),
                found: columns.len(),
            });
        }
        let n_samples = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != n_samples) {
            return Err(CurateError::DimensionMismatch {
                expected: n_samples,
                found: bad.len(),
            });
        }
        let rows = (0..n_samples)
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();
        Ok(Self { labels, rows })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub fn n_predicates(&self) -> usize {
        self.labels.len()
    }

    /// Satisfaction pattern of sample `i` across all predicates.
    pub fn signature(&self, sample: usize) -> &[bool] {
        &self.rows[sample]
    }

    pub fn get(&self, sample: usize, predicate: usize) -> bool {
        self.rows[sample][predicate]
    }

    /// Per-predicate number of samples marked in `selection` that satisfy it.
    pub fn column_counts(&self, selection: &[bool]) -> Vec<usize> {
        let mut counts = vec![0; self.n_predicates()];
        for (row, _) in self.rows.iter().zip(selection).filter(|(_, selected)| **selected) {
            for (count, &hit) in counts.iter_mut().zip(row) {
                *count += hit as usize;
            }
        }
        counts
    }
}

/// Evaluates every query against every sample.
///
/// Queries double as labels. The first query that fails aborts the build.
pub fn build_feature_matrix<S: AsRef<str>>(
    dataset: &Dataset,
    queries: &[S],
) -> Result<SatisfactionMatrix, CurateError> {
    let mut columns = Vec::with_capacity(queries.len());
    for query in queries {
        let query = query.as_ref();
        let column = evaluate(dataset, query).map_err(|source| CurateError::Predicate {
            label: query.to_string(),
            source,
        })?;
        tracing::trace!(query, matches = column.iter().filter(|&&b| b).count(), "evaluated query");
        columns.push(column);
    }

    let labels = queries.iter().map(|q| q.as_ref().to_string()).collect();
    if columns.is_empty() {
        return SatisfactionMatrix::from_rows(labels, vec![Vec::new(); dataset.len()]);
    }
    SatisfactionMatrix::from_columns(labels, columns)
}
