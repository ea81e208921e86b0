use crate::error::{Result, TddaError};
use crate::types::{LogicalType, Scalar};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashSet;

/// The cheap column-level reductions the discoverer and verifier need.
/// Computed once per field per operation; a physical adapter is expected to
/// push these down to its underlying storage rather than materialise every
/// row.
#[derive(Debug, Clone)]
pub struct FieldSummary {
    /// `None` when every value is null and the type cannot be inferred.
    pub logical_type: Option<LogicalType>,
    pub null_count: usize,
    pub non_null_count: usize,
    pub total_count: usize,
    pub min_value: Option<Scalar>,
    pub max_value: Option<Scalar>,
    pub distinct_count: usize,
    pub distinct_sample: Vec<Scalar>,
    pub distinct_truncated: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// The capability interface a dataset adapter implements. The engine calls
/// this from a single owning task per field (see the concurrency model);
/// implementations need not be internally thread-safe beyond `Send + Sync`
/// for sharing the provider handle itself across tasks.
#[async_trait]
pub trait FieldStatisticsProvider: Send + Sync {
    /// Field names in the dataset's own declared order.
    fn field_names(&self) -> Vec<String>;

    /// Computes the column-level summary for `field`, sampling at most
    /// `distinct_cap` distinct values.
    async fn summarize(&self, field: &str, distinct_cap: usize) -> Result<FieldSummary>;

    /// Every value in `field`, in row order, `None` standing for null. Used
    /// by the regex inducer (non-null strings only) and by the detector,
    /// which needs row alignment across fields.
    async fn values(&self, field: &str) -> Result<Vec<Option<Scalar>>>;

    /// Total row count of the dataset.
    fn row_count(&self) -> usize;
}

/// A fully in-memory provider over a fixed set of typed columns. This is the
/// reference implementation the engine itself tests against; a CSV,
/// columnar or SQL adapter implements the same trait out-of-tree and is
/// otherwise interchangeable with it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryColumnProvider {
    columns: IndexMap<String, Vec<Option<Scalar>>>,
}

impl InMemoryColumnProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column. All columns must share the same length; this is
    /// enforced lazily the first time the mismatch would be observed.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Option<Scalar>>) -> Self {
        self.columns.insert(name.into(), values);
        self
    }
}

#[async_trait]
impl FieldStatisticsProvider for InMemoryColumnProvider {
    fn field_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    async fn summarize(&self, field: &str, distinct_cap: usize) -> Result<FieldSummary> {
        let column = self
            .columns
            .get(field)
            .ok_or_else(|| TddaError::schema(format!("no such field '{field}'")))?;

        let total_count = column.len();
        let non_null: Vec<&Scalar> = column.iter().filter_map(|v| v.as_ref()).collect();
        let null_count = total_count - non_null.len();

        let logical_type = non_null.first().map(|v| v.logical_type());

        let mut min_value: Option<Scalar> = None;
        let mut max_value: Option<Scalar> = None;
        for v in &non_null {
            if min_value.as_ref().map_or(true, |m| (*v).partial_cmp(m) == Some(std::cmp::Ordering::Less)) {
                min_value = Some((*v).clone());
            }
            if max_value.as_ref().map_or(true, |m| (*v).partial_cmp(m) == Some(std::cmp::Ordering::Greater)) {
                max_value = Some((*v).clone());
            }
        }

        let mut seen = HashSet::new();
        let mut distinct_sample = Vec::new();
        let mut distinct_count = 0usize;
        let mut distinct_truncated = false;
        for v in &non_null {
            let key = v.to_string();
            if seen.insert(key) {
                distinct_count += 1;
                if distinct_sample.len() < distinct_cap {
                    distinct_sample.push((*v).clone());
                } else {
                    distinct_truncated = true;
                }
            }
        }

        let (min_length, max_length) = if logical_type == Some(LogicalType::String) {
            let lengths: Vec<usize> = non_null
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.chars().count())
                .collect();
            (lengths.iter().min().copied(), lengths.iter().max().copied())
        } else {
            (None, None)
        };

        Ok(FieldSummary {
            logical_type,
            null_count,
            non_null_count: non_null.len(),
            total_count,
            min_value,
            max_value,
            distinct_count,
            distinct_sample,
            distinct_truncated,
            min_length,
            max_length,
        })
    }

    async fn values(&self, field: &str) -> Result<Vec<Option<Scalar>>> {
        self.columns
            .get(field)
            .cloned()
            .ok_or_else(|| TddaError::schema(format!("no such field '{field}'")))
    }

    fn row_count(&self) -> usize {
        self.columns.values().next().map_or(0, |c| c.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalars(values: Vec<Option<i64>>) -> Vec<Option<Scalar>> {
        values.into_iter().map(|v| v.map(Scalar::Int)).collect()
    }

    #[tokio::test]
    async fn summarizes_numeric_column() {
        let provider = InMemoryColumnProvider::new()
            .with_column("age", scalars(vec![Some(20), Some(30), None, Some(40)]));
        let summary = provider.summarize("age", 20).await.unwrap();
        assert_eq!(summary.logical_type, Some(LogicalType::Int));
        assert_eq!(summary.null_count, 1);
        assert_eq!(summary.non_null_count, 3);
        assert_eq!(summary.min_value, Some(Scalar::Int(20)));
        assert_eq!(summary.max_value, Some(Scalar::Int(40)));
        assert_eq!(summary.distinct_count, 3);
    }

    #[tokio::test]
    async fn string_column_tracks_length_extrema() {
        let provider = InMemoryColumnProvider::new().with_column(
            "code",
            vec![
                Some(Scalar::Str("AB-01".to_string())),
                Some(Scalar::Str("AB-123".to_string())),
            ],
        );
        let summary = provider.summarize("code", 20).await.unwrap();
        assert_eq!(summary.min_length, Some(5));
        assert_eq!(summary.max_length, Some(6));
    }

    #[tokio::test]
    async fn all_null_column_has_no_inferred_type() {
        let provider = InMemoryColumnProvider::new().with_column("x", scalars(vec![None, None]));
        let summary = provider.summarize("x", 20).await.unwrap();
        assert_eq!(summary.logical_type, None);
        assert_eq!(summary.null_count, 2);
    }

    #[tokio::test]
    async fn distinct_sample_is_capped() {
        let values: Vec<Option<Scalar>> = (0..10).map(|i| Some(Scalar::Int(i))).collect();
        let provider = InMemoryColumnProvider::new().with_column("x", values);
        let summary = provider.summarize("x", 3).await.unwrap();
        assert_eq!(summary.distinct_count, 10);
        assert_eq!(summary.distinct_sample.len(), 3);
        assert!(summary.distinct_truncated);
    }
}
