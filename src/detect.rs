use crate::document::ConstraintDocument;
use crate::error::Result;
use crate::policy::{DetectionPolicy, TypeChecking};
use crate::stats::FieldStatisticsProvider;
use crate::types::{Bound, Constraint, Precision, Scalar, Sign};
use indexmap::IndexMap;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// One row that tripped at least one constraint (or every row, under
/// `DetectionPolicy::write_all`).
#[derive(Debug, Clone)]
pub struct DetectedRow {
    pub index: Option<usize>,
    pub values: IndexMap<String, Option<Scalar>>,
    pub n_failures: usize,
    pub per_constraint: IndexMap<String, bool>,
}

#[derive(Debug, Clone, Default)]
pub struct DetectedTable {
    pub rows: Vec<DetectedRow>,
}

/// Evaluates a constraint document row-by-row, producing an annotated view
/// of offending records.
pub struct Detector {
    policy: DetectionPolicy,
}

impl Detector {
    pub fn new(policy: DetectionPolicy) -> Self {
        Self { policy }
    }

    pub async fn detect(
        &self,
        provider: &dyn FieldStatisticsProvider,
        doc: &ConstraintDocument,
    ) -> Result<DetectedTable> {
        self.detect_cancellable(provider, doc, &CancellationToken::new()).await
    }

    pub async fn detect_cancellable(
        &self,
        provider: &dyn FieldStatisticsProvider,
        doc: &ConstraintDocument,
        cancel: &CancellationToken,
    ) -> Result<DetectedTable> {
        let row_count = provider.row_count();
        info!(row_count, field_count = doc.fields.len(), "starting detection");

        let mut field_values: HashMap<&str, Vec<Option<Scalar>>> = HashMap::new();
        let mut field_duplicate_counts: HashMap<&str, HashMap<String, usize>> = HashMap::new();
        let mut field_null_counts: HashMap<&str, usize> = HashMap::new();

        for name in doc.fields.keys() {
            if provider.field_names().iter().any(|f| f == name) {
                let values = provider.values(name).await?;
                let mut counts: HashMap<String, usize> = HashMap::new();
                let mut nulls = 0usize;
                for v in &values {
                    match v {
                        Some(s) => *counts.entry(s.to_string()).or_insert(0) += 1,
                        None => nulls += 1,
                    }
                }
                field_duplicate_counts.insert(name.as_str(), counts);
                field_null_counts.insert(name.as_str(), nulls);
                field_values.insert(name.as_str(), values);
            }
        }

        let mut rows = Vec::new();
        for row_idx in 0..row_count {
            if cancel.is_cancelled() {
                return Err(crate::error::TddaError::Cancelled);
            }

            let mut n_failures = 0usize;
            let mut per_constraint = IndexMap::new();
            let mut row_values = IndexMap::new();

            for (name, fc) in &doc.fields {
                let Some(values) = field_values.get(name.as_str()) else { continue };
                let value = values.get(row_idx).cloned().flatten();
                let include_value = self.policy.output_fields.as_ref().map_or(true, |fields| fields.contains(name));
                if include_value {
                    row_values.insert(name.clone(), value.clone());
                }

                for constraint in fc.iter() {
                    let ok = self.evaluate_row(
                        &constraint,
                        &value,
                        field_null_counts.get(name.as_str()).copied().unwrap_or(0),
                        field_duplicate_counts.get(name.as_str()),
                    );
                    if !ok {
                        n_failures += 1;
                    }
                    if self.policy.per_constraint {
                        per_constraint.insert(format!("{name}_{}_ok", constraint.tag()), ok);
                    }
                }
            }

            if n_failures > 0 || self.policy.write_all {
                rows.push(DetectedRow {
                    index: self.policy.include_index.then_some(row_idx),
                    values: row_values,
                    n_failures,
                    per_constraint,
                });
            }
        }

        Ok(DetectedTable { rows })
    }

    fn evaluate_row(
        &self,
        constraint: &Constraint,
        value: &Option<Scalar>,
        column_null_count: usize,
        duplicate_counts: Option<&HashMap<String, usize>>,
    ) -> bool {
        let Some(v) = value else {
            return true_unless_type_or_max_nulls(constraint, column_null_count);
        };

        match constraint {
            Constraint::Type(expected) => match self.policy.type_checking {
                TypeChecking::Sloppy => expected.compatible_sloppy(v.logical_type()),
                TypeChecking::Strict => *expected == v.logical_type(),
            },
            Constraint::Min(bound) => self.row_satisfies_min(bound, v),
            Constraint::Max(bound) => self.row_satisfies_max(bound, v),
            Constraint::Sign(sign) => row_satisfies_sign(*sign, v),
            Constraint::MinLength(n) => v.as_str().map_or(true, |s| s.chars().count() >= *n),
            Constraint::MaxLength(n) => v.as_str().map_or(true, |s| s.chars().count() <= *n),
            Constraint::MaxNulls(_) => true,
            Constraint::NoDuplicates(expect) => {
                if !expect {
                    true
                } else {
                    duplicate_counts.and_then(|c| c.get(&v.to_string())).copied().unwrap_or(1) <= 1
                }
            }
            Constraint::AllowedValues(allowed) => allowed.iter().any(|a| a == v),
            Constraint::Rex(patterns) => v.as_str().map_or(true, |s| {
                patterns.iter().filter_map(|p| regex::Regex::new(p).ok()).any(|r| r.is_match(s))
            }),
        }
    }

    fn row_satisfies_min(&self, bound: &Bound, v: &Scalar) -> bool {
        let (Some(m), Some(x)) = (bound.value.as_f64(), v.as_f64()) else { return true };
        let tolerance = self.policy.epsilon * m.abs().max(1.0);
        match bound.precision {
            Precision::Open => x > m - tolerance,
            Precision::Closed | Precision::Fuzzy => x >= m - tolerance,
        }
    }

    fn row_satisfies_max(&self, bound: &Bound, v: &Scalar) -> bool {
        let (Some(m), Some(x)) = (bound.value.as_f64(), v.as_f64()) else { return true };
        let tolerance = self.policy.epsilon * m.abs().max(1.0);
        match bound.precision {
            Precision::Open => x < m + tolerance,
            Precision::Closed | Precision::Fuzzy => x <= m + tolerance,
        }
    }
}

/// A null row's own value always passes every row-level predicate except it
/// is the column aggregate for `MaxNulls` that decides the row's fate; see
/// the null-handling invariant (§8.6 of the governing document).
fn true_unless_type_or_max_nulls(constraint: &Constraint, column_null_count: usize) -> bool {
    match constraint {
        Constraint::MaxNulls(n) => column_null_count <= *n,
        _ => true,
    }
}

fn row_satisfies_sign(sign: Sign, v: &Scalar) -> bool {
    let Some(x) = v.as_f64() else { return true };
    match sign {
        Sign::Positive => x > 0.0,
        Sign::NonNegative => x >= 0.0,
        Sign::Zero => x == 0.0,
        Sign::NonPositive => x <= 0.0,
        Sign::Negative => x < 0.0,
        Sign::AllNull => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::Discoverer;
    use crate::policy::DiscoveryConfig;
    use crate::stats::InMemoryColumnProvider;

    fn ints(values: Vec<Option<i64>>) -> Vec<Option<Scalar>> {
        values.into_iter().map(|v| v.map(Scalar::Int)).collect()
    }

    #[tokio::test]
    async fn flags_only_offending_rows_by_default() {
        let provider = InMemoryColumnProvider::new().with_column("age", ints(vec![Some(20), Some(30), Some(40)]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();

        let wider = InMemoryColumnProvider::new().with_column("age", ints(vec![Some(20), Some(30), Some(999)]));
        let table = Detector::new(DetectionPolicy::default()).detect(&wider, &doc).await.unwrap();
        assert_eq!(table.rows.len(), 1);
        // 999 trips both the discovered `max` bound and `allowed_values`.
        assert_eq!(table.rows[0].n_failures, 2);
    }

    #[tokio::test]
    async fn write_all_retains_passing_rows() {
        let provider = InMemoryColumnProvider::new().with_column("age", ints(vec![Some(20), Some(30)]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
        let table = Detector::new(DetectionPolicy::default().with_write_all(true))
            .detect(&provider, &doc)
            .await
            .unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows.iter().all(|r| r.n_failures == 0));
    }

    #[tokio::test]
    async fn null_value_never_fails_non_type_non_max_nulls_constraints() {
        let provider = InMemoryColumnProvider::new().with_column("age", ints(vec![Some(20), Some(30), Some(40)]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();

        let with_null = InMemoryColumnProvider::new().with_column("age", ints(vec![Some(20), None, Some(40)]));
        let table = Detector::new(DetectionPolicy::default().with_write_all(true).with_per_constraint(true))
            .detect(&with_null, &doc)
            .await
            .unwrap();
        let null_row = &table.rows[1];
        assert!(null_row.per_constraint.get("age_min_ok").copied().unwrap_or(false));
        assert!(null_row.per_constraint.get("age_max_ok").copied().unwrap_or(false));
    }

    #[tokio::test]
    async fn per_constraint_columns_follow_naming_convention() {
        let provider = InMemoryColumnProvider::new().with_column("age", ints(vec![Some(20), Some(30)]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
        let table = Detector::new(DetectionPolicy::default().with_write_all(true).with_per_constraint(true))
            .detect(&provider, &doc)
            .await
            .unwrap();
        assert!(table.rows[0].per_constraint.contains_key("age_max_nulls_ok"));
    }
}
