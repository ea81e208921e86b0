use crate::error::Result;
use crate::policy::DiscoveryConfig;
use crate::regex_inducer;
use crate::stats::{FieldStatisticsProvider, FieldSummary};
use crate::types::{Bound, Constraint, FieldConstraints, LogicalType, Scalar, Sign};
use crate::document::ConstraintDocument;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Infers a minimal informative constraint set per field from observed
/// column statistics.
pub struct Discoverer {
    config: DiscoveryConfig,
}

impl Discoverer {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Discovers constraints for every field of `provider`, one cooperative
    /// task per field, joined back in the provider's declared field order.
    pub async fn discover(&self, provider: &dyn FieldStatisticsProvider) -> Result<ConstraintDocument> {
        self.discover_cancellable(provider, &CancellationToken::new()).await
    }

    pub async fn discover_cancellable(
        &self,
        provider: &dyn FieldStatisticsProvider,
        cancel: &CancellationToken,
    ) -> Result<ConstraintDocument> {
        let fields = provider.field_names();
        info!(field_count = fields.len(), "starting discovery");

        if provider.row_count() < self.config.min_sample_size {
            warn!(
                rows = provider.row_count(),
                min_sample_size = self.config.min_sample_size,
                "discovering constraints from a small sample"
            );
        }

        let mut doc = ConstraintDocument::new();
        for field in &fields {
            if cancel.is_cancelled() {
                return Err(crate::error::TddaError::Cancelled);
            }
            let summary = provider.summarize(field, self.config.distinct_cap).await?;
            let values = if self.config.enable_regex_discovery && summary.logical_type == Some(LogicalType::String) {
                Some(provider.values(field).await?)
            } else {
                None
            };
            let fc = self.discover_field(field, &summary, values.as_deref());
            doc.fields.insert(field.clone(), fc);
        }

        Ok(doc)
    }

    fn discover_field(
        &self,
        name: &str,
        summary: &FieldSummary,
        values: Option<&[Option<Scalar>]>,
    ) -> FieldConstraints {
        debug!(field = name, "discovering field constraints");
        let mut fc = FieldConstraints::default();

        let Some(logical_type) = summary.logical_type else {
            // All-null field: only MaxNulls is informative.
            if summary.total_count > 0 {
                fc.set(Constraint::MaxNulls(summary.total_count));
            }
            return fc;
        };

        fc.set(Constraint::Type(logical_type));

        if summary.null_count == 0 {
            fc.set(Constraint::MaxNulls(0));
        } else if summary.null_count < summary.total_count {
            fc.set(Constraint::MaxNulls(summary.null_count));
        }

        if matches!(logical_type, LogicalType::Int | LogicalType::Real) {
            if let (Some(min), Some(max)) = (&summary.min_value, &summary.max_value) {
                fc.set(Constraint::Min(Bound::closed(min.clone())));
                fc.set(Constraint::Max(Bound::closed(max.clone())));
                if let Some(sign) = infer_sign(min, max) {
                    fc.set(Constraint::Sign(sign));
                }
            }
        }

        if logical_type == LogicalType::String {
            if let (Some(min_len), Some(max_len)) = (summary.min_length, summary.max_length) {
                fc.set(Constraint::MinLength(min_len));
                fc.set(Constraint::MaxLength(max_len));
            }
        }

        let within_cap = !summary.distinct_truncated;
        if within_cap || !self.config.suppress_allowed_values_above_cap {
            if summary.non_null_count > 0 {
                fc.set(Constraint::AllowedValues(summary.distinct_sample.clone()));
            }
        }

        if summary.distinct_count == summary.non_null_count && summary.non_null_count >= 2 {
            fc.set(Constraint::NoDuplicates(true));
        }

        if let Some(values) = values {
            let samples: Vec<String> = values
                .iter()
                .filter_map(|v| v.as_ref().and_then(|s| s.as_str().map(|s| s.to_string())))
                .collect();
            if !samples.is_empty() {
                let patterns = regex_inducer::induce(&samples, self.config.alternation_cap);
                if !patterns.is_empty() {
                    fc.set(Constraint::Rex(patterns));
                }
            }
        }

        fc
    }
}

fn infer_sign(min: &Scalar, max: &Scalar) -> Option<Sign> {
    let min = min.as_f64()?;
    let max = max.as_f64()?;
    Some(if min > 0.0 {
        Sign::Positive
    } else if min == 0.0 && max > 0.0 {
        Sign::NonNegative
    } else if min == 0.0 && max == 0.0 {
        Sign::Zero
    } else if max < 0.0 {
        Sign::Negative
    } else if max == 0.0 {
        Sign::NonPositive
    } else {
        return None;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::InMemoryColumnProvider;

    fn ints(values: Vec<Option<i64>>) -> Vec<Option<Scalar>> {
        values.into_iter().map(|v| v.map(Scalar::Int)).collect()
    }

    #[tokio::test]
    async fn discovers_numeric_bounds_and_sign() {
        let provider = InMemoryColumnProvider::new().with_column("age", ints(vec![Some(20), Some(30), Some(40)]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
        let fc = &doc.fields["age"];
        assert_eq!(fc.logical_type, Some(LogicalType::Int));
        assert_eq!(fc.min.as_ref().unwrap().value, Scalar::Int(20));
        assert_eq!(fc.max.as_ref().unwrap().value, Scalar::Int(40));
        assert_eq!(fc.sign, Some(Sign::Positive));
        assert_eq!(fc.max_nulls, Some(0));
    }

    #[tokio::test]
    async fn emits_allowed_values_under_cap() {
        let provider = InMemoryColumnProvider::new().with_column("x", ints(vec![Some(1), Some(1), Some(2)]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
        let fc = &doc.fields["x"];
        let values = fc.allowed_values.as_ref().unwrap();
        assert_eq!(values.len(), 2);
        assert!(fc.no_duplicates.is_none());
    }

    #[tokio::test]
    async fn marks_no_duplicates_when_all_distinct() {
        let provider = InMemoryColumnProvider::new().with_column("x", ints(vec![Some(1), Some(2), Some(3)]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
        assert_eq!(doc.fields["x"].no_duplicates, Some(true));
    }

    #[tokio::test]
    async fn all_null_field_emits_only_max_nulls() {
        let provider = InMemoryColumnProvider::new().with_column("x", ints(vec![None, None, None]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
        let fc = &doc.fields["x"];
        assert!(fc.logical_type.is_none());
        assert_eq!(fc.max_nulls, Some(3));
        assert!(fc.min.is_none());
    }

    #[tokio::test]
    async fn discovers_rex_for_string_fields() {
        let provider = InMemoryColumnProvider::new().with_column(
            "code",
            vec![
                Some(Scalar::Str("AB-01".to_string())),
                Some(Scalar::Str("AB-02".to_string())),
                Some(Scalar::Str("AB-17".to_string())),
            ],
        );
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
        let fc = &doc.fields["code"];
        assert!(fc.rex.is_some());
    }
}
