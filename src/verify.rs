use crate::document::ConstraintDocument;
use crate::error::Result;
use crate::policy::{ReportMode, TypeChecking, VerifyPolicy};
use crate::stats::FieldStatisticsProvider;
use crate::types::{Bound, Constraint, FieldConstraints, LogicalType, MultiFieldKind, Precision, Scalar, Sign};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
    NotApplicable,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConstraintOutcome {
    pub constraint: String,
    pub outcome: Outcome,
    pub reason: Option<String>,
    pub counterexample: Option<String>,
}

impl ConstraintOutcome {
    fn pass(constraint: &str) -> Self {
        Self { constraint: constraint.to_string(), outcome: Outcome::Pass, reason: None, counterexample: None }
    }

    fn fail(constraint: &str, reason: impl Into<String>, counterexample: Option<String>) -> Self {
        Self {
            constraint: constraint.to_string(),
            outcome: Outcome::Fail,
            reason: Some(reason.into()),
            counterexample,
        }
    }

    fn not_applicable(constraint: &str, reason: impl Into<String>) -> Self {
        Self {
            constraint: constraint.to_string(),
            outcome: Outcome::NotApplicable,
            reason: Some(reason.into()),
            counterexample: None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldReport {
    pub field: String,
    pub results: Vec<ConstraintOutcome>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MultiFieldReport {
    pub kind: MultiFieldKind,
    pub left: String,
    pub right: String,
    pub outcome: Outcome,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct VerificationReport {
    pub fields: Vec<FieldReport>,
    pub multi_field: Vec<MultiFieldReport>,
}

impl VerificationReport {
    pub fn all_passed(&self) -> bool {
        self.fields.iter().all(|f| f.results.iter().all(|r| r.outcome != Outcome::Fail))
            && self.multi_field.iter().all(|m| m.outcome != Outcome::Fail)
    }
}

/// Evaluates a constraint document against a dataset.
pub struct Verifier {
    policy: VerifyPolicy,
}

impl Verifier {
    pub fn new(policy: VerifyPolicy) -> Self {
        Self { policy }
    }

    pub async fn verify(
        &self,
        provider: &dyn FieldStatisticsProvider,
        doc: &ConstraintDocument,
    ) -> Result<VerificationReport> {
        self.verify_cancellable(provider, doc, &CancellationToken::new()).await
    }

    pub async fn verify_cancellable(
        &self,
        provider: &dyn FieldStatisticsProvider,
        doc: &ConstraintDocument,
        cancel: &CancellationToken,
    ) -> Result<VerificationReport> {
        info!(field_count = doc.fields.len(), "starting verification");
        let known_fields: HashSet<String> = provider.field_names().into_iter().collect();
        let mut report = VerificationReport::default();

        for (name, fc) in &doc.fields {
            if cancel.is_cancelled() {
                return Err(crate::error::TddaError::Cancelled);
            }
            debug!(field = name, "verifying field");

            if !known_fields.contains(name) {
                let results = fc
                    .iter()
                    .into_iter()
                    .map(|c| ConstraintOutcome::fail(c.tag(), "missing field", None))
                    .collect();
                report.fields.push(FieldReport { field: name.clone(), results });
                continue;
            }

            let values = provider.values(name).await?;
            let results = self.verify_field(fc, &values);
            report.fields.push(FieldReport { field: name.clone(), results });
        }

        for mf in &doc.multi_field {
            if cancel.is_cancelled() {
                return Err(crate::error::TddaError::Cancelled);
            }
            let outcome = self.verify_multi_field(provider, mf.kind, &mf.left, &mf.right).await?;
            report.multi_field.push(outcome);
        }

        if self.policy.report_mode == ReportMode::FailuresOnly {
            for f in &mut report.fields {
                f.results.retain(|r| r.outcome == Outcome::Fail);
            }
            report.fields.retain(|f| !f.results.is_empty());
            report.multi_field.retain(|m| m.outcome == Outcome::Fail);
        }

        Ok(report)
    }

    fn verify_field(&self, fc: &FieldConstraints, values: &[Option<Scalar>]) -> Vec<ConstraintOutcome> {
        let non_null: Vec<&Scalar> = values.iter().filter_map(|v| v.as_ref()).collect();
        fc.iter().into_iter().map(|c| self.verify_constraint(&c, values, &non_null)).collect()
    }

    fn verify_constraint(&self, c: &Constraint, all: &[Option<Scalar>], non_null: &[&Scalar]) -> ConstraintOutcome {
        match c {
            Constraint::Type(expected) => self.verify_type(*expected, non_null),
            Constraint::Min(bound) => self.verify_min(bound, non_null),
            Constraint::Max(bound) => self.verify_max(bound, non_null),
            Constraint::Sign(sign) => self.verify_sign(*sign, non_null),
            Constraint::MinLength(n) => self.verify_min_length(*n, non_null),
            Constraint::MaxLength(n) => self.verify_max_length(*n, non_null),
            Constraint::MaxNulls(n) => {
                let null_count = all.len() - non_null.len();
                if null_count <= *n {
                    ConstraintOutcome::pass("max_nulls")
                } else {
                    ConstraintOutcome::fail(
                        "max_nulls",
                        format!("observed {null_count} nulls, allowed {n}"),
                        None,
                    )
                }
            }
            Constraint::NoDuplicates(expect) => {
                if !expect {
                    return ConstraintOutcome::pass("no_duplicates");
                }
                let mut seen = HashSet::new();
                for v in non_null {
                    if !seen.insert(v.to_string()) {
                        return ConstraintOutcome::fail("no_duplicates", "duplicate value found", Some(v.to_string()));
                    }
                }
                ConstraintOutcome::pass("no_duplicates")
            }
            Constraint::AllowedValues(allowed) => {
                for v in non_null {
                    if !allowed.iter().any(|a| a == *v) {
                        return ConstraintOutcome::fail(
                            "allowed_values",
                            "value not in allowed set",
                            Some(v.to_string()),
                        );
                    }
                }
                ConstraintOutcome::pass("allowed_values")
            }
            Constraint::Rex(patterns) => {
                let compiled: Vec<regex::Regex> =
                    patterns.iter().filter_map(|p| regex::Regex::new(p).ok()).collect();
                for v in non_null {
                    if let Some(s) = v.as_str() {
                        if !compiled.iter().any(|r| r.is_match(s)) {
                            return ConstraintOutcome::fail(
                                "rex",
                                "value matches no pattern",
                                Some(s.to_string()),
                            );
                        }
                    }
                }
                ConstraintOutcome::pass("rex")
            }
        }
    }

    fn verify_type(&self, expected: LogicalType, non_null: &[&Scalar]) -> ConstraintOutcome {
        let Some(observed) = non_null.first().map(|v| v.logical_type()) else {
            return ConstraintOutcome::not_applicable("type", "field has no non-null values");
        };
        let ok = match self.policy.type_checking {
            TypeChecking::Sloppy => expected.compatible_sloppy(observed),
            TypeChecking::Strict => expected == observed,
        };
        if ok {
            ConstraintOutcome::pass("type")
        } else {
            ConstraintOutcome::fail("type", format!("expected {expected}, observed {observed}"), None)
        }
    }

    fn verify_min(&self, bound: &Bound, non_null: &[&Scalar]) -> ConstraintOutcome {
        let Some(m) = bound.value.as_f64() else {
            return ConstraintOutcome::not_applicable("min", "bound is not numeric");
        };
        let tolerance = self.policy.epsilon * m.abs().max(1.0);
        for v in non_null {
            let Some(x) = v.as_f64() else { continue };
            let ok = match bound.precision {
                Precision::Open => x > m - tolerance,
                Precision::Closed | Precision::Fuzzy => x >= m - tolerance,
            };
            if !ok {
                return ConstraintOutcome::fail("min", format!("value below minimum {m}"), Some(v.to_string()));
            }
        }
        ConstraintOutcome::pass("min")
    }

    fn verify_max(&self, bound: &Bound, non_null: &[&Scalar]) -> ConstraintOutcome {
        let Some(m) = bound.value.as_f64() else {
            return ConstraintOutcome::not_applicable("max", "bound is not numeric");
        };
        let tolerance = self.policy.epsilon * m.abs().max(1.0);
        for v in non_null {
            let Some(x) = v.as_f64() else { continue };
            let ok = match bound.precision {
                Precision::Open => x < m + tolerance,
                Precision::Closed | Precision::Fuzzy => x <= m + tolerance,
            };
            if !ok {
                return ConstraintOutcome::fail("max", format!("value above maximum {m}"), Some(v.to_string()));
            }
        }
        ConstraintOutcome::pass("max")
    }

    fn verify_sign(&self, sign: Sign, non_null: &[&Scalar]) -> ConstraintOutcome {
        let nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
        if nums.is_empty() {
            return if sign == Sign::AllNull {
                ConstraintOutcome::pass("sign")
            } else {
                ConstraintOutcome::not_applicable("sign", "field has no numeric values")
            };
        }
        let min = nums.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let ok = match sign {
            Sign::Positive => min > 0.0,
            Sign::NonNegative => min >= 0.0,
            Sign::Zero => min == 0.0 && max == 0.0,
            Sign::NonPositive => max <= 0.0,
            Sign::Negative => max < 0.0,
            Sign::AllNull => false,
        };
        if ok {
            ConstraintOutcome::pass("sign")
        } else {
            ConstraintOutcome::fail("sign", format!("observed range [{min}, {max}] violates sign"), None)
        }
    }

    fn verify_min_length(&self, n: usize, non_null: &[&Scalar]) -> ConstraintOutcome {
        for v in non_null {
            if let Some(s) = v.as_str() {
                if s.chars().count() < n {
                    return ConstraintOutcome::fail("min_length", format!("shorter than {n}"), Some(s.to_string()));
                }
            }
        }
        ConstraintOutcome::pass("min_length")
    }

    fn verify_max_length(&self, n: usize, non_null: &[&Scalar]) -> ConstraintOutcome {
        for v in non_null {
            if let Some(s) = v.as_str() {
                if s.chars().count() > n {
                    return ConstraintOutcome::fail("max_length", format!("longer than {n}"), Some(s.to_string()));
                }
            }
        }
        ConstraintOutcome::pass("max_length")
    }

    async fn verify_multi_field(
        &self,
        provider: &dyn FieldStatisticsProvider,
        kind: MultiFieldKind,
        left: &str,
        right: &str,
    ) -> Result<MultiFieldReport> {
        let lv = provider.values(left).await?;
        let rv = provider.values(right).await?;
        for (a, b) in lv.iter().zip(rv.iter()) {
            let (Some(a), Some(b)) = (a, b) else { continue };
            let Some(ord) = a.partial_cmp(b) else { continue };
            let ok = match kind {
                MultiFieldKind::Lt => ord == std::cmp::Ordering::Less,
                MultiFieldKind::Lte => ord != std::cmp::Ordering::Greater,
                MultiFieldKind::Eq => ord == std::cmp::Ordering::Equal,
                MultiFieldKind::Gt => ord == std::cmp::Ordering::Greater,
                MultiFieldKind::Gte => ord != std::cmp::Ordering::Less,
            };
            if !ok {
                return Ok(MultiFieldReport {
                    kind,
                    left: left.to_string(),
                    right: right.to_string(),
                    outcome: Outcome::Fail,
                    reason: Some(format!("{left}={a} violates {kind:?} {right}={b}")),
                });
            }
        }
        Ok(MultiFieldReport {
            kind,
            left: left.to_string(),
            right: right.to_string(),
            outcome: Outcome::Pass,
            reason: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::Discoverer;
    use crate::policy::DiscoveryConfig;
    use crate::stats::InMemoryColumnProvider;

    fn ints(values: Vec<i64>) -> Vec<Option<Scalar>> {
        values.into_iter().map(|v| Some(Scalar::Int(v))).collect()
    }

    #[tokio::test]
    async fn discovered_document_passes_its_own_source_data() {
        let provider = InMemoryColumnProvider::new().with_column("age", ints(vec![20, 30, 40]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
        let report = Verifier::new(VerifyPolicy::default()).verify(&provider, &doc).await.unwrap();
        assert!(report.all_passed());
    }

    #[tokio::test]
    async fn max_violation_reports_counterexample() {
        let provider = InMemoryColumnProvider::new().with_column("age", ints(vec![20, 30, 40]));
        let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
        let wider = InMemoryColumnProvider::new().with_column("age", ints(vec![20, 30, 50]));
        let report = Verifier::new(VerifyPolicy::default()).verify(&wider, &doc).await.unwrap();
        let max_result = report.fields[0].results.iter().find(|r| r.constraint == "max").unwrap();
        assert_eq!(max_result.outcome, Outcome::Fail);
        assert_eq!(max_result.counterexample, Some("50".to_string()));
    }

    #[tokio::test]
    async fn epsilon_tolerates_small_overshoot() {
        let provider = InMemoryColumnProvider::new().with_column("x", vec![Some(Scalar::Real(10.0))]);
        // distinct_cap 0 keeps `allowed_values` out of the discovered document so only
        // the `max` bound is exercised by this test.
        let doc = Discoverer::new(DiscoveryConfig::default().with_distinct_cap(0))
            .discover(&provider)
            .await
            .unwrap();
        let slightly_over =
            InMemoryColumnProvider::new().with_column("x", vec![Some(Scalar::Real(10.0000001))]);

        let strict = Verifier::new(VerifyPolicy::default()).verify(&slightly_over, &doc).await.unwrap();
        assert!(!strict.all_passed());

        let fuzzy = Verifier::new(VerifyPolicy::default().with_epsilon(1e-6))
            .verify(&slightly_over, &doc)
            .await
            .unwrap();
        assert!(fuzzy.all_passed());
    }

    #[tokio::test]
    async fn sloppy_vs_strict_typing() {
        let mut doc = ConstraintDocument::new();
        let mut fc = FieldConstraints::default();
        fc.logical_type = Some(LogicalType::Real);
        doc.fields.insert("x".to_string(), fc);

        let provider = InMemoryColumnProvider::new().with_column("x", ints(vec![1, 2, 3]));

        let sloppy = Verifier::new(VerifyPolicy::default()).verify(&provider, &doc).await.unwrap();
        assert!(sloppy.all_passed());

        let strict = Verifier::new(VerifyPolicy::default().with_type_checking(TypeChecking::Strict))
            .verify(&provider, &doc)
            .await
            .unwrap();
        assert!(!strict.all_passed());
    }

    #[tokio::test]
    async fn missing_field_fails_every_constraint() {
        let mut doc = ConstraintDocument::new();
        let mut fc = FieldConstraints::default();
        fc.logical_type = Some(LogicalType::Int);
        doc.fields.insert("ghost".to_string(), fc);

        let provider = InMemoryColumnProvider::new().with_column("age", ints(vec![1]));
        let report = Verifier::new(VerifyPolicy::default()).verify(&provider, &doc).await.unwrap();
        assert!(!report.all_passed());
    }
}
