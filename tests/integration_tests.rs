use tdda::detect::Detector;
use tdda::discover::Discoverer;
use tdda::document::ConstraintDocument;
use tdda::policy::{DetectionPolicy, DiscoveryConfig, VerifyPolicy};
use tdda::stats::InMemoryColumnProvider;
use tdda::types::Scalar;
use tdda::verify::Verifier;

fn employee_provider() -> InMemoryColumnProvider {
    InMemoryColumnProvider::new()
        .with_column(
            "employee_id",
            vec![
                Some(Scalar::Str("EMP-001".to_string())),
                Some(Scalar::Str("EMP-002".to_string())),
                Some(Scalar::Str("EMP-003".to_string())),
                Some(Scalar::Str("EMP-004".to_string())),
            ],
        )
        .with_column(
            "age",
            vec![Some(Scalar::Int(25)), Some(Scalar::Int(40)), Some(Scalar::Int(33)), Some(Scalar::Int(51))],
        )
        .with_column(
            "department",
            vec![
                Some(Scalar::Str("eng".to_string())),
                Some(Scalar::Str("sales".to_string())),
                Some(Scalar::Str("eng".to_string())),
                Some(Scalar::Str("eng".to_string())),
            ],
        )
}

#[tokio::test]
async fn discover_then_verify_same_dataset_passes() {
    let provider = employee_provider();
    let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();
    let report = Verifier::new(VerifyPolicy::default()).verify(&provider, &doc).await.unwrap();
    assert!(report.all_passed(), "{report:?}");
}

#[tokio::test]
async fn document_round_trips_through_disk() {
    let provider = employee_provider();
    let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("constraints.json");
    doc.save(&path).unwrap();
    let reloaded = ConstraintDocument::load(&path).unwrap();

    let report = Verifier::new(VerifyPolicy::default()).verify(&provider, &reloaded).await.unwrap();
    assert!(report.all_passed());
}

#[tokio::test]
async fn verification_catches_a_widened_dataset() {
    let provider = employee_provider();
    let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();

    let drifted = InMemoryColumnProvider::new()
        .with_column(
            "employee_id",
            vec![Some(Scalar::Str("EMP-001".to_string())), Some(Scalar::Str("X".to_string()))],
        )
        .with_column("age", vec![Some(Scalar::Int(25)), Some(Scalar::Int(200))])
        .with_column("department", vec![Some(Scalar::Str("eng".to_string())), Some(Scalar::Str("legal".to_string()))]);

    let report = Verifier::new(VerifyPolicy::default()).verify(&drifted, &doc).await.unwrap();
    assert!(!report.all_passed());

    let age_report = report.fields.iter().find(|f| f.field == "age").unwrap();
    assert!(age_report.results.iter().any(|r| r.constraint == "max" && r.outcome == tdda::verify::Outcome::Fail));
}

#[tokio::test]
async fn detector_marks_exactly_the_failing_rows() {
    let provider = employee_provider();
    let doc = Discoverer::new(DiscoveryConfig::default()).discover(&provider).await.unwrap();

    let drifted = InMemoryColumnProvider::new()
        .with_column(
            "employee_id",
            vec![
                Some(Scalar::Str("EMP-001".to_string())),
                Some(Scalar::Str("EMP-002".to_string())),
                Some(Scalar::Str("NOT-A-CODE".to_string())),
            ],
        )
        .with_column("age", vec![Some(Scalar::Int(25)), Some(Scalar::Int(40)), Some(Scalar::Int(33))])
        .with_column(
            "department",
            vec![
                Some(Scalar::Str("eng".to_string())),
                Some(Scalar::Str("sales".to_string())),
                Some(Scalar::Str("eng".to_string())),
            ],
        );

    let table = Detector::new(DetectionPolicy::default().with_include_index(true))
        .detect(&drifted, &doc)
        .await
        .unwrap();

    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].index, Some(2));
}
