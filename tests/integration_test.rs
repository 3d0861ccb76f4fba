//! End-to-end checks across the public API

use tempfile::TempDir;
use user_recon::aliases::AliasPredictor;
use user_recon::anomaly::{AnomalyConfig, AnomalyDetector, AnomalyStatus};
use user_recon::config::ReconConfig;
use user_recon::entropy::{normalized_entropy, shannon_entropy};
use user_recon::features::FeatureExtractor;
use user_recon::pipeline::run_recon;
use user_recon::presence::{OfflineProbe, PresenceMap, PresenceRecord, StaticProbe};
use user_recon::similarity::SimilarityScorer;
use user_recon::trainer::ModelTrainer;
use user_recon::ReconError;

#[test]
fn test_entropy_properties() {
    assert_eq!(shannon_entropy(""), 0.0);
    assert_eq!(shannon_entropy("elhamjvdi"), shannon_entropy("ivdjmahle"));
    assert_eq!(normalized_entropy("zzzzzz"), 0.0);
    for u in ["elhamjvdi", "admin2024", "xX_dark.lord_99_Xx"] {
        assert!((0.0..=1.0).contains(&normalized_entropy(u)));
    }
}

#[test]
fn test_self_similarity() {
    let scorer = SimilarityScorer::new();
    for u in ["elhamjvdi", "admin", "Bob_99"] {
        let r = scorer.compare(u, u, None, None);
        assert_eq!(r.combined_score, 100.0, "{u}");
        assert_eq!(r.verdict, "Highly likely same user");
    }
}

#[test]
fn test_known_pair() {
    let r = SimilarityScorer::new().compare("elhamjvdi", "elham87jvdi", None, None);
    assert!(r.sequence_score > 0.7);
    assert!(r.combined_score >= 60.0);
}

#[test]
fn test_presence_boost_end_to_end() {
    let found = |names: &[&str]| -> PresenceMap {
        names
            .iter()
            .map(|n| (n.to_string(), PresenceRecord::found()))
            .collect()
    };
    let a = found(&["GitHub", "Reddit"]);
    let b = found(&["GitHub", "Reddit"]);
    let plain = SimilarityScorer::new().compare("elhamjvdi", "elham87jvdi", None, None);
    let boosted = SimilarityScorer::new().compare("elhamjvdi", "elham87jvdi", Some(&a), Some(&b));
    // every checked platform is shared: the full 30 points
    assert!((boosted.combined_score - (plain.combined_score + 30.0)).abs() < 0.011);
    assert_eq!(boosted.shared_platforms, Some(2));
    assert_eq!(boosted.verdict, "Highly likely same user");
}

#[test]
fn test_alias_generation() {
    let predictor = AliasPredictor::new();
    let variants = predictor.generate_variants("admin");
    for expected in ["admin123", "admin2024", "_admin_"] {
        assert!(variants.iter().any(|v| v == expected), "missing {expected}");
    }
    assert!(!variants.iter().any(|v| v == "admin"));
    assert_eq!(variants, predictor.generate_variants("admin"));
    for c in predictor.predict_future_aliases("admin") {
        assert!((0.0..=100.0).contains(&c.likelihood));
    }
}

#[test]
fn test_anomaly_on_username_features() {
    let usernames = [
        "alice", "bobby", "carol", "david", "emily", "frank", "grace", "henry", "irene", "jacky",
        "X9f!@kPz#Q7$wL2^",
    ];
    let matrix = FeatureExtractor::new().extract_matrix(&usernames);
    let mut detector = AnomalyDetector::with_config(AnomalyConfig {
        contamination: 0.1,
        ..Default::default()
    })
    .unwrap();
    detector.fit(&matrix).unwrap();

    let statuses = detector.batch_predict(&matrix).unwrap();
    assert_eq!(statuses.last(), Some(&AnomalyStatus::Anomaly));
    let outlier = detector.score(&matrix[10]).unwrap();
    assert!(matrix[..10]
        .iter()
        .all(|row| detector.score(row).unwrap() < outlier));
}

#[test]
fn test_predict_before_fit_is_error() {
    let detector = AnomalyDetector::new();
    let row = FeatureExtractor::new().extract("alice").to_vec();
    assert!(matches!(
        detector.predict(&row),
        Err(ReconError::NotFitted { .. })
    ));
}

#[test]
fn test_report_schema() {
    let mut presence = PresenceMap::new();
    presence.insert("GitHub".into(), PresenceRecord::found());
    presence.insert("Reddit".into(), PresenceRecord::not_found());
    presence.insert("VK".into(), PresenceRecord::unknown());
    let probe = StaticProbe::new().with("elhamjvdi", presence);

    let report = run_recon("elhamjvdi", &probe, &ReconConfig::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["username"], "elhamjvdi");
    assert!(json["timestamp"].is_string());
    let analysis = &json["analysis"];
    assert_eq!(analysis["social_presence"]["GitHub"]["found"], true);
    assert_eq!(analysis["social_presence"]["Reddit"]["found"], false);
    assert!(analysis["social_presence"]["VK"]["found"].is_null());
    assert!(analysis["entropy"]["raw"].is_f64());
    assert!(analysis["entropy"]["normalized"].is_f64());
    assert_eq!(analysis["entropy"]["class"], "Medium (balanced)");

    let aliases = analysis["predicted_aliases"].as_array().unwrap();
    assert!(!aliases.is_empty());
    for alias in aliases {
        for field in ["candidate", "similarity", "entropy_diff", "likelihood_score"] {
            assert!(alias.get(field).is_some(), "missing {field}");
        }
    }
    assert_eq!(
        analysis["anomaly_reports"].as_array().unwrap().len(),
        aliases.len()
    );
}

#[test]
fn test_offline_pipeline() {
    let report = run_recon("admin", &OfflineProbe, &ReconConfig::default()).unwrap();
    assert!(report
        .analysis
        .social_presence
        .values()
        .all(|r| r.found.is_none()));
    assert_eq!(report.analysis.patterns.verdict, "Generic/role-based");
}

#[test]
fn test_trainer_end_to_end() {
    let dir = TempDir::new().unwrap();
    let mut trainer = ModelTrainer::new(dir.path().join("models"));

    let usernames = ["elhamjvdi", "admin123", "test_user", "bot9999", "xXcoolguyXx"];
    let labels = ["personal", "generic", "generic", "bot", "personal"];

    let outcome = trainer.train_similarity(&usernames).unwrap();
    assert_eq!(outcome.status, "trained");
    let score = trainer.compare_usernames("elhamjvdi", "elham87jvdi").unwrap();
    assert!(score > 0.0 && score <= 100.0);

    trainer.train_classifier(&usernames, &labels).unwrap();
    let prediction = trainer.predict_label("admin123").unwrap();
    assert_eq!(prediction.username, "admin123");
    assert!(labels.contains(&prediction.label.as_str()));
    assert!(prediction.confidence > 0.0 && prediction.confidence <= 100.0);

    // a fresh trainer on the same directory sees the persisted artifacts
    let reader = ModelTrainer::new(dir.path().join("models"));
    assert_eq!(
        reader.compare_usernames("elhamjvdi", "elham87jvdi").unwrap(),
        score
    );
}
