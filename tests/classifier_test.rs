mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use threat_decision_engine::core::{
    AttackType, Blocklist, Classifier, DecisionRequest, Severity, Status, TrackerLimits,
};

use common::test_engine;

const BLOCK_DURATION: Duration = Duration::from_secs(600);

#[tokio::test]
async fn clean_request_is_allowed() {
    let (engine, blocklist, _) = test_engine(BLOCK_DURATION);
    let verdict = engine
        .decide(DecisionRequest::new("8.8.8.8", "/api/products", "GET"))
        .await;

    assert_eq!(verdict.status, Status::Allow);
    assert_eq!(verdict.attack_type, AttackType::Normal);
    assert_eq!(verdict.severity, Some(Severity::Low));
    assert!(!verdict.is_blocked_now);
    assert!(!blocklist.is_blocked("8.8.8.8").await);
}

#[tokio::test]
async fn sql_injection_blocks_and_persists_across_requests() {
    let (engine, blocklist, _) = test_engine(BLOCK_DURATION);
    let attack = DecisionRequest::new("192.168.1.100", "/api/users", "POST")
        .with_user_agent("curl/7.68.0")
        .with_payload(json!({"username": "admin' OR '1'='1", "password": "anything"}));

    let verdict = engine.decide(attack).await;
    assert_eq!(verdict.status, Status::Block);
    assert_eq!(verdict.attack_type, AttackType::SqlInjection);
    assert_eq!(verdict.severity, Some(Severity::High));
    assert!(verdict.is_blocked_now);
    assert!(blocklist.is_blocked("192.168.1.100").await);

    // A follow-up benign request from the same address stays blocked without
    // re-matching any payload content.
    let repeat = engine
        .decide(DecisionRequest::new("192.168.1.100", "/api/products", "GET"))
        .await;
    assert_eq!(repeat.status, Status::Block);
    assert_eq!(repeat.attack_type, AttackType::SqlInjection);
    assert_eq!(repeat.reason.as_deref(), Some("IP currently blocked"));
    assert!(!repeat.is_blocked_now);
}

#[tokio::test]
async fn xss_warns_without_blocklisting() {
    let (engine, blocklist, _) = test_engine(BLOCK_DURATION);
    let verdict = engine
        .decide(
            DecisionRequest::new("10.0.0.50", "/search", "GET")
                .with_payload(json!({"q": "<script>alert(1)</script>"})),
        )
        .await;

    assert_eq!(verdict.status, Status::Warn);
    assert_eq!(verdict.attack_type, AttackType::XssAttempt);
    assert_eq!(verdict.severity, Some(Severity::Medium));
    assert!(!blocklist.is_blocked("10.0.0.50").await);
}

#[tokio::test]
async fn sensitive_path_access_is_blocked() {
    let (engine, _, _) = test_engine(BLOCK_DURATION);
    let verdict = engine
        .decide(DecisionRequest::new("172.16.0.1", "/admin", "GET"))
        .await;

    assert_eq!(verdict.status, Status::Block);
    assert_eq!(verdict.attack_type, AttackType::SensitivePathAccess);
    assert_eq!(verdict.severity, Some(Severity::High));
    assert!(verdict.is_blocked_now);
}

#[tokio::test]
async fn sql_injection_outranks_xss() {
    let (engine, _, _) = test_engine(BLOCK_DURATION);
    let verdict = engine
        .decide(DecisionRequest::new("10.1.1.1", "/search", "POST").with_payload(json!({
            "q": "<script>alert(1)</script>",
            "id": "1 UNION SELECT password FROM users",
        })))
        .await;

    assert_eq!(verdict.attack_type, AttackType::SqlInjection);
    assert_eq!(verdict.status, Status::Block);
}

#[tokio::test]
async fn bot_user_agent_warns_but_empty_one_does_not() {
    let (engine, _, _) = test_engine(BLOCK_DURATION);

    let bot = engine
        .decide(
            DecisionRequest::new("10.2.2.2", "/api/items", "GET")
                .with_user_agent("python-requests/2.28"),
        )
        .await;
    assert_eq!(bot.status, Status::Warn);
    assert_eq!(bot.attack_type, AttackType::AutomatedBot);

    let bare = engine
        .decide(DecisionRequest::new("10.2.2.3", "/api/items", "GET"))
        .await;
    assert_eq!(bare.status, Status::Allow);
}

#[tokio::test]
async fn repeated_login_failures_trigger_brute_force_block() {
    let (engine, _, _) = test_engine(BLOCK_DURATION);

    for _ in 0..10 {
        let verdict = engine
            .decide(
                DecisionRequest::new("10.3.3.3", "/api/login", "POST")
                    .with_user_agent("Mozilla/5.0"),
            )
            .await;
        assert_eq!(verdict.status, Status::Allow);
    }

    let verdict = engine
        .decide(
            DecisionRequest::new("10.3.3.3", "/api/login", "POST").with_user_agent("Mozilla/5.0"),
        )
        .await;
    assert_eq!(verdict.status, Status::Block);
    assert_eq!(verdict.attack_type, AttackType::BruteForceLogin);
    assert_eq!(verdict.severity, Some(Severity::High));
}

#[tokio::test]
async fn request_flood_triggers_critical_block() {
    let (engine, _, _) = test_engine(BLOCK_DURATION);

    for _ in 0..200 {
        let verdict = engine
            .decide(DecisionRequest::new("10.4.4.4", "/", "GET").with_user_agent("Mozilla/5.0"))
            .await;
        assert_eq!(verdict.status, Status::Allow);
    }

    let verdict = engine
        .decide(DecisionRequest::new("10.4.4.4", "/", "GET").with_user_agent("Mozilla/5.0"))
        .await;
    assert_eq!(verdict.status, Status::Block);
    assert_eq!(verdict.attack_type, AttackType::DosFlood);
    assert_eq!(verdict.severity, Some(Severity::Critical));
}

#[tokio::test]
async fn scanning_many_paths_triggers_directory_scan_block() {
    let (engine, _, _) = test_engine(BLOCK_DURATION);

    for i in 0..20 {
        let verdict = engine
            .decide(
                DecisionRequest::new("10.5.5.5", &format!("/page-{i}"), "GET")
                    .with_user_agent("Mozilla/5.0"),
            )
            .await;
        assert_eq!(verdict.status, Status::Allow);
    }

    let verdict = engine
        .decide(
            DecisionRequest::new("10.5.5.5", "/page-20", "GET").with_user_agent("Mozilla/5.0"),
        )
        .await;
    assert_eq!(verdict.status, Status::Block);
    assert_eq!(verdict.attack_type, AttackType::DirectoryScan);
}

#[tokio::test]
async fn block_expires_and_normal_classification_resumes() {
    let (engine, blocklist, _) = test_engine(Duration::from_millis(50));

    engine
        .decide(DecisionRequest::new("10.6.6.6", "/admin", "GET"))
        .await;
    assert!(blocklist.is_blocked("10.6.6.6").await);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let verdict = engine
        .decide(DecisionRequest::new("10.6.6.6", "/api/products", "GET"))
        .await;
    assert_eq!(verdict.status, Status::Allow);
    assert_eq!(verdict.attack_type, AttackType::Normal);
}

#[tokio::test]
async fn identical_state_yields_identical_classifications() {
    let request = DecisionRequest::new("10.7.7.7", "/api/users", "POST")
        .with_user_agent("curl/7.68.0")
        .with_payload(json!({"username": "admin' OR '1'='1"}));

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let classifier = Classifier::new(
            TrackerLimits::default(),
            Arc::new(Blocklist::new()),
            None,
            None,
        );
        outcomes.push(classifier.classify(&request).await);
    }
    assert_eq!(outcomes[0], outcomes[1]);
}
