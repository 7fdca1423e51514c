use std::sync::Arc;

use serde_json::Value;

use crate::core::blocklist::Blocklist;
use crate::core::request_tracker::{ActivitySnapshot, RequestTracker, TrackerLimits};
use crate::core::verdict::{AttackType, Classification, DecisionRequest, Severity, Status};
use crate::intel::{FlowFeatures, FlowScorer, ReputationClient};
use crate::utils::log_detection;

/// Path fragments that mark probing for configuration or management surfaces.
const SENSITIVE_PATHS: &[&str] = &[
    ".env",
    "/admin",
    "/.git",
    "/config",
    "/.aws",
    "/.ssh",
    "/phpmyadmin",
    "/etc/passwd",
    "/wp-admin",
];

/// SQL injection fragments, matched against the lowercased flattened payload.
const SQL_SIGNATURES: &[&str] = &[
    "' or '1'='1",
    "\" or \"1\"=\"1",
    "' or 1=1",
    "union select",
    "'--",
    ";--",
    "--",
    "; drop",
    "; delete",
    "; insert",
    "; update",
];

/// Script-injection markers. These only warn: rich-text input produces too
/// many legitimate near-matches to auto-block on.
const XSS_SIGNATURES: &[&str] = &["<script", "onerror=", "onload=", "javascript:"];

/// Known automation signatures in the user-agent header. An empty user agent
/// deliberately does not match: plenty of plain clients send none, and the
/// default classification for an otherwise clean request stays ALLOW.
const BOT_SIGNATURES: &[&str] = &[
    "curl",
    "python-requests",
    "wget",
    "bot",
    "scrapy",
    "go-http-client",
    "libwww",
];

/// Path fragments that identify authentication endpoints for the brute-force
/// counter.
const LOGIN_PATHS: &[&str] = &["login", "signin", "auth", "session"];

/// Minimum confidence before the external traffic model is trusted.
const SCORER_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Classifies one request against the attack taxonomy.
///
/// The classifier reads the blocklist and maintains its own rolling counters,
/// but never mutates the blocklist itself; acting on a BLOCK verdict is the
/// engine's job. Rules are evaluated in a fixed order and the first match
/// wins, so a strong match can never be downgraded by a weaker later one.
pub struct Classifier {
    blocklist: Arc<Blocklist>,
    tracker: RequestTracker,
    reputation: Option<ReputationClient>,
    scorer: Option<Arc<dyn FlowScorer>>,
}

impl Classifier {
    pub fn new(
        limits: TrackerLimits,
        blocklist: Arc<Blocklist>,
        reputation: Option<ReputationClient>,
        scorer: Option<Arc<dyn FlowScorer>>,
    ) -> Self {
        Self {
            blocklist,
            tracker: RequestTracker::new(limits),
            reputation,
            scorer,
        }
    }

    pub async fn classify(&self, request: &DecisionRequest) -> Classification {
        let snapshot = self
            .tracker
            .observe(
                &request.ip,
                &request.path,
                is_login_attempt(&request.path, &request.method),
            )
            .await;

        let classification = self.evaluate(request, snapshot).await;
        if classification.status != Status::Allow {
            log_detection(
                &request.ip,
                classification.attack_type.as_str(),
                classification.status.as_str(),
            );
        }
        classification
    }

    async fn evaluate(
        &self,
        request: &DecisionRequest,
        snapshot: ActivitySnapshot,
    ) -> Classification {
        // 1. An address under an active block stays blocked, whatever the
        //    request looks like. This hit does not newly trigger enforcement.
        if let Some(original) = self.blocklist.active_block(&request.ip).await {
            let attack_type = match original {
                AttackType::Normal => AttackType::RepeatOffender,
                other => other,
            };
            return Classification {
                is_blocked_now: false,
                ..Classification::block(
                    attack_type,
                    Severity::High,
                    "IP currently blocked".to_string(),
                )
            };
        }

        // 2. Sensitive path probing.
        let path = request.path.to_lowercase();
        if SENSITIVE_PATHS.iter().any(|p| path.contains(p)) {
            return Classification::block(
                AttackType::SensitivePathAccess,
                Severity::High,
                format!("Sensitive path accessed: {}", request.path),
            );
        }

        let payload_text = request
            .payload
            .as_ref()
            .map(flatten_payload)
            .unwrap_or_default();

        // 3. SQL injection outranks XSS: both can appear in one payload and
        //    the stronger verdict must win.
        if matches_any(&payload_text, SQL_SIGNATURES) {
            return Classification::block(
                AttackType::SqlInjection,
                Severity::High,
                "SQL injection pattern detected".to_string(),
            );
        }

        // 4. Script injection markers.
        if matches_any(&payload_text, XSS_SIGNATURES) {
            return Classification::warn(
                AttackType::XssAttempt,
                Severity::Medium,
                "Script injection marker detected".to_string(),
            );
        }

        let limits = self.tracker.limits();

        // 5. Brute-force login attempts.
        if snapshot.login_attempts > limits.login_threshold {
            return Classification::block(
                AttackType::BruteForceLogin,
                Severity::High,
                format!(
                    "{} login attempts within {}s",
                    snapshot.login_attempts,
                    limits.login_window.as_secs()
                ),
            );
        }

        // 6. Request flood.
        if snapshot.request_count > limits.flood_threshold {
            return Classification::block(
                AttackType::DosFlood,
                Severity::Critical,
                format!(
                    "{} requests within {}s",
                    snapshot.request_count,
                    limits.flood_window.as_secs()
                ),
            );
        }

        // 7. Directory scanning.
        if snapshot.distinct_paths > limits.scan_threshold {
            return Classification::block(
                AttackType::DirectoryScan,
                Severity::High,
                format!(
                    "{} distinct paths within {}s",
                    snapshot.distinct_paths,
                    limits.scan_window.as_secs()
                ),
            );
        }

        // 8. Automation signatures in the user agent.
        let user_agent = request.user_agent.to_lowercase();
        if !user_agent.is_empty() {
            if let Some(signature) = BOT_SIGNATURES.iter().find(|s| user_agent.contains(*s)) {
                return Classification::warn(
                    AttackType::AutomatedBot,
                    Severity::Medium,
                    format!("Automated client signature: {}", signature),
                );
            }
        }

        // 9. External intel. A failed or absent lookup is no signal, never an
        //    error.
        if let Some(classification) = self.consult_intel(request, &payload_text).await {
            return classification;
        }

        // 10. Nothing matched.
        Classification::allow()
    }

    async fn consult_intel(
        &self,
        request: &DecisionRequest,
        payload_text: &str,
    ) -> Option<Classification> {
        if let Some(reputation) = &self.reputation {
            if let Some(report) = reputation.lookup(&request.ip).await {
                if report.malicious {
                    return Some(Classification::block(
                        AttackType::ThreatIntel,
                        Severity::Critical,
                        "Address reported malicious by threat intelligence".to_string(),
                    ));
                }
            }
        }

        if let Some(scorer) = &self.scorer {
            let features = FlowFeatures {
                addr: request.ip.clone(),
                path: request.path.clone(),
                method: request.method.clone(),
                user_agent: request.user_agent.clone(),
                payload_bytes: payload_text.len(),
            };
            if let Some(prediction) = scorer.score(&features).await {
                let benign = matches!(prediction.label.as_str(), "normal" | "benign");
                if !benign && prediction.confidence >= SCORER_CONFIDENCE_THRESHOLD {
                    return Some(Classification::block(
                        AttackType::ThreatIntel,
                        Severity::Critical,
                        format!(
                            "Traffic model flagged {} ({:.2})",
                            prediction.label, prediction.confidence
                        ),
                    ));
                }
            }
        }

        None
    }
}

fn is_login_attempt(path: &str, method: &str) -> bool {
    if !method.eq_ignore_ascii_case("POST") {
        return false;
    }
    let path = path.to_lowercase();
    LOGIN_PATHS.iter().any(|p| path.contains(p))
}

fn matches_any(text: &str, signatures: &[&str]) -> bool {
    !text.is_empty() && signatures.iter().any(|s| text.contains(s))
}

/// Flatten arbitrary nested JSON into one lowercased string for signature
/// matching. Keys are included: injection fragments hide in them too. A
/// malformed or scalar payload simply flattens to its text form; flattening
/// never fails.
fn flatten_payload(value: &Value) -> String {
    let mut out = String::new();
    flatten_into(value, &mut out);
    out.to_lowercase()
}

fn flatten_into(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            out.push_str(s);
            out.push(' ');
        }
        Value::Bool(b) => {
            out.push_str(if *b { "true" } else { "false" });
            out.push(' ');
        }
        Value::Number(n) => {
            out.push_str(&n.to_string());
            out.push(' ');
        }
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                out.push_str(key);
                out.push(' ');
                flatten_into(item, out);
            }
        }
    }
}
