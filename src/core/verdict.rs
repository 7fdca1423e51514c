use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Enforcement decision for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Allow,
    Warn,
    Block,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Allow => "ALLOW",
            Status::Warn => "WARN",
            Status::Block => "BLOCK",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// The fixed attack taxonomy.
///
/// Serialized as snake_case strings so the wire format matches the taxonomy
/// keys consumers index on (`sql_injection`, `dos_flood`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    Normal,
    SensitivePathAccess,
    SqlInjection,
    XssAttempt,
    BruteForceLogin,
    DosFlood,
    DirectoryScan,
    AutomatedBot,
    ThreatIntel,
    RepeatOffender,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::Normal => "normal",
            AttackType::SensitivePathAccess => "sensitive_path_access",
            AttackType::SqlInjection => "sql_injection",
            AttackType::XssAttempt => "xss_attempt",
            AttackType::BruteForceLogin => "brute_force_login",
            AttackType::DosFlood => "dos_flood",
            AttackType::DirectoryScan => "directory_scan",
            AttackType::AutomatedBot => "automated_bot",
            AttackType::ThreatIntel => "threat_intel",
            AttackType::RepeatOffender => "repeat_offender",
        }
    }

    /// Static remediation advice attached to every verdict of this type.
    pub fn suggestion(&self) -> &'static str {
        match self {
            AttackType::Normal => "",
            AttackType::SensitivePathAccess => {
                "Restrict access to internal paths and audit exposed configuration files."
            }
            AttackType::SqlInjection => {
                "Sanitize inputs and use parameterized queries behind the WAF SQL filter."
            }
            AttackType::XssAttempt => {
                "Escape HTML output and apply a content security policy."
            }
            AttackType::BruteForceLogin => {
                "Enforce account lockout and add a CAPTCHA on the login form."
            }
            AttackType::DosFlood => {
                "Enable upstream rate limiting and consider CDN-level mitigation."
            }
            AttackType::DirectoryScan => {
                "Disable directory listings and return uniform 404 responses."
            }
            AttackType::AutomatedBot => {
                "Verify the client is a sanctioned integration or add a bot challenge."
            }
            AttackType::ThreatIntel => {
                "Keep the address blocked and review the threat feed report."
            }
            AttackType::RepeatOffender => {
                "Keep the block in place until the expiry elapses."
            }
        }
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound decision request as received on `POST /security/decision`.
///
/// Every field is optional on the wire; missing `ip` is handled by the engine
/// (it yields a WARN verdict), the rest fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    #[serde(default)]
    pub ip: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

impl DecisionRequest {
    pub fn new(ip: &str, path: &str, method: &str) -> Self {
        Self {
            ip: ip.to_string(),
            path: path.to_string(),
            method: method.to_string(),
            user_agent: String::new(),
            payload: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Classification outcome, before the engine stamps request metadata and a
/// timestamp onto it. Keeping this separate from [`Verdict`] keeps the
/// classifier free of side effects: it reports what should happen, the engine
/// makes it happen.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: Status,
    pub attack_type: AttackType,
    pub severity: Option<Severity>,
    pub reason: Option<String>,
    pub is_blocked_now: bool,
}

impl Classification {
    pub fn allow() -> Self {
        Self {
            status: Status::Allow,
            attack_type: AttackType::Normal,
            severity: Some(Severity::Low),
            reason: None,
            is_blocked_now: false,
        }
    }

    pub fn warn(attack_type: AttackType, severity: Severity, reason: String) -> Self {
        Self {
            status: Status::Warn,
            attack_type,
            severity: Some(severity),
            reason: Some(reason),
            is_blocked_now: false,
        }
    }

    pub fn block(attack_type: AttackType, severity: Severity, reason: String) -> Self {
        Self {
            status: Status::Block,
            attack_type,
            severity: Some(severity),
            reason: Some(reason),
            is_blocked_now: true,
        }
    }
}

/// The unit flowing through the pipeline: one classified request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub ip: String,
    pub path: String,
    pub method: String,
    pub status: Status,
    pub attack_type: AttackType,
    pub severity: Option<Severity>,
    pub timestamp: i64,
    pub reason: Option<String>,
    pub suggestion: String,
    pub is_blocked_now: bool,
}

impl Verdict {
    /// Assemble a verdict from a request, its classification, and a creation
    /// timestamp (unix seconds).
    pub fn from_classification(
        request: &DecisionRequest,
        classification: Classification,
        timestamp: i64,
    ) -> Self {
        Self {
            ip: request.ip.clone(),
            path: request.path.clone(),
            method: request.method.clone(),
            status: classification.status,
            attack_type: classification.attack_type,
            severity: classification.severity,
            timestamp,
            reason: classification.reason,
            suggestion: classification.attack_type.suggestion().to_string(),
            is_blocked_now: classification.is_blocked_now,
        }
    }

    /// Verdict returned when the request carries no source address.
    pub fn missing_ip(request: &DecisionRequest, timestamp: i64) -> Self {
        Self {
            ip: String::new(),
            path: request.path.clone(),
            method: request.method.clone(),
            status: Status::Warn,
            attack_type: AttackType::Normal,
            severity: None,
            timestamp,
            reason: Some("Missing ip".to_string()),
            suggestion: String::new(),
            is_blocked_now: false,
        }
    }

    /// Storage identity: repeated identical verdicts for the same address and
    /// attack within one minute collapse into a single stored record.
    pub fn dedup_key(&self) -> String {
        format!("{}_{}_{}", self.ip, self.attack_type, self.timestamp / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_buckets_by_minute() {
        let req = DecisionRequest::new("1.2.3.4", "/x", "GET");
        let mut a = Verdict::from_classification(&req, Classification::allow(), 120);
        let b = Verdict::from_classification(&req, Classification::allow(), 179);
        let c = Verdict::from_classification(&req, Classification::allow(), 180);
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_ne!(b.dedup_key(), c.dedup_key());

        a.attack_type = AttackType::SqlInjection;
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn wire_format_matches_consumers() {
        let req = DecisionRequest::new("1.2.3.4", "/api/users", "POST");
        let verdict = Verdict::from_classification(
            &req,
            Classification::block(
                AttackType::SqlInjection,
                Severity::High,
                "SQL injection pattern detected".to_string(),
            ),
            60,
        );
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["status"], "BLOCK");
        assert_eq!(json["attack_type"], "sql_injection");
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["is_blocked_now"], true);
        assert_eq!(json["suggestion"], AttackType::SqlInjection.suggestion());
    }

    #[test]
    fn request_defaults_fill_missing_fields() {
        let req: DecisionRequest = serde_json::from_str(r#"{"ip":"8.8.8.8"}"#).unwrap();
        assert_eq!(req.path, "/");
        assert_eq!(req.method, "GET");
        assert!(req.user_agent.is_empty());
        assert!(req.payload.is_none());
    }
}
