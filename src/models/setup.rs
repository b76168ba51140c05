use std::path::Path;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::models::api_endpoint::{EndpointSpec, HttpMethod};
use crate::models::role_credential::RoleCredential;

/// Where the login endpoint lives and how to read its response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginSetup {
    pub path: String,
    pub token_jsonpath: String,
    pub identity_jsonpath: String,
    pub timeout_secs: u64,
}

impl Default for LoginSetup {
    fn default() -> Self {
        LoginSetup {
            path: "/api/auth/login".to_string(),
            token_jsonpath: "$.token".to_string(),
            identity_jsonpath: "$.user".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Event names spoken over the duplex channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuplexProtocol {
    pub url: Option<String>,
    pub subscribe_event: String,
    pub ack_event: String,
    pub topics: Vec<String>,
    pub push_events: Vec<String>,
    pub error_events: Vec<String>,
    // roles that open duplex connections; empty means every provisioned role
    pub roles: Vec<String>,
}

impl Default for DuplexProtocol {
    fn default() -> Self {
        DuplexProtocol {
            url: None,
            subscribe_event: "subscribe".to_string(),
            ack_event: "subscribed".to_string(),
            topics: vec!["grades".to_string(), "announcements".to_string()],
            push_events: vec![
                "grade:updated".to_string(),
                "announcement:created".to_string(),
                "attendance:marked".to_string(),
            ],
            error_events: vec!["error".to_string(), "connect_error".to_string()],
            roles: Vec::new(),
        }
    }
}

/// Description of the service under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetConfig {
    pub base_url: String,
    pub login: LoginSetup,
    pub roster: Vec<RoleCredential>,
    pub public_endpoints: Vec<EndpointSpec>,
    pub authenticated_endpoints: Vec<EndpointSpec>,
    pub duplex: DuplexProtocol,
    // path of the endpoint driven by HTTP stress escalation
    pub stress_endpoint: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetConfig {
            base_url: "http://localhost:3000".to_string(),
            login: LoginSetup::default(),
            roster: vec![
                RoleCredential::new("admin", "admin@school.test", "admin123", 1),
                RoleCredential::new("teacher", "teacher@school.test", "teacher123", 2),
                RoleCredential::new("student", "student@school.test", "student123", 3),
                RoleCredential::new("parent", "parent@school.test", "parent123", 4),
                RoleCredential::new("staff", "staff@school.test", "staff123", 5),
            ],
            public_endpoints: vec![
                EndpointSpec::get("/api/health", "Health check"),
                EndpointSpec::get("/api/announcements/public", "Public announcements"),
            ],
            authenticated_endpoints: vec![
                EndpointSpec::get("/api/auth/me", "Current user"),
                EndpointSpec::get("/api/classes", "Class list"),
                EndpointSpec::get("/api/users", "User directory").with_roles(&["admin", "staff"]),
                EndpointSpec::get("/api/grades", "Grades")
                    .with_roles(&["admin", "teacher", "student", "parent"]),
                EndpointSpec::get("/api/report-cards", "Report cards")
                    .with_roles(&["admin", "teacher", "parent"]),
                EndpointSpec::get("/api/attendance", "Attendance")
                    .with_roles(&["admin", "teacher", "staff"]),
                EndpointSpec::get("/api/notifications", "Notifications"),
                EndpointSpec::get("/api/grades", "Record grade")
                    .with_method(HttpMethod::Post)
                    .with_roles(&["teacher"])
                    .with_body(json!({
                        "studentId": 1,
                        "subjectId": 1,
                        "score": 88,
                        "term": "load-test"
                    })),
            ],
            duplex: DuplexProtocol::default(),
            stress_endpoint: None,
        }
    }
}

impl TargetConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading target config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing target config {}", path.display()))
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Explicit duplex URL, or the base URL with a ws scheme and `/ws` path.
    pub fn duplex_url(&self) -> String {
        if let Some(url) = &self.duplex.url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/ws", base)
    }

    /// Endpoint used for HTTP stress escalation: the configured path,
    /// else the first public endpoint.
    pub fn stress_target(&self) -> Option<&EndpointSpec> {
        match &self.stress_endpoint {
            Some(path) => self
                .public_endpoints
                .iter()
                .chain(self.authenticated_endpoints.iter())
                .find(|e| &e.path == path),
            None => self.public_endpoints.first(),
        }
    }

    pub fn duplex_roles(&self) -> Vec<String> {
        if self.duplex.roles.is_empty() {
            self.roster.iter().map(|c| c.role_name.clone()).collect()
        } else {
            self.duplex.roles.clone()
        }
    }
}
