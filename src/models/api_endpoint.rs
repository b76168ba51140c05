use std::collections::BTreeSet;
use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    /// Methods that carry a JSON body on authenticated calls.
    pub fn is_mutating(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One endpoint under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    pub path: String,
    pub method: HttpMethod,
    pub display_name: String,
    // empty means every provisioned role may call it
    #[serde(default)]
    pub allowed_roles: BTreeSet<String>,
    #[serde(default)]
    pub request_body: Option<Value>,
}

impl EndpointSpec {
    pub fn get(path: &str, display_name: &str) -> Self {
        EndpointSpec {
            path: path.to_string(),
            method: HttpMethod::Get,
            display_name: display_name.to_string(),
            allowed_roles: BTreeSet::new(),
            request_body: None,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.allowed_roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn allows(&self, role: &str) -> bool {
        self.allowed_roles.is_empty() || self.allowed_roles.contains(role)
    }

    /// "GET /api/classes"
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_gate() {
        let open = EndpointSpec::get("/api/classes", "Classes");
        assert!(open.allows("student"));

        let gated = EndpointSpec::get("/api/users", "Users").with_roles(&["admin", "staff"]);
        assert!(gated.allows("admin"));
        assert!(!gated.allows("student"));
    }

    #[test]
    fn method_deserializes_uppercase() {
        let endpoint: EndpointSpec = serde_json::from_value(json!({
            "path": "/api/grades",
            "method": "POST",
            "displayName": "Create grade",
            "allowedRoles": ["teacher"],
            "requestBody": {"score": 90}
        }))
        .unwrap();
        assert_eq!(endpoint.method, HttpMethod::Post);
        assert!(endpoint.method.is_mutating());
        assert_eq!(endpoint.label(), "POST /api/grades");
        assert!(endpoint.allows("teacher"));
    }
}
