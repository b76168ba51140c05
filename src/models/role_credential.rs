use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCredential {
    pub role_name: String,
    pub username: String,
    pub password: String,
    pub role_id: u32,
}

impl RoleCredential {
    pub fn new(role_name: &str, username: &str, password: &str, role_id: u32) -> Self {
        RoleCredential {
            role_name: role_name.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            role_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub role_name: String,
    pub bearer_token: String,
    pub identity: Value,
}

/// Sessions obtained for one run, keyed by role name.
///
/// Built once by the provisioner and lent to every phase; a role that failed to
/// log in is simply absent.
#[derive(Debug, Clone, Default)]
pub struct SessionMap {
    sessions: BTreeMap<String, AuthSession>,
}

impl SessionMap {
    pub fn new() -> Self {
        SessionMap::default()
    }

    pub fn insert(&mut self, session: AuthSession) {
        self.sessions.insert(session.role_name.clone(), session);
    }

    pub fn get(&self, role: &str) -> Option<&AuthSession> {
        self.sessions.get(role)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
