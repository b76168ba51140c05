use std::time::Duration;
use jsonpath_lib::select;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{info, warn};
use crate::core::execute::http_client;
use crate::error::LoginError;
use crate::models::role_credential::{AuthSession, RoleCredential, SessionMap};
use crate::models::setup::{LoginSetup, TargetConfig};

/// Log every roster entry in once. Roles that fail are logged and left out of the map.
pub async fn provision_sessions(target: &TargetConfig) -> anyhow::Result<SessionMap> {
    let client = http_client(Duration::from_secs(target.login.timeout_secs.max(1)))?;
    let login_url = target.url_for(&target.login.path);
    let mut sessions = SessionMap::new();
    for credential in &target.roster {
        match login(&client, &login_url, &target.login, credential).await {
            Ok(session) => {
                info!(role = %credential.role_name, "authenticated");
                sessions.insert(session);
            }
            Err(e) => {
                warn!(
                    role = %credential.role_name,
                    error = %e,
                    "login failed, role will be skipped"
                );
            }
        }
    }
    info!(authenticated = sessions.len(), roster = target.roster.len(), "sessions provisioned");
    Ok(sessions)
}

async fn login(
    client: &Client,
    login_url: &str,
    setup: &LoginSetup,
    credential: &RoleCredential,
) -> Result<AuthSession, LoginError> {
    let response = client
        .post(login_url)
        .json(&json!({
            "identifier": credential.username,
            "password": credential.password,
        }))
        .send()
        .await?;
    if response.status() != StatusCode::OK {
        return Err(LoginError::Rejected(response.status().as_u16()));
    }
    let body: Value = response
        .json()
        .await
        .map_err(|e| LoginError::MalformedBody(e.to_string()))?;

    let bearer_token = match extract_one(&body, &setup.token_jsonpath)? {
        Value::String(token) if !token.is_empty() => token.clone(),
        other => return Err(LoginError::MalformedBody(format!("token is not a string: {}", other))),
    };
    let identity = extract_one(&body, &setup.identity_jsonpath)?.clone();

    if let Some(role_id) = identity.get("roleId").and_then(Value::as_u64) {
        if role_id != u64::from(credential.role_id) {
            warn!(
                role = %credential.role_name,
                expected = credential.role_id,
                actual = role_id,
                "login identity carries a different role id"
            );
        }
    }

    Ok(AuthSession {
        role_name: credential.role_name.clone(),
        bearer_token,
        identity,
    })
}

// exactly one match is required
fn extract_one<'a>(body: &'a Value, path: &'a str) -> Result<&'a Value, LoginError> {
    let matches = select(body, path)
        .map_err(|e| LoginError::MalformedBody(format!("{} ({:?})", path, e)))?;
    match matches.as_slice() {
        [] => Err(LoginError::MalformedBody(format!("{} matched nothing", path))),
        [one] => Ok(*one),
        _ => Err(LoginError::MalformedBody(format!("{} matched more than one value", path))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_login(
        server: &MockServer,
        username: &str,
        password: &str,
        token: &str,
        role_id: u32,
    ) {
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({"identifier": username, "password": password})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": token,
                "user": {"id": role_id * 10, "email": username, "roleId": role_id}
            })))
            .mount(server)
            .await;
    }

    fn target_for(server: &MockServer) -> TargetConfig {
        TargetConfig { base_url: server.uri(), ..TargetConfig::default() }
    }

    #[tokio::test]
    async fn wrong_password_drops_only_that_role() {
        let server = MockServer::start().await;
        let mut target = target_for(&server);
        for credential in &target.roster {
            mount_login(
                &server,
                &credential.username,
                &credential.password,
                &format!("tok-{}", credential.role_name),
                credential.role_id,
            )
            .await;
        }
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "invalid credentials"})),
            )
            .with_priority(10)
            .mount(&server)
            .await;
        target.roster[3].password = "wrong".to_string();

        let sessions = provision_sessions(&target).await.unwrap();

        assert_eq!(sessions.len(), 4);
        assert!(sessions.get("parent").is_none());
        let teacher = sessions.get("teacher").unwrap();
        assert_eq!(teacher.bearer_token, "tok-teacher");
        assert_eq!(teacher.identity["roleId"], 2);
    }

    #[tokio::test]
    async fn malformed_body_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let sessions = provision_sessions(&target_for(&server)).await.unwrap();
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"id": 1}})))
            .mount(&server)
            .await;
        let target = target_for(&server);
        let client = http_client(Duration::from_secs(2)).unwrap();

        let url = target.url_for("/api/auth/login");
        let err = login(&client, &url, &target.login, &target.roster[0]).await.unwrap_err();
        assert!(matches!(err, LoginError::MalformedBody(_)));
    }

    #[tokio::test]
    async fn custom_jsonpath_locates_nested_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"accessToken": "nested", "profile": {"id": 7}}
            })))
            .mount(&server)
            .await;
        let mut target = target_for(&server);
        target.login = LoginSetup {
            path: "/auth/session".to_string(),
            token_jsonpath: "$.data.accessToken".to_string(),
            identity_jsonpath: "$.data.profile".to_string(),
            timeout_secs: 2,
        };

        let sessions = provision_sessions(&target).await.unwrap();
        assert_eq!(sessions.len(), 5);
        assert_eq!(sessions.get("admin").unwrap().bearer_token, "nested");
        assert_eq!(sessions.get("admin").unwrap().identity, json!({"id": 7}));
    }

    #[tokio::test]
    async fn unreachable_login_endpoint_yields_empty_map() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = TargetConfig {
            base_url: format!("http://127.0.0.1:{}", port),
            ..TargetConfig::default()
        };
        let sessions = provision_sessions(&target).await.unwrap();
        assert!(sessions.is_empty());
    }
}
