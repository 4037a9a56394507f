use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = guichet_api::app::build_app("test-secret".to_string()).await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn register(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
    email: &str,
    role: Option<&str>,
) -> serde_json::Value {
    let mut body = json!({
        "name": name,
        "email": email,
        "password": "s3cret",
    });
    if let Some(role) = role {
        body["role"] = json!(role);
    }

    let res = client
        .post(format!("{base_url}/auth/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED, "register {email}");
    res.json().await.unwrap()
}

async fn login(client: &reqwest::Client, base_url: &str, email: &str) -> String {
    let res = client
        .post(format!("{base_url}/auth/login"))
        .json(&json!({ "email": email, "password": "s3cret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK, "login {email}");
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Well-formed JWT, wrong signing secret.
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": uuid::Uuid::now_v7(),
        "role": "agent",
        "iat": now,
        "exp": now + 600,
    });
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"wrong-secret"),
    )
    .unwrap();

    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(&forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reflects_the_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let user = register(&client, &srv.base_url, "Agent Ana", "ana@corp.test", Some("agent")).await;
    let token = login(&client, &srv.base_url, "ana@corp.test").await;

    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], user["id"]);
    assert_eq!(body["role"], "agent");
}

#[tokio::test]
async fn duplicate_email_registration_is_conflict() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "Bob", "bob@corp.test", None).await;

    // Same email, different case: still a conflict.
    let res = client
        .post(format!("{}/auth/register", srv.base_url))
        .json(&json!({ "name": "Bob 2", "email": "BOB@corp.test", "password": "other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn printer_broken_end_to_end() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "Rita", "rita@corp.test", None).await;
    let agent = register(&client, &srv.base_url, "Ana", "ana@corp.test", Some("agent")).await;
    register(&client, &srv.base_url, "Avi", "avi@corp.test", Some("agent")).await;

    let rita = login(&client, &srv.base_url, "rita@corp.test").await;
    let ana = login(&client, &srv.base_url, "ana@corp.test").await;
    let avi = login(&client, &srv.base_url, "avi@corp.test").await;

    // Rita opens the ticket: Pending, unassigned, creator pinned.
    let res = client
        .post(format!("{}/demandes", srv.base_url))
        .bearer_auth(&rita)
        .json(&json!({ "title": "Printer broken", "description": "3rd floor printer jams" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "pending");
    assert!(created["assigned_agent"].is_null());
    assert!(created["assigned_at"].is_null());

    // Ana self-assigns: timestamp set, status unchanged.
    let res = client
        .patch(format!("{}/demandes/{id}", srv.base_url))
        .bearer_auth(&ana)
        .json(&json!({ "assigned_agent": agent["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["assigned_agent"], agent["id"]);
    assert!(!updated["assigned_at"].is_null());
    assert_eq!(updated["status"], "pending");
    let assigned_at = updated["assigned_at"].clone();

    // Ana marks it Done: update stamp refreshed, assignment untouched.
    let res = client
        .patch(format!("{}/demandes/{id}", srv.base_url))
        .bearer_auth(&ana)
        .json(&json!({ "status": "done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let done: serde_json::Value = res.json().await.unwrap();
    assert_eq!(done["status"], "done");
    assert_eq!(done["assigned_at"], assigned_at);
    assert!(!done["updated_at"].is_null());
    assert_eq!(done["updated_by"], agent["id"]);

    // The creator may still edit the title after completion.
    let res = client
        .patch(format!("{}/demandes/{id}", srv.base_url))
        .bearer_auth(&rita)
        .json(&json!({ "title": "Printer broken (3rd floor)" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let renamed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(renamed["title"], "Printer broken (3rd floor)");
    assert_eq!(renamed["status"], "done");

    // Rita comments; a different agent (Avi) may delete that comment.
    let res = client
        .post(format!("{}/commentaires", srv.base_url))
        .bearer_auth(&rita)
        .json(&json!({ "demande_id": id, "content": "thanks, confirmed fixed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let comment: serde_json::Value = res.json().await.unwrap();
    let comment_id = comment["id"].as_str().unwrap();

    let res = client
        .delete(format!("{}/commentaires/{comment_id}", srv.base_url))
        .bearer_auth(&avi)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn workflow_fields_are_forbidden_for_regular_users() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "Rita", "rita@corp.test", None).await;
    let rita = login(&client, &srv.base_url, "rita@corp.test").await;

    let res = client
        .post(format!("{}/demandes", srv.base_url))
        .bearer_auth(&rita)
        .json(&json!({ "title": "Screen flickers" }))
        .send()
        .await
        .unwrap();
    let id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Even on her own ticket, Rita may not touch the status.
    let res = client
        .patch(format!("{}/demandes/{id}", srv.base_url))
        .bearer_auth(&rita)
        .json(&json!({ "status": "done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_change_is_ignored_without_the_grant() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let user = register(&client, &srv.base_url, "Bob", "bob@corp.test", None).await;
    register(&client, &srv.base_url, "Ana", "ana@corp.test", Some("agent")).await;
    let bob = login(&client, &srv.base_url, "bob@corp.test").await;
    let ana = login(&client, &srv.base_url, "ana@corp.test").await;
    let user_id = user["id"].as_str().unwrap();

    // Self-promotion attempt: update succeeds, role silently stays put.
    let res = client
        .patch(format!("{}/users/{user_id}", srv.base_url))
        .bearer_auth(&bob)
        .json(&json!({ "name": "Bob B", "role": "agent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["name"], "Bob B");
    assert_eq!(body["role"], "regular");

    // The same payload from an agent applies.
    let res = client
        .patch(format!("{}/users/{user_id}", srv.base_url))
        .bearer_auth(&ana)
        .json(&json!({ "role": "agent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"], "agent");
}

#[tokio::test]
async fn non_agents_only_see_their_own_demandes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "Rita", "rita@corp.test", None).await;
    register(&client, &srv.base_url, "Bob", "bob@corp.test", None).await;
    register(&client, &srv.base_url, "Ana", "ana@corp.test", Some("agent")).await;
    let rita = login(&client, &srv.base_url, "rita@corp.test").await;
    let bob = login(&client, &srv.base_url, "bob@corp.test").await;
    let ana = login(&client, &srv.base_url, "ana@corp.test").await;

    for (token, title) in [(&rita, "rita's"), (&bob, "bob's")] {
        let res = client
            .post(format!("{}/demandes", srv.base_url))
            .bearer_auth(token)
            .json(&json!({ "title": title }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .get(format!("{}/demandes", srv.base_url))
        .bearer_auth(&rita)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "rita's");

    // Fetching Bob's ticket directly is forbidden for Rita.
    let res = client
        .get(format!("{}/demandes", srv.base_url))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    let bobs_id = res.json::<serde_json::Value>().await.unwrap()["items"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let res = client
        .get(format!("{}/demandes/{bobs_id}", srv.base_url))
        .bearer_auth(&rita)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Agents see everything.
    let res = client
        .get(format!("{}/demandes", srv.base_url))
        .bearer_auth(&ana)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn deleted_demande_behaves_as_absent() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "Rita", "rita@corp.test", None).await;
    register(&client, &srv.base_url, "Ana", "ana@corp.test", Some("agent")).await;
    let rita = login(&client, &srv.base_url, "rita@corp.test").await;
    let ana = login(&client, &srv.base_url, "ana@corp.test").await;

    let res = client
        .post(format!("{}/demandes", srv.base_url))
        .bearer_auth(&rita)
        .json(&json!({ "title": "doomed" }))
        .send()
        .await
        .unwrap();
    let id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // A comment posted before the deletion survives it.
    let res = client
        .post(format!("{}/commentaires", srv.base_url))
        .bearer_auth(&rita)
        .json(&json!({ "demande_id": id, "content": "for the record" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let comment_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .delete(format!("{}/demandes/{id}", srv.base_url))
        .bearer_auth(&rita)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    // Second delete: not found. Reads and new comments: not found too,
    // even for an agent.
    let res = client
        .delete(format!("{}/demandes/{id}", srv.base_url))
        .bearer_auth(&rita)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/demandes/{id}", srv.base_url))
        .bearer_auth(&ana)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/commentaires", srv.base_url))
        .bearer_auth(&ana)
        .json(&json!({ "demande_id": id, "content": "too late" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // The pre-existing comment is still readable and deletable.
    let res = client
        .get(format!("{}/commentaires/{comment_id}", srv.base_url))
        .bearer_auth(&rita)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(format!("{}/commentaires/{comment_id}", srv.base_url))
        .bearer_auth(&rita)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn clearing_the_assignee_clears_the_timestamp() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "Rita", "rita@corp.test", None).await;
    let agent = register(&client, &srv.base_url, "Ana", "ana@corp.test", Some("agent")).await;
    let rita = login(&client, &srv.base_url, "rita@corp.test").await;
    let ana = login(&client, &srv.base_url, "ana@corp.test").await;

    let res = client
        .post(format!("{}/demandes", srv.base_url))
        .bearer_auth(&rita)
        .json(&json!({ "title": "VPN drops" }))
        .send()
        .await
        .unwrap();
    let id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .patch(format!("{}/demandes/{id}", srv.base_url))
        .bearer_auth(&ana)
        .json(&json!({ "assigned_agent": agent["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Explicit null clears both fields in the same update.
    let res = client
        .patch(format!("{}/demandes/{id}", srv.base_url))
        .bearer_auth(&ana)
        .json(&json!({ "assigned_agent": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["assigned_agent"].is_null());
    assert!(body["assigned_at"].is_null());
}

#[tokio::test]
async fn deactivated_accounts_cannot_log_in() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let user = register(&client, &srv.base_url, "Bob", "bob@corp.test", None).await;
    register(&client, &srv.base_url, "Ana", "ana@corp.test", Some("agent")).await;
    let bob = login(&client, &srv.base_url, "bob@corp.test").await;
    let ana = login(&client, &srv.base_url, "ana@corp.test").await;
    let user_id = user["id"].as_str().unwrap();

    // Only agents may deactivate.
    let res = client
        .post(format!("{}/users/{user_id}/deactivate", srv.base_url))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{}/users/{user_id}/deactivate", srv.base_url))
        .bearer_auth(&ana)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Second deactivation conflicts.
    let res = client
        .post(format!("{}/users/{user_id}/deactivate", srv.base_url))
        .bearer_auth(&ana)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": "bob@corp.test", "password": "s3cret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "inactive_account");
}

#[tokio::test]
async fn wrong_credentials_are_rejected_as_invalid() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "Bob", "bob@corp.test", None).await;

    // Wrong password for a known account.
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": "bob@corp.test", "password": "not-it" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");

    // Unknown email: same answer, nothing leaked about which half failed.
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": "nobody@corp.test", "password": "s3cret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn user_listing_is_agent_only_and_filtered() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "Rita", "rita@corp.test", None).await;
    register(&client, &srv.base_url, "Bob", "bob@other.test", None).await;
    register(&client, &srv.base_url, "Ana", "ana@corp.test", Some("agent")).await;
    let rita = login(&client, &srv.base_url, "rita@corp.test").await;
    let ana = login(&client, &srv.base_url, "ana@corp.test").await;

    let res = client
        .get(format!("{}/users", srv.base_url))
        .bearer_auth(&rita)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(format!("{}/users?email=corp&role=regular", srv.base_url))
        .bearer_auth(&ana)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["email"], "rita@corp.test");
}
