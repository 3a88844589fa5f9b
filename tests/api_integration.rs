use office_docs::api::AppState;
use office_docs::store::OrganizationStore;
use office_docs::{serve_app, MemoryStore, OrganizationId};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
    user_id: Option<&'static str>,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            user_id: None,
        }
    }

    fn as_user(&self, user_id: &'static str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            user_id: Some(user_id),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.user_id {
            Some(user_id) => builder.header("x-user-id", user_id),
            None => builder,
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::POST, path)
            .json(&json)
            .send()
            .await
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::PUT, path)
            .json(&json)
            .send()
            .await
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::GET, path).send().await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::DELETE, path).send().await
    }
}

/// Start the API on an ephemeral port backed by a fresh in-memory store
async fn spawn_app() -> (TestClient, Arc<MemoryStore>, OrganizationId) {
    let store = Arc::new(MemoryStore::new());
    let org = store.add_organization("Contoso Legal");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let state = AppState::new(Arc::clone(&store), "test");
    tokio::spawn(async move {
        serve_app(listener, state).await.unwrap();
    });

    (TestClient::new(format!("http://{}", address)), store, org)
}

fn lease_document() -> Value {
    json!({
        "partitionKey": "tenant-a",
        "name": "Lease agreement",
        "fileName": "lease.pdf",
        "fileSize": 2048,
        "mimeType": "application/pdf",
        "blobUrl": "https://files.example.com/lease.pdf",
        "metadata": {
            "createdBy": "alice",
            "createdAt": "2024-05-01T10:00:00Z"
        }
    })
}

#[tokio::test]
async fn test_health_endpoints() {
    let (client, _, _) = spawn_app().await;

    for path in ["/", "/health"] {
        let response = client.get(path).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["services"]["storage"], "ok");
        assert!(body["timestamp"].as_str().is_some());
    }
}

#[tokio::test]
async fn test_document_defaults_survive_create_and_get() {
    let (client, _, _) = spawn_app().await;

    let response = client.post("/documents", lease_document()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();

    assert!(!created["id"].as_str().unwrap().is_empty());
    assert_eq!(created["status"], "draft");
    assert_eq!(created["metadata"]["version"], 1);
    assert_eq!(created["metadata"]["priority"], "low");
    assert_eq!(created["metadata"]["isLocked"], false);
    assert_eq!(created["tags"], json!([]));
    assert_eq!(created["permissions"]["owners"], json!([]));

    let id = created["id"].as_str().unwrap();
    let fetched: Value = client
        .get(&format!("/documents/{}?pk=tenant-a", id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, created);

    let missing = client
        .get(&format!("/documents/{}?pk=tenant-b", id))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_document_is_rejected_without_a_write() {
    let (client, _, _) = spawn_app().await;

    let mut document = lease_document();
    document["blobUrl"] = json!("not a url");
    document.as_object_mut().unwrap().remove("name");

    let response = client.post("/documents", document).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["fieldErrors"]["name"], json!(["Required"]));
    assert!(body["error"]["fieldErrors"]["blobUrl"].is_array());

    let listed: Vec<Value> = client.get("/documents").await.unwrap().json().await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_document_list_filters_by_tenant_and_status() {
    let (client, _, _) = spawn_app().await;

    client.post("/documents", lease_document()).await.unwrap();
    let mut approved = lease_document();
    approved["partitionKey"] = json!("tenant-b");
    approved["status"] = json!("approved");
    approved["metadata"]["createdAt"] = json!("2024-06-01T10:00:00Z");
    client.post("/documents", approved).await.unwrap();

    let all: Vec<Value> = client.get("/documents").await.unwrap().json().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["partitionKey"], "tenant-b");

    let tenant_a: Vec<Value> = client
        .get("/documents?tenantId=tenant-a")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tenant_a.len(), 1);

    let approved_only: Vec<Value> = client
        .get("/documents?status=approved")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(approved_only.len(), 1);
    assert_eq!(approved_only[0]["status"], "approved");
}

#[tokio::test]
async fn test_document_update_merges_and_bumps_version() {
    let (client, _, _) = spawn_app().await;
    let client = client.as_user("carol");

    let created: Value = client
        .post("/documents", lease_document())
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let response = client
        .put(
            &format!("/documents/{}", id),
            json!({ "partitionKey": "tenant-a", "name": "Lease v2", "id": "hijacked" }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();

    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["name"], "Lease v2");
    assert_eq!(updated["fileName"], "lease.pdf");
    assert_eq!(updated["metadata"]["version"], 2);
    assert_eq!(updated["metadata"]["modifiedBy"], "carol");

    let missing = client
        .put(
            "/documents/does-not-exist?pk=tenant-a",
            json!({ "name": "Ghost" }),
        )
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stale_version_and_foreign_lock_block_updates() {
    let (client, _, _) = spawn_app().await;

    let created: Value = client
        .post("/documents", lease_document())
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let mut stale_metadata = created["metadata"].clone();
    stale_metadata["version"] = json!(7);
    let stale = client
        .put(
            &format!("/documents/{}?pk=tenant-a", id),
            json!({ "metadata": stale_metadata }),
        )
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::CONFLICT);

    let mut locked = lease_document();
    locked["metadata"]["isLocked"] = json!(true);
    locked["metadata"]["lockedBy"] = json!("bob");
    let locked: Value = client
        .post("/documents", locked)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let locked_path = format!("/documents/{}?pk=tenant-a", locked["id"].as_str().unwrap());

    let by_alice = client
        .as_user("alice")
        .put(&locked_path, json!({ "name": "Mine now" }))
        .await
        .unwrap();
    assert_eq!(by_alice.status(), StatusCode::LOCKED);

    let by_bob = client
        .as_user("bob")
        .put(&locked_path, json!({ "name": "Still mine" }))
        .await
        .unwrap();
    assert_eq!(by_bob.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_document_delete_is_always_no_content() {
    let (client, _, _) = spawn_app().await;

    let created: Value = client
        .post("/documents", lease_document())
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let path = format!("/documents/{}?pk=tenant-a", created["id"].as_str().unwrap());

    assert_eq!(client.delete(&path).await.unwrap().status(), StatusCode::NO_CONTENT);
    assert_eq!(client.get(&path).await.unwrap().status(), StatusCode::NOT_FOUND);
    assert_eq!(client.delete(&path).await.unwrap().status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_office_lifecycle_with_partial_update() {
    let (client, _, org) = spawn_app().await;

    let response = client
        .post(
            "/offices",
            json!({ "name": "Riga HQ", "city": "Riga", "country": "Latvia", "isActive": false }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let office: Value = response.json().await.unwrap();
    assert_eq!(office["isActive"], true);
    assert_eq!(office["organizationId"], org.to_string());

    let path = format!("/offices/{}", office["id"].as_str().unwrap());
    let updated: Value = client
        .put(&path, json!({ "city": "Jurmala" }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["city"], "Jurmala");
    assert_eq!(updated["name"], "Riga HQ");
    assert_eq!(updated["country"], "Latvia");

    let listed: Vec<Value> = client.get("/offices").await.unwrap().json().await.unwrap();
    assert_eq!(listed.len(), 1);

    assert_eq!(client.delete(&path).await.unwrap().status(), StatusCode::NO_CONTENT);
    assert_eq!(client.get(&path).await.unwrap().status(), StatusCode::NOT_FOUND);

    let too_long = client
        .post("/offices", json!({ "name": "x".repeat(101) }))
        .await
        .unwrap();
    assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_departments_and_clients_crud() {
    let (client, _, _) = spawn_app().await;

    let department: Value = client
        .post("/departments", json!({ "name": "Litigation" }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let department_path = format!("/departments/{}", department["id"].as_str().unwrap());
    let renamed: Value = client
        .put(&department_path, json!({ "description": "Court work" }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(renamed["name"], "Litigation");
    assert_eq!(renamed["description"], "Court work");

    let bad_email = client
        .post(
            "/users/clients",
            json!({ "firstName": "Ada", "lastName": "Lovelace", "email": "nope" }),
        )
        .await
        .unwrap();
    assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);
    let body: Value = bad_email.json().await.unwrap();
    assert_eq!(body["error"]["fieldErrors"]["email"], json!(["Invalid email"]));

    let response = client
        .post(
            "/users/clients",
            json!({ "firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com" }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    let client_path = format!("/users/clients/{}", created["id"].as_str().unwrap());

    let fetched: Value = client.get(&client_path).await.unwrap().json().await.unwrap();
    assert_eq!(fetched["email"], "ada@example.com");
    assert_eq!(client.delete(&client_path).await.unwrap().status(), StatusCode::NO_CONTENT);

    let missing = client
        .put(&client_path, json!({ "phone": "+371 2000 0000" }))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rows_follow_the_organization_header() {
    let (client, store, _) = spawn_app().await;
    let other = store.add_organization("Fabrikam");

    client
        .post("/offices", json!({ "name": "Default office" }))
        .await
        .unwrap();

    let scoped: Vec<Value> = client
        .client
        .get(format!("{}/offices", client.base_url))
        .header("x-organization-id", other.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(scoped.is_empty());

    let invalid = client
        .client
        .get(format!("{}/offices", client.base_url))
        .header("x-organization-id", "not-a-uuid")
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_directory_sync_is_idempotent() {
    let (client, _, _) = spawn_app().await;

    let batch = json!({
        "users": [
            { "id": "aad-1", "displayName": "Ada", "mail": "ada@contoso.com" },
            { "id": "aad-2", "displayName": "Grace", "userPrincipalName": "grace@contoso.com" }
        ]
    });

    for _ in 0..2 {
        let response = client.post("/users/sync-azure-ad", batch.clone()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "updated": 2 }));
    }

    let cached: Vec<Value> = client.get("/users/azure-ad").await.unwrap().json().await.unwrap();
    assert_eq!(cached.len(), 2);
    let grace = cached
        .iter()
        .find(|entry| entry["azureAdUserId"] == "aad-2")
        .unwrap();
    assert_eq!(grace["email"], "grace@contoso.com");
}

#[tokio::test]
async fn test_failed_directory_sync_changes_nothing() {
    let (client, _, _) = spawn_app().await;

    client
        .post(
            "/users/sync-azure-ad",
            json!({ "users": [{ "id": "aad-1", "displayName": "Ada" }] }),
        )
        .await
        .unwrap();

    let response = client
        .post(
            "/users/sync-azure-ad",
            json!({ "users": [
                { "id": "aad-1", "displayName": "Ada Renamed" },
                { "id": "aad-3", "displayName": "New" },
                { "displayName": "No id" }
            ] }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Sync failed" }));

    let cached: Vec<Value> = client.get("/users/azure-ad").await.unwrap().json().await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0]["displayName"], "Ada");
}

#[tokio::test]
async fn test_malformed_sync_records_fail_the_batch() {
    let (client, _, _) = spawn_app().await;

    let badly_typed = client
        .post(
            "/users/sync-azure-ad",
            json!({ "users": [{ "id": "aad-1", "displayName": "Anna" }, { "id": 42 }] }),
        )
        .await
        .unwrap();
    assert_eq!(badly_typed.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let not_a_list = client
        .post("/users/sync-azure-ad", json!({ "users": "abc" }))
        .await
        .unwrap();
    assert_eq!(not_a_list.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = not_a_list.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Sync failed" }));

    let oversized = client
        .post(
            "/users/sync-azure-ad",
            json!({ "users": [{ "id": "aad-2", "displayName": "N".repeat(500) }] }),
        )
        .await
        .unwrap();
    assert_eq!(oversized.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let cached: Vec<Value> = client.get("/users/azure-ad").await.unwrap().json().await.unwrap();
    assert!(cached.is_empty());
}

#[tokio::test]
async fn test_unknown_organization_header_writes_nothing() {
    let (client, store, org) = spawn_app().await;

    let response = client
        .client
        .post(format!("{}/offices", client.base_url))
        .header("x-organization-id", "5f0c6a52-3c1e-4d0e-9a55-1b7e8f2d4c10")
        .json(&json!({ "name": "Ghost office" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let own = client
        .client
        .get(format!("{}/offices", client.base_url))
        .header("x-organization-id", org.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::OK);
    let listed: Vec<Value> = own.json().await.unwrap();
    assert!(listed.is_empty());
    assert!(!store.organization_exists(OrganizationId(uuid::Uuid::nil())).await.unwrap());
}

#[tokio::test]
async fn test_unknown_status_filter_is_rejected() {
    let (client, _, _) = spawn_app().await;

    let response = client.get("/documents?status=bogus").await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
