use mockito::Matcher;
use serde_json::{Map, Value, json};
use std::time::Duration;

use statping_provisioner::models::{CheckEntry, CheckType};
use statping_provisioner::reconciler::{Outcome, Reconciler};
use statping_provisioner::remote::statping::StatpingClient;
use statping_provisioner::remote::{RemoteStore, StoreError};

const TOKEN: &str = "secret-token";

fn client_for(server: &mockito::ServerGuard) -> StatpingClient {
    StatpingClient::new(&server.url(), TOKEN, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_list_groups_sends_bearer_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/groups")
        .match_header("authorization", "Bearer secret-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {"id": 1, "name": "Web", "public": true, "order_id": 0},
                {"id": 2, "name": "Infra", "public": false}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let groups = client_for(&server).list_groups().await.unwrap();

    mock.assert_async().await;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].name, "Infra");
    assert_eq!(groups[1].resolved_id(), Some(2));
    assert_eq!(groups[1].public, Some(false));
}

#[tokio::test]
async fn test_null_listing_is_empty() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/services")
        .with_status(200)
        .with_body("null")
        .create_async()
        .await;

    let checks = client_for(&server).list_checks().await.unwrap();

    assert!(checks.is_empty());
}

#[tokio::test]
async fn test_listing_failure_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/services")
        .with_status(401)
        .with_body(r#"{"error":"unauthorized"}"#)
        .create_async()
        .await;

    let result = client_for(&server).list_checks().await;

    match result {
        Err(StoreError::UnexpectedStatus { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("unauthorized"));
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_group_returns_assigned_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/groups")
        .match_body(Matcher::Json(json!({"name": "Web", "public": false})))
        .with_status(200)
        .with_body(r#"{"status":"success","type":"group","method":"create","id":42}"#)
        .create_async()
        .await;

    let group = client_for(&server).create_group("Web", false).await.unwrap();

    mock.assert_async().await;
    assert_eq!(group.resolved_id(), Some(42));
    assert_eq!(group.name, "Web");
}

#[tokio::test]
async fn test_create_group_without_id_is_unresolved() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/groups")
        .with_status(200)
        .with_body(r#"{"status":"error","error":"name taken"}"#)
        .create_async()
        .await;

    let group = client_for(&server).create_group("Web", true).await.unwrap();

    assert_eq!(group.resolved_id(), None);
}

#[tokio::test]
async fn test_create_check_posts_full_spec() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/services")
        .match_body(Matcher::PartialJson(json!({
            "name": "db",
            "domain": "10.0.0.5",
            "type": "tcp",
            "port": 5432,
            "method": "GET",
            "expected_status": 200,
            "group_id": 3
        })))
        .with_status(200)
        .with_body(r#"{"status":"success"}"#)
        .create_async()
        .await;

    let spec = CheckEntry {
        check_type: Some(CheckType::Tcp),
        port: Some(5432),
        ..CheckEntry::new("db", "10.0.0.5")
    }
    .resolve(3);

    client_for(&server).create_check(&spec).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_only_status_200_counts_as_success() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/services")
        .with_status(201)
        .with_body("created elsewhere")
        .create_async()
        .await;

    let spec = CheckEntry::new("api", "https://api.example.com").resolve(1);
    let result = client_for(&server).create_check(&spec).await;

    assert!(matches!(
        result,
        Err(StoreError::UnexpectedStatus { status: 201, .. })
    ));
}

#[tokio::test]
async fn test_update_check_targets_the_service_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/services/12")
        .match_header("authorization", "Bearer secret-token")
        .match_body(Matcher::PartialJson(json!({"name": "api", "group_id": 5})))
        .with_status(200)
        .with_body(
            json!({
                "status": "success",
                "output": {"id": 12, "name": "api", "group_id": 5, "online": true}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let body = CheckEntry::new("api", "https://api.example.com")
        .resolve(5)
        .to_body();
    let updated = client_for(&server).update_check(12, &body).await.unwrap();

    mock.assert_async().await;
    assert_eq!(updated.id, 12);
    assert_eq!(updated.group_id, Some(5));
}

#[tokio::test]
async fn test_update_check_falls_back_to_request_when_output_missing() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/services/8")
        .with_status(200)
        .with_body(r#"{"status":"success"}"#)
        .create_async()
        .await;

    let body = CheckEntry::new("api", "https://api.example.com")
        .resolve(2)
        .to_body();
    let updated = client_for(&server).update_check(8, &body).await.unwrap();

    assert_eq!(updated.id, 8);
    assert_eq!(updated.name, "api");
    assert_eq!(updated.group_id, Some(2));
}

#[tokio::test]
async fn test_update_without_identity_never_hits_the_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let client = client_for(&server);

    let body = CheckEntry::new("api", "https://api.example.com")
        .resolve(2)
        .to_body();
    let no_id = client.update_check(0, &body).await;
    let no_body = client.update_check(8, &Map::<String, Value>::new()).await;

    assert!(matches!(no_id, Err(StoreError::MissingIdentity)));
    assert!(matches!(no_body, Err(StoreError::MissingIdentity)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_failure_is_a_network_error() {
    let client =
        StatpingClient::new("http://127.0.0.1:1", TOKEN, Duration::from_secs(2)).unwrap();

    let result = client.list_groups().await;

    assert!(matches!(result, Err(StoreError::Network(_))));
}

#[tokio::test]
async fn test_reconcile_against_http_api() {
    let mut server = mockito::Server::new_async().await;
    let groups = server
        .mock("GET", "/api/groups")
        .with_status(200)
        .with_body(r#"[{"id":7,"name":"A","public":true}]"#)
        .create_async()
        .await;
    let services = server
        .mock("GET", "/api/services")
        .with_status(200)
        .with_body(r#"[{"id":30,"name":"existing","group_id":7}]"#)
        .expect(2)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/api/services")
        .match_body(Matcher::PartialJson(json!({"name": "fresh", "group_id": 7})))
        .with_status(200)
        .with_body(r#"{"status":"success"}"#)
        .create_async()
        .await;
    let update = server
        .mock("POST", "/api/services/30")
        .match_body(Matcher::PartialJson(json!({"name": "existing", "group_id": 7})))
        .with_status(200)
        .with_body(r#"{"status":"success"}"#)
        .create_async()
        .await;
    let group_create = server
        .mock("POST", "/api/groups")
        .expect(0)
        .create_async()
        .await;

    let reconciler = Reconciler::new(client_for(&server));
    let document = statping_provisioner::document::parse_document(
        r#"
- name: A
  entries:
    - {name: existing, domain: https://a.example.com}
    - {name: fresh, domain: https://b.example.com}
"#,
    )
    .unwrap();

    let summary = reconciler.run(&document).await.unwrap();

    groups.assert_async().await;
    services.assert_async().await;
    create.assert_async().await;
    update.assert_async().await;
    group_create.assert_async().await;
    assert_eq!(summary.groups[0].group_id, 7);
    assert_eq!(summary.groups[0].checks[0].outcome, Outcome::Updated);
    assert_eq!(summary.groups[0].checks[1].outcome, Outcome::Created);
}
