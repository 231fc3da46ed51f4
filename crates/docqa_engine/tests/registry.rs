use std::sync::Arc;

use docqa_engine::{ApiSettings, DeleteOutcome, DocumentRegistryClient, ReqwestApi};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> DocumentRegistryClient {
    docqa_logging::initialize_for_tests();
    let api = ReqwestApi::new(&ApiSettings {
        base_url: server.uri(),
        ..ApiSettings::default()
    })
    .expect("api");
    DocumentRegistryClient::new(Arc::new(api))
}

fn listing(names: &[&str]) -> serde_json::Value {
    let documents: Vec<_> = names
        .iter()
        .map(|name| json!({"filename": name, "upload_time": "2024-03-01T12:00:00", "chunks": 4}))
        .collect();
    json!({ "documents": documents })
}

#[tokio::test]
async fn activate_fetches_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["a.pdf"])))
        .expect(1)
        .mount(&server)
        .await;
    let registry = client(&server);

    assert!(registry.activate().await);
    assert!(!registry.activate().await);

    assert_eq!(registry.documents().len(), 1);
    assert!(!registry.is_loading());
    assert_eq!(registry.error(), None);
}

#[tokio::test]
async fn failed_refetch_keeps_stale_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["a.pdf", "b.pdf"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let registry = client(&server);

    assert!(registry.fetch_documents().await);
    assert!(!registry.refetch().await);

    assert_eq!(registry.documents().len(), 2);
    assert_eq!(registry.error().as_deref(), Some("HTTP error! status: 500"));
}

#[tokio::test]
async fn delete_deselects_and_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["a.pdf", "b.pdf"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["b.pdf"])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/documents/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    let registry = client(&server);

    registry.activate().await;
    registry.toggle_selected("a.pdf");
    registry.toggle_selected("b.pdf");

    let outcome = registry.delete_document("a.pdf").await;

    assert_eq!(
        outcome,
        DeleteOutcome::Deleted {
            filename: "a.pdf".to_string(),
        }
    );
    assert_eq!(registry.selected(), vec!["b.pdf".to_string()]);
    let names: Vec<_> = registry
        .documents()
        .into_iter()
        .map(|doc| doc.filename)
        .collect();
    assert_eq!(names, vec!["b.pdf".to_string()]);
}

#[tokio::test]
async fn failed_delete_keeps_selection() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/documents/a.pdf"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not Found"})))
        .mount(&server)
        .await;
    let registry = client(&server);
    registry.toggle_selected("a.pdf");

    let outcome = registry.delete_document("a.pdf").await;

    assert_eq!(
        outcome,
        DeleteOutcome::Failed {
            filename: "a.pdf".to_string(),
            message: "Not Found".to_string(),
        }
    );
    assert_eq!(registry.selected(), vec!["a.pdf".to_string()]);
}
