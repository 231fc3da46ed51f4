use std::sync::Arc;

use anyhow::Result;
use docqa_core::DocId;
use docqa_engine::{
    DeleteOutcome, DocumentApi, DocumentRegistryClient, FileHistoryStore, HealthMonitor,
    HistoryStore, IngestionController, QuestionAnsweringController, ReqwestApi,
};
use docqa_logging::docqa_debug;

use crate::config::AppConfig;

/// The four controllers sharing one API client.
#[derive(Clone)]
pub struct Session {
    pub registry: DocumentRegistryClient,
    pub ingest: IngestionController,
    pub qa: QuestionAnsweringController,
    pub health: HealthMonitor,
    pub top_k: u32,
}

impl Session {
    pub fn open(config: &AppConfig) -> Result<Self> {
        let api = ReqwestApi::new(&config.api_settings())?;
        let store = FileHistoryStore::new(config.data_dir.clone());
        Ok(Self::with_parts(Arc::new(api), Arc::new(store), config))
    }

    pub fn with_parts(
        api: Arc<dyn DocumentApi>,
        store: Arc<dyn HistoryStore>,
        config: &AppConfig,
    ) -> Self {
        let settings = config.controller_settings();
        Self {
            registry: DocumentRegistryClient::new(api.clone()),
            ingest: IngestionController::new(api.clone(), &settings),
            qa: QuestionAnsweringController::new(api.clone(), store),
            health: HealthMonitor::new(api, &settings),
            top_k: config.top_k,
        }
    }

    /// Deletes an uploaded item and keeps the registry view consistent with it.
    pub async fn delete_upload(&self, id: DocId) -> DeleteOutcome {
        let outcome = self.ingest.delete_document(id).await;
        if let DeleteOutcome::Deleted { filename } = &outcome {
            docqa_debug!("Dropping {} from the selection", filename);
            self.registry.deselect(filename);
            self.registry.refetch().await;
        }
        outcome
    }

    /// Asks against the current document selection.
    pub async fn ask(&self, question: &str, top_k: u32) -> docqa_engine::AskOutcome {
        let selected = self.registry.selected();
        self.qa.ask(question, top_k, &selected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_engine::{ApiSettings, LocalFile, MemoryHistoryStore};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session(server: &MockServer) -> Session {
        let config = AppConfig {
            api_base: server.uri(),
            embed_delay_ms: 10,
            ..AppConfig::default()
        };
        let api = ReqwestApi::new(&ApiSettings {
            base_url: server.uri(),
            ..ApiSettings::default()
        })
        .unwrap();
        Session::with_parts(
            Arc::new(api),
            Arc::new(MemoryHistoryStore::default()),
            &config,
        )
    }

    #[tokio::test]
    async fn deleting_an_upload_clears_it_from_selection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [{"filename": "lease.pdf", "upload_time": "2024-03-01T12:00:00", "chunks": 9}]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"documents": []})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/documents/lease.pdf"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let session = session(&server);

        session
            .ingest
            .submit_files(vec![LocalFile::new("lease.pdf", b"%PDF".to_vec())])
            .await;
        session.registry.activate().await;
        session.registry.toggle_selected("lease.pdf");
        let id = session.ingest.docs()[0].id;

        let outcome = session.delete_upload(id).await;

        assert!(matches!(outcome, DeleteOutcome::Deleted { .. }));
        assert!(session.ingest.docs().is_empty());
        assert!(session.registry.selected().is_empty());
        assert!(session.registry.documents().is_empty());
    }

    #[tokio::test]
    async fn ask_uses_current_selection_and_top_k() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .and(body_partial_json(json!({
                "top_k": 5,
                "selected_documents": ["lease.pdf"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        let session = session(&server);
        session.registry.toggle_selected("lease.pdf");

        let outcome = session.ask("Who is the landlord?", session.top_k).await;

        assert_eq!(outcome, docqa_engine::AskOutcome::Answered);
    }
}
