use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use docqa_core::{AskRequest, AskResponse, FileMeta, RemoteDocument};
use docqa_logging::docqa_debug;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::{ApiError, FailureKind};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// `None` lets a request wait for as long as the service takes.
    pub request_timeout: Option<Duration>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

/// A file picked for upload, content already loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, content))
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta::new(self.name.clone(), self.content.len() as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<RemoteDocument>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// The remote analysis service.
#[async_trait::async_trait]
pub trait DocumentApi: Send + Sync {
    async fn health(&self) -> Result<HealthReport, ApiError>;

    async fn list_documents(&self) -> Result<Vec<RemoteDocument>, ApiError>;

    /// One multipart request with every file under the `files` field.
    async fn ingest(&self, files: &[LocalFile]) -> Result<(), ApiError>;

    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ApiError>;

    async fn delete_document(&self, filename: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    base: Url,
    client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base address", settings.base_url),
            ));
        }

        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ApiError::new(FailureKind::Transport, err.to_string()))?;

        Ok(Self { base, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait::async_trait]
impl DocumentApi for ReqwestApi {
    async fn health(&self) -> Result<HealthReport, ApiError> {
        let url = self.endpoint(&["health"]);
        docqa_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let response = ensure_success(response, |code| format!("HTTP error! status: {code}")).await?;
        decode_json(response).await
    }

    async fn list_documents(&self) -> Result<Vec<RemoteDocument>, ApiError> {
        let url = self.endpoint(&["documents"]);
        docqa_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::Status(status.as_u16()),
                format!("HTTP error! status: {}", status.as_u16()),
            ));
        }
        let list: DocumentList = decode_json(response).await?;
        Ok(list.documents)
    }

    async fn ingest(&self, files: &[LocalFile]) -> Result<(), ApiError> {
        let url = self.endpoint(&["ingest"]);
        docqa_debug!("POST {} files={}", url, files.len());
        let form = files.iter().fold(Form::new(), |form, file| {
            let part = Part::bytes(file.content.to_vec()).file_name(file.name.clone());
            form.part("files", part)
        });
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response, |_| "Ingest failed".to_string()).await?;
        Ok(())
    }

    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ApiError> {
        let url = self.endpoint(&["ask"]);
        docqa_debug!(
            "POST {} top_k={} selected={}",
            url,
            request.top_k,
            request.selected_documents.len()
        );
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response, |_| "Ask failed".to_string()).await?;
        decode_json(response).await
    }

    async fn delete_document(&self, filename: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["documents", filename]);
        docqa_debug!("DELETE {}", url);
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response, |_| "Delete failed".to_string()).await?;
        Ok(())
    }
}

/// Passes 2xx responses through; otherwise builds an error from the body's
/// `detail`, or from `fallback` when there is none.
async fn ensure_success(
    response: reqwest::Response,
    fallback: impl FnOnce(u16) -> String,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = extract_detail(&body).unwrap_or_else(|| fallback(code));
    Err(ApiError::new(FailureKind::Status(code), message))
}

fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(text) if !text.is_empty() => Some(text),
        serde_json::Value::String(_) | serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Transport, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_prefers_string_and_ignores_empty() {
        assert_eq!(
            extract_detail(r#"{"detail":"index unavailable"}"#),
            Some("index unavailable".to_string())
        );
        assert_eq!(extract_detail(r#"{"detail":""}"#), None);
        assert_eq!(extract_detail(r#"{"error":"x"}"#), None);
        assert_eq!(extract_detail("<html>502</html>"), None);
    }

    #[test]
    fn structured_detail_is_rendered_as_json() {
        let detail = extract_detail(r#"{"detail":[{"msg":"field required"}]}"#).unwrap();
        assert!(detail.contains("field required"));
    }

    #[test]
    fn endpoints_keep_base_path_and_escape_filenames() {
        let api = ReqwestApi::new(&ApiSettings {
            base_url: "http://example.test/api/".to_string(),
            ..ApiSettings::default()
        })
        .unwrap();

        assert_eq!(
            api.endpoint(&["documents"]).as_str(),
            "http://example.test/api/documents"
        );
        assert_eq!(
            api.endpoint(&["documents", "my lease.pdf"]).as_str(),
            "http://example.test/api/documents/my%20lease.pdf"
        );
    }

    #[test]
    fn rejects_unusable_base_address() {
        let err = ReqwestApi::new(&ApiSettings {
            base_url: "not a url".to_string(),
            ..ApiSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }
}
