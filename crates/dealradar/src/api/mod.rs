//! Request/response surface of the queue.
//!
//! Every operation returns either its response type or an [`ApiError`]; both
//! serialize to the JSON shapes handed to callers (`{"error": "..."}` for
//! failures). Transport (HTTP, IPC) is left to the embedding application.

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::queue::{CancelOutcome, PipelineQueue};
use crate::recognizer::CompanyRecognizer;
use crate::registry::{missing_fields, CompanyRecord, RawRecord, REQUIRED_FIELDS};
use crate::task::TaskView;

/// Coarse failure class, for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    BadRequest,
    NotFound,
    Unavailable,
    Upstream,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip, default = "default_kind")]
    pub kind: ApiErrorKind,
}

fn default_kind() -> ApiErrorKind {
    ApiErrorKind::BadRequest
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            kind,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

impl std::error::Error for ApiError {}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::NotFound(_) => ApiError::not_found("Task not found"),
            QueueError::ShutDown | QueueError::SpawnFailed(_) => {
                ApiError::new(ApiErrorKind::Unavailable, e.to_string())
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl SubmitResponse {
    fn queued(task_id: String, message: Option<String>) -> Self {
        Self {
            task_id,
            status: "queued".to_string(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizeResponse {
    pub task_id: String,
    pub company: CompanyRecord,
    pub status: String,
    pub message: String,
}

/// Renders an operation result as the JSON body sent to callers.
pub fn to_json<T: Serialize>(result: &ApiResult<T>) -> serde_json::Value {
    let rendered = match result {
        Ok(response) => serde_json::to_value(response),
        Err(error) => serde_json::to_value(error),
    };
    rendered.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
}

/// The operations exposed to callers, over a shared queue.
#[derive(Clone)]
pub struct QueueApi {
    queue: Arc<PipelineQueue>,
    recognizer: Option<CompanyRecognizer>,
}

impl QueueApi {
    pub fn new(queue: Arc<PipelineQueue>) -> Self {
        Self {
            queue,
            recognizer: None,
        }
    }

    pub fn with_recognizer(mut self, recognizer: CompanyRecognizer) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn queue(&self) -> &Arc<PipelineQueue> {
        &self.queue
    }

    /// Queues semicolon-delimited company rows. Line-level validation happens
    /// on the worker; only an empty upload is rejected here.
    pub fn submit_batch(&self, content: &str) -> ApiResult<SubmitResponse> {
        if content.trim().is_empty() {
            return Err(ApiError::bad_request("Empty CSV file"));
        }

        let task_id = self.queue.submit_batch(content)?;
        info!("Queued CSV upload as {}", task_id);
        Ok(SubmitResponse::queued(
            task_id,
            Some("CSV added to processing queue".to_string()),
        ))
    }

    /// Queues a single record after checking that the required fields exist.
    pub fn submit_manual(&self, record: RawRecord) -> ApiResult<SubmitResponse> {
        if !missing_fields(&record).is_empty() {
            return Err(ApiError::bad_request(format!(
                "Missing required fields. Need: {}",
                REQUIRED_FIELDS.join(", ")
            )));
        }

        let task_id = self.queue.submit_manual(record)?;
        Ok(SubmitResponse::queued(task_id, None))
    }

    pub fn get_task(&self, task_id: &str) -> ApiResult<TaskView> {
        Ok(self.queue.get(task_id)?)
    }

    pub fn list_tasks(&self) -> TaskListResponse {
        TaskListResponse {
            tasks: self.queue.list(),
        }
    }

    pub fn cancel_task(&self, task_id: &str) -> ApiResult<MessageResponse> {
        match self.queue.cancel_detailed(task_id) {
            CancelOutcome::Cancelled => Ok(MessageResponse {
                message: "Task cancelled".to_string(),
            }),
            CancelOutcome::AlreadyStarted(_) | CancelOutcome::NotFound => Err(
                ApiError::not_found("Task not found or already completed"),
            ),
        }
    }

    /// Looks up a company by name and queues the result as a manual task.
    pub async fn recognize_company(&self, company_name: &str) -> ApiResult<RecognizeResponse> {
        if company_name.trim().is_empty() {
            return Err(ApiError::bad_request("Company name is required"));
        }
        let recognizer = self.recognizer.as_ref().ok_or_else(|| {
            ApiError::new(ApiErrorKind::Unavailable, "Company recognition is not configured")
        })?;

        let company = recognizer.recognize(company_name).await.map_err(|e| {
            warn!("Recognition of '{}' failed: {}", company_name.trim(), e);
            ApiError::new(
                ApiErrorKind::Upstream,
                format!("Failed to recognize company: {}", e),
            )
        })?;

        let task_id = self.queue.submit_manual(company.to_raw())?;
        let message = format!("Added {} to processing queue", company.company_name);
        Ok(RecognizeResponse {
            task_id,
            company,
            status: "queued".to_string(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueConfig;
    use crate::recognizer::{CompletionClient, RecognitionError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    struct CannedClient(&'static str);

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, RecognitionError> {
            Ok(self.0.to_string())
        }
    }

    fn api(temp: &TempDir) -> QueueApi {
        let config = QueueConfig::new(temp.path().join("companies.csv"), temp.path(), vec![])
            .with_poll_interval(Duration::from_millis(20));
        QueueApi::new(Arc::new(PipelineQueue::start(config).unwrap()))
    }

    #[test]
    fn test_submit_batch_rejects_empty() {
        let temp = TempDir::new().unwrap();
        let api = api(&temp);

        let result = api.submit_batch("  \n ");
        assert_eq!(to_json(&result), json!({ "error": "Empty CSV file" }));
        assert!(api.queue().is_empty());
    }

    #[test]
    fn test_submit_batch_queued() {
        let temp = TempDir::new().unwrap();
        let api = api(&temp);

        let response = api
            .submit_batch("acme;Acme Corp;US;https://acme.com;")
            .unwrap();
        assert!(response.task_id.starts_with("add_company_csv_"));
        let body = to_json(&Ok::<_, ApiError>(response));
        assert_eq!(body["status"], json!("queued"));
        assert_eq!(body["message"], json!("CSV added to processing queue"));
    }

    #[test]
    fn test_submit_manual_requires_fields() {
        let temp = TempDir::new().unwrap();
        let api = api(&temp);

        let record = json!({ "company_id": "acme" }).as_object().unwrap().clone();
        let error = api.submit_manual(record).unwrap_err();
        assert_eq!(
            error.error,
            "Missing required fields. Need: company_id, company_name, country, website"
        );
        assert_eq!(error.kind, ApiErrorKind::BadRequest);
    }

    #[test]
    fn test_submit_manual_omits_message() {
        let temp = TempDir::new().unwrap();
        let api = api(&temp);

        let record = json!({
            "company_id": "acme",
            "company_name": "Acme Corp",
            "country": "US",
            "website": "https://acme.com"
        })
        .as_object()
        .unwrap()
        .clone();
        let body = to_json(&api.submit_manual(record));
        assert!(body["task_id"]
            .as_str()
            .unwrap()
            .starts_with("add_company_manual_"));
        assert!(body.get("message").is_none());
    }

    #[test]
    fn test_unknown_task() {
        let temp = TempDir::new().unwrap();
        let api = api(&temp);

        assert_eq!(
            to_json(&api.get_task("nope")),
            json!({ "error": "Task not found" })
        );
        assert_eq!(
            to_json(&api.cancel_task("nope")),
            json!({ "error": "Task not found or already completed" })
        );
    }

    #[test]
    fn test_list_tasks_shape() {
        let temp = TempDir::new().unwrap();
        let api = api(&temp);
        api.queue().shutdown();

        let body = serde_json::to_value(api.list_tasks()).unwrap();
        assert_eq!(body, json!({ "tasks": [] }));
    }

    #[tokio::test]
    async fn test_recognize_company_queues_record() {
        let temp = TempDir::new().unwrap();
        let api = api(&temp).with_recognizer(CompanyRecognizer::new(Arc::new(CannedClient(
            r#"{"company_id": "acme", "company_name": "Acme Corp", "country": "US", "website": "https://acme.com", "ir_url": null}"#,
        ))));

        let response = api.recognize_company("acme").await.unwrap();
        assert_eq!(response.company.company_id, "acme");
        assert_eq!(response.status, "queued");
        assert_eq!(response.message, "Added Acme Corp to processing queue");
        assert!(response.task_id.starts_with("add_company_manual_"));
    }

    #[tokio::test]
    async fn test_recognize_company_failure() {
        let temp = TempDir::new().unwrap();
        let api = api(&temp).with_recognizer(CompanyRecognizer::new(Arc::new(CannedClient(
            "I have no idea",
        ))));

        let error = api.recognize_company("mystery").await.unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::Upstream);
        assert!(error.error.starts_with("Failed to recognize company: AI returned invalid JSON"));
        assert!(api.queue().is_empty());
    }

    #[tokio::test]
    async fn test_recognize_without_recognizer() {
        let temp = TempDir::new().unwrap();
        let error = api(&temp).recognize_company("acme").await.unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::Unavailable);
    }
}
