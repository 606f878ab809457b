pub mod api;
pub mod config;
pub mod error;
pub mod queue;
pub mod recognizer;
pub mod registry;
pub mod sanitize;
pub mod secrets;
pub mod step;
pub mod task;
pub mod telemetry;

pub use api::{ApiError, ApiErrorKind, QueueApi};
pub use config::{load_config, Config, QueuePolicy, RecognizerConfig, StepConfig};
pub use error::{
    ConfigError, DealRadarError, QueueError, RegistryError, Result, ValidationError,
};
pub use queue::{CancelOutcome, PipelineQueue, QueueConfig};
pub use recognizer::{
    CompanyRecognizer, CompletionClient, OpenAiCompletionClient, RecognitionError,
};
pub use registry::{CompanyRecord, CompanyRegistry, RawRecord};
pub use secrets::{resolve_api_key, SecretError};
pub use step::{ProcessStep, Step, StepError, StepOutput, StepRunner};
pub use task::{TaskKind, TaskPayload, TaskStatus, TaskView};
pub use telemetry::init_logging;
