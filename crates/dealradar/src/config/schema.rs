use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Root of the shared on-disk pipeline state.
    pub data_directory: String,
    /// Registry file; relative paths resolve against `data_directory`.
    #[serde(default = "default_registry_file")]
    pub registry_file: String,
    /// Directory holding the step scripts of the standard pipeline.
    #[serde(default = "default_scripts_directory")]
    pub scripts_directory: String,
    /// Working directory for every step. Defaults to `scripts_directory`.
    #[serde(default)]
    pub working_directory: Option<String>,
    /// Interpreter used for the standard pipeline scripts.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Explicit step list. Empty means the standard pipeline.
    #[serde(default)]
    pub steps: Vec<StepConfig>,
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub policy: QueuePolicy,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
}

fn default_registry_file() -> String {
    "companies.csv".to_string()
}

fn default_scripts_directory() -> String {
    "src".to_string()
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_step_timeout_secs() -> u64 {
    3600
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Truncation and listing limits applied by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePolicy {
    /// Log lines exposed in a task view.
    #[serde(default = "default_log_tail")]
    pub log_tail: usize,
    /// Stdout lines of a successful step copied into the task log.
    #[serde(default = "default_step_output_tail")]
    pub step_output_tail: usize,
    /// Characters of diagnostic output kept from a failed step.
    #[serde(default = "default_error_excerpt_chars")]
    pub error_excerpt_chars: usize,
    /// Tasks returned by a listing.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_log_tail() -> usize {
    50
}

fn default_step_output_tail() -> usize {
    5
}

fn default_error_excerpt_chars() -> usize {
    500
}

fn default_list_limit() -> usize {
    20
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            log_tail: default_log_tail(),
            step_output_tail: default_step_output_tail(),
            error_excerpt_chars: default_error_excerpt_chars(),
            list_limit: default_list_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Finished tasks beyond this many are evicted after each task.
    /// `None` disables the automatic sweep.
    #[serde(default = "default_keep_tasks")]
    pub keep_tasks: Option<usize>,
}

fn default_keep_tasks() -> Option<usize> {
    Some(50)
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep_tasks: default_keep_tasks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Chat-completions endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// API key given inline. Prefer `api_key_file` or `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_recognizer_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    300
}

fn default_recognizer_timeout() -> u64 {
    30
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            api_key_file: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_recognizer_timeout(),
        }
    }
}
