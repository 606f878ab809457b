use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DealRadarError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Step error: {0}")]
    Step(#[from] crate::step::StepError),

    #[error("Recognition error: {0}")]
    Recognition(#[from] crate::recognizer::RecognitionError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid step '{id}': {reason}")]
    InvalidStep { id: String, reason: String },
}

/// A submission payload that cannot be turned into company records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid CSV line: {line}")]
    MalformedLine { line: String },

    #[error("Missing required fields in: {line}")]
    MissingFieldsInLine { line: String },

    #[error("Missing required fields. Need: {}", .missing.join(", "))]
    MissingFields { missing: Vec<String> },

    #[error("Field '{field}' must be a string")]
    InvalidFieldType { field: String },

    #[error("Field '{field}' must not be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must not contain line breaks")]
    LineBreak { field: String },

    #[error("No valid companies found")]
    Empty,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read registry '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write registry '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt registry row {row}: {reason}")]
    CorruptRow { row: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Queue is shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, DealRadarError>;
