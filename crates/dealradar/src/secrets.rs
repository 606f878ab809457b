//! API key resolution.
//!
//! A key may be given inline, as a file (the Docker secrets pattern) or as an
//! environment variable. The first source that is configured wins; a
//! configured source that cannot be read is an error rather than a fallthrough.

use std::fs;

use secrecy::SecretString;

use crate::config::RecognizerConfig;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No API key configured (set api_key, api_key_file or api_key_env)")]
    NoSourceProvided,

    #[error("Failed to read API key from file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("API key file '{path}' is empty")]
    EmptyFile { path: String },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// One place a secret can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource<'a> {
    Value(&'a str),
    File(&'a str),
    Env(&'a str),
}

impl SecretSource<'_> {
    fn is_configured(&self) -> bool {
        match self {
            SecretSource::Value(s) | SecretSource::File(s) | SecretSource::Env(s) => !s.is_empty(),
        }
    }

    fn read(&self) -> Result<SecretString, SecretError> {
        match *self {
            SecretSource::Value(value) => Ok(SecretString::from(value.to_string())),
            SecretSource::File(path) => {
                let expanded = expand_home(path);
                let content =
                    fs::read_to_string(&expanded).map_err(|source| SecretError::FileRead {
                        path: expanded.clone(),
                        source,
                    })?;
                let key = content.trim();
                if key.is_empty() {
                    return Err(SecretError::EmptyFile { path: expanded });
                }
                Ok(SecretString::from(key.to_string()))
            }
            SecretSource::Env(name) => match std::env::var(name) {
                Ok(value) => Ok(SecretString::from(value.trim().to_string())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            },
        }
    }
}

/// Reads the first configured source in `sources`.
pub fn resolve_secret(sources: &[SecretSource<'_>]) -> Result<SecretString, SecretError> {
    sources
        .iter()
        .find(|source| source.is_configured())
        .ok_or(SecretError::NoSourceProvided)?
        .read()
}

/// Resolves the recognizer API key: inline value, then file, then env var.
pub fn resolve_api_key(config: &RecognizerConfig) -> Result<SecretString, SecretError> {
    let mut sources = Vec::with_capacity(3);
    if let Some(value) = config.api_key.as_deref() {
        sources.push(SecretSource::Value(value));
    }
    if let Some(path) = config.api_key_file.as_deref() {
        sources.push(SecretSource::File(path));
    }
    if let Some(name) = config.api_key_env.as_deref() {
        sources.push(SecretSource::Env(name));
    }
    resolve_secret(&sources)
}

fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
