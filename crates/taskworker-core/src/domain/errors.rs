//! ExecutionError - runner が返すエラー
//!
//! `name` は任意の文字列なので thiserror の enum ではなく手書きの struct にしている。

use std::error::Error;
use std::fmt;

type BoxError = Box<dyn Error + Send + Sync>;

/// Error raised while executing a task.
///
/// Only `name` and `message` reach the broker; `source` stays in-process
/// (logs and audit events).
#[derive(Debug)]
pub struct ExecutionError {
    name: String,
    message: String,
    source: Option<BoxError>,
}

impl ExecutionError {
    /// Default name for errors that don't carry one.
    pub const DEFAULT_NAME: &'static str = "Error";

    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// `Error`-named error with the given message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Self::DEFAULT_NAME, message)
    }

    /// Wrap any error, keeping its `Display` as the message.
    pub fn from_error<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::msg(error.to_string()).with_source(error)
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub(crate) fn unsupported_api_version(api_version: &str) -> Self {
        Self::msg(format!("Unsupported Template apiVersion {api_version}"))
    }

    pub(crate) fn panicked(message: impl Into<String>) -> Self {
        Self::new("Panic", message)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl Error for ExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}
