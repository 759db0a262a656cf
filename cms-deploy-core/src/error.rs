//! Error types shared by the deployment tasks and the pipeline runner.

use std::path::PathBuf;
use thiserror::Error;

use crate::contract::ToolError;

/// Failure of a single deployment operation.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid glob pattern `{pattern}`: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML in {path}: {message}")]
    Xml { path: PathBuf, message: String },

    #[error("XPath `{xpath}` matched no nodes in {path}")]
    XPathMiss { path: PathBuf, xpath: String },

    #[error("unsupported XPath `{xpath}`: {reason}")]
    XPathSyntax { xpath: String, reason: String },

    #[error("{operation} failed: {source}")]
    Tool {
        operation: &'static str,
        #[source]
        source: ToolError,
    },
}

impl DeployError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps an adapter failure, naming the operation that was attempted.
    pub fn tool(operation: &'static str) -> impl FnOnce(ToolError) -> DeployError {
        move |source| DeployError::Tool { operation, source }
    }
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("step {index} ({step}) failed: {source}")]
    StepFailed {
        index: usize,
        step: String,
        #[source]
        source: DeployError,
    },

    #[error("no step named `{0}` in the pipeline")]
    UnknownStep(String),
}

impl PipelineError {
    /// Index of the step the run stopped at.
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            PipelineError::StepFailed { index, .. } => Some(*index),
            PipelineError::UnknownStep(_) => None,
        }
    }
}
