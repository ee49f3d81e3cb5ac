// src/errors.rs

//! Crate-wide error types.
//!
//! `PipelineError` covers everything that can stop a target from running.
//! `TransformError` is per-file and never aborts a task on its own; the task
//! runner records it in the [`crate::task::TaskReport`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Cycle detected in pipelines: {0}")]
    PipelineCycle(String),

    #[error("Destination {path:?} is not writable: {source}")]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Errors that must halt the process even from inside the watch loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Config(_)
                | PipelineError::PipelineCycle(_)
                | PipelineError::DestinationUnwritable { .. }
        )
    }
}

/// Failure of a single transform step on a single file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("{transform}: syntax error at line {line}: {message}")]
    Syntax {
        transform: &'static str,
        line: usize,
        message: String,
    },

    #[error("{transform}: undefined variable ${name}")]
    UndefinedVariable {
        transform: &'static str,
        name: String,
    },

    #[error("{transform}: unsupported construct: {what}")]
    Unsupported {
        transform: &'static str,
        what: String,
    },

    #[error("{transform}: codec failure: {message}")]
    Codec {
        transform: &'static str,
        message: String,
    },

    #[error("{transform}: input is not valid UTF-8")]
    Encoding { transform: &'static str },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
