use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrauError {
    #[error("unresolved variable: %{{{0}}}")]
    UnresolvedVariable(String),

    #[error("template cycle while expanding %{{{0}}}")]
    TemplateCycle(String),

    #[error("index {index} out of range for %{{{name}}} ({len} elements)")]
    IndexOutOfRange {
        name: String,
        index: usize,
        len: usize,
    },

    #[error("malformed placeholder in template: {0}")]
    MalformedTemplate(String),

    #[error("macOS SDK not found: {0}")]
    MissingSdk(PathBuf),

    #[error("package {package}: step '{step}' exited with status {code}")]
    StepExecution {
        package: String,
        step: String,
        code: i32,
    },

    #[error("file collector failed with status {0}")]
    CollectorFailed(i32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse property list: {0}")]
    Plist(#[from] plist::Error),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BrauError>;
