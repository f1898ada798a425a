//! Errors surfaced by the engine to the presentation layer.
//!
//! None of these are fatal: the caller decides whether to report, retry or fall back to a
//! known-good path.
use thiserror::Error;

use crate::graph::Label;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no answer '{label}' on the way to {}", show_path(.path))]
    NodeNotFound { path: Vec<Label>, label: Label },
    #[error("story graph has no root node")]
    EmptyGraph,
    #[error("'{label}' is not a choice at the current node")]
    InvalidChoice { label: Label },
    #[error("could not read saved state: {0}")]
    Deserialization(String),
    #[error("answer '{label}' appears twice on the same node")]
    DuplicateAnswer { label: Label },
    #[error("story refers to unregistered hook '{name}'")]
    UnknownHook { name: String },
    #[error("invalid story: {0}")]
    InvalidStory(String),
    #[error("there is no puzzle to answer")]
    NoPuzzle,
    #[error("nobody called '{name}' is here")]
    UnknownNpc { name: String },
}

pub(crate) fn show_path(path: &[Label]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(" > ")
    }
}
