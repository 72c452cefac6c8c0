//! Internal error taxonomy.
//!
//! `HookError` is plumbing, not a decision: every variant is collapsed to
//! [`crate::fragment::HookDecision::Fallthrough`] at the top of `main`, and
//! none of it is ever surfaced to the calling agent or turned into a
//! non-zero exit code.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("failed to parse command: {0}")]
    Parse(String),

    #[error("unsupported shell construct: {0}")]
    UnsupportedNode(String),

    #[error("malformed hook input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    #[error("not a bash tool invocation")]
    NotBashTool,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
