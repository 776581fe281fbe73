pub mod client;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod vote;

pub use client::*;
pub use parser::*;
pub use provider::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Model endpoint unreachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Model endpoint returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Summary request cancelled")]
    Cancelled,

    #[error("No API credential configured")]
    MissingCredential,
}

impl SummaryError {
    /// Short label for logs. Never includes response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Timeout(_) => "timeout",
            Self::Http { .. } => "http",
            Self::HttpClient(_) => "http_client",
            Self::MalformedResponse(_) => "malformed_response",
            Self::JsonParsing(_) => "json_parsing",
            Self::Cancelled => "cancelled",
            Self::MissingCredential => "missing_credential",
        }
    }
}

/// Shared cancellation signal for an in-flight summary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn error_kind_hides_body() {
        let err = SummaryError::Http {
            status: 500,
            body: "patient text echoed".into(),
        };
        assert_eq!(err.kind(), "http");
    }
}
