use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RcsbError {
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unsupported {field}: {value}")]
    UnsupportedMapping { field: &'static str, value: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("ambiguous sequence type: {0}")]
    AmbiguousSequenceType(String),

    #[error("cannot infer search service for parameters: {0}")]
    CannotInferService(String),

    #[error("RCSB request failed: {0}")]
    Http(String),

    #[error("RCSB returned status {status} for {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("GraphQL query failed: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("failed to parse structure file: {0}")]
    StructureParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

/// Coarse error classes for callers that branch on the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedResponse,
    UnsupportedMapping,
    InvalidInput,
    Network,
    NotFound,
    Io,
}

impl RcsbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RcsbError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            RcsbError::UnsupportedMapping { .. } => ErrorKind::UnsupportedMapping,
            RcsbError::InvalidInput(_)
            | RcsbError::AmbiguousSequenceType(_)
            | RcsbError::CannotInferService(_) => ErrorKind::InvalidInput,
            RcsbError::Http(_) | RcsbError::Status { .. } | RcsbError::GraphQl(_) => {
                ErrorKind::Network
            }
            RcsbError::NotFound(_) => ErrorKind::NotFound,
            RcsbError::StructureParse(_)
            | RcsbError::Filesystem(_)
            | RcsbError::ConfigRead(_)
            | RcsbError::ConfigParse(_) => ErrorKind::Io,
        }
    }

    /// Transport and status failures are the only ones worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RcsbError::Http(_) | RcsbError::Status { .. })
    }

    pub(crate) fn unsupported(field: &'static str, value: impl Into<String>) -> Self {
        RcsbError::UnsupportedMapping {
            field,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_separate_network_from_payload_failures() {
        let status = RcsbError::Status {
            url: "https://data.rcsb.org/graphql".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(status.kind(), ErrorKind::Network);
        assert!(status.is_retryable());

        let malformed = RcsbError::MalformedResponse("no result_set".to_string());
        assert_eq!(malformed.kind(), ErrorKind::MalformedResponse);
        assert!(!malformed.is_retryable());
    }

    #[test]
    fn graphql_errors_join_messages() {
        let err = RcsbError::GraphQl(vec!["bad field".to_string(), "bad id".to_string()]);
        assert_eq!(err.to_string(), "GraphQL query failed: bad field; bad id");
    }
}
