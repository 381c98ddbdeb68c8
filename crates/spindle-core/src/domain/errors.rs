//! Task failure taxonomy.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure raised by a task body (or by the timeout check before it runs).
///
/// Classification drives logging granularity only; the retry policy treats
/// all kinds the same.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("{0}")]
    General(String),
}

impl TaskError {
    /// Operational classification of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::Timeout(_) => ErrorKind::Timeout,
            TaskError::Network(_) => ErrorKind::Network,
            TaskError::Database(_) => ErrorKind::Database,
            TaskError::General(_) => ErrorKind::General,
        }
    }
}

/// Error kind, detached from the error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Timeout,
    Network,
    Database,
    /// Catch-all for anything the body raised that is none of the above.
    General,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::Database => "database",
            ErrorKind::General => "general",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_variants() {
        assert_eq!(
            TaskError::Timeout(Duration::from_secs(5)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(TaskError::Network("down".into()).kind(), ErrorKind::Network);
        assert_eq!(TaskError::Database("gone".into()).kind(), ErrorKind::Database);
        assert_eq!(TaskError::General("boom".into()).kind(), ErrorKind::General);
    }

    #[test]
    fn display_includes_message() {
        let err = TaskError::Network("connection refused".into());
        assert_eq!(err.to_string(), "network error: connection refused");
    }
}
