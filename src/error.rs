//! Error types shared by the analytics core
//!
//! Every fallible operation reports the operation name so callers can tell
//! a failed `predict` apart from a failed `train_classifier` without parsing
//! messages.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the analytics core
#[derive(Error, Debug)]
pub enum ReconError {
    #[error("{op}: invalid input '{identifier}': {reason}")]
    InvalidInput {
        op: &'static str,
        identifier: String,
        reason: String,
    },

    /// `vector` is the rendered input of a single-vector call
    #[error("{op}: model not fitted, call fit() first")]
    NotFitted {
        op: &'static str,
        vector: Option<String>,
    },

    #[error("{op}: no trained artifact at {}, train the model first", path.display())]
    NotTrained { op: &'static str, path: PathBuf },

    #[error("{op}: artifact I/O failed for {}: {source}", path.display())]
    Persistence {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `row` is the offending index when the input was a batch
    #[error(
        "{op}: expected a {expected}-dimensional vector, got {actual}{}",
        row.map(|r| format!(" at row {r}")).unwrap_or_default()
    )]
    DimensionMismatch {
        op: &'static str,
        row: Option<usize>,
        expected: usize,
        actual: usize,
    },
}

impl ReconError {
    pub(crate) fn invalid(
        op: &'static str,
        identifier: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            op,
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            op,
            path: path.into(),
            source,
        }
    }
}

pub type ReconResult<T> = Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_operation() {
        let err = ReconError::NotFitted {
            op: "batch_predict",
            vector: None,
        };
        assert!(err.to_string().starts_with("batch_predict:"));

        let err = ReconError::DimensionMismatch {
            op: "predict",
            row: None,
            expected: 8,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "predict: expected a 8-dimensional vector, got 3"
        );
    }

    #[test]
    fn test_dimension_mismatch_names_the_row() {
        let err = ReconError::DimensionMismatch {
            op: "fit",
            row: Some(4),
            expected: 8,
            actual: 7,
        };
        assert_eq!(
            err.to_string(),
            "fit: expected a 8-dimensional vector, got 7 at row 4"
        );
    }

    #[test]
    fn test_invalid_input_carries_identifier() {
        let err = ReconError::invalid("train_similarity", "", "corpus is empty");
        match err {
            ReconError::InvalidInput { identifier, reason, .. } => {
                assert_eq!(identifier, "");
                assert_eq!(reason, "corpus is empty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
