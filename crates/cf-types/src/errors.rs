use thiserror::Error;

/// Main error type for the ChromaFlow system.
#[derive(Error, Debug)]
pub enum CfError {
    /// Malformed input rejected at a call boundary (mismatched color
    /// dimensionality, non-finite or negative rate entries).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Zero-sum or divide-by-zero inside the rate scaler. Unrecoverable for
    /// the current run; the orchestrator aborts rather than retries.
    #[error("degenerate scale: {0}")]
    DegenerateScale(String),

    /// Hardware fault surfaced from the actuator or sensor boundary.
    #[error("rig fault: {0}")]
    Rig(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ChromaFlow operations.
pub type CfResult<T> = Result<T, CfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_context() {
        let err = CfError::DegenerateScale("sum of adjusted rates is zero".into());
        assert!(err.to_string().contains("degenerate scale"));
        assert!(err.to_string().contains("sum of adjusted rates"));
    }

    #[test]
    fn serde_error_converts() {
        let bad = serde_json::from_str::<serde_json::Value>("{");
        let err: CfError = bad.unwrap_err().into();
        match err {
            CfError::Serialization(_) => (),
            other => panic!("expected serialization error, got {other:?}"),
        }
    }
}
