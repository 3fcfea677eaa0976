use thiserror::Error;

/// Main error type for tagdex operations
#[derive(Error, Debug)]
pub enum TagdexError {
    #[error("unknown expression")]
    UnknownExpression,

    #[error("too many matches for prefix '{prefix}'")]
    TooManyMatches { prefix: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tagdex operations
pub type Result<T> = std::result::Result<T, TagdexError>;

impl TagdexError {
    /// True for errors caused by the query itself rather than the process.
    ///
    /// Query errors are reported back over the wire as a `threw` reply and
    /// leave the connection (and the index) untouched.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            TagdexError::UnknownExpression
                | TagdexError::TooManyMatches { .. }
                | TagdexError::InvalidRequest(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TagdexError::TooManyMatches {
            prefix: "ca".to_string(),
        };
        assert_eq!(err.to_string(), "too many matches for prefix 'ca'");

        assert_eq!(
            TagdexError::UnknownExpression.to_string(),
            "unknown expression"
        );
    }

    #[test]
    fn test_query_errors() {
        assert!(TagdexError::UnknownExpression.is_query_error());
        assert!(TagdexError::InvalidRequest("x".to_string()).is_query_error());
        let io = TagdexError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert!(!io.is_query_error());
    }
}
