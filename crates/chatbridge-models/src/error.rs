//! Error types for the `chatbridge-models` crate.

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A channel name was empty or contained whitespace.
    #[error("invalid channel name \"{value}\": {reason}")]
    InvalidChannel {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A chat login name was empty.
    #[error("invalid username \"{value}\": {reason}")]
    InvalidUsername {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_channel() {
        let err = ModelError::InvalidChannel {
            value: "#".into(),
            reason: "must not be empty".into(),
        };
        assert_eq!(err.to_string(), "invalid channel name \"#\": must not be empty");
    }

    #[test]
    fn error_display_username() {
        let err = ModelError::InvalidUsername {
            value: "".into(),
            reason: "must not be empty".into(),
        };
        assert_eq!(err.to_string(), "invalid username \"\": must not be empty");
    }
}
