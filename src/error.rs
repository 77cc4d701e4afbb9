//! Caller-visible errors.
//!
//! Only structurally invalid input (an empty or ragged dataset, an unreadable
//! CSV, an invalid configuration value) ends a run. Failures of a single
//! statistical test or estimator degrade locally and are reported through
//! `stationarity::TestError` and `models::EstimatorError` instead.

/// Malformed input or invalid configuration.
pub const EXIT_INPUT: u8 = 2;
/// Nothing left to analyse (e.g. no numeric column for a command that needs one).
pub const EXIT_INSUFFICIENT: u8 = 3;
/// Numerical or internal failure, including failed exports.
pub const EXIT_INTERNAL: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// The dataset cannot be classified at all.
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, format!("Malformed input: {}", message.into()))
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, format!("Invalid configuration: {}", message.into()))
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_uses_input_exit_code() {
        let err = AppError::malformed_input("dataset has no rows");
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert_eq!(err.to_string(), "Malformed input: dataset has no rows");
    }
}
