//! Error types for dashboard insights operations

use thiserror::Error;

/// Errors that can occur while producing insights or managing
/// personalization / annotation records
#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    #[error("Insufficient data for calculation: {operation}")]
    InsufficientData { operation: String },

    #[error("Calculation error: {message}")]
    CalculationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("{entity} with id {id} not found")]
    NotFound { entity: String, id: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },
}

impl InsightsError {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData { message: message.into() }
    }

    pub fn insufficient_data(operation: impl Into<String>) -> Self {
        Self::InsufficientData { operation: operation.into() }
    }

    pub fn calculation_error(message: impl Into<String>) -> Self {
        Self::CalculationError { message: message.into() }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::StorageError { message: message.into() }
    }
}

/// Run `work`, and if it fails log the error and return `fallback()` instead.
///
/// Every public analysis entry point goes through this so callers always
/// receive a value of the expected shape.
pub fn safely<T, W, F>(operation: &str, work: W, fallback: F) -> T
where
    W: FnOnce() -> Result<T, InsightsError>,
    F: FnOnce() -> T,
{
    match work() {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(operation, error = %err, "Insights operation failed, returning fallback");
            fallback()
        }
    }
}

/// Reject NaN and infinite values before any arithmetic touches them.
pub fn ensure_finite(values: &[f64], operation: &str) -> Result<(), InsightsError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(InsightsError::invalid_data(format!(
            "{}: non-finite value at index {}",
            operation, index
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safely_returns_work_result_on_success() {
        let value = safely("ok", || Ok(5), || 0);
        assert_eq!(value, 5);
    }

    #[test]
    fn safely_returns_fallback_on_error() {
        let value: Vec<u8> = safely(
            "failing",
            || Err(InsightsError::invalid_data("boom")),
            Vec::new,
        );
        assert!(value.is_empty());
    }

    #[test]
    fn ensure_finite_reports_first_bad_index() {
        let err = ensure_finite(&[1.0, f64::NAN, f64::INFINITY], "test").unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn ensure_finite_accepts_empty_and_normal_values() {
        assert!(ensure_finite(&[], "test").is_ok());
        assert!(ensure_finite(&[0.0, -3.5, 1e9], "test").is_ok());
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = InsightsError::not_found("Annotation", 42);
        assert_eq!(err.to_string(), "Annotation with id 42 not found");
    }
}
