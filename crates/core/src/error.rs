use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid task identifier '{0}': must be 1-100 characters of letters, digits, '.', '-' or '_'")]
    InvalidTaskId(String),

    #[error("Invalid evaluation URL '{url}': {reason}")]
    InvalidEvaluationUrl { url: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CoreError::InvalidTaskId("bad name".to_string());
        assert!(error.to_string().contains("bad name"));
    }
}
