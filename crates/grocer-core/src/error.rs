use thiserror::Error;

/// Top-level error type for the grocer workspace.
///
/// Subsystem crates define their own error types and implement
/// `From<GrocerError>` (or the reverse) so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GrocerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog load failed: {0}")]
    Catalog(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for GrocerError {
    fn from(err: toml::de::Error) -> Self {
        GrocerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for GrocerError {
    fn from(err: toml::ser::Error) -> Self {
        GrocerError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for GrocerError {
    fn from(err: serde_json::Error) -> Self {
        GrocerError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for grocer operations.
pub type Result<T> = std::result::Result<T, GrocerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GrocerError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(GrocerError, &str)> = vec![
            (
                GrocerError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                GrocerError::Catalog("duplicate id 7".to_string()),
                "Catalog load failed: duplicate id 7",
            ),
            (
                GrocerError::Api("bind failed".to_string()),
                "API error: bind failed",
            ),
            (
                GrocerError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GrocerError = io_err.into();
        assert!(matches!(err, GrocerError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let grocer_err: GrocerError = err.unwrap_err().into();
        assert!(matches!(grocer_err, GrocerError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let grocer_err: GrocerError = err.unwrap_err().into();
        assert!(matches!(grocer_err, GrocerError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
