use thiserror::Error;

/// Top-level error type for the docuflow system.
///
/// Each variant wraps a subsystem-specific message. Subsystem crates return
/// `Result<T, DocuflowError>` so the `?` operator works seamlessly across
/// crate boundaries; the API layer maps these onto HTTP status codes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocuflowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Flow engine error: {0}")]
    Engine(String),

    #[error("Chat completion error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Blob storage error: {0}")]
    Blob(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for DocuflowError {
    fn from(err: toml::de::Error) -> Self {
        DocuflowError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DocuflowError {
    fn from(err: toml::ser::Error) -> Self {
        DocuflowError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DocuflowError {
    fn from(err: serde_json::Error) -> Self {
        DocuflowError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for docuflow operations.
pub type Result<T> = std::result::Result<T, DocuflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocuflowError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(DocuflowError, &str)> = vec![
            (
                DocuflowError::Template("unknown name".to_string()),
                "Template error: unknown name",
            ),
            (
                DocuflowError::Session("expired".to_string()),
                "Session error: expired",
            ),
            (
                DocuflowError::Engine("plan missing".to_string()),
                "Flow engine error: plan missing",
            ),
            (
                DocuflowError::Llm("timeout".to_string()),
                "Chat completion error: timeout",
            ),
            (
                DocuflowError::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (
                DocuflowError::Blob("container gone".to_string()),
                "Blob storage error: container gone",
            ),
            (
                DocuflowError::Render("bad template".to_string()),
                "Render error: bad template",
            ),
            (
                DocuflowError::Api("unroutable".to_string()),
                "API error: unroutable",
            ),
            (
                DocuflowError::Serialization("invalid json".to_string()),
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
        let err: DocuflowError = io_err.into();
        assert!(matches!(err, DocuflowError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let parsed: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        assert!(parsed.is_err());
        let err: DocuflowError = parsed.unwrap_err().into();
        assert!(matches!(err, DocuflowError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let bad_json = "{ invalid json }";
        let parsed: std::result::Result<serde_json::Value, _> = serde_json::from_str(bad_json);
        assert!(parsed.is_err());
        let err: DocuflowError = parsed.unwrap_err().into();
        assert!(matches!(err, DocuflowError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
