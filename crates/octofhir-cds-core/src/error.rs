use thiserror::Error;

/// Errors raised while assembling the CDS engine at startup.
///
/// Request-time problems are never reported through this type: validation
/// failures are returned as [`crate::validation::ValidationError`] values and
/// handler faults as [`crate::service::ServiceError`].
#[derive(Debug, Error)]
pub enum CdsError {
    #[error("Duplicate CDS service id: {0}")]
    DuplicateService(String),

    #[error("Invalid CDS service '{id}': {message}")]
    InvalidService { id: String, message: String },

    #[error("Schema compilation failed for {target}: {message}")]
    SchemaCompile { target: String, message: String },
}

impl CdsError {
    /// Create a new DuplicateService error
    pub fn duplicate_service(id: impl Into<String>) -> Self {
        Self::DuplicateService(id.into())
    }

    /// Create a new InvalidService error
    pub fn invalid_service(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidService {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a new SchemaCompile error
    pub fn schema_compile(target: impl Into<String>, message: impl ToString) -> Self {
        Self::SchemaCompile {
            target: target.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for engine assembly
pub type Result<T> = std::result::Result<T, CdsError>;
