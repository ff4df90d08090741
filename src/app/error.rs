use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagesiftError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No recipe supports endpoint: {0}")]
    UnsupportedEndpoint(String),

    #[error("Blocked by bot challenge: {0}")]
    Blocked(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out waiting for: {0}")]
    Timeout(String),

    #[error("External tool failed: {0}")]
    ExternalTool(String),

    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Page error: {0}")]
    Page(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PagesiftError {
    /// True for the failure kinds a caller may want to map to a 4xx-style
    /// response rather than a hard server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PagesiftError::InvalidRequest(_)
                | PagesiftError::UnsupportedEndpoint(_)
                | PagesiftError::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PagesiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(PagesiftError::InvalidRequest("missing query".into()).is_client_error());
        assert!(PagesiftError::NotFound("article".into()).is_client_error());
        assert!(!PagesiftError::Blocked("captcha".into()).is_client_error());
        assert!(!PagesiftError::Timeout("selector".into()).is_client_error());
    }
}
