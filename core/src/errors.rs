use thiserror::Error;

/// Failures raised by adapters and session plumbing.
///
/// Selection and prompt composition never fail; everything listed here is
/// produced by an adapter call or by encoding/decoding a session document.
#[derive(Debug, Error)]
pub enum BlacklightError {
    #[error("{0}")]
    Config(String),
    #[error("{message}")]
    Backend { status: Option<u16>, message: String },
    #[error("{0}")]
    UnsupportedEnvironment(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid session document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BlacklightError>;

impl BlacklightError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn backend(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedEnvironment(message.into())
    }

    /// HTTP status carried by the failure, if one was observed.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => *status,
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CFG-1001",
            Self::Backend { .. } => "BKD-1001",
            Self::UnsupportedEnvironment(_) => "ENV-1001",
            Self::Http(_) => "NET-1001",
            Self::Serialization(_) => "SES-1001",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::Config(_) => "A required credential or endpoint is missing for the active backend.",
            Self::Backend { .. } => "The backend answered with a failure status or an error body.",
            Self::UnsupportedEnvironment(_) => "The host lacks a capability the active backend needs.",
            Self::Http(_) => "The backend could not be reached or its reply could not be read.",
            Self::Serialization(_) => "The session document could not be encoded or decoded.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_keeps_status_and_message() {
        let err = BlacklightError::backend(Some(500), "Ollama error 500: boom");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "Ollama error 500: boom");
        assert_eq!(err.code(), "BKD-1001");
    }

    #[test]
    fn codes_are_distinct_per_kind() {
        let config = BlacklightError::config("missing key");
        let env = BlacklightError::unsupported("no runtime");
        assert_ne!(config.code(), env.code());
        assert_eq!(config.status(), None);
    }
}
