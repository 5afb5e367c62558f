#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Request cancelled")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Whether this is a connection-level failure (DNS, refused, reset, timeout).
    pub fn is_network(&self) -> bool {
        match self {
            AppError::Http(e) => {
                e.is_connect() || e.is_timeout() || e.is_request() || looks_like_network(&e.to_string())
            }
            AppError::Timeout => true,
            AppError::Other(msg) => looks_like_network(msg),
            _ => false,
        }
    }

    /// Message shown to the user when a send fails.
    pub fn user_message(&self) -> String {
        if self.is_network() {
            format!("Network error: {self}")
        } else {
            format!("Request failed: {self}")
        }
    }
}

fn looks_like_network(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    ["network", "connection", "dns", "resolve", "timed out", "unreachable"]
        .iter()
        .any(|needle| msg.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_network_message_is_classified() {
        let err = AppError::Other("Connection refused (os error 111)".into());
        assert!(err.is_network());
        assert!(err.user_message().starts_with("Network error:"));
    }

    #[test]
    fn test_validation_is_not_network() {
        let err = AppError::validation("URL is empty");
        assert!(!err.is_network());
        assert_eq!(err.user_message(), "Request failed: URL is empty");
    }

    #[test]
    fn test_timeout_is_network() {
        assert!(AppError::Timeout.is_network());
    }
}
