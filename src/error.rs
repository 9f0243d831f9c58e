/// Error type shared by the fetch, storage and settings layers
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SiaError {
    /// The request never produced a response (offline, CORS, DNS, ...)
    #[error("network error: {0}")]
    Network(String),

    /// The source answered with a non-2xx status
    #[error("request failed with status {0}")]
    Status(u16),

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("payload is not a JSON array")]
    NotAnArray,

    #[error("storage error: {0}")]
    Storage(String),

    /// A setting the current source needs is not configured
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The artifact list held nothing that can still be downloaded
    #[error("no downloadable artifact found")]
    NoArtifact,

    #[error("unreadable archive: {0}")]
    Archive(String),
}

impl SiaError {
    /// Short message suitable for the popup's inline error banner
    pub fn user_message(&self) -> String {
        match self {
            SiaError::Network(_) => {
                "Failed to get data. Please check your internet connection.".to_string()
            }
            SiaError::Status(code) => format!("Failed to fetch data from API. Status: {}", code),
            SiaError::MalformedJson(_) | SiaError::NotAnArray => {
                "Failed to parse data. Please check the API data format.".to_string()
            }
            SiaError::Storage(_) => "Failed to access extension storage.".to_string(),
            SiaError::MissingSetting(name) => format!("Please configure your {} first.", name),
            SiaError::InvalidUrl(url) => format!("Invalid API URL: {}", url),
            SiaError::NoArtifact => "No course data artifact is available yet.".to_string(),
            SiaError::Archive(_) => "Failed to unpack the course data archive.".to_string(),
        }
    }
}

// Errors keep only their message so SiaError stays Clone + PartialEq
impl From<serde_json::Error> for SiaError {
    fn from(err: serde_json::Error) -> Self {
        SiaError::MalformedJson(err.to_string())
    }
}

impl From<zip::result::ZipError> for SiaError {
    fn from(err: zip::result::ZipError) -> Self {
        SiaError::Archive(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SiaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_includes_code() {
        let err = SiaError::Status(503);
        assert_eq!(err.to_string(), "request failed with status 503");
        assert!(err.user_message().contains("503"));
    }

    #[test]
    fn test_from_serde_error() {
        let err: SiaError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, SiaError::MalformedJson(_)));
        assert!(err.to_string().starts_with("malformed JSON: "));
    }

    #[test]
    fn test_from_zip_error() {
        let zip_err = zip::ZipArchive::new(std::io::Cursor::new(b"not a zip".to_vec()))
            .err()
            .unwrap();
        let err = SiaError::from(zip_err);
        assert!(matches!(err, SiaError::Archive(_)));
        assert_eq!(err.user_message(), "Failed to unpack the course data archive.");
    }

    #[test]
    fn test_error_source_trait() {
        let err: Box<dyn std::error::Error> = Box::new(SiaError::NotAnArray);
        assert_eq!(err.to_string(), "payload is not a JSON array");
    }
}
