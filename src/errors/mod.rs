use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong while talking to NextCloud or to the host.
///
/// Only `ConfigurationMissing`, `InvalidConfiguration` and `Host` escape the
/// plugin entry points. The rest are turned into notifications, recorded in
/// an `UploadReport`, or queued for retry.
#[derive(Error, Debug)]
pub enum NextcloudError {
    #[error("NextCloud is not configured yet, please fill in the picBed.nextcloud settings first")]
    ConfigurationMissing,

    #[error("Invalid NextCloud configuration: {0}")]
    InvalidConfiguration(#[source] serde_json::Error),

    /// Non-2xx answer. The message starts with the numeric status so
    /// callers can classify it by prefix.
    #[error("{status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid base64 payload for '{file_name}': {source}")]
    InvalidPayload {
        file_name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Nothing to upload for '{file_name}': neither buffer nor base64Image is set")]
    MissingPayload { file_name: String },

    #[error("Unexpected share response: {0}")]
    InvalidShareResponse(#[source] serde_json::Error),

    #[error("Failed to delete '{file_name}': {reason}")]
    DeleteFailed { file_name: String, reason: String },

    #[error("Failed to serialize item: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

impl NextcloudError {
    /// Failures whose message begins with `404` mean the remote folder is
    /// missing, which is a settings problem rather than a server problem.
    pub fn is_path_not_found(&self) -> bool {
        self.to_string().starts_with("404")
    }

    /// Stable code for logs and frontends
    pub fn error_code(&self) -> &'static str {
        match self {
            NextcloudError::ConfigurationMissing => "CONFIGURATION_MISSING",
            NextcloudError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            NextcloudError::Http { .. } if self.is_path_not_found() => "PATH_NOT_FOUND",
            NextcloudError::Http { .. } => "HTTP_ERROR",
            NextcloudError::Transport(_) => "TRANSPORT_ERROR",
            NextcloudError::InvalidPayload { .. } => "INVALID_PAYLOAD",
            NextcloudError::MissingPayload { .. } => "MISSING_PAYLOAD",
            NextcloudError::InvalidShareResponse(_) => "INVALID_SHARE_RESPONSE",
            NextcloudError::DeleteFailed { .. } => "DELETE_FAILED",
            NextcloudError::Serialization(_) => "SERIALIZATION_ERROR",
            NextcloudError::Host(_) => "HOST_ERROR",
        }
    }

    /// Text shown to the user in a notification body
    pub fn user_message(&self) -> String {
        if self.is_path_not_found() {
            return "Remote path does not exist, please check the path setting".to_string();
        }

        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_404_is_path_not_found() {
        let error = NextcloudError::Http {
            status: StatusCode::NOT_FOUND,
            body: "<d:error/>".to_string(),
        };

        assert!(error.to_string().starts_with("404 Not Found"));
        assert!(error.is_path_not_found());
        assert_eq!(error.error_code(), "PATH_NOT_FOUND");
        assert_eq!(
            error.user_message(),
            "Remote path does not exist, please check the path setting"
        );
    }

    #[test]
    fn test_other_http_errors_keep_raw_message() {
        let error = NextcloudError::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        };

        assert!(!error.is_path_not_found());
        assert_eq!(error.error_code(), "HTTP_ERROR");
        assert_eq!(error.user_message(), "500 Internal Server Error: boom");
    }

    #[test]
    fn test_error_codes_for_batch_failures() {
        let missing = NextcloudError::MissingPayload {
            file_name: "a.png".to_string(),
        };
        let delete = NextcloudError::DeleteFailed {
            file_name: "a.png".to_string(),
            reason: "500 Internal Server Error: ".to_string(),
        };

        assert_eq!(missing.error_code(), "MISSING_PAYLOAD");
        assert_eq!(delete.error_code(), "DELETE_FAILED");
        assert_eq!(NextcloudError::ConfigurationMissing.error_code(), "CONFIGURATION_MISSING");
    }
}
