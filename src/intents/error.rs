use super::plugin_run::PluginRunError;
use crate::backend::BackendError;
use thiserror::Error;

/// Errors of the pass-through intents
#[derive(Debug, Error)]
pub enum IntentError {
    /// Backend error occurred during API communication
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The caller supplied an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Feed bootstrap or plugin run failed
    #[error(transparent)]
    PluginRun(#[from] PluginRunError),

    /// Result could not be converted into plain data
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntentError {
    /// Returns a user-friendly error message with troubleshooting hints
    pub fn help_message(&self) -> String {
        match self {
            IntentError::Backend(BackendError::AuthenticationError { message }) => format!(
                "Error: Authentication failed\n\n\
                 Help: The stored token was rejected. Try:\n\
                 - Log in again: salsa connect --user <name> --password <password>\n\
                 - Check the API URL: salsa context\n\n\
                 Details: {}",
                message
            ),
            IntentError::Backend(BackendError::NetworkError { message })
            | IntentError::Backend(BackendError::ConfigurationError { message }) => format!(
                "Error: Cannot reach the API\n\n\
                 Help: Try:\n\
                 - Check network connectivity\n\
                 - Check the API URL (SALSA_URL or --url)\n\n\
                 Details: {}",
                message
            ),
            IntentError::Backend(BackendError::TimeoutError { seconds }) => format!(
                "Error: Request timeout after {} seconds\n\n\
                 Help: Try:\n\
                 - Increase timeout: --timeout {}\n\
                 - Check the API status",
                seconds,
                seconds * 2
            ),
            IntentError::PluginRun(err) => format!(
                "Error: {}\n\nFailed step: {}",
                err,
                err.step()
            ),
            other => format!("Error: {}", other),
        }
    }
}
