//! Errors reported back to menu clients

use thiserror::Error;

/// Failures of control channel requests
#[derive(Debug, Error)]
pub enum MenuError {
    /// The menu definition could not be parsed
    #[error("malformed menu content: {0}")]
    ContentFormat(#[from] serde_json::Error),

    /// No session is registered under this path
    #[error("unknown menu session: {0}")]
    UnknownSession(String),

    /// The presentation backend failed to show a menu surface
    #[error("failed to show menu: {0}")]
    Presentation(String),

    /// The core thread is gone (process shutting down)
    #[error("menu service is not running")]
    ServiceStopped,
}

impl From<MenuError> for zbus::fdo::Error {
    fn from(err: MenuError) -> Self {
        match err {
            MenuError::ContentFormat(_) | MenuError::UnknownSession(_) => {
                zbus::fdo::Error::InvalidArgs(err.to_string())
            }
            MenuError::Presentation(_) | MenuError::ServiceStopped => {
                zbus::fdo::Error::Failed(err.to_string())
            }
        }
    }
}
