use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Auth service error ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Malformed session: {0}")]
    Session(String),

    #[cfg(feature = "db")]
    #[error("Database error: {message}")]
    Database { message: String },
}

impl PortalError {
    /// True when the auth service answered and refused the credentials,
    /// as opposed to being unreachable or returning garbage.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, PortalError::Auth { status, .. } if (400..500).contains(status))
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
