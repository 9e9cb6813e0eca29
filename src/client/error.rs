use thiserror::Error;

/// Failures reported by the identity provider
#[derive(Debug, Error)]
pub enum IdentityError {
    /// `message` is user-facing; `code` is the provider's raw error code
    #[error("{message}")]
    Rejected { code: String, message: String },

    #[error("Identity service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected identity service response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Non-2xx from the profile API; `message` is the server's error text verbatim
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    NotAuthenticated(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed profile response: {0}")]
    Malformed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
