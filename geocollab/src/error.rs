use geocollab_tokens::TokenError;
use reqwest::{header::InvalidHeaderValue, StatusCode};
use thiserror::Error;

use crate::{cipher::CipherError, config::ConfigError};

/// An error raised by the [`ApiClient`][crate::ApiClient]
#[derive(Debug, Error)]
pub enum Error {
    /// An argument failed local validation; no request was made
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Credentials must be set and a token acquired before this operation
    #[error("not connected: set credentials and connect first")]
    ConnectionRequired,
    /// The client was built without a client ID and client secret
    #[error("ApiClient must have a client_id and a client_secret")]
    NotConfigured,
    /// A token could not be acquired, refreshed or revoked
    #[error(transparent)]
    Token(#[from] TokenError),
    /// The configuration could not be used
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The stored password could not be encrypted or decrypted
    #[error(transparent)]
    Cipher(#[from] CipherError),
    /// The access token cannot be sent in an HTTP header
    #[error("access token is not a valid header value")]
    InvalidToken(#[from] InvalidHeaderValue),
    /// The request could not be sent or its response could not be read
    #[error("error sending request to the API")]
    Request(#[source] reqwest::Error),
    /// The API answered with an unsuccessful status
    #[error("API responded with {status}: {body}")]
    Api {
        /// The response status
        status: StatusCode,
        /// The response body, lossily decoded
        body: String,
    },
    /// The response body was not valid JSON
    #[error("unable to decode API response")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<geocollab_tokens::ConfigError> for Error {
    fn from(err: geocollab_tokens::ConfigError) -> Self {
        Self::Config(ConfigError::Auth(err))
    }
}
