//! Errors produced while managing tokens

use std::error;

use thiserror::Error;

/// A boxed error from a token authority
pub type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// An error raised by the [`TokenManager`][crate::TokenManager]
///
/// Each variant is prefixed with the phase in which the failure occurred.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The caller supplied missing or malformed arguments
    ///
    /// Always detected before any request is made.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The password grant failed
    #[error("Access Token Error: {source}")]
    Acquisition {
        /// The underlying authority error
        source: BoxError,
    },
    /// The refresh token grant failed
    #[error("Error refreshing access token: {source}")]
    Refresh {
        /// The underlying authority error
        source: BoxError,
    },
    /// The revocation request failed
    ///
    /// Local token state has been cleared regardless.
    #[error("Error revoking access token: {source}")]
    Revocation {
        /// The underlying authority error
        source: BoxError,
    },
}

impl TokenError {
    pub(crate) fn acquisition(source: impl Into<BoxError>) -> Self {
        Self::Acquisition {
            source: source.into(),
        }
    }

    pub(crate) fn refresh(source: impl Into<BoxError>) -> Self {
        Self::Refresh {
            source: source.into(),
        }
    }

    pub(crate) fn revocation(source: impl Into<BoxError>) -> Self {
        Self::Revocation {
            source: source.into(),
        }
    }
}

/// The token manager could not be constructed
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was missing or empty
    #[error("{0} must be provided")]
    Missing(&'static str),
    /// The authentication URL could not be used as a base for the token endpoints
    #[error("invalid authentication url `{url}`")]
    InvalidUrl {
        /// The offending URL
        url: String,
    },
    /// The HTTP client could not be built
    #[cfg(feature = "oauth2")]
    #[cfg_attr(docsrs, doc(cfg(feature = "oauth2")))]
    #[error("unable to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}
