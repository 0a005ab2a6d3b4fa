//! Client configuration

use std::{env, time::Duration};

use geocollab_tokens::{ClientId, ClientSecret};
use reqwest::Url;
use thiserror::Error;

/// Timeout applied to every request unless overridden
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the API base URL
pub const API_URL_VAR: &str = "GEOCOLLAB_API_URL";
/// Environment variable holding the identity provider's base URL
pub const AUTH_URL_VAR: &str = "GEOCOLLAB_AUTH_URL";
/// Environment variable holding the OAuth2 client ID
pub const CLIENT_ID_VAR: &str = "GEOCOLLAB_CLIENT_ID";
/// Environment variable holding the OAuth2 client secret
pub const CLIENT_SECRET_VAR: &str = "GEOCOLLAB_CLIENT_SECRET";
/// Environment variable holding the secret used to encrypt passwords at rest
pub const SECRET_VAR: &str = "SECRET";
/// Environment variable holding the request timeout in seconds
pub const TIMEOUT_VAR: &str = "GEOCOLLAB_TIMEOUT_SECS";

/// The configuration could not be used
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set
    #[error("environment variable {0} must be set")]
    MissingVar(&'static str),
    /// A URL could not be parsed
    #[error("invalid url `{url}`")]
    InvalidUrl {
        /// The offending URL
        url: String,
    },
    /// The timeout was not a whole number of seconds
    #[error("invalid timeout `{0}`, expected a number of seconds")]
    InvalidTimeout(String),
    /// The token manager could not be constructed
    #[error("invalid authentication settings")]
    Auth(#[from] geocollab_tokens::ConfigError),
    /// The HTTP client could not be built
    #[error("unable to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// Settings for the identity provider
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The identity provider's OpenID Connect base URL
    pub auth_url: String,
    /// The OAuth2 client ID
    pub client_id: ClientId,
    /// The OAuth2 client secret
    pub client_secret: ClientSecret,
}

impl AuthConfig {
    /// Constructs new authentication settings
    pub fn new(
        auth_url: impl Into<String>,
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// Settings for an [`ApiClient`][crate::ApiClient]
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// The API base URL
    pub api_url: Url,
    /// Identity provider settings; without them only unauthenticated use is possible
    pub auth: Option<AuthConfig>,
    /// Secret used to encrypt the stored password
    ///
    /// When absent, a fixed and publicly known default is used.
    pub secret: Option<String>,
    /// Timeout applied to every request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Constructs a configuration for the API at `api_url`
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_url(api_url)?,
            auth: None,
            secret: None,
            request_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Adds identity provider settings
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets the secret used to encrypt passwords at rest
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Sets the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Reads the configuration from the process environment
    ///
    /// Authentication settings are only present if the auth URL, client ID
    /// and client secret variables are all set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let api_url = var(API_URL_VAR).ok_or(ConfigError::MissingVar(API_URL_VAR))?;
        let mut config = Self::new(&api_url)?;

        if let (Some(auth_url), Some(client_id), Some(client_secret)) = (
            var(AUTH_URL_VAR),
            var(CLIENT_ID_VAR),
            var(CLIENT_SECRET_VAR),
        ) {
            config.auth = Some(AuthConfig::new(auth_url, client_id, client_secret));
        }

        config.secret = var(SECRET_VAR);

        if let Some(timeout) = var(TIMEOUT_VAR) {
            let secs = timeout
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(timeout.clone()))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|_| ConfigError::InvalidUrl {
        url: url.to_owned(),
    })
}
