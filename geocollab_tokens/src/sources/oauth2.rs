//! A token authority backed by an OAuth2 / OpenID Connect identity provider

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use super::{Grant, TokenAuthority};
use crate::{AccessTokenRef, ConfigError, IssuedTokens};

pub mod dto;

/// Timeout applied to every request sent to the identity provider unless overridden
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An authority exposing `/token` and `/revoke` endpoints beneath a common base URL
///
/// Requests are sent as URL-encoded form data.
#[derive(Clone, Debug)]
pub struct OAuth2Authority {
    client: reqwest::Client,
    base_url: reqwest::Url,
    token_url: reqwest::Url,
    revoke_url: reqwest::Url,
    credentials: Arc<dto::ClientCredentials>,
}

impl OAuth2Authority {
    /// Constructs a new authority using the provided HTTP client
    ///
    /// `base_url` is the provider's OpenID Connect prefix, for example
    /// `https://iam.example.com/auth/realms/demo/protocol/openid-connect`.
    pub fn new(
        client: reqwest::Client,
        base_url: reqwest::Url,
        credentials: dto::ClientCredentials,
    ) -> Result<Self, ConfigError> {
        if credentials.client_id.as_str().is_empty() {
            return Err(ConfigError::Missing("a client id"));
        }
        if credentials.client_secret.as_str().is_empty() {
            return Err(ConfigError::Missing("a client secret"));
        }

        let token_url = endpoint(&base_url, "token")?;
        let revoke_url = endpoint(&base_url, "revoke")?;

        Ok(Self {
            client,
            base_url,
            token_url,
            revoke_url,
            credentials: Arc::new(credentials),
        })
    }

    /// Builds an HTTP client with the given request timeout
    pub fn default_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .user_agent(concat!("geocollab_tokens/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(ConfigError::HttpClient)
    }

    /// The base URL of the identity provider
    #[inline]
    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }
}

fn endpoint(base: &reqwest::Url, name: &str) -> Result<reqwest::Url, ConfigError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ConfigError::InvalidUrl {
            url: base.to_string(),
        })?
        .pop_if_empty()
        .push(name);
    Ok(url)
}

/// An error while attempting to talk to the authority
#[derive(Debug, Error)]
pub enum TokenRequestError {
    /// An error from the authority with an error body
    #[error("error response from authority: {body}")]
    ErrorWithBody {
        /// The underlying request error
        source: reqwest::Error,
        /// The body of the error
        body: String,
    },
    /// Unable to deserialize the token body
    #[error("error deserializing token body from authority")]
    TokenBodyError(#[from] serde_json::Error),
    /// Unable to read the response
    #[error("error reading response body")]
    BodyReadError(#[source] reqwest::Error),
    /// Unable to send a request to the authority
    #[error("error sending request to authority")]
    RequestSend(#[source] reqwest::Error),
}

#[async_trait]
impl TokenAuthority for OAuth2Authority {
    type Error = TokenRequestError;

    async fn request_token(&self, grant: Grant<'_>) -> Result<IssuedTokens, Self::Error> {
        let request = self.client.post(self.token_url.clone());
        let request = match grant {
            Grant::Password(credentials) => request.form(&dto::PasswordGrant {
                client: &self.credentials,
                credentials,
            }),
            Grant::RefreshToken(refresh_token) => request.form(&dto::RefreshGrant {
                client: &self.credentials,
                refresh_token,
            }),
        };

        request_token(request, &self.token_url, grant.grant_type(), &self.credentials).await
    }

    async fn revoke_token(&self, token: &AccessTokenRef) -> Result<(), Self::Error> {
        let request = self
            .client
            .post(self.revoke_url.clone())
            .form(&dto::RevokeRequest::new(&self.credentials, token));

        revoke_token(request, &self.revoke_url, &self.credentials).await
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, TokenRequestError> {
    if let Err(error) = resp.error_for_status_ref() {
        let body = resp
            .text()
            .await
            .map_err(TokenRequestError::BodyReadError)?;
        return Err(TokenRequestError::ErrorWithBody {
            source: error,
            body,
        });
    }

    Ok(resp)
}

#[tracing::instrument(
    err,
    skip(request, token_url, grant_type, credentials),
    fields(
        token_url = %token_url,
        credentials.grant_type = grant_type,
        credentials.client_id = %credentials.client_id,
    ),
)]
async fn request_token(
    request: reqwest::RequestBuilder,
    token_url: &reqwest::Url,
    grant_type: &'static str,
    credentials: &dto::ClientCredentials,
) -> Result<IssuedTokens, TokenRequestError> {
    tracing::trace!("requesting token from authority");

    let resp = request.send().await.map_err(TokenRequestError::RequestSend)?;

    tracing::debug!(
        response.status = resp.status().as_u16(),
        "received token response from issuing authority"
    );

    let resp = error_for_status(resp).await?;

    let body = resp
        .bytes()
        .await
        .map_err(TokenRequestError::BodyReadError)?;
    let resp: dto::TokenResponse = serde_json::from_slice(&body)?;

    tracing::info!(
        has_refresh_token = resp.refresh_token.is_some(),
        expires_in = resp.expires_in.0,
        refresh_expires_in = resp.refresh_expires_in.0,
        "received new tokens"
    );

    Ok(resp.into_issued())
}

#[tracing::instrument(
    err,
    skip(request, revoke_url, credentials),
    fields(
        revoke_url = %revoke_url,
        credentials.client_id = %credentials.client_id,
    ),
)]
async fn revoke_token(
    request: reqwest::RequestBuilder,
    revoke_url: &reqwest::Url,
    credentials: &dto::ClientCredentials,
) -> Result<(), TokenRequestError> {
    tracing::trace!("revoking token at authority");

    let resp = request.send().await.map_err(TokenRequestError::RequestSend)?;

    tracing::debug!(
        response.status = resp.status().as_u16(),
        "received revocation response from authority"
    );

    error_for_status(resp).await?;

    tracing::info!("access token revoked");
    Ok(())
}
