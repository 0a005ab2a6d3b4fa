//! Token authorities

use crate::{AccessTokenRef, Credentials, IssuedTokens, RefreshTokenRef};
use async_trait::async_trait;
use std::error;

#[cfg(feature = "oauth2")]
pub mod oauth2;

/// A grant presented to the authority in exchange for tokens
#[derive(Clone, Copy, Debug)]
pub enum Grant<'a> {
    /// The resource owner password credentials grant
    Password(&'a Credentials),
    /// The refresh token grant
    RefreshToken(&'a RefreshTokenRef),
}

impl Grant<'_> {
    /// The OAuth2 `grant_type` for this grant
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::RefreshToken(_) => "refresh_token",
        }
    }
}

/// An asynchronous authority that issues and revokes tokens
#[async_trait]
pub trait TokenAuthority: Send + Sync {
    /// The error type returned in the event that a request to the authority fails
    type Error: error::Error + Send + Sync + 'static;

    /// Exchanges a grant for a new token pair
    async fn request_token(&self, grant: Grant<'_>) -> Result<IssuedTokens, Self::Error>;

    /// Asks the authority to invalidate an access token
    async fn revoke_token(&self, token: &AccessTokenRef) -> Result<(), Self::Error>;
}
