//! DTOs for interacting with the identity provider's token endpoints

use geocollab_clock::DurationSecs;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    AccessToken, AccessTokenRef, ClientId, ClientIdRef, ClientSecret, ClientSecretRef,
    Credentials, IssuedTokens, RefreshToken, RefreshTokenRef,
};

const SCOPE: &str = "openid";

/// Client credentials
#[derive(Debug, Serialize)]
pub struct ClientCredentials {
    /// The client ID
    pub client_id: ClientId,

    /// The client secret
    pub client_secret: ClientSecret,
}

/// A password grant request body
#[derive(Debug)]
pub(super) struct PasswordGrant<'a> {
    pub client: &'a ClientCredentials,
    pub credentials: &'a Credentials,
}

impl Serialize for PasswordGrant<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut ser = serializer.serialize_struct("PasswordGrant", 6)?;
        ser.serialize_field("grant_type", "password")?;
        ser.serialize_field("username", self.credentials.username())?;
        ser.serialize_field("password", self.credentials.password())?;
        ser.serialize_field("client_id", &self.client.client_id)?;
        ser.serialize_field("client_secret", &self.client.client_secret)?;
        ser.serialize_field("scope", SCOPE)?;
        ser.end()
    }
}

/// A refresh token grant request body
#[derive(Debug)]
pub(super) struct RefreshGrant<'a> {
    pub client: &'a ClientCredentials,
    pub refresh_token: &'a RefreshTokenRef,
}

impl Serialize for RefreshGrant<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut ser = serializer.serialize_struct("RefreshGrant", 5)?;
        ser.serialize_field("grant_type", "refresh_token")?;
        ser.serialize_field("refresh_token", self.refresh_token)?;
        ser.serialize_field("client_id", &self.client.client_id)?;
        ser.serialize_field("client_secret", &self.client.client_secret)?;
        ser.serialize_field("scope", SCOPE)?;
        ser.end()
    }
}

/// A revocation request body
#[derive(Debug, Serialize)]
pub(super) struct RevokeRequest<'a> {
    pub client_id: &'a ClientIdRef,
    pub client_secret: &'a ClientSecretRef,
    pub token: &'a AccessTokenRef,
}

impl<'a> RevokeRequest<'a> {
    pub fn new(client: &'a ClientCredentials, token: &'a AccessTokenRef) -> Self {
        Self {
            client_id: &client.client_id,
            client_secret: &client.client_secret,
            token,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub(super) struct TokenResponse {
    pub access_token: AccessToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,
    pub expires_in: DurationSecs,
    #[serde(default)]
    pub refresh_expires_in: DurationSecs,
}

impl TokenResponse {
    pub fn into_issued(self) -> IssuedTokens {
        IssuedTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            refresh_expires_in: self.refresh_expires_in,
        }
    }
}
