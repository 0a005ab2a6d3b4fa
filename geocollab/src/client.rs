use std::time::Duration;

use bytes::{BufMut, BytesMut};
use geocollab_tokens::{
    sources::oauth2::OAuth2Authority, AccessToken, AccessTokenRef, Credentials, TokenManager,
    Username, UsernameRef,
};
use reqwest::{
    header::{self, HeaderValue},
    multipart::Form,
    Method, RequestBuilder, Url,
};
use serde_json::{Map, Value};

use crate::{
    cipher::{EncryptedPassword, PasswordCipher},
    config::{AuthConfig, ClientConfig, ConfigError},
    Error,
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The authenticated session of a single user with the collaboration API
///
/// The client keeps the user's name in clear and their password encrypted
/// with a [`PasswordCipher`]. Every request is authorized with a bearer token
/// obtained from the client's [`TokenManager`], which acquires, refreshes and
/// caches tokens as needed.
///
/// There is no process-wide instance. Callers needing one can keep a client
/// in a `OnceLock` or behind an `Arc<tokio::sync::RwLock<_>>`.
///
/// ```no_run
/// # async fn run() -> Result<(), geocollab::Error> {
/// use geocollab::{ApiClient, AuthConfig, ClientConfig, UserId};
///
/// let config = ClientConfig::new("https://collab.example.com/gcms/api")?.with_auth(
///     AuthConfig::new(
///         "https://iam.example.com/auth/realms/demo/protocol/openid-connect",
///         "collab-client",
///         "collab-secret",
///     ),
/// );
///
/// let mut client = ApiClient::new(config)?;
/// client.set_credentials("mapper", "hunter2").await?;
/// client.connect().await?;
///
/// let me = client.get_user(UserId::Me, &[]).await?;
/// println!("{}", me);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    api_url: Url,
    request_timeout: Duration,
    cipher: PasswordCipher,
    tokens: Option<TokenManager<OAuth2Authority>>,
    identity: Option<Identity>,
}

#[derive(Debug)]
struct Identity {
    username: Username,
    password: EncryptedPassword,
}

impl ApiClient {
    /// Constructs a client from its configuration
    ///
    /// A token manager is only built when the configuration carries
    /// authentication settings. Without one, every request fails with
    /// [`Error::NotConfigured`] until [`reconfigure_auth()`][Self::reconfigure_auth()]
    /// is called.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        if config.api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: config.api_url.into(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http,
            cipher: PasswordCipher::new(config.secret.as_deref())?,
            tokens: token_manager(config.auth.as_ref(), config.request_timeout)?,
            api_url: config.api_url,
            request_timeout: config.request_timeout,
            identity: None,
        })
    }

    /// The API base URL
    #[inline]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// The token manager, if authentication is configured
    #[inline]
    pub fn token_manager(&self) -> Option<&TokenManager<OAuth2Authority>> {
        self.tokens.as_ref()
    }

    /// The name of the user whose credentials are set
    pub fn username(&self) -> Option<&UsernameRef> {
        self.identity.as_ref().map(|i| &*i.username)
    }

    /// The stored password, as encrypted by this client's cipher
    ///
    /// Can be persisted and later passed back to
    /// [`set_encrypted_credentials()`][Self::set_encrypted_credentials()].
    pub fn encrypted_password(&self) -> Option<&EncryptedPassword> {
        self.identity.as_ref().map(|i| &i.password)
    }

    /// Replaces the authentication settings
    ///
    /// The current session is disconnected and the stored credentials are
    /// forgotten. Passing `None` leaves the client unable to authenticate.
    pub async fn reconfigure_auth(&mut self, auth: Option<AuthConfig>) -> Result<(), Error> {
        let tokens = token_manager(auth.as_ref(), self.request_timeout)?;

        self.end_session().await;
        self.identity = None;
        self.tokens = tokens;
        Ok(())
    }

    /// Sets the credentials of the user on whose behalf requests are made
    ///
    /// The password is encrypted before being stored. If another user's
    /// credentials were set, that user's session is disconnected first.
    pub async fn set_credentials(&mut self, username: &str, password: &str) -> Result<(), Error> {
        check_credentials(username, password)?;
        let password = self.cipher.encrypt(password)?;
        self.replace_identity(username, password).await;
        Ok(())
    }

    /// Sets credentials whose password was already encrypted by a cipher with
    /// the same secret
    pub async fn set_encrypted_credentials(
        &mut self,
        username: &str,
        password: EncryptedPassword,
    ) -> Result<(), Error> {
        check_credentials(username, password.as_str())?;
        self.replace_identity(username, password).await;
        Ok(())
    }

    async fn replace_identity(&mut self, username: &str, password: EncryptedPassword) {
        let other_user = self
            .identity
            .as_ref()
            .map_or(false, |i| i.username.as_str() != username);

        if other_user {
            tracing::debug!("credentials changed to another user, ending current session");
            self.end_session().await;
        }

        self.identity = Some(Identity {
            username: Username::new(username.to_owned()),
            password,
        });
    }

    async fn end_session(&self) {
        if let Some(tokens) = &self.tokens {
            if let Err(error) = tokens.disconnect().await {
                tracing::warn!(%error, "unable to revoke access token, continuing");
            }
        }
    }

    /// Whether an access token is held
    ///
    /// The token may have expired; it will be refreshed by the next request.
    pub fn is_connected(&self) -> bool {
        self.tokens
            .as_ref()
            .map_or(false, TokenManager::has_access_token)
    }

    /// Acquires an access token for the stored credentials
    pub async fn connect(&self) -> Result<(), Error> {
        self.access_token().await.map(drop)
    }

    /// Forgets the held tokens and revokes the access token
    pub async fn disconnect(&self) -> Result<(), Error> {
        match &self.tokens {
            Some(tokens) => Ok(tokens.disconnect().await?),
            None => Ok(()),
        }
    }

    async fn access_token(&self) -> Result<AccessToken, Error> {
        let tokens = self.tokens.as_ref().ok_or(Error::NotConfigured)?;
        let identity = self.identity.as_ref().ok_or(Error::ConnectionRequired)?;

        let credentials = Credentials::new(
            identity.username.clone(),
            self.cipher.decrypt(&identity.password)?,
        );

        Ok(tokens.fetch_token(&credentials).await?)
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, Error> {
        let token = self.access_token().await?;
        Ok(request.header(header::AUTHORIZATION, bearer(&token)?))
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigError::InvalidUrl {
                url: self.api_url.to_string(),
            })?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }

    #[tracing::instrument(
        level = "debug",
        err,
        skip(self, method, prepare),
        fields(http.method = %method, http.status = tracing::field::Empty),
    )]
    async fn dispatch<F>(&self, method: Method, path: &str, prepare: F) -> Result<Value, Error>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        if method != Method::GET && !self.is_connected() {
            return Err(Error::ConnectionRequired);
        }

        let url = self.endpoint(path)?;
        let request = prepare(self.http.request(method, url));
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(Error::Request)?;

        let status = response.status();
        tracing::Span::current().record("http.status", status.as_u16());

        let body = response.bytes().await.map_err(Error::Request)?;
        if !status.is_success() {
            return Err(Error::Api {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&body)?)
    }

    pub(crate) async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, Error> {
        self.dispatch(Method::GET, path, |r| r.query(params)).await
    }

    pub(crate) async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: &Map<String, Value>,
    ) -> Result<Value, Error> {
        self.dispatch(method, path, |r| r.json(body)).await
    }

    pub(crate) async fn send_form(&self, path: &str, form: Form) -> Result<Value, Error> {
        self.dispatch(Method::POST, path, move |r| r.multipart(form))
            .await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<Value, Error> {
        self.dispatch(Method::DELETE, path, |r| r).await
    }
}

fn token_manager(
    auth: Option<&AuthConfig>,
    timeout: Duration,
) -> Result<Option<TokenManager<OAuth2Authority>>, Error> {
    let Some(auth) = auth else {
        return Ok(None);
    };

    let manager = TokenManager::with_timeout(
        &auth.auth_url,
        auth.client_id.clone(),
        auth.client_secret.clone(),
        timeout,
    )?;

    Ok(Some(manager))
}

fn check_credentials(username: &str, password: &str) -> Result<(), Error> {
    if username.is_empty() || password.is_empty() {
        return Err(Error::invalid("username and password must be provided"));
    }
    Ok(())
}

fn bearer(token: &AccessTokenRef) -> Result<HeaderValue, Error> {
    let mut header_value = BytesMut::with_capacity(token.as_str().len() + 7);
    header_value.put_slice(b"Bearer ");
    header_value.put_slice(token.as_str().as_bytes());

    let mut value = HeaderValue::from_maybe_shared(header_value.freeze())?;
    value.set_sensitive(true);
    Ok(value)
}
