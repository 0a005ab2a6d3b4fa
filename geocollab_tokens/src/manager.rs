use std::sync::{Mutex, MutexGuard, PoisonError};

use geocollab_clock::{Clock, System};
use tokio::sync::Notify;

use crate::{
    sources::{Grant, TokenAuthority},
    tokens::TokenState,
    AccessToken, Credentials, IssuedTokens, RefreshToken, TokenError, TokenStatus,
};

#[cfg(feature = "oauth2")]
use crate::{
    sources::oauth2::{dto::ClientCredentials, OAuth2Authority, DEFAULT_TIMEOUT},
    ClientId, ClientSecret, ConfigError,
};

/// Acquires, caches, refreshes and revokes the access token of a single user session
///
/// The manager is meant to be shared (typically behind an `Arc`) by every
/// operation that needs a bearer token. When no usable token is held, only one
/// password grant is ever outstanding at a time: other callers wait for it to
/// complete and then re-evaluate, usually finding the freshly stored token.
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use geocollab_tokens::{Credentials, TokenManager};
///
/// let manager = TokenManager::new(
///     "https://iam.example.com/auth/realms/demo/protocol/openid-connect",
///     "collab-client",
///     "collab-secret",
/// )?;
///
/// let credentials = Credentials::new("mapper", "hunter2");
/// let token = manager.fetch_token(&credentials).await?;
/// println!("{:#?}", token);
///
/// manager.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TokenManager<A, C = System> {
    authority: A,
    clock: C,
    state: Mutex<TokenState>,
    acquired: Notify,
}

#[cfg(feature = "oauth2")]
#[cfg_attr(docsrs, doc(cfg(feature = "oauth2")))]
impl TokenManager<OAuth2Authority> {
    /// Constructs a manager talking to the identity provider at `auth_url`
    ///
    /// Fails if any of the settings is empty or if the URL cannot be used as a
    /// base for the `/token` and `/revoke` endpoints.
    pub fn new(
        auth_url: &str,
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
    ) -> Result<Self, ConfigError> {
        Self::with_timeout(auth_url, client_id, client_secret, DEFAULT_TIMEOUT)
    }

    /// Constructs a manager whose requests give up after `timeout`
    pub fn with_timeout(
        auth_url: &str,
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
        timeout: std::time::Duration,
    ) -> Result<Self, ConfigError> {
        if auth_url.is_empty() {
            return Err(ConfigError::Missing("an authentication url"));
        }

        let base_url = auth_url.parse().map_err(|_| ConfigError::InvalidUrl {
            url: auth_url.to_owned(),
        })?;

        let credentials = ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        };

        let client = OAuth2Authority::default_client(timeout)?;
        let authority = OAuth2Authority::new(client, base_url, credentials)?;

        Ok(Self::with_authority(authority))
    }
}

#[cfg(feature = "oauth2")]
#[cfg_attr(docsrs, doc(cfg(feature = "oauth2")))]
impl<C> TokenManager<OAuth2Authority, C> {
    /// The base URL of the identity provider
    #[inline]
    pub fn auth_base_url(&self) -> &reqwest::Url {
        self.authority.base_url()
    }
}

impl<A> TokenManager<A, System> {
    /// Constructs a manager around an arbitrary token authority
    pub fn with_authority(authority: A) -> Self {
        Self {
            authority,
            clock: System,
            state: Mutex::new(TokenState::default()),
            acquired: Notify::new(),
        }
    }
}

impl<A, C> TokenManager<A, C> {
    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> TokenManager<A, D> {
        TokenManager {
            authority: self.authority,
            clock,
            state: self.state,
            acquired: self.acquired,
        }
    }

    /// The authority this manager requests tokens from
    #[inline]
    pub fn authority(&self) -> &A {
        &self.authority
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        // The state is left consistent between statements, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an access token is currently held, expired or not
    pub fn has_access_token(&self) -> bool {
        self.lock().access_token().is_some()
    }

    /// Whether a token has been acquired since construction or the last disconnect
    pub fn has_acquired(&self) -> bool {
        self.lock().ever_acquired()
    }
}

enum Step {
    Wait,
    Cached(AccessToken),
    Acquire { generation: u64 },
    Refresh { refresh_token: RefreshToken, generation: u64 },
}

/// Releases the in-flight flag and wakes waiters, however the acquisition ends
struct InFlight<'a, A, C> {
    manager: &'a TokenManager<A, C>,
}

impl<A, C> Drop for InFlight<'_, A, C> {
    fn drop(&mut self) {
        self.manager.lock().acquisition_in_flight = false;
        self.manager.acquired.notify_waiters();
    }
}

impl<A, C> TokenManager<A, C>
where
    A: TokenAuthority,
    C: Clock,
{
    /// Whether the access token is missing or expired
    ///
    /// A token whose expiry is exactly now counts as expired.
    pub fn is_token_expired(&self) -> bool {
        self.lock().is_expired_at(self.clock.now())
    }

    /// Whether the refresh token is missing or expired
    pub fn is_refresh_token_expired(&self) -> bool {
        self.lock().is_refresh_expired_at(self.clock.now())
    }

    /// The current lifecycle status of the held tokens
    pub fn token_status(&self) -> TokenStatus {
        self.lock().status_at(self.clock.now())
    }

    /// Returns a valid access token, requesting a new one if necessary
    ///
    /// A cached token is returned without any request while it is valid. An
    /// expired access token is refreshed while the refresh token remains
    /// valid; otherwise the password grant is used.
    pub async fn fetch_token(&self, credentials: &Credentials) -> Result<AccessToken, TokenError> {
        credentials.ensure_complete()?;

        loop {
            // Subscribe before inspecting the flag so a completion in between is not missed.
            let acquired = self.acquired.notified();

            match self.next_step() {
                Step::Wait => {
                    tracing::debug!("token acquisition already in flight, waiting");
                    acquired.await;
                }
                Step::Cached(token) => {
                    tracing::trace!("using cached access token");
                    return Ok(token);
                }
                Step::Acquire { generation } => {
                    return self.acquire(credentials, generation).await;
                }
                Step::Refresh {
                    refresh_token,
                    generation,
                } => {
                    return self.refresh(&refresh_token, generation).await;
                }
            }
        }
    }

    fn next_step(&self) -> Step {
        let mut state = self.lock();

        if state.acquisition_in_flight {
            return Step::Wait;
        }

        let generation = state.generation();
        match state.status_at(self.clock.now()) {
            TokenStatus::Valid => {
                if let Some(token) = state.access_token() {
                    return Step::Cached(token.to_owned());
                }
            }
            TokenStatus::Refreshable => {
                if let Some(refresh_token) = state.refresh_token() {
                    return Step::Refresh {
                        refresh_token: refresh_token.to_owned(),
                        generation,
                    };
                }
            }
            TokenStatus::Missing | TokenStatus::Expired => {}
        }

        state.acquisition_in_flight = true;
        Step::Acquire { generation }
    }

    async fn acquire(
        &self,
        credentials: &Credentials,
        generation: u64,
    ) -> Result<AccessToken, TokenError> {
        let _in_flight = InFlight { manager: self };

        tracing::debug!(username = %credentials.username(), "requesting token with password grant");

        let tokens = self
            .authority
            .request_token(Grant::Password(credentials))
            .await
            .map_err(TokenError::acquisition)?;

        self.store(tokens, generation)
            .ok_or_else(|| TokenError::acquisition("disconnected while acquiring token"))
    }

    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
        generation: u64,
    ) -> Result<AccessToken, TokenError> {
        tracing::debug!("access token expired, requesting token with refresh grant");

        let tokens = self
            .authority
            .request_token(Grant::RefreshToken(refresh_token))
            .await
            .map_err(TokenError::refresh)?;

        self.store(tokens, generation)
            .ok_or_else(|| TokenError::refresh("disconnected while refreshing token"))
    }

    /// Stores the tokens unless a disconnect happened since the request started
    fn store(&self, tokens: IssuedTokens, generation: u64) -> Option<AccessToken> {
        let mut state = self.lock();
        if state.generation() != generation {
            tracing::debug!("discarding tokens issued to a disconnected session");
            return None;
        }

        let access_token = tokens.access_token.clone();
        state.store(tokens, self.clock.now());
        Some(access_token)
    }

    /// Forgets all tokens and revokes the access token if it is still valid
    ///
    /// Local state is cleared before the revocation is attempted, so it is
    /// cleared even when revocation fails.
    pub async fn disconnect(&self) -> Result<(), TokenError> {
        let live_token = self.lock().clear(self.clock.now());

        match live_token {
            Some(token) => {
                tracing::debug!("revoking access token");
                self.authority
                    .revoke_token(&token)
                    .await
                    .map_err(TokenError::revocation)
            }
            None => {
                tracing::debug!("no live access token to revoke");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use color_eyre::Result;
    use geocollab_clock::{DurationSecs, TestClock, UnixTime};
    use tokio::sync::Semaphore;
    use tracing_test::traced_test;

    use super::*;
    use crate::AccessTokenRef;

    #[derive(Debug, thiserror::Error)]
    #[error("authority unavailable")]
    struct Unavailable;

    #[derive(Debug, Default)]
    struct FakeAuthority {
        password_grants: AtomicUsize,
        refresh_grants: AtomicUsize,
        revocations: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_password: AtomicBool,
        fail_refresh: AtomicBool,
        fail_revoke: AtomicBool,
        gate: Option<Semaphore>,
    }

    impl FakeAuthority {
        fn gated() -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Self::default()
            }
        }

        fn open_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.add_permits(Semaphore::MAX_PERMITS / 2);
            }
        }

        fn password_grants(&self) -> usize {
            self.password_grants.load(Ordering::SeqCst)
        }

        fn refresh_grants(&self) -> usize {
            self.refresh_grants.load(Ordering::SeqCst)
        }

        fn revocations(&self) -> usize {
            self.revocations.load(Ordering::SeqCst)
        }
    }

    fn issued(access_token: &'static str) -> IssuedTokens {
        IssuedTokens {
            access_token: AccessToken::from_static(access_token),
            refresh_token: Some(RefreshToken::from_static("R")),
            expires_in: DurationSecs(60),
            refresh_expires_in: DurationSecs(3600),
        }
    }

    #[async_trait]
    impl TokenAuthority for FakeAuthority {
        type Error = Unavailable;

        async fn request_token(&self, grant: Grant<'_>) -> Result<IssuedTokens, Self::Error> {
            match grant {
                Grant::Password(_) => {
                    self.password_grants.fetch_add(1, Ordering::SeqCst);
                    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    self.max_in_flight.fetch_max(now, Ordering::SeqCst);

                    if let Some(gate) = &self.gate {
                        gate.acquire().await.expect("gate closed").forget();
                    }

                    self.in_flight.fetch_sub(1, Ordering::SeqCst);
                    if self.fail_password.load(Ordering::SeqCst) {
                        Err(Unavailable)
                    } else {
                        Ok(issued("A"))
                    }
                }
                Grant::RefreshToken(refresh_token) => {
                    assert_eq!(refresh_token.as_str(), "R");
                    self.refresh_grants.fetch_add(1, Ordering::SeqCst);
                    if self.fail_refresh.load(Ordering::SeqCst) {
                        Err(Unavailable)
                    } else {
                        Ok(issued("B"))
                    }
                }
            }
        }

        async fn revoke_token(&self, _: &AccessTokenRef) -> Result<(), Self::Error> {
            self.revocations.fetch_add(1, Ordering::SeqCst);
            if self.fail_revoke.load(Ordering::SeqCst) {
                Err(Unavailable)
            } else {
                Ok(())
            }
        }
    }

    const START: UnixTime = UnixTime(1_000);

    fn manager(authority: FakeAuthority) -> (TokenManager<FakeAuthority, TestClock>, TestClock) {
        let clock = TestClock::new(START);
        let manager = TokenManager::with_authority(authority).with_clock(clock.clone());
        (manager, clock)
    }

    fn credentials() -> Credentials {
        Credentials::new("u", "p")
    }

    #[tokio::test]
    #[traced_test]
    async fn password_grant_fills_an_empty_manager() -> Result<()> {
        let (manager, _) = manager(FakeAuthority::default());
        assert_eq!(manager.token_status(), TokenStatus::Missing);

        let token = manager.fetch_token(&credentials()).await?;

        assert_eq!(token.as_str(), "A");
        assert_eq!(manager.authority().password_grants(), 1);
        assert!(manager.has_access_token());
        assert!(manager.has_acquired());
        assert_eq!(
            manager.lock().expirations(),
            (Some(START + DurationSecs(60)), Some(START + DurationSecs(3600)))
        );
        Ok(())
    }

    #[tokio::test]
    async fn follows_the_token_lifecycle() -> Result<()> {
        let (manager, clock) = manager(FakeAuthority::default());

        assert_eq!(manager.fetch_token(&credentials()).await?.as_str(), "A");

        clock.advance(DurationSecs(59));
        assert_eq!(manager.fetch_token(&credentials()).await?.as_str(), "A");
        assert_eq!(manager.authority().password_grants(), 1);
        assert_eq!(manager.authority().refresh_grants(), 0);

        clock.advance(DurationSecs(1));
        assert!(manager.is_token_expired());
        assert_eq!(manager.token_status(), TokenStatus::Refreshable);
        assert_eq!(manager.fetch_token(&credentials()).await?.as_str(), "B");
        assert_eq!(manager.authority().password_grants(), 1);
        assert_eq!(manager.authority().refresh_grants(), 1);

        clock.advance(DurationSecs(3600));
        assert!(manager.is_refresh_token_expired());
        assert_eq!(manager.token_status(), TokenStatus::Expired);
        assert_eq!(manager.fetch_token(&credentials()).await?.as_str(), "A");
        assert_eq!(manager.authority().password_grants(), 2);
        assert_eq!(manager.authority().refresh_grants(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn incomplete_credentials_are_rejected_before_any_request() {
        let (manager, _) = manager(FakeAuthority::default());

        let err = manager
            .fetch_token(&Credentials::new("u", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, TokenError::InvalidInput(_)));
        assert_eq!(manager.authority().password_grants(), 0);
        assert!(!manager.has_acquired());
    }

    #[tokio::test]
    async fn failed_password_grant_is_reported_as_acquisition_error() {
        let authority = FakeAuthority::default();
        authority.fail_password.store(true, Ordering::SeqCst);
        let (manager, _) = manager(authority);

        let err = manager.fetch_token(&credentials()).await.unwrap_err();

        assert!(matches!(err, TokenError::Acquisition { .. }));
        assert_eq!(err.to_string(), "Access Token Error: authority unavailable");
        assert!(!manager.has_access_token());
        assert!(!manager.lock().acquisition_in_flight);
    }

    #[tokio::test]
    async fn failed_refresh_does_not_fall_back_to_password_grant() -> Result<()> {
        let (manager, clock) = manager(FakeAuthority::default());
        manager.fetch_token(&credentials()).await?;
        manager.authority().fail_refresh.store(true, Ordering::SeqCst);

        clock.advance(DurationSecs(60));
        let err = manager.fetch_token(&credentials()).await.unwrap_err();

        assert!(matches!(err, TokenError::Refresh { .. }));
        assert!(err.to_string().starts_with("Error refreshing access token:"));
        assert_eq!(manager.authority().password_grants(), 1);
        assert_eq!(manager.authority().refresh_grants(), 1);

        manager.authority().fail_refresh.store(false, Ordering::SeqCst);
        assert_eq!(manager.fetch_token(&credentials()).await?.as_str(), "B");
        assert_eq!(manager.authority().refresh_grants(), 2);
        Ok(())
    }

    mod when_callers_race_for_the_first_token {
        use super::*;

        #[tokio::test]
        async fn only_one_password_grant_is_issued() -> Result<()> {
            let (manager, _) = manager(FakeAuthority::gated());
            let manager = Arc::new(manager);

            let tasks: Vec<_> = (0..3)
                .map(|_| {
                    let manager = manager.clone();
                    tokio::spawn(async move { manager.fetch_token(&credentials()).await })
                })
                .collect();

            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            assert_eq!(manager.authority().password_grants(), 1);

            manager.authority().open_gate();
            for task in tasks {
                assert_eq!(task.await??.as_str(), "A");
            }

            assert_eq!(manager.authority().password_grants(), 1);
            assert_eq!(manager.authority().max_in_flight.load(Ordering::SeqCst), 1);
            Ok(())
        }

        #[tokio::test]
        async fn waiters_retry_after_a_failed_grant() -> Result<()> {
            let authority = FakeAuthority::gated();
            authority.fail_password.store(true, Ordering::SeqCst);
            let (manager, _) = manager(authority);
            let manager = Arc::new(manager);

            let first = tokio::spawn({
                let manager = manager.clone();
                async move { manager.fetch_token(&credentials()).await }
            });
            let second = tokio::spawn({
                let manager = manager.clone();
                async move { manager.fetch_token(&credentials()).await }
            });

            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            assert_eq!(manager.authority().password_grants(), 1);

            manager.authority().open_gate();
            assert!(first.await?.is_err());
            assert!(second.await?.is_err());

            assert_eq!(manager.authority().password_grants(), 2);
            assert_eq!(manager.authority().max_in_flight.load(Ordering::SeqCst), 1);
            Ok(())
        }

        #[tokio::test]
        async fn a_cancelled_grant_releases_waiters() -> Result<()> {
            let (manager, _) = manager(FakeAuthority::gated());
            let manager = Arc::new(manager);

            let doomed = tokio::spawn({
                let manager = manager.clone();
                async move { manager.fetch_token(&credentials()).await }
            });
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
            assert!(manager.lock().acquisition_in_flight);

            doomed.abort();
            assert!(doomed.await.unwrap_err().is_cancelled());
            assert!(!manager.lock().acquisition_in_flight);

            manager.authority().open_gate();
            assert_eq!(manager.fetch_token(&credentials()).await?.as_str(), "A");
            assert_eq!(manager.authority().password_grants(), 2);
            Ok(())
        }
    }

    mod disconnect {
        use super::*;

        #[tokio::test]
        async fn revokes_a_live_token_and_clears_state() -> Result<()> {
            let (manager, _) = manager(FakeAuthority::default());
            manager.fetch_token(&credentials()).await?;

            manager.disconnect().await?;

            assert_eq!(manager.authority().revocations(), 1);
            assert!(!manager.has_access_token());
            assert!(!manager.has_acquired());
            assert_eq!(manager.lock().expirations(), (None, None));
            assert!(manager.lock().refresh_token().is_none());
            Ok(())
        }

        #[tokio::test]
        async fn skips_revocation_for_an_expired_token() -> Result<()> {
            let (manager, clock) = manager(FakeAuthority::default());
            manager.fetch_token(&credentials()).await?;
            clock.advance(DurationSecs(60));

            manager.disconnect().await?;

            assert_eq!(manager.authority().revocations(), 0);
            assert!(!manager.has_access_token());
            Ok(())
        }

        #[tokio::test]
        async fn clears_state_even_when_revocation_fails() -> Result<()> {
            let (manager, _) = manager(FakeAuthority::default());
            manager.fetch_token(&credentials()).await?;
            manager.authority().fail_revoke.store(true, Ordering::SeqCst);

            let err = manager.disconnect().await.unwrap_err();

            assert!(matches!(err, TokenError::Revocation { .. }));
            assert!(err.to_string().starts_with("Error revoking access token:"));
            assert!(!manager.has_access_token());
            assert_eq!(manager.lock().expirations(), (None, None));
            assert!(manager.lock().refresh_token().is_none());
            Ok(())
        }

        #[tokio::test]
        async fn wins_over_an_acquisition_in_flight() -> Result<()> {
            let (manager, _) = manager(FakeAuthority::gated());
            let manager = Arc::new(manager);

            let pending = tokio::spawn({
                let manager = manager.clone();
                async move { manager.fetch_token(&credentials()).await }
            });
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }

            manager.disconnect().await?;
            manager.authority().open_gate();

            let err = pending.await?.unwrap_err();
            assert!(matches!(err, TokenError::Acquisition { .. }));
            assert!(!manager.has_access_token());
            assert!(!manager.lock().acquisition_in_flight);
            Ok(())
        }

        #[tokio::test]
        async fn next_fetch_starts_over_with_password_grant() -> Result<()> {
            let (manager, _) = manager(FakeAuthority::default());
            manager.fetch_token(&credentials()).await?;
            manager.disconnect().await?;

            manager.fetch_token(&credentials()).await?;

            assert_eq!(manager.authority().password_grants(), 2);
            assert!(manager.has_acquired());
            Ok(())
        }
    }
}
