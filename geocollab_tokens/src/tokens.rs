use geocollab_clock::{DurationSecs, UnixTime};

use crate::{AccessToken, AccessTokenRef, RefreshToken, RefreshTokenRef};

/// A token pair as returned by the authority
#[derive(Debug)]
pub struct IssuedTokens {
    /// The new access token
    pub access_token: AccessToken,
    /// The new refresh token, if the authority issued one
    pub refresh_token: Option<RefreshToken>,
    /// How long the access token is valid for
    pub expires_in: DurationSecs,
    /// How long the refresh token is valid for
    pub refresh_expires_in: DurationSecs,
}

/// Where the held tokens stand relative to the current time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
    /// No access token is held
    Missing,
    /// The access token is valid
    Valid,
    /// The access token has expired, but the refresh token is still valid
    Refreshable,
    /// Both tokens have expired
    Expired,
}

#[derive(Debug, Default)]
pub(crate) struct TokenState {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
    access_expires_at: Option<UnixTime>,
    refresh_expires_at: Option<UnixTime>,
    pub(crate) acquisition_in_flight: bool,
    ever_acquired: bool,
    generation: u64,
}

impl TokenState {
    #[inline]
    pub(crate) fn access_token(&self) -> Option<&AccessTokenRef> {
        self.access_token.as_deref()
    }

    #[inline]
    pub(crate) fn refresh_token(&self) -> Option<&RefreshTokenRef> {
        self.refresh_token.as_deref()
    }

    #[inline]
    pub(crate) fn ever_acquired(&self) -> bool {
        self.ever_acquired
    }

    #[inline]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// An absent expiration is treated as already expired
    #[inline]
    pub(crate) fn is_expired_at(&self, now: UnixTime) -> bool {
        self.access_expires_at.map_or(true, |at| now >= at)
    }

    #[inline]
    pub(crate) fn is_refresh_expired_at(&self, now: UnixTime) -> bool {
        self.refresh_expires_at.map_or(true, |at| now >= at)
    }

    pub(crate) fn status_at(&self, now: UnixTime) -> TokenStatus {
        if self.access_token.is_none() {
            TokenStatus::Missing
        } else if !self.is_expired_at(now) {
            TokenStatus::Valid
        } else if !self.is_refresh_expired_at(now) {
            TokenStatus::Refreshable
        } else {
            TokenStatus::Expired
        }
    }

    /// Stores a token pair issued at `issued`
    ///
    /// Both expirations are always replaced together.
    pub(crate) fn store(&mut self, tokens: IssuedTokens, issued: UnixTime) {
        self.access_expires_at = Some(issued + tokens.expires_in);
        self.refresh_expires_at = Some(issued + tokens.refresh_expires_in);
        self.access_token = Some(tokens.access_token);
        self.refresh_token = tokens.refresh_token;
        self.ever_acquired = true;
    }

    /// Forgets every token and starts a new generation
    ///
    /// Returns the access token if it was still valid at `now`.
    pub(crate) fn clear(&mut self, now: UnixTime) -> Option<AccessToken> {
        let still_valid = !self.is_expired_at(now);
        let access_token = self.access_token.take().filter(|_| still_valid);

        self.refresh_token = None;
        self.access_expires_at = None;
        self.refresh_expires_at = None;
        self.ever_acquired = false;
        self.generation = self.generation.wrapping_add(1);

        access_token
    }

    #[cfg(test)]
    pub(crate) fn expirations(&self) -> (Option<UnixTime>, Option<UnixTime>) {
        (self.access_expires_at, self.refresh_expires_at)
    }
}
