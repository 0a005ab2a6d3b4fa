//! Access token lifecycle management for the resource owner password grant
//!
//! A [`TokenManager`] owns the token state of a single user session. Callers
//! hand it the user's [`Credentials`] whenever they need a bearer token and it
//! decides, based on the tokens it holds and the current time, whether to:
//!
//! * return the cached access token, if it has not yet expired,
//! * exchange the refresh token for a new pair, if only the access token has
//!   expired, or
//! * perform the password grant, if no token is held or both have expired.
//!
//! Refreshing is always preferred to the password grant since it does not
//! send the password over the wire. The password grant is additionally
//! serialized: when several operations start at once on a fresh manager, one
//! of them performs the grant while the others wait for it to complete.
//!
//! Time is read from a [`Clock`][geocollab_clock::Clock], so tests can move
//! time forward with a [`TestClock`][geocollab_clock::TestClock] instead of
//! sleeping. The identity provider sits behind the
//! [`TokenAuthority`][sources::TokenAuthority] trait.
//!
//! # Features
//!
//! * `oauth2` (default): Provides [`OAuth2Authority`][sources::oauth2::OAuth2Authority],
//!   an authority that talks to the `/token` and `/revoke` endpoints of an
//!   OpenID Connect provider over `reqwest`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
mod credentials;
mod error;
mod manager;
pub mod sources;
mod tokens;

pub use braids::*;
pub use credentials::Credentials;
pub use error::{BoxError, ConfigError, TokenError};
pub use manager::TokenManager;
pub use tokens::{IssuedTokens, TokenStatus};
