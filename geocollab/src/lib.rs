//! Client for a geographic collaboration REST API
//!
//! An [`ApiClient`] holds the credentials of one user and authorizes every
//! request with a bearer token managed by a
//! [`TokenManager`][geocollab_tokens::TokenManager]. Resource operations
//! (users, communities, databases, permissions, reports and geoservices)
//! validate their arguments locally before any token is requested, so a
//! request the API would reject as malformed never leaves the process.
//!
//! Responses are returned as untyped [`serde_json::Value`]s.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use geocollab::{ApiClient, ClientConfig};
//!
//! let mut client = ApiClient::new(ClientConfig::from_env()?)?;
//! client.set_credentials("mapper", "hunter2").await?;
//! client.connect().await?;
//!
//! let databases = client.all_databases(&[("limit", "10")]).await?;
//! println!("{:#}", databases);
//! # Ok(())
//! # }
//! ```

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

pub mod cipher;
mod client;
pub mod config;
mod error;
mod multipart;
mod resources;
mod validate;

pub use cipher::{EncryptedPassword, PasswordCipher};
pub use client::ApiClient;
pub use config::{AuthConfig, ClientConfig};
pub use error::Error;
pub use geocollab_tokens::{TokenError, TokenStatus};
pub use multipart::Attachment;
pub use resources::UserId;
pub use validate::parse_id;
