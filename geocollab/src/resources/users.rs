use std::{fmt, str::FromStr};

use reqwest::Method;
use serde_json::Value;

use crate::{
    validate::{self, Intent, Resource},
    ApiClient, Error,
};

/// Identifies a user, or the user the client is authenticated as
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UserId {
    /// The authenticated user
    #[default]
    Me,
    /// A user by numeric id
    Id(u64),
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "me" {
            return Ok(Self::Me);
        }

        s.trim()
            .parse()
            .map(Self::Id)
            .map_err(|_| Error::invalid(r#"id must be "me" or positive number"#))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Me => f.write_str("me"),
            Self::Id(id) => fmt::Display::fmt(id, f),
        }
    }
}

impl ApiClient {
    /// Lists users
    pub async fn all_users(&self, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("all_users", params)?;
        self.get("users", params).await
    }

    /// Fetches a user
    pub async fn get_user(&self, user: UserId, params: &[(&str, &str)]) -> Result<Value, Error> {
        validate::params("get_user", params)?;
        self.get(&format!("users/{}", user), params).await
    }

    /// Updates a user's description or administrator flag
    pub async fn update_user(&self, user: UserId, body: &Value) -> Result<Value, Error> {
        let body = validate::body(Resource::User, Intent::Update, body)?;
        self.send_json(Method::PATCH, &format!("users/{}", user), body)
            .await
    }
}
