use crate::{Password, PasswordRef, TokenError, Username, UsernameRef};

/// Resource owner credentials used for the password grant
#[derive(Clone, Debug)]
pub struct Credentials {
    username: Username,
    password: Password,
}

impl Credentials {
    /// Constructs a new set of credentials
    pub fn new(username: impl Into<Username>, password: impl Into<Password>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The user's name
    #[inline]
    pub fn username(&self) -> &UsernameRef {
        &self.username
    }

    /// The user's password
    #[inline]
    pub fn password(&self) -> &PasswordRef {
        &self.password
    }

    pub(crate) fn ensure_complete(&self) -> Result<(), TokenError> {
        if self.username.as_str().is_empty() || self.password.as_str().is_empty() {
            return Err(TokenError::InvalidInput("credentials must be provided"));
        }

        Ok(())
    }
}
