use std::fmt::{Display, Formatter};
use std::{ops::Deref, str::FromStr};

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A normalised (trimmed, lower-case) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email {
    inner: String,
}

impl Email {
    /// The part after the `@`.
    pub fn domain(&self) -> &str {
        // Parsing guarantees exactly one `@`.
        self.inner.rsplit('@').next().unwrap_or_default()
    }

    /// Does this address belong to `domain` or one of its subdomains?
    pub fn is_in_domain(&self, domain: &str) -> bool {
        let domain = domain.trim().trim_start_matches('@').to_ascii_lowercase();
        let own = self.domain();
        own == domain || own.ends_with(&format!(".{domain}"))
    }
}

impl Deref for Email {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("email address must contain exactly one '@'")]
    MissingAt,
    #[error("email address has an empty local part")]
    EmptyLocal,
    #[error("email address has an invalid domain")]
    BadDomain,
    #[error("email address must not contain whitespace")]
    Whitespace,
}

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }
        let (local, domain) = match s.split_once('@') {
            Some((local, domain)) if !domain.contains('@') => (local, domain),
            _ => return Err(EmailError::MissingAt),
        };
        if local.is_empty() {
            return Err(EmailError::EmptyLocal);
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailError::BadDomain);
        }
        Ok(Self { inner: s })
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.inner
    }
}

impl From<Email> for Bson {
    fn from(email: Email) -> Self {
        Bson::String(email.inner)
    }
}
