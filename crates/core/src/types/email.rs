//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
///
/// Structural problems (no `@`, empty local part, empty domain) all collapse
/// into [`EmailError::Malformed`]; callers report them to users identically,
/// so distinguishing them would only bloat match arms.
#[derive(thiserror::Error, Debug, Clone)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input exceeds the RFC 5321 length limit.
    #[error("email must be at most {0} characters")]
    TooLong(usize),
    /// The input is not `local@domain` with both sides non-empty.
    #[error("email must be of the form local@domain")]
    Malformed,
}

/// A validated email address.
///
/// Accounts are unique by email, recovery codes are delivered to it, and the
/// recovery endpoints echo it back in [masked](Email::masked) form. Validation
/// is deliberately shallow (shape and length only); deliverability is the
/// SMTP relay's problem, and over-strict parsers reject real addresses.
///
/// ## Examples
///
/// ```
/// use sunleaf_core::Email;
///
/// let email = Email::parse("user.name+tag@domain.co.uk").unwrap();
/// assert_eq!(email.as_str(), "user.name+tag@domain.co.uk");
///
/// assert!(Email::parse("").is_err());
/// assert!(Email::parse("no-at-symbol").is_err());
/// assert!(Email::parse("@domain.com").is_err());
/// assert!(Email::parse("user@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] if the input is empty, longer than
    /// [`Email::MAX_LENGTH`], or not shaped like `local@domain`.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong(Self::MAX_LENGTH));
        }
        match s.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(s.to_owned()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the address with the local part masked for display.
    ///
    /// Keeps the first two characters of the local part and replaces the
    /// rest with `***`: `farmer@example.com` becomes `fa***@example.com`.
    /// A one-character local part has nothing worth hiding behind its first
    /// two characters and is returned unmasked.
    ///
    /// The recovery endpoints answer with this form so a requester learns
    /// where their code went without the response disclosing the address.
    #[must_use]
    pub fn masked(&self) -> String {
        // parse() guaranteed the '@' is present
        let Some((local, domain)) = self.0.split_once('@') else {
            return self.0.clone();
        };
        let prefix: String = local.chars().take(2).collect();
        if prefix.chars().count() < 2 {
            return self.0.clone();
        }
        format!("{prefix}***@{domain}")
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        // Stored values were validated on the way in
        Ok(Self(<String as sqlx::Decode<sqlx::Postgres>>::decode(
            value,
        )?))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
