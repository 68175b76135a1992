//! Review rating type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a rating is outside the 1-5 star range.
#[derive(thiserror::Error, Debug, Clone)]
#[error("rating must be between {min} and {max}", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError;

/// A star rating on a product review.
///
/// Always an integer in `1..=5`. Construction through [`Rating::new`] (or
/// serde, which goes through the same check) is the only way to obtain one,
/// so a `Rating` held anywhere in the system is known valid.
///
/// ## Examples
///
/// ```
/// use sunleaf_core::Rating;
///
/// assert_eq!(Rating::new(4).unwrap().as_i16(), 4);
/// assert!(Rating::new(0).is_err());
/// assert!(Rating::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct Rating(i16);

impl Rating {
    /// Lowest allowed rating.
    pub const MIN: i16 = 1;
    /// Highest allowed rating.
    pub const MAX: i16 = 5;

    /// Create a `Rating`, checking the range.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] if `value` is outside `1..=5`.
    pub const fn new(value: i16) -> Result<Self, RatingError> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(RatingError)
        }
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i16> for Rating {
    type Error = RatingError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

// SQLx support (with postgres feature): stored as SMALLINT
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // The reviews table carries a CHECK constraint on the same range
        Ok(Self::new(raw)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_full_range() {
        for value in 1..=5 {
            assert_eq!(Rating::new(value).unwrap().as_i16(), value);
        }
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-1).is_err());
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("3").is_ok());
        assert!(serde_json::from_str::<Rating>("0").is_err());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn test_serde_serializes_as_number() {
        let rating = Rating::new(5).unwrap();
        assert_eq!(serde_json::to_string(&rating).unwrap(), "5");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Rating::new(2).unwrap()), "2");
    }

    #[test]
    fn test_ordering() {
        assert!(Rating::new(1).unwrap() < Rating::new(5).unwrap());
    }
}
