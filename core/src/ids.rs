//! Typed identifiers for catalog entities.
//!
//! All identifiers wrap the `i64` surrogate keys assigned by the database.
//! On the wire they appear either as JSON numbers (entity payloads) or as
//! decimal strings (reorder requests, where persisted ids share a namespace
//! with system-field keys).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw database key.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// The raw database key.
            #[must_use]
            pub const fn raw(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type! {
    /// Identifier of a ticketing event.
    EventId
}

id_type! {
    /// Identifier of a product category within an event.
    CategoryId
}

id_type! {
    /// Identifier of a product ("item") within an event.
    ItemId
}

id_type! {
    /// Identifier of a custom question within an event.
    QuestionId
}

id_type! {
    /// Identifier of a question option.
    OptionId
}

id_type! {
    /// Identifier of a stock quota within an event.
    QuotaId
}

id_type! {
    /// Identifier of an administrative user.
    ActorId
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_decimal() {
        assert_eq!(ItemId::new(42).to_string(), "42");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("17".parse::<QuestionId>().unwrap(), QuestionId::new(17));
        assert!("attendee_email".parse::<QuestionId>().is_err());
        assert!("12x".parse::<ItemId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&CategoryId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
