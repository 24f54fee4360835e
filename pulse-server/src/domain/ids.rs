//! Opaque identifier types for stops, locations and routes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when an identifier string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    reason: &'static str,
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier, trimming surrounding whitespace.
            ///
            /// Returns an error if nothing is left after trimming.
            pub fn parse(s: &str) -> Result<Self, InvalidId> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(InvalidId {
                        kind: $kind,
                        reason: "cannot be empty",
                    });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidId;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a single physical stop sign or post (SID).
    ///
    /// This is the identifier live-arrival queries are made against.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulse_server::domain::StopId;
    ///
    /// let sid = StopId::parse(" 1001 ").unwrap();
    /// assert_eq!(sid.as_str(), "1001");
    /// assert!(StopId::parse("   ").is_err());
    /// ```
    StopId,
    "stop id"
);

opaque_id!(
    /// Identifier grouping stop posts at one physical location (SLID).
    LocationId,
    "location id"
);

opaque_id!(
    /// Identifier of a bus route.
    RouteId,
    "route id"
);
