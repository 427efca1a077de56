//! Domain identifier types
//!
//! This module provides newtype wrappers for domain record identities. Every
//! domain record carries a stable UUID identity separate from the legacy
//! identity it was transformed from; the legacy-id bridge column on each
//! record is the only link between the two worlds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identity
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID (e.g. one read back from storage)
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| format!("Invalid {} UUID: {e}", stringify!($name)))
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Identity of a transformed opportunity record
    OpportunityId
}

uuid_id! {
    /// Identity of a transformed opportunity summary record
    ///
    /// Current and historical summary revisions each get their own identity.
    SummaryId
}

uuid_id! {
    /// Identity of a summary link record (applicant type, funding
    /// category, or funding instrument)
    LinkId
}

uuid_id! {
    /// Identity of a competition instruction document record
    InstructionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = OpportunityId::generate();
        let b = OpportunityId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        let id = SummaryId::generate();
        let parsed = SummaryId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        let result = LinkId::from_str("not-a-uuid");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("LinkId"));
    }

    #[test]
    fn test_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = InstructionId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = OpportunityId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: OpportunityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
