//! Newtype identifiers for the fields of an event record.
//!
//! Every name carried by an event is a distinct newtype so an [`Author`] can
//! never be passed where a [`BranchName`] is expected, even though both are
//! strings underneath. The string-backed types reject the empty string, which
//! is how the "required, non-empty" rule of the event record is enforced.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, and
// serde impls that go through new().
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value, returning `None` if it is empty or only
            /// whitespace.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
                    .ok_or_else(|| format!("{} must not be empty", stringify!($name)))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UUID-backed identifiers, assigned by the store
// ---------------------------------------------------------------------------

/// Opaque identifier assigned to an event when it is appended to a store.
///
/// Returned to the webhook caller on acceptance; carries no ordering meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a new random identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an [`EventId`] from an existing UUID (e.g. read back from storage).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// String-backed identifiers, taken from GitHub payloads
// ---------------------------------------------------------------------------

string_id! {
    /// The GitHub login (or pusher name) credited with an event.
    Author
}

string_id! {
    /// A Git branch name without the `refs/heads/` prefix (e.g. `"main"`).
    BranchName
}

string_id! {
    /// Identifies the source repository, normally in `"owner/repo"` format.
    RepositoryName
}

impl BranchName {
    /// Creates a branch name from a Git ref, stripping a leading
    /// `refs/heads/`. Tags and other refs are kept verbatim.
    pub fn from_ref(git_ref: &str) -> Option<Self> {
        Self::new(git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_names_are_rejected() {
        assert!(Author::new("").is_none());
        assert!(Author::new("   ").is_none());
        assert_eq!(Author::new("alice").unwrap().as_str(), "alice");
    }

    #[test]
    fn deserializing_applies_the_same_rules_as_new() {
        assert!(serde_json::from_str::<Author>("\"\"").is_err());
        assert!(serde_json::from_str::<RepositoryName>("\"  \"").is_err());
        let branch: BranchName = serde_json::from_str("\"main\"").unwrap();
        assert_eq!(branch.as_str(), "main");
        assert_eq!(serde_json::to_string(&branch).unwrap(), "\"main\"");
    }

    #[test]
    fn branch_from_ref_strips_heads_prefix() {
        assert_eq!(BranchName::from_ref("refs/heads/staging").unwrap().as_str(), "staging");
        assert_eq!(BranchName::from_ref("main").unwrap().as_str(), "main");
        assert_eq!(BranchName::from_ref("refs/tags/v1").unwrap().as_str(), "refs/tags/v1");
        assert!(BranchName::from_ref("refs/heads/").is_none());
    }

    #[test]
    fn event_id_round_trips_through_text() {
        let id = EventId::new_random();
        let parsed: EventId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
