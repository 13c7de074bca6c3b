use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one participant for the lifetime of its session.
///
/// Generated locally on startup. Ordering is plain lexicographic string
/// ordering, which both sides of a link agree on without coordination.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short label used in member lists, e.g. `User 1f3a`.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(4) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
