//! Typed remote collections.
//!
//! Every mirrored collection and every replay target is one of these
//! variants, so routing never depends on an arbitrary string.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A server-owned collection mirrored locally and targeted by mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Participants,
    Activities,
    ActivityTypes,
    Roles,
    Assignments,
    Venues,
}

impl Collection {
    /// Every collection, in a stable order.
    pub const ALL: [Collection; 6] = [
        Collection::Participants,
        Collection::Activities,
        Collection::ActivityTypes,
        Collection::Roles,
        Collection::Assignments,
        Collection::Venues,
    ];

    /// Storage name, also used as the JSON key in snapshot batches.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Participants => "participants",
            Collection::Activities => "activities",
            Collection::ActivityTypes => "activityTypes",
            Collection::Roles => "roles",
            Collection::Assignments => "assignments",
            Collection::Venues => "venues",
        }
    }

    /// REST path segment for this collection.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Collection::ActivityTypes => "activity-types",
            other => other.as_str(),
        }
    }

    /// Collection endpoint, e.g. `/activity-types`.
    pub fn path(&self) -> String {
        format!("/{}", self.path_segment())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s || c.path_segment() == s)
            .ok_or_else(|| Error::UnknownCollection(s.to_string()))
    }
}
