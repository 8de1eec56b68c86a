//! Producer (customer) records, as seen through the role lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Tier;

/// A customer allowed to submit orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub id: ProducerId,
    pub name: String,
    pub tier: Tier,
    /// Retired producers may no longer submit orders.
    pub retired: bool,
    pub created_at: DateTime<Utc>,
}

impl Producer {
    pub fn new(name: impl Into<String>, tier: Tier) -> Self {
        Self {
            id: ProducerId::new(),
            name: name.into(),
            tier,
            retired: false,
            created_at: Utc::now(),
        }
    }
}

/// Newtype for producer IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProducerId(pub Uuid);

impl ProducerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProducerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProducerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProducerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
