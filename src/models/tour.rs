//! Tours and their review status

use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A producer-authored sequence of checkpoints that visitors join.
///
/// `current_checkpoints` is the number of checkpoints and doubles as the index
/// the next appended checkpoint receives.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[graphql(complex)]
pub struct Tour {
    pub id: i64,
    pub name: String,
    #[graphql(skip)]
    pub owner_id: i64,
    /// Owner's username
    pub owner: String,
    /// Code members have to present when joining
    pub session_id: i64,
    /// Public handle used to find the tour
    pub search_id: String,
    pub description: Option<String>,
    pub difficulty: Option<i32>,
    pub status: TourStatus,
    pub current_checkpoints: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tour {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}

/// Review workflow: private → pending (owner submits) → featured or back to
/// private (admin decides).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum TourStatus {
    #[default]
    Private,
    Pending,
    Featured,
}

impl fmt::Display for TourStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TourStatus::Private => write!(f, "private"),
            TourStatus::Pending => write!(f, "pending"),
            TourStatus::Featured => write!(f, "featured"),
        }
    }
}

impl FromStr for TourStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(TourStatus::Private),
            "pending" => Ok(TourStatus::Pending),
            "featured" => Ok(TourStatus::Featured),
            _ => Err(anyhow::anyhow!("Invalid tour status: {}", s)),
        }
    }
}

/// Input for creating a tour
#[derive(Debug, Clone, Serialize, Deserialize, InputObject)]
pub struct CreateTourInput {
    pub name: String,
    pub session_id: i64,
    pub search_id: String,
    pub description: Option<String>,
    pub difficulty: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tour_status_display_and_parse() {
        for status in [TourStatus::Private, TourStatus::Pending, TourStatus::Featured] {
            assert_eq!(TourStatus::from_str(&status.to_string()).unwrap(), status);
        }
        assert_eq!(TourStatus::from_str("FEATURED").unwrap(), TourStatus::Featured);
        assert!(TourStatus::from_str("public").is_err());
    }

    #[test]
    fn test_tour_status_default() {
        assert_eq!(TourStatus::default(), TourStatus::Private);
    }
}
