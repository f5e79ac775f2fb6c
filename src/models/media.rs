//! Uploaded images and the gamification entities built on them

use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to bytes held by the blob store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Storage key (`<uuid>.<ext>`)
    pub key: String,
    pub content_type: String,
}

/// A picture of a museum object, or one used by a picture checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct Picture {
    pub id: i64,
    pub description: Option<String>,
    #[graphql(skip)]
    pub file: StoredFile,
    pub created_at: DateTime<Utc>,
}

/// An avatar users can pick from. Locked pictures cannot be chosen.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct ProfilePicture {
    pub id: i64,
    pub locked: bool,
    #[graphql(skip)]
    pub file: StoredFile,
    pub created_at: DateTime<Utc>,
}

/// An achievement. A user earns it once their progress reaches `cost`.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cost: i64,
    #[graphql(skip)]
    pub file: StoredFile,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a badge together with its image
#[derive(Debug, Clone)]
pub struct CreateBadgeInput {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cost: i64,
}

/// A user's standing towards one badge
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct BadgeProgress {
    pub badge: Badge,
    pub progress: i64,
    pub earned: bool,
}

impl BadgeProgress {
    pub fn new(badge: Badge, progress: i64) -> Self {
        let earned = progress >= badge.cost;
        Self {
            badge,
            progress,
            earned,
        }
    }
}

/// Which kind of image a download or upload refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Picture,
    ProfilePicture,
    Badge,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Picture => write!(f, "Picture"),
            MediaKind::ProfilePicture => write!(f, "ProfilePicture"),
            MediaKind::Badge => write!(f, "Badge"),
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Picture" => Ok(MediaKind::Picture),
            "ProfilePicture" => Ok(MediaKind::ProfilePicture),
            "Badge" => Ok(MediaKind::Badge),
            _ => Err(anyhow::anyhow!("Unknown media type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn badge(cost: i64) -> Badge {
        Badge {
            id: "explorer".to_string(),
            name: "Explorer".to_string(),
            description: None,
            cost,
            file: StoredFile {
                key: "a.png".to_string(),
                content_type: "image/png".to_string(),
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_badge_progress_earned_at_cost() {
        assert!(!BadgeProgress::new(badge(10), 9).earned);
        assert!(BadgeProgress::new(badge(10), 10).earned);
        assert!(BadgeProgress::new(badge(0), 0).earned);
    }

    #[test]
    fn test_media_kind_roundtrip() {
        for kind in [MediaKind::Picture, MediaKind::ProfilePicture, MediaKind::Badge] {
            assert_eq!(MediaKind::from_str(&kind.to_string()).unwrap(), kind);
        }
        assert!(MediaKind::from_str("picture").is_err());
    }
}
