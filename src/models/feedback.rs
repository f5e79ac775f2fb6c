//! Feedback about the app and about individual tours

use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest accepted tour rating
pub const MIN_RATING: i32 = 1;
/// Highest accepted tour rating
pub const MAX_RATING: i32 = 5;

/// Feedback about the app itself, triaged by admins
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct AppFeedback {
    pub id: i64,
    pub rating: i32,
    pub review: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A member's rating of a tour
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct TourFeedback {
    pub id: i64,
    pub tour_id: i64,
    pub rating: i32,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

pub fn is_valid_rating(rating: i32) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(!is_valid_rating(0));
        assert!(is_valid_rating(1));
        assert!(is_valid_rating(5));
        assert!(!is_valid_rating(6));
        assert!(!is_valid_rating(-3));
    }
}
