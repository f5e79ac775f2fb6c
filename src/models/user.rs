//! Accounts: app users, web admins and producer promotion codes

use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A visitor account of the mobile app.
///
/// Producers may author tours; everybody else can only join them.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    #[graphql(skip)]
    pub password_hash: String,
    /// Whether the user may create tours
    pub producer: bool,
    /// Currently selected profile picture
    pub profile_picture_id: Option<i64>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User. The password must already be hashed.
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            username,
            password_hash,
            producer: false,
            profile_picture_id: None,
            created_at: Utc::now(),
        }
    }
}

/// An account of the administration web client.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    #[graphql(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Admin {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: 0,
            username,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Single-use code that promotes a user to producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct Code {
    pub code: String,
    pub created_at: DateTime<Utc>,
}

/// Length of generated promotion codes
pub const CODE_LENGTH: usize = 5;
