//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the storage of one aggregate; `cascade` holds
//! the multi-table removals that must run in a single transaction.

pub mod admin;
pub mod answer;
pub mod cascade;
pub mod checkpoint;
pub mod code;
pub mod favourite;
pub mod feedback;
pub mod media;
pub mod museum_object;
pub mod tour;
pub mod user;

pub use admin::{AdminRepository, SqlxAdminRepository};
pub use answer::{AnswerRepository, SqlxAnswerRepository};
pub use cascade::{CascadeRepository, SqlxCascadeRepository};
pub use checkpoint::{CheckpointRepository, MovePlan, Shift, SqlxCheckpointRepository};
pub use code::{CodeRepository, SqlxCodeRepository};
pub use favourite::{FavouriteRepository, SqlxFavouriteRepository};
pub use feedback::{FeedbackRepository, SqlxFeedbackRepository};
pub use media::{MediaRepository, SqlxMediaRepository};
pub use museum_object::{MuseumObjectRepository, SqlxMuseumObjectRepository};
pub use tour::{SqlxTourRepository, TourRepository};
pub use user::{SqlxUserRepository, UserRepository};

use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Sqlite, Transaction};

/// Begin a transaction that holds the write lock from its first statement.
///
/// A deferred SQLite transaction that reads before it writes cannot wait for
/// the write lock: the upgrade fails with `SQLITE_BUSY` as soon as another
/// connection is writing. Opening with a write statement acquires the lock up
/// front, where the busy timeout applies.
pub(crate) async fn begin_write(pool: &DynDatabasePool) -> Result<Transaction<'static, Sqlite>> {
    let mut tx = pool.sqlite().begin().await.context("Failed to begin transaction")?;
    sqlx::query("UPDATE _migrations SET version = version WHERE 0")
        .execute(&mut *tx)
        .await
        .context("Failed to acquire write lock")?;
    Ok(tx)
}

/// Encode a list-valued field for a TEXT column
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("Failed to encode JSON column")
}

/// Decode a nullable JSON column, treating NULL as an empty list
pub(crate) fn from_json_list<T: DeserializeOwned>(value: Option<String>) -> Result<Vec<T>> {
    match value {
        Some(text) if !text.is_empty() => {
            serde_json::from_str(&text).context("Failed to decode JSON column")
        }
        _ => Ok(Vec::new()),
    }
}

/// Escape `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_list_roundtrip_and_null() {
        let encoded = to_json(&vec!["a".to_string(), "b".to_string()]).unwrap();
        let decoded: Vec<String> = from_json_list(Some(encoded)).unwrap();
        assert_eq!(decoded, vec!["a", "b"]);

        let empty: Vec<i64> = from_json_list(None).unwrap();
        assert!(empty.is_empty());
        assert!(from_json_list::<i64>(Some("not json".to_string())).is_err());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("oil"), "%oil%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
