//! Answer repository
//!
//! One row per (question, user). Answering again overwrites the row in place.

use super::{from_json_list, to_json};
use crate::db::DynDatabasePool;
use crate::models::{Answer, AnswerBody};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Store the user's answer to a question, replacing an earlier one
    async fn upsert(&self, question_id: i64, user_id: i64, body: &AnswerBody) -> Result<Answer>;

    async fn get(&self, question_id: i64, user_id: i64) -> Result<Option<Answer>>;

    /// All answers to a question ordered by username
    async fn list_by_question(&self, question_id: i64) -> Result<Vec<Answer>>;

    /// A user's answers within a tour, in checkpoint order
    async fn list_by_user_in_tour(&self, tour_id: i64, user_id: i64) -> Result<Vec<Answer>>;
}

pub struct SqlxAnswerRepository {
    pool: DynDatabasePool,
}

impl SqlxAnswerRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AnswerRepository> {
        Arc::new(Self::new(pool))
    }
}

const ANSWER_SELECT: &str = r#"
    SELECT a.id, a.checkpoint_id, a.user_id, u.username, a.answer, a.choices, a.correct, a.updated_at
    FROM answers a
    JOIN users u ON u.id = a.user_id
"#;

#[async_trait]
impl AnswerRepository for SqlxAnswerRepository {
    async fn upsert(&self, question_id: i64, user_id: i64, body: &AnswerBody) -> Result<Answer> {
        let (text, choices, correct) = match body {
            AnswerBody::Text(text) => (Some(text.clone()), None, None),
            AnswerBody::MultipleChoice { choices, correct } => {
                (None, Some(to_json(choices)?), Some(*correct))
            }
        };
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO answers (checkpoint_id, user_id, answer, choices, correct, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (checkpoint_id, user_id) DO UPDATE SET
                answer = excluded.answer,
                choices = excluded.choices,
                correct = excluded.correct,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(question_id)
        .bind(user_id)
        .bind(text)
        .bind(choices)
        .bind(correct)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to store answer")?;

        self.get(question_id, user_id)
            .await?
            .ok_or_else(|| anyhow!("Answer vanished after upsert"))
    }

    async fn get(&self, question_id: i64, user_id: i64) -> Result<Option<Answer>> {
        let row = sqlx::query(&format!(
            "{} WHERE a.checkpoint_id = ? AND a.user_id = ?",
            ANSWER_SELECT
        ))
        .bind(question_id)
        .bind(user_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get answer")?;
        row.as_ref().map(row_to_answer).transpose()
    }

    async fn list_by_question(&self, question_id: i64) -> Result<Vec<Answer>> {
        let rows = sqlx::query(&format!(
            "{} WHERE a.checkpoint_id = ? ORDER BY u.username",
            ANSWER_SELECT
        ))
        .bind(question_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list answers to question")?;
        rows.iter().map(row_to_answer).collect()
    }

    async fn list_by_user_in_tour(&self, tour_id: i64, user_id: i64) -> Result<Vec<Answer>> {
        let rows = sqlx::query(&format!(
            "{} JOIN checkpoints c ON c.id = a.checkpoint_id WHERE c.tour_id = ? AND a.user_id = ? ORDER BY c.idx",
            ANSWER_SELECT
        ))
        .bind(tour_id)
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list answers of user")?;
        rows.iter().map(row_to_answer).collect()
    }
}

fn row_to_answer(row: &SqliteRow) -> Result<Answer> {
    let choices: Option<String> = row.try_get("choices")?;
    let body = match choices {
        Some(choices) => AnswerBody::MultipleChoice {
            choices: from_json_list(Some(choices))?,
            correct: row.try_get::<Option<i64>, _>("correct")?.unwrap_or(0),
        },
        None => AnswerBody::Text(row.try_get::<Option<String>, _>("answer")?.unwrap_or_default()),
    };

    Ok(Answer {
        id: row.try_get("id")?,
        question_id: row.try_get("checkpoint_id")?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        body,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_tour, insert_user, migrated_pool};
    use crate::db::repositories::{CheckpointRepository, SqlxCheckpointRepository};
    use crate::models::{CheckpointKind, NewCheckpoint};

    fn question(label: &str) -> NewCheckpoint {
        NewCheckpoint {
            text: None,
            show_text: false,
            show_picture: false,
            show_details: false,
            kind: CheckpointKind::Question {
                question: label.to_string(),
                linked_objects: vec![],
            },
        }
    }

    struct Fixture {
        repo: SqlxAnswerRepository,
        tour: i64,
        anna: i64,
        ben: i64,
        first: i64,
        second: i64,
    }

    async fn setup() -> Fixture {
        let pool = migrated_pool().await;
        let anna = insert_user(&pool, "anna").await;
        let ben = insert_user(&pool, "ben").await;
        let tour = insert_tour(&pool, anna, "tour").await;

        let checkpoints = SqlxCheckpointRepository::new(pool.clone());
        let first = checkpoints.append(tour, &question("Q1")).await.unwrap().unwrap().id;
        let second = checkpoints.append(tour, &question("Q2")).await.unwrap().unwrap().id;

        Fixture {
            repo: SqlxAnswerRepository::new(pool),
            tour,
            anna,
            ben,
            first,
            second,
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let f = setup().await;

        f.repo
            .upsert(f.first, f.ben, &AnswerBody::Text("first try".to_string()))
            .await
            .unwrap();
        let answer = f
            .repo
            .upsert(f.first, f.ben, &AnswerBody::Text("second try".to_string()))
            .await
            .unwrap();

        assert_eq!(answer.username, "ben");
        assert_eq!(answer.body.text(), Some("second try"));
        assert_eq!(f.repo.list_by_question(f.first).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_multiple_choice_body_roundtrip() {
        let f = setup().await;
        let body = AnswerBody::MultipleChoice {
            choices: vec![0, 2],
            correct: 1,
        };

        f.repo.upsert(f.first, f.ben, &body).await.unwrap();
        let stored = f.repo.get(f.first, f.ben).await.unwrap().unwrap();
        assert_eq!(stored.body, body);
    }

    #[tokio::test]
    async fn test_listing() {
        let f = setup().await;

        f.repo.upsert(f.second, f.ben, &AnswerBody::Text("b2".into())).await.unwrap();
        f.repo.upsert(f.first, f.ben, &AnswerBody::Text("b1".into())).await.unwrap();
        f.repo.upsert(f.first, f.anna, &AnswerBody::Text("a1".into())).await.unwrap();

        let names: Vec<String> = f
            .repo
            .list_by_question(f.first)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.username)
            .collect();
        assert_eq!(names, vec!["anna", "ben"]);

        let bodies: Vec<String> = f
            .repo
            .list_by_user_in_tour(f.tour, f.ben)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|a| a.body.text().map(str::to_string))
            .collect();
        assert_eq!(bodies, vec!["b1", "b2"]);
    }
}
