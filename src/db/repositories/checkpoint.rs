//! Checkpoint repository
//!
//! Checkpoints of a tour occupy the dense positions `0..current_checkpoints`.
//! Every structural change (append, move, remove) runs in one transaction
//! that keeps the positions dense and the tour counter in step.
//!
//! Moves are planned by the pure [`MovePlan`] and applied as a single ranged
//! `UPDATE` over the neighbours plus one update of the moved row.

use super::{begin_write, from_json_list, to_json};
use crate::db::DynDatabasePool;
use crate::models::{Checkpoint, CheckpointKind, CheckpointType, NewCheckpoint};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::sync::Arc;

// ============================================================================
// Move planning
// ============================================================================

/// Neighbours in `start..=end` move by `delta` positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub start: i64,
    pub end: i64,
    pub delta: i64,
}

impl Shift {
    fn covers(&self, index: i64) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

/// Where a moved checkpoint lands and how its neighbours shift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    pub from: i64,
    pub to: i64,
    pub shift: Option<Shift>,
}

impl MovePlan {
    /// Plan moving the checkpoint at `current` in a tour of `count` checkpoints.
    ///
    /// `-1` and anything at or past the last position mean "last position";
    /// other negative targets mean the first position.
    pub fn new(current: i64, target: i64, count: i64) -> Self {
        let last = (count - 1).max(0);
        let to = if target == -1 || target >= last {
            last
        } else {
            target.max(0)
        };

        let shift = if to < current {
            Some(Shift {
                start: to,
                end: current - 1,
                delta: 1,
            })
        } else if to > current {
            Some(Shift {
                start: current + 1,
                end: to,
                delta: -1,
            })
        } else {
            None
        };

        Self {
            from: current,
            to,
            shift,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.shift.is_none()
    }

    /// Position that the checkpoint currently at `index` ends up at
    pub fn position_of(&self, index: i64) -> i64 {
        if index == self.from {
            return self.to;
        }
        match self.shift {
            Some(shift) if shift.covers(index) => index + shift.delta,
            _ => index,
        }
    }
}

// ============================================================================
// Repository
// ============================================================================

#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Append at the end of a tour and bump its counter.
    /// Returns None if the tour does not exist.
    async fn append(&self, tour_id: i64, checkpoint: &NewCheckpoint) -> Result<Option<Checkpoint>>;

    async fn get(&self, id: i64) -> Result<Option<Checkpoint>>;

    /// Checkpoints of a tour ordered by position
    async fn list_by_tour(&self, tour_id: i64) -> Result<Vec<Checkpoint>>;

    /// Persist text, display flags and variant payload. Position is untouched.
    async fn update(&self, checkpoint: &Checkpoint) -> Result<Checkpoint>;

    /// Move a checkpoint to `target`, see [`MovePlan::new`]
    async fn move_to(&self, id: i64, target: i64) -> Result<Option<Checkpoint>>;

    /// Remove a checkpoint with its answers and close the gap.
    /// Returns the removed checkpoint, or None if it did not exist.
    async fn remove(&self, id: i64) -> Result<Option<Checkpoint>>;
}

pub struct SqlxCheckpointRepository {
    pool: DynDatabasePool,
}

impl SqlxCheckpointRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CheckpointRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CheckpointRepository for SqlxCheckpointRepository {
    async fn append(&self, tour_id: i64, checkpoint: &NewCheckpoint) -> Result<Option<Checkpoint>> {
        let mut tx = begin_write(&self.pool).await?;

        let Some(count) = tour_counter(&mut tx, tour_id).await? else {
            return Ok(None);
        };

        let columns = KindColumns::from_kind(&checkpoint.kind)?;
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO checkpoints (
                tour_id, idx, kind, text, show_text, show_picture, show_details,
                picture_id, object_id, question, linked_objects, possible_answers,
                correct_answers, max_choices, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tour_id)
        .bind(count)
        .bind(checkpoint.kind.checkpoint_type().to_string())
        .bind(&checkpoint.text)
        .bind(checkpoint.show_text)
        .bind(checkpoint.show_picture)
        .bind(checkpoint.show_details)
        .bind(columns.picture_id)
        .bind(&columns.object_id)
        .bind(&columns.question)
        .bind(&columns.linked_objects)
        .bind(&columns.possible_answers)
        .bind(&columns.correct_answers)
        .bind(columns.max_choices)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert checkpoint")?;

        set_tour_counter(&mut tx, tour_id, count + 1).await?;
        tx.commit().await.context("Failed to commit transaction")?;

        Ok(Some(Checkpoint {
            id: result.last_insert_rowid(),
            tour_id,
            index: count,
            text: checkpoint.text.clone(),
            show_text: checkpoint.show_text,
            show_picture: checkpoint.show_picture,
            show_details: checkpoint.show_details,
            kind: checkpoint.kind.clone(),
            created_at,
        }))
    }

    async fn get(&self, id: i64) -> Result<Option<Checkpoint>> {
        let row = sqlx::query("SELECT * FROM checkpoints WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get checkpoint")?;
        row.as_ref().map(row_to_checkpoint).transpose()
    }

    async fn list_by_tour(&self, tour_id: i64) -> Result<Vec<Checkpoint>> {
        let rows = sqlx::query("SELECT * FROM checkpoints WHERE tour_id = ? ORDER BY idx, id")
            .bind(tour_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list checkpoints")?;
        rows.iter().map(row_to_checkpoint).collect()
    }

    async fn update(&self, checkpoint: &Checkpoint) -> Result<Checkpoint> {
        let columns = KindColumns::from_kind(&checkpoint.kind)?;
        sqlx::query(
            r#"
            UPDATE checkpoints
            SET text = ?, show_text = ?, show_picture = ?, show_details = ?,
                picture_id = ?, object_id = ?, question = ?, linked_objects = ?,
                possible_answers = ?, correct_answers = ?, max_choices = ?
            WHERE id = ?
            "#,
        )
        .bind(&checkpoint.text)
        .bind(checkpoint.show_text)
        .bind(checkpoint.show_picture)
        .bind(checkpoint.show_details)
        .bind(columns.picture_id)
        .bind(&columns.object_id)
        .bind(&columns.question)
        .bind(&columns.linked_objects)
        .bind(&columns.possible_answers)
        .bind(&columns.correct_answers)
        .bind(columns.max_choices)
        .bind(checkpoint.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update checkpoint")?;

        Ok(checkpoint.clone())
    }

    async fn move_to(&self, id: i64, target: i64) -> Result<Option<Checkpoint>> {
        let mut tx = begin_write(&self.pool).await?;

        let Some(mut checkpoint) = checkpoint_in(&mut tx, id).await? else {
            return Ok(None);
        };
        let count = tour_counter(&mut tx, checkpoint.tour_id)
            .await?
            .ok_or_else(|| anyhow!("Checkpoint {} belongs to a missing tour", id))?;

        let plan = MovePlan::new(checkpoint.index, target, count);
        if let Some(shift) = plan.shift {
            sqlx::query(
                "UPDATE checkpoints SET idx = idx + ? WHERE tour_id = ? AND id != ? AND idx BETWEEN ? AND ?",
            )
            .bind(shift.delta)
            .bind(checkpoint.tour_id)
            .bind(id)
            .bind(shift.start)
            .bind(shift.end)
            .execute(&mut *tx)
            .await
            .context("Failed to shift checkpoints")?;

            sqlx::query("UPDATE checkpoints SET idx = ? WHERE id = ?")
                .bind(plan.to)
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to move checkpoint")?;
        }

        tx.commit().await.context("Failed to commit transaction")?;

        checkpoint.index = plan.to;
        Ok(Some(checkpoint))
    }

    async fn remove(&self, id: i64) -> Result<Option<Checkpoint>> {
        let mut tx = begin_write(&self.pool).await?;

        let Some(checkpoint) = checkpoint_in(&mut tx, id).await? else {
            return Ok(None);
        };
        remove_checkpoint(&mut tx, &checkpoint).await?;

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(Some(checkpoint))
    }
}

// ============================================================================
// Connection-level helpers, shared with the cascades
// ============================================================================

pub(crate) async fn checkpoint_in(conn: &mut SqliteConnection, id: i64) -> Result<Option<Checkpoint>> {
    let row = sqlx::query("SELECT * FROM checkpoints WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to get checkpoint")?;
    row.as_ref().map(row_to_checkpoint).transpose()
}

/// Delete a checkpoint's answers and row, shift later checkpoints down and
/// decrement the tour counter
pub(crate) async fn remove_checkpoint(conn: &mut SqliteConnection, checkpoint: &Checkpoint) -> Result<()> {
    sqlx::query("DELETE FROM answers WHERE checkpoint_id = ?")
        .bind(checkpoint.id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete answers of checkpoint")?;

    sqlx::query("UPDATE checkpoints SET idx = idx - 1 WHERE tour_id = ? AND idx > ?")
        .bind(checkpoint.tour_id)
        .bind(checkpoint.index)
        .execute(&mut *conn)
        .await
        .context("Failed to reindex checkpoints")?;

    sqlx::query(
        "UPDATE tours SET current_checkpoints = MAX(current_checkpoints - 1, 0), updated_at = ? WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(checkpoint.tour_id)
    .execute(&mut *conn)
    .await
    .context("Failed to decrement checkpoint counter")?;

    sqlx::query("DELETE FROM checkpoints WHERE id = ?")
        .bind(checkpoint.id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete checkpoint")?;

    Ok(())
}

async fn tour_counter(conn: &mut SqliteConnection, tour_id: i64) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT current_checkpoints FROM tours WHERE id = ?")
        .bind(tour_id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to read checkpoint counter")?;
    match row {
        Some(row) => Ok(Some(row.try_get("current_checkpoints")?)),
        None => Ok(None),
    }
}

async fn set_tour_counter(conn: &mut SqliteConnection, tour_id: i64, count: i64) -> Result<()> {
    sqlx::query("UPDATE tours SET current_checkpoints = ?, updated_at = ? WHERE id = ?")
        .bind(count)
        .bind(Utc::now())
        .bind(tour_id)
        .execute(&mut *conn)
        .await
        .context("Failed to update checkpoint counter")?;
    Ok(())
}

// ============================================================================
// Row mapping
// ============================================================================

/// Variant payload spread over the nullable checkpoint columns
#[derive(Debug, Default)]
struct KindColumns {
    picture_id: Option<i64>,
    object_id: Option<String>,
    question: Option<String>,
    linked_objects: Option<String>,
    possible_answers: Option<String>,
    correct_answers: Option<String>,
    max_choices: Option<i64>,
}

impl KindColumns {
    fn from_kind(kind: &CheckpointKind) -> Result<Self> {
        Ok(match kind {
            CheckpointKind::Text => Self::default(),
            CheckpointKind::Picture { picture_id } => Self {
                picture_id: Some(*picture_id),
                ..Self::default()
            },
            CheckpointKind::Object { object_id } => Self {
                object_id: Some(object_id.clone()),
                ..Self::default()
            },
            CheckpointKind::Question {
                question,
                linked_objects,
            } => Self {
                question: Some(question.clone()),
                linked_objects: Some(to_json(linked_objects)?),
                ..Self::default()
            },
            CheckpointKind::MultipleChoice {
                question,
                linked_objects,
                possible_answers,
                correct_answers,
                max_choices,
            } => Self {
                question: Some(question.clone()),
                linked_objects: Some(to_json(linked_objects)?),
                possible_answers: Some(to_json(possible_answers)?),
                correct_answers: Some(to_json(correct_answers)?),
                max_choices: *max_choices,
                ..Self::default()
            },
        })
    }
}

pub(crate) fn row_to_checkpoint(row: &SqliteRow) -> Result<Checkpoint> {
    let id: i64 = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    let question = || -> Result<String> {
        row.try_get::<Option<String>, _>("question")?
            .ok_or_else(|| anyhow!("Question checkpoint {} has no question", id))
    };

    let kind = match kind.parse::<CheckpointType>()? {
        CheckpointType::Text => CheckpointKind::Text,
        CheckpointType::Picture => CheckpointKind::Picture {
            picture_id: row
                .try_get::<Option<i64>, _>("picture_id")?
                .ok_or_else(|| anyhow!("Picture checkpoint {} has no picture", id))?,
        },
        CheckpointType::Object => CheckpointKind::Object {
            object_id: row
                .try_get::<Option<String>, _>("object_id")?
                .ok_or_else(|| anyhow!("Object checkpoint {} has no object", id))?,
        },
        CheckpointType::Question => CheckpointKind::Question {
            question: question()?,
            linked_objects: from_json_list(row.try_get("linked_objects")?)?,
        },
        CheckpointType::MultipleChoice => CheckpointKind::MultipleChoice {
            question: question()?,
            linked_objects: from_json_list(row.try_get("linked_objects")?)?,
            possible_answers: from_json_list(row.try_get("possible_answers")?)?,
            correct_answers: from_json_list(row.try_get("correct_answers")?)?,
            max_choices: row.try_get("max_choices")?,
        },
    };

    Ok(Checkpoint {
        id,
        tour_id: row.try_get("tour_id")?,
        index: row.try_get("idx")?,
        text: row.try_get("text")?,
        show_text: row.try_get("show_text")?,
        show_picture: row.try_get("show_picture")?,
        show_details: row.try_get("show_details")?,
        kind,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_tour, insert_user, migrated_pool};
    use proptest::prelude::*;

    fn text(label: &str) -> NewCheckpoint {
        NewCheckpoint {
            text: Some(label.to_string()),
            show_text: true,
            show_picture: false,
            show_details: false,
            kind: CheckpointKind::Text,
        }
    }

    async fn tour_with(count: usize) -> (SqlxCheckpointRepository, DynDatabasePool, i64, Vec<i64>) {
        let pool = migrated_pool().await;
        let owner = insert_user(&pool, "owner").await;
        let tour = insert_tour(&pool, owner, "tour").await;
        let repo = SqlxCheckpointRepository::new(pool.clone());

        let mut ids = Vec::new();
        for i in 0..count {
            let cp = repo
                .append(tour, &text(&format!("cp{}", i)))
                .await
                .unwrap()
                .expect("tour exists");
            ids.push(cp.id);
        }
        (repo, pool, tour, ids)
    }

    /// Checkpoint ids in position order
    async fn order(repo: &SqlxCheckpointRepository, tour: i64) -> Vec<i64> {
        repo.list_by_tour(tour).await.unwrap().into_iter().map(|c| c.id).collect()
    }

    async fn indices(repo: &SqlxCheckpointRepository, tour: i64) -> Vec<i64> {
        repo.list_by_tour(tour).await.unwrap().into_iter().map(|c| c.index).collect()
    }

    async fn counter(pool: &DynDatabasePool, tour: i64) -> i64 {
        sqlx::query("SELECT current_checkpoints FROM tours WHERE id = ?")
            .bind(tour)
            .fetch_one(pool.sqlite())
            .await
            .unwrap()
            .get("current_checkpoints")
    }

    // ------------------------------------------------------------------
    // MovePlan
    // ------------------------------------------------------------------

    #[test]
    fn test_plan_move_forward_and_back() {
        let plan = MovePlan::new(1, 3, 5);
        assert_eq!(plan.to, 3);
        assert_eq!(plan.shift, Some(Shift { start: 2, end: 3, delta: -1 }));

        let plan = MovePlan::new(3, 0, 5);
        assert_eq!(plan.to, 0);
        assert_eq!(plan.shift, Some(Shift { start: 0, end: 2, delta: 1 }));
    }

    #[test]
    fn test_plan_clamps_targets() {
        assert_eq!(MovePlan::new(1, -1, 5).to, 4);
        assert_eq!(MovePlan::new(1, 5, 5).to, 4);
        assert_eq!(MovePlan::new(1, 99, 5).to, 4);
        assert_eq!(MovePlan::new(3, -7, 5).to, 0);
        assert!(MovePlan::new(2, 2, 5).is_noop());
        assert!(MovePlan::new(4, -1, 5).is_noop());
        assert!(MovePlan::new(0, 3, 1).is_noop());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_plan_is_a_permutation(
            (count, current) in (1i64..30).prop_flat_map(|n| (Just(n), 0..n)),
            target in -5i64..35,
        ) {
            let plan = MovePlan::new(current, target, count);
            let mut moved: Vec<i64> = (0..count).map(|i| plan.position_of(i)).collect();
            moved.sort_unstable();
            prop_assert_eq!(moved, (0..count).collect::<Vec<_>>());
        }

        #[test]
        fn prop_minus_one_equals_count(
            (count, current) in (1i64..30).prop_flat_map(|n| (Just(n), 0..n)),
        ) {
            prop_assert_eq!(MovePlan::new(current, -1, count), MovePlan::new(current, count, count));
            prop_assert_eq!(MovePlan::new(current, -1, count), MovePlan::new(current, count - 1, count));
        }

        #[test]
        fn prop_database_move_keeps_positions_dense(
            (count, current) in (1usize..8).prop_flat_map(|n| (Just(n), 0..n)),
            target in -5i64..13,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (repo, pool, tour, ids) = tour_with(count).await;
                let plan = MovePlan::new(current as i64, target, count as i64);

                let moved = repo.move_to(ids[current], target).await.unwrap().unwrap();
                assert_eq!(moved.index, plan.to);

                assert_eq!(indices(&repo, tour).await, (0..count as i64).collect::<Vec<_>>());
                assert_eq!(counter(&pool, tour).await, count as i64);

                let mut expected = ids.clone();
                let id = expected.remove(current);
                expected.insert(plan.to as usize, id);
                assert_eq!(order(&repo, tour).await, expected);
            });
        }
    }

    // ------------------------------------------------------------------
    // Repository
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_append_assigns_dense_positions() {
        let (repo, pool, tour, ids) = tour_with(4).await;

        assert_eq!(indices(&repo, tour).await, vec![0, 1, 2, 3]);
        assert_eq!(order(&repo, tour).await, ids);
        assert_eq!(counter(&pool, tour).await, 4);
    }

    #[tokio::test]
    async fn test_append_to_missing_tour() {
        let (repo, _, _, _) = tour_with(0).await;
        assert!(repo.append(999, &text("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_variant_payload_roundtrip() {
        let (repo, _, tour, _) = tour_with(0).await;

        let kind = CheckpointKind::MultipleChoice {
            question: "Which century?".to_string(),
            linked_objects: vec!["INV-1".to_string()],
            possible_answers: vec!["16th".to_string(), "17th".to_string()],
            correct_answers: vec![1],
            max_choices: Some(1),
        };
        let created = repo
            .append(
                tour,
                &NewCheckpoint {
                    text: None,
                    show_text: false,
                    show_picture: true,
                    show_details: true,
                    kind: kind.clone(),
                },
            )
            .await
            .unwrap()
            .unwrap();

        let stored = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(stored.kind, kind);
        assert!(stored.show_picture && stored.show_details && !stored.show_text);
    }

    #[tokio::test]
    async fn test_update_keeps_position() {
        let (repo, _, _, ids) = tour_with(3).await;

        let mut cp = repo.get(ids[1]).await.unwrap().unwrap();
        cp.text = Some("edited".to_string());
        cp.show_details = true;
        repo.update(&cp).await.unwrap();

        let stored = repo.get(ids[1]).await.unwrap().unwrap();
        assert_eq!(stored.text.as_deref(), Some("edited"));
        assert!(stored.show_details);
        assert_eq!(stored.index, 1);
    }

    #[tokio::test]
    async fn test_move_to_end_variants_agree() {
        let (a, _, tour_a, ids_a) = tour_with(5).await;
        let (b, _, tour_b, ids_b) = tour_with(5).await;

        a.move_to(ids_a[1], -1).await.unwrap();
        b.move_to(ids_b[1], 5).await.unwrap();

        assert_eq!(indices(&a, tour_a).await, indices(&b, tour_b).await);
        assert_eq!(order(&a, tour_a).await, vec![ids_a[0], ids_a[2], ids_a[3], ids_a[4], ids_a[1]]);
        assert_eq!(order(&b, tour_b).await, vec![ids_b[0], ids_b[2], ids_b[3], ids_b[4], ids_b[1]]);
    }

    #[tokio::test]
    async fn test_move_missing_checkpoint() {
        let (repo, _, _, _) = tour_with(2).await;
        assert!(repo.move_to(999, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_reindexes_and_decrements() {
        let (repo, pool, tour, ids) = tour_with(5).await;

        sqlx::query("INSERT INTO answers (checkpoint_id, user_id, answer) VALUES (?, 1, 'x')")
            .bind(ids[2])
            .execute(pool.sqlite())
            .await
            .unwrap();

        let removed = repo.remove(ids[2]).await.unwrap().expect("checkpoint existed");
        assert_eq!(removed.index, 2);

        assert_eq!(indices(&repo, tour).await, vec![0, 1, 2, 3]);
        assert_eq!(order(&repo, tour).await, vec![ids[0], ids[1], ids[3], ids[4]]);
        assert_eq!(counter(&pool, tour).await, 4);

        let answers: i64 = sqlx::query("SELECT COUNT(*) AS n FROM answers")
            .fetch_one(pool.sqlite())
            .await
            .unwrap()
            .get("n");
        assert_eq!(answers, 0);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let (repo, pool, tour, _) = tour_with(3).await;

        assert!(repo.remove(999).await.unwrap().is_none());
        assert_eq!(indices(&repo, tour).await, vec![0, 1, 2]);
        assert_eq!(counter(&pool, tour).await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_and_moves_on_file_database() {
        use crate::config::DatabaseConfig;
        use crate::db::{create_pool, migrations::run_migrations};

        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: dir.path().join("museum.db").to_string_lossy().to_string(),
        };
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let owner = insert_user(&pool, "owner").await;
        let mut tours = Vec::new();
        for i in 0..16 {
            tours.push(insert_tour(&pool, owner, &format!("tour-{}", i)).await);
        }
        let repo = SqlxCheckpointRepository::boxed(pool.clone());

        let appends: Vec<_> = (0..80)
            .map(|i| {
                let repo = repo.clone();
                let tour = tours[i % tours.len()];
                tokio::spawn(async move { repo.append(tour, &text(&format!("cp{}", i))).await })
            })
            .collect();
        let mut created = Vec::new();
        for handle in appends {
            created.push(handle.await.unwrap().unwrap().expect("tour exists"));
        }

        let moves: Vec<_> = created
            .iter()
            .enumerate()
            .map(|(i, checkpoint)| {
                let repo = repo.clone();
                let id = checkpoint.id;
                tokio::spawn(async move { repo.move_to(id, (i % 3) as i64 - 1).await })
            })
            .collect();
        for handle in moves {
            assert!(handle.await.unwrap().unwrap().is_some());
        }

        for tour in tours {
            let mut positions: Vec<i64> = repo
                .list_by_tour(tour)
                .await
                .unwrap()
                .into_iter()
                .map(|c| c.index)
                .collect();
            positions.sort();
            assert_eq!(positions, (0..5).collect::<Vec<i64>>());
            assert_eq!(counter(&pool, tour).await, 5);
        }
    }
}
