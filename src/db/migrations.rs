//! Database migrations module
//!
//! All migrations are embedded directly in Rust code as SQL strings so the
//! server ships as a single binary. Applied versions are tracked in the
//! `_migrations` table.
//!
//! Foreign keys describe ownership edges only and carry no `ON DELETE`
//! actions: removing a tour, user or museum object goes through the ordered
//! routines in `repositories::cascade`, and the constraints make a wrong order fail
//! loudly instead of leaving orphans.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::DynDatabasePool;

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements, separated by `;`
    pub up: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(100) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                producer BOOLEAN NOT NULL DEFAULT 0,
                profile_picture_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
        "#,
    },
    Migration {
        version: 2,
        name: "create_admins",
        up: r#"
            CREATE TABLE IF NOT EXISTS admins (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(100) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#,
    },
    Migration {
        version: 3,
        name: "create_codes",
        up: r#"
            CREATE TABLE IF NOT EXISTS codes (
                code VARCHAR(16) PRIMARY KEY,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#,
    },
    Migration {
        version: 4,
        name: "create_media",
        up: r#"
            CREATE TABLE IF NOT EXISTS pictures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT,
                file_key VARCHAR(255) NOT NULL,
                content_type VARCHAR(100) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS profile_pictures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                locked BOOLEAN NOT NULL DEFAULT 0,
                file_key VARCHAR(255) NOT NULL,
                content_type VARCHAR(100) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS badges (
                id VARCHAR(100) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                cost INTEGER NOT NULL,
                file_key VARCHAR(255) NOT NULL,
                content_type VARCHAR(100) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS badge_progress (
                user_id INTEGER NOT NULL REFERENCES users(id),
                badge_id VARCHAR(100) NOT NULL REFERENCES badges(id),
                progress INTEGER NOT NULL DEFAULT 0,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, badge_id)
            )
        "#,
    },
    Migration {
        version: 5,
        name: "create_museum_objects",
        up: r#"
            CREATE TABLE IF NOT EXISTS museum_objects (
                object_id VARCHAR(100) PRIMARY KEY,
                category VARCHAR(255) NOT NULL,
                sub_category VARCHAR(255) NOT NULL,
                title VARCHAR(500) NOT NULL,
                time_range VARCHAR(255),
                year VARCHAR(100),
                pictures TEXT NOT NULL DEFAULT '[]',
                art_type VARCHAR(255),
                creator VARCHAR(255),
                material VARCHAR(255),
                size VARCHAR(255),
                location VARCHAR(255),
                description TEXT,
                additional_information TEXT,
                interdisciplinary_context TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_museum_objects_category ON museum_objects(category)
        "#,
    },
    Migration {
        version: 6,
        name: "create_tours",
        up: r#"
            CREATE TABLE IF NOT EXISTS tours (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                owner_id INTEGER NOT NULL REFERENCES users(id),
                session_id INTEGER NOT NULL,
                search_id VARCHAR(100) NOT NULL UNIQUE,
                description TEXT,
                difficulty INTEGER,
                status VARCHAR(20) NOT NULL DEFAULT 'private',
                current_checkpoints INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_tours_owner ON tours(owner_id);
            CREATE INDEX IF NOT EXISTS idx_tours_status ON tours(status);
            CREATE TABLE IF NOT EXISTS tour_members (
                tour_id INTEGER NOT NULL REFERENCES tours(id),
                user_id INTEGER NOT NULL REFERENCES users(id),
                joined_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (tour_id, user_id)
            );
            CREATE INDEX IF NOT EXISTS idx_tour_members_user ON tour_members(user_id)
        "#,
    },
    Migration {
        version: 7,
        name: "create_checkpoints",
        up: r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tour_id INTEGER NOT NULL REFERENCES tours(id),
                idx INTEGER NOT NULL,
                kind VARCHAR(20) NOT NULL,
                text TEXT,
                show_text BOOLEAN NOT NULL DEFAULT 0,
                show_picture BOOLEAN NOT NULL DEFAULT 0,
                show_details BOOLEAN NOT NULL DEFAULT 0,
                picture_id INTEGER,
                object_id VARCHAR(100),
                question TEXT,
                linked_objects TEXT,
                possible_answers TEXT,
                correct_answers TEXT,
                max_choices INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_checkpoints_tour_idx ON checkpoints(tour_id, idx);
            CREATE INDEX IF NOT EXISTS idx_checkpoints_object ON checkpoints(object_id)
        "#,
    },
    Migration {
        version: 8,
        name: "create_answers",
        up: r#"
            CREATE TABLE IF NOT EXISTS answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                checkpoint_id INTEGER NOT NULL REFERENCES checkpoints(id),
                user_id INTEGER NOT NULL REFERENCES users(id),
                answer TEXT,
                choices TEXT,
                correct INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (checkpoint_id, user_id)
            );
            CREATE INDEX IF NOT EXISTS idx_answers_user ON answers(user_id)
        "#,
    },
    Migration {
        version: 9,
        name: "create_favourites",
        up: r#"
            CREATE TABLE IF NOT EXISTS favourite_tours (
                user_id INTEGER NOT NULL REFERENCES users(id),
                tour_id INTEGER NOT NULL REFERENCES tours(id),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, tour_id)
            );
            CREATE TABLE IF NOT EXISTS favourite_objects (
                user_id INTEGER NOT NULL REFERENCES users(id),
                object_id VARCHAR(100) NOT NULL REFERENCES museum_objects(object_id),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, object_id)
            )
        "#,
    },
    Migration {
        version: 10,
        name: "create_feedback",
        up: r#"
            CREATE TABLE IF NOT EXISTS app_feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rating INTEGER NOT NULL,
                review TEXT NOT NULL,
                read BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS tour_feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tour_id INTEGER NOT NULL REFERENCES tours(id),
                rating INTEGER NOT NULL,
                review TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_tour_feedback_tour ON tour_feedback(tour_id)
        "#,
    },
];

/// Run all pending migrations
///
/// # Returns
///
/// Number of migrations applied
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool.sqlite())
        .await?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

/// Apply a single migration and record it, atomically
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.sqlite().begin().await?;

    for statement in split_sql_statements(migration.up) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    if sql.len() > 100 {
        format!("{}...", &sql[..100])
    } else {
        sql.to_string()
    }
}

/// Split SQL into individual statements, skipping blanks and comment-only chunks
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(applied.len() == MIGRATIONS.len())
}

/// Get migration by version
pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}
