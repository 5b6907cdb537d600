use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, QueryBuilder, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::{debug, info};

use shared::domain::{
    EventRecord, NewOutcome, OutcomeId, OutcomeQuery, OutcomeRecord, OutcomeValue, Schedule,
    TaskId, TaskRecord,
};

const CARE_TABLES: [&str; 3] = ["tasks", "outcomes", "outcome_values"];

/// The local care store: tasks, their scheduled events, and recorded outcomes.
#[async_trait]
pub trait CareStore: Send + Sync {
    /// Tasks with at least one scheduled event on `date`, in store order.
    async fn fetch_tasks_with_events_on(&self, date: NaiveDate) -> Result<Vec<TaskRecord>>;
    /// Scheduled events of one task on `date`, each carrying its outcome if recorded.
    async fn fetch_events(&self, task_id: &TaskId, date: NaiveDate) -> Result<Vec<EventRecord>>;
    async fn fetch_outcomes(&self, query: &OutcomeQuery) -> Result<Vec<OutcomeRecord>>;
    /// Records an outcome, replacing any earlier outcome of the same event.
    async fn add_outcome(&self, outcome: NewOutcome) -> Result<OutcomeRecord>;
    /// Inserts the tasks whose ids are not stored yet; returns how many were added.
    async fn add_tasks_if_not_present(&self, tasks: &[TaskRecord]) -> Result<u64>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    /// Opens (creating if needed) the store at `database_url` and applies
    /// pending migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid care store url '{database_url}'"))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to connect to care store '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to migrate care store")?;
        info!(%database_url, "care store opened");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Fails unless the connection answers and every care table exists.
    pub async fn health_check(&self) -> Result<()> {
        let present: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('tasks', 'outcomes', 'outcome_values')",
        )
        .fetch_all(&self.pool)
        .await
        .context("care store is not reachable")?;
        if let Some(missing) = CARE_TABLES
            .iter()
            .find(|table| !present.iter().any(|name| name == *table))
        {
            bail!("care store is missing table '{missing}'");
        }
        Ok(())
    }

    pub async fn fetch_task(&self, task_id: &TaskId) -> Result<Option<TaskRecord>> {
        let row = sqlx::query(
            "SELECT id, title, instructions, start_date, end_date, interval_days, occurrences_per_day
             FROM tasks WHERE id = ?",
        )
        .bind(task_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| task_from_row(&r)))
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        let rows = sqlx::query(
            "SELECT id, title, instructions, start_date, end_date, interval_days, occurrences_per_day
             FROM tasks ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(task_from_row).collect())
    }
}

#[async_trait]
impl CareStore for Storage {
    async fn fetch_tasks_with_events_on(&self, date: NaiveDate) -> Result<Vec<TaskRecord>> {
        let rows = sqlx::query(
            "SELECT id, title, instructions, start_date, end_date, interval_days, occurrences_per_day
             FROM tasks
             WHERE start_date <= ?1 AND (end_date IS NULL OR end_date >= ?1)
             ORDER BY rowid ASC",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to fetch tasks for {date}"))?;

        Ok(rows
            .iter()
            .map(task_from_row)
            .filter(|task| task.schedule.occurrences_on(date) > 0)
            .collect())
    }

    async fn fetch_events(&self, task_id: &TaskId, date: NaiveDate) -> Result<Vec<EventRecord>> {
        let Some(task) = self.fetch_task(task_id).await? else {
            return Ok(Vec::new());
        };

        let occurrences = task.schedule.occurrences_on(date);
        if occurrences == 0 {
            return Ok(Vec::new());
        }

        let mut outcomes = self
            .fetch_outcomes(&OutcomeQuery {
                task_ids: vec![task_id.clone()],
                from: Some(date),
                to: Some(date),
            })
            .await?;

        Ok((0..occurrences)
            .map(|occurrence| {
                let outcome = outcomes
                    .iter()
                    .position(|o| o.occurrence == occurrence)
                    .map(|index| outcomes.swap_remove(index));
                EventRecord {
                    task_id: task_id.clone(),
                    date,
                    occurrence,
                    outcome,
                }
            })
            .collect())
    }

    async fn fetch_outcomes(&self, query: &OutcomeQuery) -> Result<Vec<OutcomeRecord>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT o.id, o.task_id, o.event_date, o.occurrence, o.created_at, v.kind, v.value
             FROM outcomes o
             LEFT JOIN outcome_values v ON v.outcome_id = o.id
             WHERE 1 = 1",
        );
        if !query.task_ids.is_empty() {
            builder.push(" AND o.task_id IN (");
            let mut ids = builder.separated(", ");
            for task_id in &query.task_ids {
                ids.push_bind(task_id.as_str().to_owned());
            }
            ids.push_unseparated(")");
        }
        if let Some(from) = query.from {
            builder.push(" AND o.event_date >= ").push_bind(from);
        }
        if let Some(to) = query.to {
            builder.push(" AND o.event_date <= ").push_bind(to);
        }
        builder.push(" ORDER BY o.event_date ASC, o.id ASC, v.position ASC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch outcomes")?;

        let mut outcomes: Vec<OutcomeRecord> = Vec::new();
        for row in rows {
            let id = OutcomeId(row.get::<i64, _>(0));
            if outcomes.last().map(|o| o.id) != Some(id) {
                outcomes.push(OutcomeRecord {
                    id,
                    task_id: TaskId::new(row.get::<String, _>(1)),
                    date: row.get::<NaiveDate, _>(2),
                    occurrence: row.get::<i64, _>(3) as u32,
                    values: Vec::new(),
                    created_at: row.get::<DateTime<Utc>, _>(4),
                });
            }
            if let (Some(kind), Some(value)) = (
                row.get::<Option<String>, _>(5),
                row.get::<Option<f64>, _>(6),
            ) {
                if let Some(outcome) = outcomes.last_mut() {
                    outcome.values.push(OutcomeValue { kind, value });
                }
            }
        }
        Ok(outcomes)
    }

    async fn add_outcome(&self, outcome: NewOutcome) -> Result<OutcomeRecord> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let rec = sqlx::query(
            "INSERT INTO outcomes (task_id, event_date, occurrence, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(task_id, event_date, occurrence) DO UPDATE SET created_at = excluded.created_at
             RETURNING id",
        )
        .bind(outcome.task_id.as_str())
        .bind(outcome.date)
        .bind(i64::from(outcome.occurrence))
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("failed to store outcome for task {}", outcome.task_id))?;
        let id = OutcomeId(rec.get::<i64, _>(0));

        sqlx::query("DELETE FROM outcome_values WHERE outcome_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        for (position, value) in outcome.values.iter().enumerate() {
            sqlx::query(
                "INSERT INTO outcome_values (outcome_id, position, kind, value) VALUES (?, ?, ?, ?)",
            )
            .bind(id.0)
            .bind(position as i64)
            .bind(value.kind.as_str())
            .bind(value.value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(task_id = %outcome.task_id, date = %outcome.date, values = outcome.values.len(), "outcome stored");

        Ok(OutcomeRecord {
            id,
            task_id: outcome.task_id,
            date: outcome.date,
            occurrence: outcome.occurrence,
            values: outcome.values,
            created_at,
        })
    }

    async fn add_tasks_if_not_present(&self, tasks: &[TaskRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut added = 0;
        for task in tasks {
            added += sqlx::query(
                "INSERT INTO tasks (id, title, instructions, start_date, end_date, interval_days, occurrences_per_day)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(task.id.as_str())
            .bind(task.title.as_str())
            .bind(task.instructions.as_deref())
            .bind(task.schedule.start)
            .bind(task.schedule.end)
            .bind(i64::from(task.schedule.interval_days))
            .bind(i64::from(task.schedule.occurrences_per_day))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        if added > 0 {
            info!(added, "added tasks into care store");
        }
        Ok(added)
    }
}

fn task_from_row(r: &SqliteRow) -> TaskRecord {
    TaskRecord {
        id: TaskId::new(r.get::<String, _>(0)),
        title: r.get::<String, _>(1),
        instructions: r.get::<Option<String>, _>(2),
        schedule: Schedule {
            start: r.get::<NaiveDate, _>(3),
            end: r.get::<Option<NaiveDate>, _>(4),
            interval_days: r.get::<i64, _>(5) as u32,
            occurrences_per_day: r.get::<i64, _>(6) as u32,
        },
    }
}

/// Creates the directory holding a file-backed SQLite database. In-memory
/// and non-SQLite urls are left alone.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    match sqlite_path(database_url).as_deref().and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("cannot create '{}' for care store '{database_url}'", dir.display())),
        _ => Ok(()),
    }
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split_once('?').map_or(rest, |(path, _)| path);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
