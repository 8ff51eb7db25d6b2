use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, RepositoryResult};
use crate::models::{DateRange, MetricTimestamps, NewProgress, PageRequest, Progress, ProgressUpdate};

const PROGRESS_COLUMNS: &str = "id, user_id, bmi, calories_intake, calorie_deficit, weight, \
     body_fat_percentage, muscle_mass, last_bmi_update, last_calories_update, date, \
     created_at, updated_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn create(&self, entry: NewProgress) -> RepositoryResult<Progress>;
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Progress>>;
    async fn list_by_user(
        &self,
        user_id: Uuid,
        range: DateRange,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<Progress>, i64)>;
    /// Latest gated-write timestamps across all of the user's entries
    async fn latest_update_times(&self, user_id: Uuid) -> RepositoryResult<MetricTimestamps>;
    async fn update(&self, id: Uuid, update: ProgressUpdate) -> RepositoryResult<Progress>;
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}

pub struct PgProgressRepository {
    pool: PgPool,
}

impl PgProgressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn create(&self, entry: NewProgress) -> RepositoryResult<Progress> {
        let sql = format!(
            "INSERT INTO progress (id, user_id, bmi, calories_intake, calorie_deficit, weight, \
             body_fat_percentage, muscle_mass, last_bmi_update, last_calories_update, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {PROGRESS_COLUMNS}"
        );

        let created = sqlx::query_as::<_, Progress>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.user_id)
            .bind(entry.bmi)
            .bind(entry.calories_intake)
            .bind(entry.calorie_deficit)
            .bind(entry.weight)
            .bind(entry.body_fat_percentage)
            .bind(entry.muscle_mass)
            .bind(entry.last_bmi_update)
            .bind(entry.last_calories_update)
            .bind(entry.date)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Progress>> {
        let sql = format!("SELECT {PROGRESS_COLUMNS} FROM progress WHERE id = $1");
        let entry = sqlx::query_as::<_, Progress>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        range: DateRange,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<Progress>, i64)> {
        const FILTER: &str = "user_id = $1 \
             AND ($2::timestamptz IS NULL OR date >= $2) \
             AND ($3::timestamptz IS NULL OR date < $3)";

        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress WHERE {FILTER} \
             ORDER BY date DESC LIMIT $4 OFFSET $5"
        );
        let entries = sqlx::query_as::<_, Progress>(&sql)
            .bind(user_id)
            .bind(range.from)
            .bind(range.until)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM progress WHERE {FILTER}"))
            .bind(user_id)
            .bind(range.from)
            .bind(range.until)
            .fetch_one(&self.pool)
            .await?;

        Ok((entries, total))
    }

    async fn latest_update_times(&self, user_id: Uuid) -> RepositoryResult<MetricTimestamps> {
        let (last_bmi_update, last_calories_update): (Option<DateTime<Utc>>, Option<DateTime<Utc>>) =
            sqlx::query_as(
                "SELECT MAX(last_bmi_update), MAX(last_calories_update) \
                 FROM progress WHERE user_id = $1",
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(MetricTimestamps {
            last_bmi_update,
            last_calories_update,
        })
    }

    async fn update(&self, id: Uuid, update: ProgressUpdate) -> RepositoryResult<Progress> {
        let mut entry = self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        entry.apply(update, Utc::now());

        let sql = format!(
            "UPDATE progress SET bmi = $2, calories_intake = $3, calorie_deficit = $4, \
             weight = $5, body_fat_percentage = $6, muscle_mass = $7, last_bmi_update = $8, \
             last_calories_update = $9, date = $10, updated_at = $11 \
             WHERE id = $1 RETURNING {PROGRESS_COLUMNS}"
        );

        let updated = sqlx::query_as::<_, Progress>(&sql)
            .bind(id)
            .bind(entry.bmi)
            .bind(entry.calories_intake)
            .bind(entry.calorie_deficit)
            .bind(entry.weight)
            .bind(entry.body_fat_percentage)
            .bind(entry.muscle_mass)
            .bind(entry.last_bmi_update)
            .bind(entry.last_calories_update)
            .bind(entry.date)
            .bind(entry.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM progress WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
