use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, RepositoryResult};
use crate::models::{DateRange, NewWorkout, PageRequest, Workout, WorkoutUpdate};

const WORKOUT_COLUMNS: &str = "id, user_id, trainer_id, date, title, exercises, duration_minutes, \
     calories_burned, intensity, notes, is_public, created_at, updated_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkoutRepository: Send + Sync {
    async fn create(&self, workout: NewWorkout) -> RepositoryResult<Workout>;
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Workout>>;
    /// A user's workouts inside `range`, newest first, with the unpaginated total
    async fn list_by_user(
        &self,
        user_id: Uuid,
        range: DateRange,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<Workout>, i64)>;
    async fn list_public_by_trainer(
        &self,
        trainer_id: Uuid,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<Workout>, i64)>;
    async fn update(&self, id: Uuid, update: WorkoutUpdate) -> RepositoryResult<Workout>;
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}

pub struct PgWorkoutRepository {
    pool: PgPool,
}

impl PgWorkoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkoutRepository for PgWorkoutRepository {
    async fn create(&self, workout: NewWorkout) -> RepositoryResult<Workout> {
        let sql = format!(
            "INSERT INTO workouts (id, user_id, trainer_id, date, title, exercises, \
             duration_minutes, calories_burned, intensity, notes, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {WORKOUT_COLUMNS}"
        );

        let created = sqlx::query_as::<_, Workout>(&sql)
            .bind(Uuid::new_v4())
            .bind(workout.user_id)
            .bind(workout.trainer_id)
            .bind(workout.date)
            .bind(&workout.title)
            .bind(Json(&workout.exercises))
            .bind(workout.duration_minutes)
            .bind(workout.calories_burned)
            .bind(workout.intensity)
            .bind(&workout.notes)
            .bind(workout.is_public)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Workout>> {
        let sql = format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = $1");
        let workout = sqlx::query_as::<_, Workout>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(workout)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        range: DateRange,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<Workout>, i64)> {
        const FILTER: &str = "user_id = $1 \
             AND ($2::timestamptz IS NULL OR date >= $2) \
             AND ($3::timestamptz IS NULL OR date < $3)";

        let sql = format!(
            "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE {FILTER} \
             ORDER BY date DESC LIMIT $4 OFFSET $5"
        );
        let workouts = sqlx::query_as::<_, Workout>(&sql)
            .bind(user_id)
            .bind(range.from)
            .bind(range.until)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM workouts WHERE {FILTER}"))
            .bind(user_id)
            .bind(range.from)
            .bind(range.until)
            .fetch_one(&self.pool)
            .await?;

        Ok((workouts, total))
    }

    async fn list_public_by_trainer(
        &self,
        trainer_id: Uuid,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<Workout>, i64)> {
        let sql = format!(
            "SELECT {WORKOUT_COLUMNS} FROM workouts \
             WHERE trainer_id = $1 AND is_public \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let workouts = sqlx::query_as::<_, Workout>(&sql)
            .bind(trainer_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM workouts WHERE trainer_id = $1 AND is_public")
                .bind(trainer_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((workouts, total))
    }

    async fn update(&self, id: Uuid, update: WorkoutUpdate) -> RepositoryResult<Workout> {
        let mut workout = self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        workout.apply(update, Utc::now());

        let sql = format!(
            "UPDATE workouts SET title = $2, date = $3, exercises = $4, duration_minutes = $5, \
             calories_burned = $6, intensity = $7, notes = $8, is_public = $9, updated_at = $10 \
             WHERE id = $1 RETURNING {WORKOUT_COLUMNS}"
        );

        let updated = sqlx::query_as::<_, Workout>(&sql)
            .bind(id)
            .bind(&workout.title)
            .bind(workout.date)
            .bind(&workout.exercises)
            .bind(workout.duration_minutes)
            .bind(workout.calories_burned)
            .bind(workout.intensity)
            .bind(&workout.notes)
            .bind(workout.is_public)
            .bind(workout.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM workouts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
