use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, RepositoryResult};
use crate::models::{ExerciseVideo, NewExerciseVideo, PageRequest, VideoUpdate};

const VIDEO_COLUMNS: &str = "id, trainer_id, title, description, video_path, video_url, \
     thumbnail_path, thumbnail_url, exercise_type, difficulty, duration_seconds, tags, \
     is_public, status, created_at, updated_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create(&self, video: NewExerciseVideo) -> RepositoryResult<ExerciseVideo>;
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<ExerciseVideo>>;
    async fn list_public(&self, page: PageRequest) -> RepositoryResult<(Vec<ExerciseVideo>, i64)>;
    async fn list_by_trainer(
        &self,
        trainer_id: Uuid,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<ExerciseVideo>, i64)>;
    async fn list_all(&self) -> RepositoryResult<Vec<ExerciseVideo>>;
    async fn list_missing_thumbnails(&self) -> RepositoryResult<Vec<ExerciseVideo>>;
    async fn update(&self, id: Uuid, update: VideoUpdate) -> RepositoryResult<ExerciseVideo>;
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}

pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn create(&self, video: NewExerciseVideo) -> RepositoryResult<ExerciseVideo> {
        let sql = format!(
            "INSERT INTO exercise_videos (id, trainer_id, title, description, video_path, \
             video_url, thumbnail_path, thumbnail_url, exercise_type, difficulty, \
             duration_seconds, tags, is_public, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {VIDEO_COLUMNS}"
        );

        let created = sqlx::query_as::<_, ExerciseVideo>(&sql)
            .bind(Uuid::new_v4())
            .bind(video.trainer_id)
            .bind(&video.title)
            .bind(&video.description)
            .bind(&video.video_path)
            .bind(&video.video_url)
            .bind(&video.thumbnail_path)
            .bind(&video.thumbnail_url)
            .bind(video.exercise_type)
            .bind(video.difficulty)
            .bind(video.duration_seconds)
            .bind(&video.tags)
            .bind(video.is_public)
            .bind(video.status)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<ExerciseVideo>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM exercise_videos WHERE id = $1");
        let video = sqlx::query_as::<_, ExerciseVideo>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(video)
    }

    async fn list_public(&self, page: PageRequest) -> RepositoryResult<(Vec<ExerciseVideo>, i64)> {
        let sql = format!(
            "SELECT {VIDEO_COLUMNS} FROM exercise_videos WHERE is_public \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let videos = sqlx::query_as::<_, ExerciseVideo>(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exercise_videos WHERE is_public")
            .fetch_one(&self.pool)
            .await?;

        Ok((videos, total))
    }

    async fn list_by_trainer(
        &self,
        trainer_id: Uuid,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<ExerciseVideo>, i64)> {
        let sql = format!(
            "SELECT {VIDEO_COLUMNS} FROM exercise_videos WHERE trainer_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let videos = sqlx::query_as::<_, ExerciseVideo>(&sql)
            .bind(trainer_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM exercise_videos WHERE trainer_id = $1")
                .bind(trainer_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((videos, total))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<ExerciseVideo>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM exercise_videos ORDER BY created_at");
        let videos = sqlx::query_as::<_, ExerciseVideo>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(videos)
    }

    async fn list_missing_thumbnails(&self) -> RepositoryResult<Vec<ExerciseVideo>> {
        let sql = format!(
            "SELECT {VIDEO_COLUMNS} FROM exercise_videos \
             WHERE thumbnail_url IS NULL OR thumbnail_url = '' \
             ORDER BY created_at"
        );
        let videos = sqlx::query_as::<_, ExerciseVideo>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(videos)
    }

    async fn update(&self, id: Uuid, update: VideoUpdate) -> RepositoryResult<ExerciseVideo> {
        let mut video = self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        video.apply(update, Utc::now());

        let sql = format!(
            "UPDATE exercise_videos SET title = $2, description = $3, exercise_type = $4, \
             difficulty = $5, duration_seconds = $6, tags = $7, is_public = $8, video_url = $9, \
             thumbnail_path = $10, thumbnail_url = $11, status = $12, updated_at = $13 \
             WHERE id = $1 RETURNING {VIDEO_COLUMNS}"
        );

        let updated = sqlx::query_as::<_, ExerciseVideo>(&sql)
            .bind(id)
            .bind(&video.title)
            .bind(&video.description)
            .bind(video.exercise_type)
            .bind(video.difficulty)
            .bind(video.duration_seconds)
            .bind(&video.tags)
            .bind(video.is_public)
            .bind(&video.video_url)
            .bind(&video.thumbnail_path)
            .bind(&video.thumbnail_url)
            .bind(video.status)
            .bind(video.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM exercise_videos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
