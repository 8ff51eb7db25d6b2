use std::sync::Arc;

use sqlx::PgPool;

pub mod progress_repository;
pub mod user_repository;
pub mod video_repository;
pub mod workout_repository;

pub use progress_repository::{PgProgressRepository, ProgressRepository};
pub use user_repository::{PgUserRepository, UserRepository};
pub use video_repository::{PgVideoRepository, VideoRepository};
pub use workout_repository::{PgWorkoutRepository, WorkoutRepository};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Record already exists")]
    AlreadyExists,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::AlreadyExists,
            _ => RepositoryError::Database(err),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// One handle per repository, shared by the services
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub workouts: Arc<dyn WorkoutRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub videos: Arc<dyn VideoRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            workouts: Arc::new(PgWorkoutRepository::new(pool.clone())),
            progress: Arc::new(PgProgressRepository::new(pool.clone())),
            videos: Arc::new(PgVideoRepository::new(pool)),
        }
    }
}
