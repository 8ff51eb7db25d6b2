use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, RepositoryResult};
use crate::models::{NewUser, User, UserUpdate};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, membership_start, \
     membership_expiration, is_email_verified, is_approved, first_name, last_name, age, \
     weight, height, created_at, updated_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;
    async fn update(&self, id: Uuid, update: UserUpdate) -> RepositoryResult<User>;
    /// Trainers whose membership has not expired at `now`
    async fn list_active_trainers(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<User>>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, role, membership_start, \
             membership_expiration, is_email_verified, is_approved, first_name, last_name, age, \
             weight, height) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {USER_COLUMNS}"
        );

        let created = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.membership_start)
            .bind(user.membership_expiration)
            .bind(user.is_email_verified)
            .bind(user.is_approved)
            .bind(&user.profile.first_name)
            .bind(&user.profile.last_name)
            .bind(user.profile.age)
            .bind(user.profile.weight)
            .bind(user.profile.height)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> RepositoryResult<User> {
        let mut user = self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        user.apply(update, Utc::now());

        let sql = format!(
            "UPDATE users SET username = $2, email = $3, password_hash = $4, \
             membership_expiration = $5, is_email_verified = $6, is_approved = $7, \
             first_name = $8, last_name = $9, age = $10, weight = $11, height = $12, \
             updated_at = $13 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        let updated = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.membership_expiration)
            .bind(user.is_email_verified)
            .bind(user.is_approved)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.age)
            .bind(user.weight)
            .bind(user.height)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn list_active_trainers(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE role = 'trainer' AND membership_expiration >= $1 \
             ORDER BY username"
        );
        let trainers = sqlx::query_as::<_, User>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(trainers)
    }
}
