use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};

use crate::auth::{hash_password, validate_password_strength, PasswordPolicy, UserRole};
use crate::models::{NewUser, UserProfile, UserUpdate};
use crate::repositories::UserRepository;

/// Credentials for the bootstrap admin account
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyExists,
    PasswordReset,
}

/// Creates or repairs the admin account
pub struct AdminSeeder {
    users: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl AdminSeeder {
    pub fn new(users: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }

    /// Create the admin account unless one already uses this email
    pub async fn ensure_admin(&self, account: &AdminAccount) -> Result<SeedOutcome> {
        let email = account.email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            tracing::info!(%email, "admin account already exists");
            return Ok(SeedOutcome::AlreadyExists);
        }

        self.create_admin(account).await?;
        Ok(SeedOutcome::Created)
    }

    /// Reset the admin password and flags, creating the account when missing
    pub async fn reset_admin(&self, account: &AdminAccount) -> Result<SeedOutcome> {
        let email = account.email.trim().to_lowercase();
        let Some(existing) = self.users.find_by_email(&email).await? else {
            tracing::warn!(%email, "admin account not found, creating it");
            self.create_admin(account).await?;
            return Ok(SeedOutcome::Created);
        };

        validate_password_strength(&account.password, &PasswordPolicy::default())?;
        let update = UserUpdate {
            password_hash: Some(hash_password(&account.password, self.bcrypt_cost)?),
            is_email_verified: Some(true),
            is_approved: Some(true),
            ..Default::default()
        };
        self.users.update(existing.id, update).await?;

        tracing::info!(%email, "admin password reset");
        Ok(SeedOutcome::PasswordReset)
    }

    async fn create_admin(&self, account: &AdminAccount) -> Result<()> {
        validate_password_strength(&account.password, &PasswordPolicy::default())?;

        let now = Utc::now();
        let admin = self
            .users
            .create(NewUser {
                username: account.username.trim().to_string(),
                email: account.email.trim().to_lowercase(),
                password_hash: hash_password(&account.password, self.bcrypt_cost)?,
                role: UserRole::Admin,
                membership_start: now,
                membership_expiration: now + Duration::days(365),
                is_email_verified: true,
                is_approved: true,
                profile: UserProfile {
                    first_name: Some("System".to_string()),
                    last_name: Some("Administrator".to_string()),
                    ..Default::default()
                },
            })
            .await?;

        tracing::info!(user_id = %admin.id, email = %admin.email, "admin account created");
        Ok(())
    }
}
