use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub membership_start: DateTime<Utc>,
    pub membership_expiration: DateTime<Utc>,
    pub is_email_verified: bool,
    pub is_approved: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Membership is active up to and including the expiration instant
    pub fn is_membership_active(&self, now: DateTime<Utc>) -> bool {
        now <= self.membership_expiration
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            age: self.age,
            weight: self.weight,
            height: self.height,
        }
    }

    /// Apply a partial update; profile fields merge one by one
    pub fn apply(&mut self, update: UserUpdate, now: DateTime<Utc>) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(hash) = update.password_hash {
            self.password_hash = hash;
        }
        if let Some(profile) = update.profile {
            self.first_name = profile.first_name.or(self.first_name.take());
            self.last_name = profile.last_name.or(self.last_name.take());
            self.age = profile.age.or(self.age);
            self.weight = profile.weight.or(self.weight);
            self.height = profile.height.or(self.height);
        }
        if let Some(expiration) = update.membership_expiration {
            self.membership_expiration = expiration;
        }
        if let Some(approved) = update.is_approved {
            self.is_approved = approved;
        }
        if let Some(verified) = update.is_email_verified {
            self.is_email_verified = verified;
        }
        self.updated_at = now;
    }
}

/// Optional personal details attached to an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub membership_start: DateTime<Utc>,
    pub membership_expiration: DateTime<Utc>,
    pub is_email_verified: bool,
    pub is_approved: bool,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub profile: Option<UserProfile>,
    pub membership_expiration: Option<DateTime<Utc>>,
    pub is_approved: Option<bool>,
    pub is_email_verified: Option<bool>,
}

/// User as returned by the API (no credentials)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub membership_start: DateTime<Utc>,
    pub membership_expiration: DateTime<Utc>,
    pub is_email_verified: bool,
    pub is_approved: bool,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let profile = user.profile();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            membership_start: user.membership_start,
            membership_expiration: user.membership_expiration,
            is_email_verified: user.is_email_verified,
            is_approved: user.is_approved,
            profile,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Public listing entry for trainers members can pick from
#[derive(Debug, Serialize)]
pub struct TrainerSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<User> for TrainerSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user_expiring_at(expiration: DateTime<Utc>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "member".to_string(),
            email: "member@example.com".to_string(),
            password_hash: "$2b$04$dummy".to_string(),
            role: UserRole::Member,
            membership_start: now - Duration::days(30),
            membership_expiration: expiration,
            is_email_verified: false,
            is_approved: true,
            first_name: Some("Sam".to_string()),
            last_name: None,
            age: Some(31),
            weight: None,
            height: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_membership_active_until_expiration_inclusive() {
        let expiration = Utc::now();
        let user = user_expiring_at(expiration);

        assert!(user.is_membership_active(expiration - Duration::seconds(1)));
        assert!(user.is_membership_active(expiration));
        assert!(!user.is_membership_active(expiration + Duration::seconds(1)));
    }

    #[test]
    fn test_user_response_hides_password_hash() {
        let user = user_expiring_at(Utc::now() + Duration::days(1));
        let json = serde_json::to_value(UserResponse::from(user.clone())).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["profile"]["first_name"], "Sam");

        let raw = serde_json::to_value(&user).unwrap();
        assert!(raw.get("password_hash").is_none());
    }

    #[test]
    fn test_apply_merges_profile_fields() {
        let mut user = user_expiring_at(Utc::now());
        let update = UserUpdate {
            username: Some("renamed".to_string()),
            profile: Some(UserProfile {
                last_name: Some("Lee".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        user.apply(update, Utc::now());

        assert_eq!(user.username, "renamed");
        assert_eq!(user.first_name.as_deref(), Some("Sam"));
        assert_eq!(user.last_name.as_deref(), Some("Lee"));
        assert_eq!(user.age, Some(31));
    }
}
