use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{User, UserProfile};

/// User roles for role-based access control
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Member,
    Trainer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Trainer => "trainer",
            UserRole::Admin => "admin",
        }
    }

    /// Whether this role appears in an allow-list of roles
    pub fn is_one_of(&self, allowed: &[UserRole]) -> bool {
        allowed.contains(self)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(UserRole::Member),
            "trainer" => Ok(UserRole::Trainer),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Member
    }
}

/// JWT token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,    // Subject (user ID)
    pub role: UserRole, // User role at issue time
    pub exp: usize,     // Expiration time
    pub iat: usize,     // Issued at
    pub jti: String,    // JWT ID
}

/// Authentication request models
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
    pub role: Option<UserRole>, // Optional, defaults to Member
    pub membership_expiration: Option<DateTime<Utc>>,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMembershipRequest {
    pub membership_expiration: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApprovalRequest {
    pub is_approved: Option<bool>,
    pub is_email_verified: Option<bool>,
}

/// Authentication response models
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub token: String,
    pub token_type: String,
    pub expires_in: usize,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Authenticated caller, resolved from a verified token and a live user row
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub is_approved: bool,
    pub jti: String,
}

impl UserSession {
    pub fn from_user(user: &User, jti: String) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            is_approved: user.is_approved,
            jti,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Approved trainers and admins may publish exercise videos
    pub fn can_publish_videos(&self) -> bool {
        match self.role {
            UserRole::Admin => true,
            UserRole::Trainer => self.is_approved,
            UserRole::Member => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        for role in [UserRole::Member, UserRole::Trainer, UserRole::Admin] {
            assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
        }
        assert_eq!("TRAINER".parse::<UserRole>(), Ok(UserRole::Trainer));
        assert!("coach".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_allow_list() {
        let writers = [UserRole::Member, UserRole::Trainer];
        assert!(UserRole::Member.is_one_of(&writers));
        assert!(UserRole::Trainer.is_one_of(&writers));
        assert!(!UserRole::Admin.is_one_of(&writers));
    }

    #[test]
    fn test_session_publish_rights() {
        let session = |role, is_approved| UserSession {
            user_id: Uuid::new_v4(),
            username: "someone".to_string(),
            role,
            is_approved,
            jti: String::new(),
        };

        assert!(session(UserRole::Admin, false).can_publish_videos());
        assert!(session(UserRole::Trainer, true).can_publish_videos());
        assert!(!session(UserRole::Trainer, false).can_publish_videos());
        assert!(!session(UserRole::Member, true).can_publish_videos());
    }
}
