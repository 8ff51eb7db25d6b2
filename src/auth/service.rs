use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength, verify_password, PasswordPolicy};
use crate::auth::{
    AuthError, AuthResponse, JwtService, LoginRequest, RegisterRequest, UpdateApprovalRequest,
    UpdateProfileRequest, UserInfo, UserRole, UserSession,
};
use crate::config::AppConfig;
use crate::error::validation_message;
use crate::models::{NewUser, User, UserUpdate};
use crate::repositories::{RepositoryError, UserRepository};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt_service: JwtService,
    password_policy: PasswordPolicy,
    bcrypt_cost: u32,
    default_membership_days: i64,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, config: &AppConfig) -> Self {
        Self {
            users,
            jwt_service: JwtService::new(&config.jwt_secret, config.token_ttl_days),
            password_policy: PasswordPolicy::default(),
            bcrypt_cost: config.bcrypt_cost,
            default_membership_days: config.default_membership_days,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let request = RegisterRequest {
            username: request.username.trim().to_string(),
            email: normalize_email(&request.email),
            ..request
        };
        request
            .validate()
            .map_err(|e| AuthError::Validation(validation_message(&e)))?;
        validate_password_strength(&request.password, &self.password_policy)
            .map_err(|e| AuthError::PasswordValidation(e.to_string()))?;

        let role = request.role.unwrap_or_default();
        if role == UserRole::Admin {
            return Err(AuthError::Validation(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }

        self.ensure_available(&request.email, &request.username, None).await?;

        let now = Utc::now();
        let password_hash = hash_password(&request.password, self.bcrypt_cost)?;
        let user = self
            .users
            .create(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
                role,
                membership_start: now,
                membership_expiration: request
                    .membership_expiration
                    .unwrap_or_else(|| now + Duration::days(self.default_membership_days)),
                is_email_verified: false,
                // Self-registered trainers wait for an admin before publishing
                is_approved: role != UserRole::Trainer,
                profile: request.profile.unwrap_or_default(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::AlreadyExists => AuthError::UserAlreadyExists("Email or username"),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = role.as_str(), "user registered");

        self.auth_response(&user, Some("User registered successfully"))
    }

    /// Login user
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_membership_active(Utc::now()) {
            return Err(AuthError::MembershipExpired(
                user.membership_expiration.to_rfc3339(),
            ));
        }

        self.auth_response(&user, None)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        let request = UpdateProfileRequest {
            username: request.username.map(|u| u.trim().to_string()),
            email: request.email.as_deref().map(normalize_email),
            ..request
        };
        request
            .validate()
            .map_err(|e| AuthError::Validation(validation_message(&e)))?;

        let current = self.profile(user_id).await?;
        let email = request.email.filter(|e| *e != current.email);
        let username = request.username.filter(|u| *u != current.username);
        self.ensure_available(
            email.as_deref().unwrap_or_default(),
            username.as_deref().unwrap_or_default(),
            Some(user_id),
        )
        .await?;

        let password_hash = match request.password {
            Some(password) => {
                validate_password_strength(&password, &self.password_policy)
                    .map_err(|e| AuthError::PasswordValidation(e.to_string()))?;
                Some(hash_password(&password, self.bcrypt_cost)?)
            }
            None => None,
        };

        let update = UserUpdate {
            username,
            email,
            password_hash,
            profile: request.profile,
            ..Default::default()
        };
        self.apply_update(user_id, update).await
    }

    pub async fn update_membership(
        &self,
        user_id: Uuid,
        membership_expiration: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        let user = self
            .apply_update(
                user_id,
                UserUpdate {
                    membership_expiration: Some(membership_expiration),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, expires = %membership_expiration, "membership updated");
        Ok(user)
    }

    pub async fn set_approval(
        &self,
        user_id: Uuid,
        request: UpdateApprovalRequest,
    ) -> Result<User, AuthError> {
        if request.is_approved.is_none() && request.is_email_verified.is_none() {
            return Err(AuthError::Validation(
                "Provide is_approved or is_email_verified".to_string(),
            ));
        }

        self.apply_update(
            user_id,
            UserUpdate {
                is_approved: request.is_approved,
                is_email_verified: request.is_email_verified,
                ..Default::default()
            },
        )
        .await
    }

    /// Resolve a bearer token to a live user session
    pub async fn validate_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let claims = self.jwt_service.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        // Role and approval come from the current row, not the token
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(UserSession::from_user(&user, claims.jti))
    }

    // Private helper methods

    fn auth_response(&self, user: &User, message: Option<&str>) -> Result<AuthResponse, AuthError> {
        let token = self.jwt_service.create_token(user.id, user.role)?;

        Ok(AuthResponse {
            message: message.map(str::to_string),
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.expires_in_seconds(),
            user: UserInfo::from(user),
        })
    }

    /// Empty `email` or `username` skips that check
    async fn ensure_available(
        &self,
        email: &str,
        username: &str,
        current_user: Option<Uuid>,
    ) -> Result<(), AuthError> {
        let taken = |found: Option<User>| found.map_or(false, |u| Some(u.id) != current_user);

        if !email.is_empty() && taken(self.users.find_by_email(email).await?) {
            return Err(AuthError::UserAlreadyExists("Email"));
        }
        if !username.is_empty() && taken(self.users.find_by_username(username).await?) {
            return Err(AuthError::UserAlreadyExists("Username"));
        }
        Ok(())
    }

    async fn apply_update(&self, user_id: Uuid, update: UserUpdate) -> Result<User, AuthError> {
        self.users.update(user_id, update).await.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::UserNotFound,
            RepositoryError::AlreadyExists => AuthError::UserAlreadyExists("Email or username"),
            other => AuthError::Repository(other),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
