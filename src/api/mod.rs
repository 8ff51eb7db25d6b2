// API routes and handlers

pub mod auth;
pub mod health;
pub mod presign;
pub mod progress;
pub mod routes;
pub mod state;
pub mod videos;
pub mod workouts;

pub use routes::create_routes;
pub use state::AppState;

use axum::extract::{Path, Query};
use axum::Json;
use axum_extra::extract::WithRejection;

use crate::auth::UserRole;
use crate::error::AppError;

/// Extractors whose rejections render as `AppError`
pub(crate) type JsonBody<T> = WithRejection<Json<T>, AppError>;
pub(crate) type PathParam<T> = WithRejection<Path<T>, AppError>;
pub(crate) type QueryParams<T> = WithRejection<Query<T>, AppError>;

pub(crate) const ADMINS: &[UserRole] = &[UserRole::Admin];
pub(crate) const MEMBERS_AND_TRAINERS: &[UserRole] = &[UserRole::Member, UserRole::Trainer];
pub(crate) const TRAINERS_AND_ADMINS: &[UserRole] = &[UserRole::Trainer, UserRole::Admin];
