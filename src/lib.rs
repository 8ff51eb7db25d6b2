pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod test_utils;

pub use error::{AppError, Result};
