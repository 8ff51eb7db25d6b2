use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "exercise_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Strength,
    Cardio,
    Flexibility,
    Bodyweight,
    Weightlifting,
}

impl FromStr for ExerciseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strength" => Ok(ExerciseType::Strength),
            "cardio" => Ok(ExerciseType::Cardio),
            "flexibility" => Ok(ExerciseType::Flexibility),
            "bodyweight" => Ok(ExerciseType::Bodyweight),
            "weightlifting" => Ok(ExerciseType::Weightlifting),
            _ => Err(format!("Unknown exercise type: {s}")),
        }
    }
}

impl Default for ExerciseType {
    fn default() -> Self {
        ExerciseType::Strength
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "video_difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(format!("Unknown difficulty: {s}")),
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Beginner
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "video_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Processing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExerciseVideo {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub title: String,
    pub description: String,
    pub video_path: String,
    pub video_url: String,
    pub thumbnail_path: Option<String>,
    pub thumbnail_url: Option<String>,
    pub exercise_type: ExerciseType,
    pub difficulty: Difficulty,
    pub duration_seconds: Option<i32>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExerciseVideo {
    pub fn is_owned_by(&self, trainer_id: Uuid) -> bool {
        self.trainer_id == trainer_id
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail_url.as_deref().map_or(false, |url| !url.is_empty())
    }

    /// Storage keys this row points at
    pub fn storage_keys(&self) -> Vec<String> {
        let mut keys = vec![self.video_path.clone()];
        if let Some(thumb) = self.thumbnail_path.as_ref().filter(|p| !p.is_empty()) {
            keys.push(thumb.clone());
        }
        keys
    }

    pub fn apply(&mut self, update: VideoUpdate, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(exercise_type) = update.exercise_type {
            self.exercise_type = exercise_type;
        }
        if let Some(difficulty) = update.difficulty {
            self.difficulty = difficulty;
        }
        if update.duration_seconds.is_some() {
            self.duration_seconds = update.duration_seconds;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(is_public) = update.is_public {
            self.is_public = is_public;
        }
        if let Some(url) = update.video_url {
            self.video_url = url;
        }
        if update.thumbnail_path.is_some() {
            self.thumbnail_path = update.thumbnail_path;
        }
        if update.thumbnail_url.is_some() {
            self.thumbnail_url = update.thumbnail_url;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = now;
    }
}

/// Descriptive fields supplied alongside an upload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct VideoDetails {
    #[validate(length(min = 1, message = "title required"))]
    pub title: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub exercise_type: Option<ExerciseType>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_public: Option<bool>,
}

impl VideoDetails {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.map(|d| d.trim().to_string());
        self.tags = normalize_tags(self.tags);
        self
    }
}

/// Body of `POST /api/videos/complete` for objects uploaded through a presigned URL
#[derive(Debug, Deserialize)]
pub struct CompleteUploadRequest {
    pub path: String,
    #[serde(flatten)]
    pub details: VideoDetails,
}

#[derive(Debug, Deserialize)]
pub struct PresignRequest {
    #[serde(alias = "fileName", alias = "filename")]
    pub file_name: String,
    #[serde(alias = "contentType")]
    pub content_type: String,
    /// Seconds; defaults to 600, capped at 3600
    #[serde(alias = "expiresIn")]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PresignResponse {
    pub url: String,
    pub key: String,
    pub public_url: String,
    pub expires_in: u64,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateVideoRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub exercise_type: Option<ExerciseType>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_seconds: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl UpdateVideoRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self.description = self.description.map(|d| d.trim().to_string());
        self.tags = self.tags.map(normalize_tags);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewExerciseVideo {
    pub trainer_id: Uuid,
    pub title: String,
    pub description: String,
    pub video_path: String,
    pub video_url: String,
    pub thumbnail_path: Option<String>,
    pub thumbnail_url: Option<String>,
    pub exercise_type: ExerciseType,
    pub difficulty: Difficulty,
    pub duration_seconds: Option<i32>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub status: VideoStatus,
}

#[derive(Debug, Clone, Default)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub exercise_type: Option<ExerciseType>,
    pub difficulty: Option<Difficulty>,
    pub duration_seconds: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub video_url: Option<String>,
    pub thumbnail_path: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: Option<VideoStatus>,
}

impl From<UpdateVideoRequest> for VideoUpdate {
    fn from(request: UpdateVideoRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            exercise_type: request.exercise_type,
            difficulty: request.difficulty,
            duration_seconds: request.duration_seconds,
            tags: request.tags,
            is_public: request.is_public,
            ..Default::default()
        }
    }
}

/// Trim tags and drop empty ones; accepts entries that are themselves comma separated
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.iter()
        .flat_map(|tag| tag.split(','))
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
