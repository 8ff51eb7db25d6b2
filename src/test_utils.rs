//! In-memory stand-ins for the repositories, object storage and ffmpeg,
//! shared by unit tests and the router tests under `tests/`.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::auth::{UserRole, UserSession};
use crate::models::{
    DateRange, ExerciseVideo, MetricTimestamps, NewExerciseVideo, NewProgress, NewUser, NewWorkout,
    PageRequest, Progress, ProgressUpdate, User, UserUpdate, VideoUpdate, Workout, WorkoutUpdate,
};
use crate::repositories::{
    ProgressRepository, RepositoryError, RepositoryResult, UserRepository, VideoRepository,
    WorkoutRepository,
};
use crate::services::video_processing_service::{VideoInfo, VideoProcessor};
use crate::services::video_storage_service::{public_object_url, ObjectStorage};

pub const TEST_BUCKET: &str = "liftlog-test";
pub const TEST_STORAGE_URL: &str = "https://storage.test";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn page_of<T>(rows: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect();
    (rows, total)
}

/// A session as the auth middleware would build it, for a user that needs no row
pub fn session_for(role: UserRole, is_approved: bool) -> UserSession {
    UserSession {
        user_id: Uuid::new_v4(),
        username: format!("{}-{}", role.as_str(), &Uuid::new_v4().simple().to_string()[..8]),
        role,
        is_approved,
        jti: String::new(),
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn clashes(users: &[User], id: Option<Uuid>, email: Option<&str>, username: Option<&str>) -> bool {
        users.iter().filter(|u| Some(u.id) != id).any(|u| {
            email.map_or(false, |e| u.email == e) || username.map_or(false, |n| u.username == n)
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let mut users = lock(&self.users);
        if Self::clashes(&users, None, Some(&user.email), Some(&user.username)) {
            return Err(RepositoryError::AlreadyExists);
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            membership_start: user.membership_start,
            membership_expiration: user.membership_expiration,
            is_email_verified: user.is_email_verified,
            is_approved: user.is_approved,
            first_name: user.profile.first_name,
            last_name: user.profile.last_name,
            age: user.profile.age,
            weight: user.profile.weight,
            height: user.profile.height,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(lock(&self.users).iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(lock(&self.users).iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        Ok(lock(&self.users).iter().find(|u| u.username == username).cloned())
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> RepositoryResult<User> {
        let mut users = lock(&self.users);
        if Self::clashes(&users, Some(id), update.email.as_deref(), update.username.as_deref()) {
            return Err(RepositoryError::AlreadyExists);
        }
        let user = users.iter_mut().find(|u| u.id == id).ok_or(RepositoryError::NotFound)?;
        user.apply(update, Utc::now());
        Ok(user.clone())
    }

    async fn list_active_trainers(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<User>> {
        let mut trainers: Vec<User> = lock(&self.users)
            .iter()
            .filter(|u| u.role == UserRole::Trainer && u.is_membership_active(now))
            .cloned()
            .collect();
        trainers.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(trainers)
    }
}

#[derive(Default)]
pub struct InMemoryWorkoutRepository {
    workouts: Mutex<Vec<Workout>>,
}

impl InMemoryWorkoutRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkoutRepository for InMemoryWorkoutRepository {
    async fn create(&self, workout: NewWorkout) -> RepositoryResult<Workout> {
        let now = Utc::now();
        let created = Workout {
            id: Uuid::new_v4(),
            user_id: workout.user_id,
            trainer_id: workout.trainer_id,
            date: workout.date,
            title: workout.title,
            exercises: Json(workout.exercises),
            duration_minutes: workout.duration_minutes,
            calories_burned: workout.calories_burned,
            intensity: workout.intensity,
            notes: workout.notes,
            is_public: workout.is_public,
            created_at: now,
            updated_at: now,
        };
        lock(&self.workouts).push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Workout>> {
        Ok(lock(&self.workouts).iter().find(|w| w.id == id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        range: DateRange,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<Workout>, i64)> {
        let mut rows: Vec<Workout> = lock(&self.workouts)
            .iter()
            .filter(|w| w.user_id == user_id && range.contains(w.date))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(page_of(rows, page))
    }

    async fn list_public_by_trainer(
        &self,
        trainer_id: Uuid,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<Workout>, i64)> {
        let mut rows: Vec<Workout> = lock(&self.workouts)
            .iter()
            .rev()
            .filter(|w| w.trainer_id == Some(trainer_id) && w.is_public)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page_of(rows, page))
    }

    async fn update(&self, id: Uuid, update: WorkoutUpdate) -> RepositoryResult<Workout> {
        let mut workouts = lock(&self.workouts);
        let workout = workouts.iter_mut().find(|w| w.id == id).ok_or(RepositoryError::NotFound)?;
        workout.apply(update, Utc::now());
        Ok(workout.clone())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut workouts = lock(&self.workouts);
        let before = workouts.len();
        workouts.retain(|w| w.id != id);
        if workouts.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProgressRepository {
    entries: Mutex<Vec<Progress>>,
}

impl InMemoryProgressRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressRepository {
    async fn create(&self, entry: NewProgress) -> RepositoryResult<Progress> {
        let now = Utc::now();
        let created = Progress {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            bmi: entry.bmi,
            calories_intake: entry.calories_intake,
            calorie_deficit: entry.calorie_deficit,
            weight: entry.weight,
            body_fat_percentage: entry.body_fat_percentage,
            muscle_mass: entry.muscle_mass,
            last_bmi_update: entry.last_bmi_update,
            last_calories_update: entry.last_calories_update,
            date: entry.date,
            created_at: now,
            updated_at: now,
        };
        lock(&self.entries).push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Progress>> {
        Ok(lock(&self.entries).iter().find(|p| p.id == id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        range: DateRange,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<Progress>, i64)> {
        let mut rows: Vec<Progress> = lock(&self.entries)
            .iter()
            .filter(|p| p.user_id == user_id && range.contains(p.date))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(page_of(rows, page))
    }

    async fn latest_update_times(&self, user_id: Uuid) -> RepositoryResult<MetricTimestamps> {
        let entries = lock(&self.entries);
        let mine = entries.iter().filter(|p| p.user_id == user_id);
        Ok(MetricTimestamps {
            last_bmi_update: mine.clone().filter_map(|p| p.last_bmi_update).max(),
            last_calories_update: mine.filter_map(|p| p.last_calories_update).max(),
        })
    }

    async fn update(&self, id: Uuid, update: ProgressUpdate) -> RepositoryResult<Progress> {
        let mut entries = lock(&self.entries);
        let entry = entries.iter_mut().find(|p| p.id == id).ok_or(RepositoryError::NotFound)?;
        entry.apply(update, Utc::now());
        Ok(entry.clone())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|p| p.id != id);
        if entries.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryVideoRepository {
    videos: Mutex<Vec<ExerciseVideo>>,
    fail_inserts: Mutex<bool>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `create` fail as a lost connection would
    pub fn fail_inserts(&self, fail: bool) {
        *lock(&self.fail_inserts) = fail;
    }

    /// Newest first, insertion order breaking ties
    fn newest_first(&self, keep: impl Fn(&ExerciseVideo) -> bool) -> Vec<ExerciseVideo> {
        let mut rows: Vec<ExerciseVideo> = lock(&self.videos).iter().rev().filter(|v| keep(*v)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn create(&self, video: NewExerciseVideo) -> RepositoryResult<ExerciseVideo> {
        if *lock(&self.fail_inserts) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        let now = Utc::now();
        let created = ExerciseVideo {
            id: Uuid::new_v4(),
            trainer_id: video.trainer_id,
            title: video.title,
            description: video.description,
            video_path: video.video_path,
            video_url: video.video_url,
            thumbnail_path: video.thumbnail_path,
            thumbnail_url: video.thumbnail_url,
            exercise_type: video.exercise_type,
            difficulty: video.difficulty,
            duration_seconds: video.duration_seconds,
            tags: video.tags,
            is_public: video.is_public,
            status: video.status,
            created_at: now,
            updated_at: now,
        };
        lock(&self.videos).push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<ExerciseVideo>> {
        Ok(lock(&self.videos).iter().find(|v| v.id == id).cloned())
    }

    async fn list_public(&self, page: PageRequest) -> RepositoryResult<(Vec<ExerciseVideo>, i64)> {
        Ok(page_of(self.newest_first(|v| v.is_public), page))
    }

    async fn list_by_trainer(
        &self,
        trainer_id: Uuid,
        page: PageRequest,
    ) -> RepositoryResult<(Vec<ExerciseVideo>, i64)> {
        Ok(page_of(self.newest_first(|v| v.trainer_id == trainer_id), page))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<ExerciseVideo>> {
        Ok(lock(&self.videos).clone())
    }

    async fn list_missing_thumbnails(&self) -> RepositoryResult<Vec<ExerciseVideo>> {
        Ok(lock(&self.videos).iter().filter(|v| !v.has_thumbnail()).cloned().collect())
    }

    async fn update(&self, id: Uuid, update: VideoUpdate) -> RepositoryResult<ExerciseVideo> {
        let mut videos = lock(&self.videos);
        let video = videos.iter_mut().find(|v| v.id == id).ok_or(RepositoryError::NotFound)?;
        video.apply(update, Utc::now());
        Ok(video.clone())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut videos = lock(&self.videos);
        let before = videos.len();
        videos.retain(|v| v.id != id);
        if videos.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
struct StorageFaults {
    put_prefixes: Vec<String>,
    deletes: bool,
}

/// Bucket held in a map, with switches to make puts or deletes fail
#[derive(Default)]
pub struct InMemoryObjectStorage {
    objects: Mutex<BTreeMap<String, (Bytes, String)>>,
    deleted: Mutex<Vec<String>>,
    faults: Mutex<StorageFaults>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    /// Keys removed through `delete_object`, in call order
    pub fn deleted_keys(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        lock(&self.objects).get(key).map(|(data, _)| data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        lock(&self.objects).get(key).map(|(_, content_type)| content_type.clone())
    }

    /// Seed an object as if a client had uploaded it directly
    pub fn insert(&self, key: &str, data: Bytes) {
        lock(&self.objects).insert(key.to_string(), (data, "application/octet-stream".to_string()));
    }

    pub fn fail_puts_with_prefix(&self, prefix: &str) {
        lock(&self.faults).put_prefixes.push(prefix.to_string());
    }

    pub fn fail_deletes(&self, fail: bool) {
        lock(&self.faults).deletes = fail;
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        if lock(&self.faults).put_prefixes.iter().any(|p| key.starts_with(p.as_str())) {
            bail!("Failed to upload {key}: injected failure");
        }
        lock(&self.objects).insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.object(key)
            .map(|data| data.to_vec())
            .ok_or_else(|| anyhow!("Object {key} not found"))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        if lock(&self.faults).deletes {
            bail!("Failed to delete {key}: injected failure");
        }
        lock(&self.objects).remove(key);
        lock(&self.deleted).push(key.to_string());
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        Ok(lock(&self.objects).contains_key(key))
    }

    async fn presign_upload(&self, key: &str, content_type: &str, expires_in: Duration) -> Result<String> {
        Ok(format!(
            "{}?X-Amz-Expires={}&content-type={}",
            self.public_url(key),
            expires_in.as_secs(),
            urlencoding::encode(content_type)
        ))
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(TEST_STORAGE_URL, key)
    }

    fn bucket(&self) -> &str {
        TEST_BUCKET
    }
}

/// Stands in for ffmpeg: conversion copies bytes, thumbnails are a fixed JPEG stub
#[derive(Debug, Default, Clone)]
pub struct FakeVideoProcessor {
    failing: bool,
    calls: std::sync::Arc<Mutex<HashSet<&'static str>>>,
}

impl FakeVideoProcessor {
    pub const DURATION_SECONDS: f64 = 42.0;
    pub const THUMBNAIL: &'static [u8] = b"\xFF\xD8\xFF\xE0thumbnail";

    /// Every operation errors, as when ffmpeg is not installed
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn was_called(&self, operation: &str) -> bool {
        lock(&self.calls).contains(operation)
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        lock(&self.calls).insert(operation);
        if self.failing {
            bail!("{operation} failed: ffmpeg not available");
        }
        Ok(())
    }
}

#[async_trait]
impl VideoProcessor for FakeVideoProcessor {
    async fn remux_to_mp4(&self, input: &Path, output: &Path) -> Result<()> {
        self.record("remux")?;
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn transcode_to_mp4(&self, input: &Path, output: &Path) -> Result<()> {
        self.record("transcode")?;
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn extract_thumbnail(&self, input: &Path, output: &Path, _at_seconds: f64) -> Result<()> {
        self.record("thumbnail")?;
        if !tokio::fs::try_exists(input).await? {
            bail!("input {} missing", input.display());
        }
        tokio::fs::write(output, Self::THUMBNAIL).await?;
        Ok(())
    }

    async fn probe(&self, _input: &Path) -> Result<VideoInfo> {
        self.record("probe")?;
        Ok(VideoInfo {
            width: Some(1920),
            height: Some(1080),
            duration_seconds: Some(Self::DURATION_SECONDS),
            video_codec: Some("h264".to_string()),
            fps: Some(30.0),
        })
    }
}
