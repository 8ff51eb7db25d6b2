use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::{AppConfig, UploadConfig};
use crate::repositories::Repositories;
use crate::services::{ObjectStorage, ProgressService, VideoProcessor, VideoService, WorkoutService};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub workouts: WorkoutService,
    pub progress: ProgressService,
    pub videos: VideoService,
}

impl AppState {
    pub fn new(
        repositories: Repositories,
        storage: Arc<dyn ObjectStorage>,
        processor: Arc<dyn VideoProcessor>,
        config: &AppConfig,
        upload_config: UploadConfig,
    ) -> Self {
        Self {
            auth: AuthService::new(repositories.users.clone(), config),
            workouts: WorkoutService::new(repositories.workouts, repositories.users),
            progress: ProgressService::new(repositories.progress),
            videos: VideoService::new(repositories.videos, storage, processor, upload_config),
        }
    }
}
