// Business logic services

pub mod maintenance_service;
pub mod progress_service;
pub mod video_processing_service;
pub mod video_service;
pub mod video_storage_service;
pub mod workout_service;

pub use maintenance_service::{MaintenanceService, ThumbnailSummary, UrlFixSummary};
pub use progress_service::ProgressService;
pub use video_processing_service::{FfmpegVideoProcessor, VideoProcessor};
pub use video_service::{ensure_publisher, VideoService, VideoUpload};
pub use video_storage_service::{ObjectStorage, S3ObjectStorage};
pub use workout_service::WorkoutService;
