use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use super::{env_flag, env_or};

/// Object storage location; any S3-compatible endpoint works
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, GCS interop)
    pub endpoint: Option<String>,
    /// Prefix for public object URLs, without trailing slash
    pub public_base_url: String,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self> {
        let bucket = env::var("STORAGE_BUCKET").context("STORAGE_BUCKET must be set")?;
        let region = env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let endpoint = env::var("STORAGE_ENDPOINT").ok().filter(|e| !e.trim().is_empty());

        let public_base_url = env::var("STORAGE_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{bucket}.s3.{region}.amazonaws.com"));

        Ok(Self {
            bucket,
            region,
            endpoint,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Limits and toggles for the upload pipeline
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_upload_bytes: usize,
    pub transcode: bool,
    pub thumbnails: bool,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 500 * 1024 * 1024,
            transcode: true,
            thumbnails: true,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl UploadConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            transcode: env_flag("VIDEO_TRANSCODE", defaults.transcode),
            thumbnails: env_flag("VIDEO_THUMBNAILS", defaults.thumbnails),
            ffmpeg_path: env::var("FFMPEG_PATH").map(PathBuf::from).unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: env::var("FFPROBE_PATH").map(PathBuf::from).unwrap_or(defaults.ffprobe_path),
        }
    }
}
