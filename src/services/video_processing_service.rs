use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::UploadConfig;

/// Frame used for generated thumbnails, in seconds
pub const THUMBNAIL_AT_SECONDS: f64 = 1.0;

/// Video tooling used by the upload pipeline
#[async_trait]
pub trait VideoProcessor: Send + Sync {
    /// Rewrap into an MP4 container without re-encoding
    async fn remux_to_mp4(&self, input: &Path, output: &Path) -> Result<()>;
    /// Full re-encode to H.264/AAC MP4
    async fn transcode_to_mp4(&self, input: &Path, output: &Path) -> Result<()>;
    async fn extract_thumbnail(&self, input: &Path, output: &Path, at_seconds: f64) -> Result<()>;
    async fn probe(&self, input: &Path) -> Result<VideoInfo>;
}

/// FFmpeg/FFprobe command line tools
#[derive(Debug, Clone)]
pub struct FfmpegVideoProcessor {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FfmpegVideoProcessor {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
        }
    }

    async fn run_ffmpeg<I, S>(&self, args: I, action: &str) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error"])
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to execute ffmpeg for {action}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!("FFmpeg {action} failed: {}", stderr.trim()));
        }
        Ok(())
    }
}

#[async_trait]
impl VideoProcessor for FfmpegVideoProcessor {
    async fn remux_to_mp4(&self, input: &Path, output: &Path) -> Result<()> {
        info!("Remuxing video to MP4: {:?} -> {:?}", input, output);

        self.run_ffmpeg(
            [
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-c"),
                OsStr::new("copy"),
                OsStr::new("-movflags"),
                OsStr::new("+faststart"), // Enable streaming
                OsStr::new("-y"),
                output.as_os_str(),
            ],
            "remux",
        )
        .await
    }

    async fn transcode_to_mp4(&self, input: &Path, output: &Path) -> Result<()> {
        info!("Converting video to MP4: {:?} -> {:?}", input, output);

        self.run_ffmpeg(
            [
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-c:v"),
                OsStr::new("libx264"),
                OsStr::new("-preset"),
                OsStr::new("medium"),
                OsStr::new("-crf"),
                OsStr::new("23"),
                OsStr::new("-c:a"),
                OsStr::new("aac"),
                OsStr::new("-b:a"),
                OsStr::new("128k"),
                OsStr::new("-movflags"),
                OsStr::new("+faststart"),
                OsStr::new("-y"),
                output.as_os_str(),
            ],
            "transcode",
        )
        .await
    }

    async fn extract_thumbnail(&self, input: &Path, output: &Path, at_seconds: f64) -> Result<()> {
        info!("Generating thumbnail at {}s from {:?}", at_seconds, input);

        let timestamp = format!("{at_seconds:.3}");
        self.run_ffmpeg(
            [
                OsStr::new("-ss"),
                OsStr::new(&timestamp),
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-vframes"),
                OsStr::new("1"),
                OsStr::new("-vf"),
                OsStr::new("scale=1280:-2"),
                OsStr::new("-q:v"),
                OsStr::new("2"), // JPEG quality
                OsStr::new("-y"),
                output.as_os_str(),
            ],
            "thumbnail",
        )
        .await
    }

    async fn probe(&self, input: &Path) -> Result<VideoInfo> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,duration,codec_name,r_frame_rate",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(input)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!("FFprobe failed: {}", stderr.trim()));
        }

        parse_ffprobe_output(&output.stdout)
    }
}

/// Basic stream facts reported by ffprobe
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoInfo {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_seconds: Option<f64>,
    pub video_codec: Option<String>,
    pub fps: Option<f64>,
}

impl VideoInfo {
    /// Whole seconds, rounded to nearest
    pub fn duration_whole_seconds(&self) -> Option<i32> {
        self.duration_seconds
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as i32)
    }
}

// FFprobe JSON output structures
#[derive(Debug, serde::Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, serde::Deserialize)]
struct FfprobeStream {
    width: Option<i32>,
    height: Option<i32>,
    duration: Option<String>,
    codec_name: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

fn parse_ffprobe_output(stdout: &[u8]) -> Result<VideoInfo> {
    let parsed: FfprobeOutput =
        serde_json::from_slice(stdout).context("Failed to parse ffprobe output")?;

    let stream = parsed.streams.into_iter().next();
    let format_duration = parsed.format.and_then(|f| f.duration);

    let duration_seconds = stream
        .as_ref()
        .and_then(|s| s.duration.clone())
        .or(format_duration)
        .and_then(|d| d.parse::<f64>().ok());

    Ok(VideoInfo {
        width: stream.as_ref().and_then(|s| s.width),
        height: stream.as_ref().and_then(|s| s.height),
        duration_seconds,
        video_codec: stream.as_ref().and_then(|s| s.codec_name.clone()),
        fps: stream
            .as_ref()
            .and_then(|s| s.r_frame_rate.as_deref())
            .and_then(parse_frame_rate),
    })
}

/// Parse frame rate string (e.g., "30/1" -> 30.0)
fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let (num, den) = rate_str.split_once('/')?;
    let (n, d) = (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?);
    (d != 0.0).then(|| n / d)
}

/// Bytes ready for storage, plus whatever processing produced
#[derive(Debug, Clone)]
pub struct PreparedVideo {
    pub data: Bytes,
    pub content_type: String,
    pub file_name: String,
    pub duration_seconds: Option<i32>,
    pub thumbnail: Option<Bytes>,
    pub converted: bool,
}

/// Best-effort processing of an uploaded video.
///
/// Conversion tries a remux first and falls back to a re-encode; when both fail the
/// original bytes are kept. A failed thumbnail or probe leaves that field empty. Only
/// scratch-file I/O errors are returned.
pub async fn prepare_video(
    processor: &dyn VideoProcessor,
    options: &UploadConfig,
    data: Bytes,
    file_name: &str,
    content_type: &str,
) -> Result<PreparedVideo> {
    let mut prepared = PreparedVideo {
        data,
        content_type: content_type.to_string(),
        file_name: file_name.to_string(),
        duration_seconds: None,
        thumbnail: None,
        converted: false,
    };

    if !options.transcode && !options.thumbnails {
        return Ok(prepared);
    }

    let workdir = tempfile::tempdir().context("Failed to create scratch directory")?;
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    let input_path = workdir.path().join(format!("input.{extension}"));
    tokio::fs::write(&input_path, &prepared.data)
        .await
        .context("Failed to write upload to scratch file")?;

    let mut current_path = input_path.clone();

    if options.transcode {
        let output_path = workdir.path().join("output.mp4");
        if convert_to_mp4(processor, &input_path, &output_path).await {
            prepared.data = Bytes::from(
                tokio::fs::read(&output_path)
                    .await
                    .context("Failed to read converted video")?,
            );
            prepared.content_type = "video/mp4".to_string();
            prepared.file_name = with_mp4_extension(file_name);
            prepared.converted = true;
            current_path = output_path;
        }
    }

    let probed = match processor.probe(&current_path).await {
        Ok(info) => {
            info!(
                codec = info.video_codec.as_deref().unwrap_or("unknown"),
                fps = info.fps.unwrap_or_default(),
                "probed video"
            );
            Some(info)
        }
        Err(err) => {
            warn!(error = %err, "could not probe video duration");
            None
        }
    };
    let duration = probed.as_ref().and_then(|info| info.duration_seconds);
    prepared.duration_seconds = probed.as_ref().and_then(VideoInfo::duration_whole_seconds);

    if options.thumbnails {
        // Short clips have no frame at 1s
        let at = match duration {
            Some(d) if d < THUMBNAIL_AT_SECONDS => 0.0,
            _ => THUMBNAIL_AT_SECONDS,
        };
        let thumb_path = workdir.path().join("thumb.jpg");
        match processor.extract_thumbnail(&current_path, &thumb_path, at).await {
            Ok(()) => match tokio::fs::read(&thumb_path).await {
                Ok(bytes) if !bytes.is_empty() => prepared.thumbnail = Some(Bytes::from(bytes)),
                Ok(_) => warn!("thumbnail extraction produced an empty file"),
                Err(err) => warn!(error = %err, "could not read generated thumbnail"),
            },
            Err(err) => warn!(error = %err, "thumbnail extraction failed, storing video without one"),
        }
    }

    Ok(prepared)
}

async fn convert_to_mp4(processor: &dyn VideoProcessor, input: &Path, output: &Path) -> bool {
    match processor.remux_to_mp4(input, output).await {
        Ok(()) => return true,
        Err(err) => warn!(error = %err, "remux failed, falling back to re-encode"),
    }

    match processor.transcode_to_mp4(input, output).await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "re-encode failed, uploading original file");
            false
        }
    }
}

fn with_mp4_extension(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(OsStr::to_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("video");
    format!("{stem}.mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("60/1"), Some(60.0));
        assert_eq!(parse_frame_rate("24000/1001"), Some(23.976023976023978));
        assert_eq!(parse_frame_rate("30/0"), None);
        assert_eq!(parse_frame_rate("invalid"), None);
    }

    #[test]
    fn test_parse_ffprobe_output_prefers_stream_duration() {
        let json = br#"{
            "streams": [{"width": 1920, "height": 1080, "duration": "12.48",
                         "codec_name": "h264", "r_frame_rate": "30/1"}],
            "format": {"duration": "12.60"}
        }"#;

        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.width, Some(1920));
        assert_eq!(info.duration_seconds, Some(12.48));
        assert_eq!(info.duration_whole_seconds(), Some(12));
        assert_eq!(info.fps, Some(30.0));
    }

    #[test]
    fn test_parse_ffprobe_output_falls_back_to_format_duration() {
        let json = br#"{"streams": [], "format": {"duration": "61.7"}}"#;

        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.video_codec, None);
        assert_eq!(info.duration_whole_seconds(), Some(62));
    }

    #[test]
    fn test_with_mp4_extension() {
        assert_eq!(with_mp4_extension("squat.MOV"), "squat.mp4");
        assert_eq!(with_mp4_extension("clip"), "clip.mp4");
        assert_eq!(with_mp4_extension(".mov"), ".mp4");
    }
}
