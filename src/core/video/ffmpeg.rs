//! ffprobe / ffmpeg 媒体源
//!
//! 时长用 ffprobe 读取，每次抽帧启动一个 ffmpeg 子进程 seek 到指定时间点，
//! 把单帧以 PNG 写到 stdout 再解码。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::DynamicImage;
use log::{debug, info};
use serde::Deserialize;
use tokio::process::Command;

use crate::config::SamplingConfig;
use crate::core::error::MediaDecodeError;
use crate::core::video::sampler::{MediaOpener, MediaSource};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// 读取 ffprobe 的时长：优先容器时长，其次第一个视频流
fn parse_probe_duration(stdout: &str) -> Result<f64, MediaDecodeError> {
    let probe: ProbeOutput = serde_json::from_str(stdout)
        .map_err(|e| MediaDecodeError::Probe(format!("invalid ffprobe output: {}", e)))?;

    let from_format = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());

    let from_stream = || {
        probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .and_then(|s| s.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok())
    };

    let has_video = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("video"));
    if !has_video {
        return Err(MediaDecodeError::Probe("no video stream found".to_string()));
    }

    match from_format.or_else(from_stream) {
        Some(duration) if duration.is_finite() && duration >= 0.0 => Ok(duration),
        Some(duration) => Err(MediaDecodeError::InvalidDuration(duration)),
        None => Err(MediaDecodeError::InvalidDuration(f64::NAN)),
    }
}

/// 一次抽帧会话内有效的 ffmpeg 媒体源
pub struct FfmpegSource {
    path: PathBuf,
    ffmpeg_bin: String,
    duration: f64,
}

impl FfmpegSource {
    pub async fn open(
        path: &Path,
        ffmpeg_bin: &str,
        ffprobe_bin: &str,
    ) -> Result<Self, MediaDecodeError> {
        info!("🎬 FfmpegSource: probing {}", path.display());

        let output = Command::new(ffprobe_bin)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_entries",
                "format=duration:stream=codec_type,duration",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MediaDecodeError::ToolUnavailable {
                tool: ffprobe_bin.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaDecodeError::Probe(format!(
                "ffprobe exited with {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let duration = parse_probe_duration(&String::from_utf8_lossy(&output.stdout))?;
        info!("📊 Video duration: {:.2}s", duration);

        Ok(Self {
            path: path.to_path_buf(),
            ffmpeg_bin: ffmpeg_bin.to_string(),
            duration,
        })
    }
}

#[async_trait]
impl MediaSource for FfmpegSource {
    async fn duration(&self) -> Result<f64, MediaDecodeError> {
        Ok(self.duration)
    }

    async fn capture(&self, at_secs: f64) -> Result<DynamicImage, MediaDecodeError> {
        debug!("⏩ Seeking to {:.3}s", at_secs);

        let output = Command::new(&self.ffmpeg_bin)
            .args(["-v", "error", "-ss", &format!("{:.3}", at_secs), "-i"])
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-c:v", "png", "-"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MediaDecodeError::ToolUnavailable {
                tool: self.ffmpeg_bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaDecodeError::Seek {
                at: at_secs,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(MediaDecodeError::Seek {
                at: at_secs,
                reason: "no frame at this position".to_string(),
            });
        }

        Ok(image::load_from_memory(&output.stdout)?)
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        info!("🗑️ FfmpegSource: released {}", self.path.display());
    }
}

/// 按配置的可执行文件路径打开 [`FfmpegSource`]
#[derive(Debug, Clone)]
pub struct FfmpegOpener {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FfmpegOpener {
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            ffprobe_bin: config.ffprobe_bin.clone(),
        }
    }
}

impl Default for FfmpegOpener {
    fn default() -> Self {
        Self::new(&SamplingConfig::default())
    }
}

#[async_trait]
impl MediaOpener for FfmpegOpener {
    async fn open(&self, path: &Path) -> Result<Box<dyn MediaSource>, MediaDecodeError> {
        let source = FfmpegSource::open(path, &self.ffmpeg_bin, &self.ffprobe_bin).await?;
        Ok(Box::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_prefers_format_duration() {
        let stdout = r#"{
            "streams": [{"codec_type": "video", "duration": "9.500000"}],
            "format": {"duration": "10.010000"}
        }"#;
        let duration = parse_probe_duration(stdout).expect("duration");
        assert!((duration - 10.01).abs() < 1e-9);
    }

    #[test]
    fn test_probe_falls_back_to_stream_duration() {
        let stdout = r#"{
            "streams": [
                {"codec_type": "audio", "duration": "30.0"},
                {"codec_type": "video", "duration": "12.5"}
            ],
            "format": {}
        }"#;
        assert_eq!(parse_probe_duration(stdout).expect("duration"), 12.5);
    }

    #[test]
    fn test_probe_without_video_stream() {
        let stdout = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        assert!(matches!(
            parse_probe_duration(stdout),
            Err(MediaDecodeError::Probe(_))
        ));
    }

    #[test]
    fn test_probe_missing_duration() {
        let stdout = r#"{"streams": [{"codec_type": "video"}], "format": {"duration": "N/A"}}"#;
        assert!(matches!(
            parse_probe_duration(stdout),
            Err(MediaDecodeError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_probe_garbage_output() {
        assert!(matches!(
            parse_probe_duration("not json"),
            Err(MediaDecodeError::Probe(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_decode_error() {
        let result = FfmpegSource::open(
            Path::new("clip.mp4"),
            "ffmpeg-that-does-not-exist",
            "ffprobe-that-does-not-exist",
        )
        .await;
        assert!(matches!(
            result,
            Err(MediaDecodeError::ToolUnavailable { .. })
        ));
    }
}
