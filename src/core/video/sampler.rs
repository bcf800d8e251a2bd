//! 定间隔抽帧
//!
//! 帧数 = min(floor(时长 / 间隔), 最大帧数)，第 i 帧位于 i * 间隔 秒。
//! 逐帧 seek → 等待 → 抓取，严格按顺序；任何一次失败都让整个抽帧失败。

use std::path::Path;

use async_trait::async_trait;
use image::DynamicImage;
use log::{debug, info};

use crate::config::SamplingConfig;
use crate::core::error::MediaDecodeError;
use crate::core::video::frame::{Frame, FrameImage};

/// 可 seek 的媒体源（一次抽帧会话内有效）
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// 秒
    async fn duration(&self) -> Result<f64, MediaDecodeError>;

    /// 抓取 `at_secs` 处渲染出的画面
    async fn capture(&self, at_secs: f64) -> Result<DynamicImage, MediaDecodeError>;
}

#[async_trait]
pub trait MediaOpener: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Box<dyn MediaSource>, MediaDecodeError>;
}

/// 计算抽帧数量
pub fn sample_count(
    duration_secs: f64,
    interval_secs: f64,
    max_frames: usize,
) -> Result<usize, MediaDecodeError> {
    if !interval_secs.is_finite() || interval_secs <= 0.0 {
        return Err(MediaDecodeError::InvalidInterval(interval_secs));
    }
    if !duration_secs.is_finite() || duration_secs < 0.0 {
        return Err(MediaDecodeError::InvalidDuration(duration_secs));
    }
    let available = (duration_secs / interval_secs).floor() as usize;
    Ok(available.min(max_frames))
}

pub struct FrameSampler {
    interval_secs: f64,
    max_frames: usize,
    max_dimension: u32,
    jpeg_quality: u8,
}

impl FrameSampler {
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            interval_secs: config.interval_secs,
            max_frames: config.max_frames,
            max_dimension: config.max_dimension,
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// 打开视频、抽帧，结束（成功或失败）时释放媒体源
    pub async fn sample_file(
        &self,
        opener: &dyn MediaOpener,
        path: &Path,
        on_progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> Result<Vec<Frame>, MediaDecodeError> {
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            return Err(MediaDecodeError::InvalidInterval(self.interval_secs));
        }
        let source = opener.open(path).await?;
        let result = self.sample(source.as_ref(), on_progress).await;
        drop(source);
        result
    }

    pub async fn sample(
        &self,
        source: &dyn MediaSource,
        on_progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> Result<Vec<Frame>, MediaDecodeError> {
        let duration = source.duration().await?;
        let total = sample_count(duration, self.interval_secs, self.max_frames)?;
        info!(
            "🎞️ Sampling {} frames (duration {:.2}s, every {}s, cap {})",
            total, duration, self.interval_secs, self.max_frames
        );

        let mut frames = Vec::with_capacity(total);
        for index in 0..total {
            let timestamp = index as f64 * self.interval_secs;
            let picture = source.capture(timestamp).await?;
            let image = FrameImage::from_dynamic(&picture, self.max_dimension, self.jpeg_quality)?;
            debug!(
                "   Frame {} @ {:.2}s: {}x{} ({} bytes)",
                index,
                timestamp,
                image.width,
                image.height,
                image.jpeg.len()
            );

            frames.push(Frame::new(index as u32, timestamp, image));
            on_progress(index + 1, total);
        }

        info!("✅ Sampled {} frames", frames.len());
        Ok(frames)
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(&SamplingConfig::default())
    }
}
