//! 高光打分
//!
//! 两种可互换的策略（外部 AI / demo）实现同一个 [`Scorer`]，由配置一次性选定。
//! 逐帧顺序调用，同一时刻最多一个外部请求；单帧失败记 0 分后继续。

pub mod demo;
pub mod parser;
pub mod remote;

use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};

use crate::api::models::ScoredFrame;
use crate::config::{ConfigError, ScoringConfig, ScoringProvider};
use crate::core::error::ScoringError;
use crate::core::video::{Frame, FrameImage};

pub use demo::DemoScorer;
pub use parser::parse_score_text;
pub use remote::{RemoteDialect, RemoteScorer};

pub const FAILED_REASON: &str = "Analysis failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameScore {
    /// 0-100
    pub score: u8,
    pub reason: Option<String>,
}

impl FrameScore {
    pub fn new(score: u8, reason: impl Into<String>) -> Self {
        Self {
            score: score.min(100),
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(&self, image: &FrameImage) -> Result<FrameScore, ScoringError>;
}

/// 按配置选择打分策略
pub fn build_scorer(config: &ScoringConfig) -> Result<Box<dyn Scorer>, ConfigError> {
    match config.provider {
        ScoringProvider::Demo => Ok(Box::new(DemoScorer::new(Duration::from_millis(
            config.demo_delay_ms,
        )))),
        ScoringProvider::OpenAi | ScoringProvider::Gemini => {
            Ok(Box::new(RemoteScorer::from_config(config)?))
        }
    }
}

/// 打分结果汇总
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    pub frames: Vec<ScoredFrame>,
    pub failed: usize,
}

/// 逐帧顺序打分，失败的帧记 0 分并保留
pub async fn score_all(
    scorer: &dyn Scorer,
    frames: Vec<Frame>,
    on_progress: &(dyn Fn(usize, usize) + Send + Sync),
) -> ScoringOutcome {
    let total = frames.len();
    info!("🤖 Scoring {} frames with `{}`", total, scorer.name());

    let mut scored = Vec::with_capacity(total);
    let mut failed = 0;

    for (i, frame) in frames.into_iter().enumerate() {
        let entry = match scorer.score(&frame.image).await {
            Ok(result) => ScoredFrame::new(frame, result.score, result.reason),
            Err(e) => {
                error!("❌ Frame {} scoring failed: {}", frame.index, e);
                failed += 1;
                ScoredFrame::new(frame, 0, Some(FAILED_REASON.to_string()))
            }
        };
        scored.push(entry);
        on_progress(i + 1, total);
    }

    info!(
        "🎯 Scored {} frames ({} failed), scores: {:?}",
        scored.len(),
        failed,
        scored.iter().map(|f| f.score).collect::<Vec<_>>()
    );

    ScoringOutcome {
        frames: scored,
        failed,
    }
}
