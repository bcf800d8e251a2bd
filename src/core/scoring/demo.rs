//! Demo 打分：模拟延迟后给出 60-99 的随机分数和一句随机理由，不访问网络

use std::ops::Range;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::{FrameScore, Scorer};
use crate::core::error::ScoringError;
use crate::core::video::FrameImage;

pub const DEMO_SCORE_RANGE: Range<u8> = 60..100;

pub const DEMO_REASONS: [&str; 6] = [
    "Dynamic movement detected",
    "Challenging hold achieved",
    "Impressive technique shown",
    "Peak moment captured",
    "Exciting sequence found",
    "Great form displayed",
];

pub struct DemoScorer {
    delay: Duration,
}

impl DemoScorer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    fn roll(&self) -> FrameScore {
        let mut rng = rand::rng();
        let score = rng.random_range(DEMO_SCORE_RANGE);
        let reason = DEMO_REASONS
            .choose(&mut rng)
            .copied()
            .unwrap_or(DEMO_REASONS[0]);
        FrameScore::new(score, reason)
    }
}

impl Default for DemoScorer {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

#[async_trait]
impl Scorer for DemoScorer {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn score(&self, _image: &FrameImage) -> Result<FrameScore, ScoringError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = self.roll();
        debug!("🎲 Demo score: {}", result.score);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn blank() -> FrameImage {
        FrameImage::from_dynamic(&DynamicImage::ImageRgb8(RgbImage::new(8, 8)), 640, 80)
            .expect("encode")
    }

    #[tokio::test]
    async fn test_demo_scores_in_range_with_reason() {
        let scorer = DemoScorer::instant();
        let image = blank();

        for _ in 0..50 {
            let result = scorer.score(&image).await.expect("demo never fails");
            assert!((60..=100).contains(&result.score), "score {}", result.score);
            let reason = result.reason.expect("demo attaches a reason");
            assert!(DEMO_REASONS.contains(&reason.as_str()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_waits_before_answering() {
        let scorer = DemoScorer::new(Duration::from_millis(1500));
        let started = tokio::time::Instant::now();
        scorer.score(&blank()).await.expect("demo never fails");
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }
}
