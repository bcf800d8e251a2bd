//! 高光筛选
//!
//! 两种策略：分数阈值 / 取前 N 名。输出总是按时间戳升序。

use std::cmp::Ordering;

use log::info;
use serde::{Deserialize, Serialize};

use crate::api::models::{Highlight, ScoredFrame};

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_THRESHOLD: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// 保留所有 score >= threshold 的帧
    Threshold {
        #[serde(default = "default_threshold")]
        threshold: u8,
    },
    /// 按分数降序取前 n 个，同分时更早的帧优先
    TopN {
        #[serde(default = "default_top_n")]
        n: usize,
    },
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::TopN { n: DEFAULT_TOP_N }
    }
}

pub fn select(frames: Vec<ScoredFrame>, policy: SelectionPolicy) -> Vec<Highlight> {
    let total = frames.len();

    let mut picked: Vec<Highlight> = match policy {
        SelectionPolicy::Threshold { threshold } => frames
            .into_iter()
            .filter(|f| f.score >= threshold)
            .collect(),
        SelectionPolicy::TopN { n } => {
            let mut ranked = frames;
            ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| chronological(a, b)));
            ranked.truncate(n);
            ranked
        }
    };

    picked.sort_by(chronological);

    info!(
        "✨ Selected {}/{} frames with {:?}",
        picked.len(),
        total,
        policy
    );
    picked
}

fn chronological(a: &ScoredFrame, b: &ScoredFrame) -> Ordering {
    a.timestamp()
        .total_cmp(&b.timestamp())
        .then_with(|| a.index().cmp(&b.index()))
}
