use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::video::Frame;

/// 打过分的帧；打分失败时 score 为 0 并附带失败原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFrame {
    #[serde(flatten)]
    pub frame: Frame,
    /// 0-100
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ScoredFrame {
    pub fn new(frame: Frame, score: u8, reason: Option<String>) -> Self {
        Self {
            frame,
            score: score.min(100),
            reason,
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.frame.timestamp
    }

    pub fn index(&self) -> u32 {
        self.frame.index
    }
}

/// 被选中展示的帧，展示顺序总是按时间升序
pub type Highlight = ScoredFrame;

/// 一次运行的元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "sourceName")]
    pub source_name: String,
}

impl RunMetadata {
    pub fn now(source_name: impl Into<String>) -> Self {
        Self {
            created_at: Utc::now(),
            source_name: source_name.into(),
        }
    }
}

/// 结果槽中保存的完整记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRecord {
    pub highlights: Vec<Highlight>,
    #[serde(flatten)]
    pub metadata: RunMetadata,
}

/// 从结果槽读回的数据；旧版只存数组，此时没有元数据
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResults {
    pub highlights: Vec<Highlight>,
    pub metadata: Option<RunMetadata>,
}

impl StoredResults {
    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }
}
