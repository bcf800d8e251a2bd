//! 解析模型返回的文本
//!
//! 顺序：去掉 ``` 代码块标记 → 按宽松 JSON (JSON5) 解析 `{score, reason}`
//! → 取文本中第一个数字 → 都失败则记 0 分并附带诊断原因。永不报错。

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::FrameScore;

pub const DEFAULT_REASON: &str = "AI-detected highlight";
pub const BARE_SCORE_REASON: &str = "Highlight analysis complete";
pub const UNPARSABLE_REASON: &str = "Could not read a score from the AI response";

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("valid fence regex"));
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number regex"));

#[derive(Debug, Deserialize)]
struct ScorePayload {
    score: Value,
    #[serde(default, alias = "rationale")]
    reason: Option<String>,
}

/// 结构化解析的结果
enum Structured {
    Scored(FrameScore),
    /// 有 `score` 字段但值不可用；不再从文本里找数字
    InvalidScore,
    Absent,
}

pub fn parse_score_text(raw: &str) -> FrameScore {
    let cleaned = strip_fences(raw);

    match parse_structured(&cleaned) {
        Structured::Scored(parsed) => return parsed,
        Structured::InvalidScore => {
            warn!("⚠️ Scoring payload has an unusable score: {:?}", truncate(raw, 120));
            return FrameScore::new(0, UNPARSABLE_REASON);
        }
        Structured::Absent => {}
    }

    if let Some(score) = first_number(&cleaned) {
        return FrameScore::new(score, BARE_SCORE_REASON);
    }

    warn!("⚠️ Unparsable scoring response: {:?}", truncate(raw, 120));
    FrameScore::new(0, UNPARSABLE_REASON)
}

fn strip_fences(raw: &str) -> String {
    FENCE.replace_all(raw, "").trim().to_string()
}

fn parse_structured(text: &str) -> Structured {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Structured::Absent;
    };
    if end <= start {
        return Structured::Absent;
    }

    let Ok(payload) = json5::from_str::<ScorePayload>(&text[start..=end]) else {
        return Structured::Absent;
    };
    let score = match &payload.score {
        Value::Number(n) => n.as_f64().and_then(clamp_score),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(clamp_score),
        _ => None,
    };
    let Some(score) = score else {
        return Structured::InvalidScore;
    };

    let reason = payload
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_REASON.to_string());

    Structured::Scored(FrameScore::new(score, reason))
}

fn first_number(text: &str) -> Option<u8> {
    NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(clamp_score)
}

fn clamp_score(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 100.0) as u8)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
