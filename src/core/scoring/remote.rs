//! 外部视觉模型打分
//!
//! 支持两种接口格式：OpenAI chat-completions（Bearer 鉴权）和
//! Gemini generateContent（`?key=` 鉴权）。每帧一次 POST。

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::parser::parse_score_text;
use super::{FrameScore, Scorer};
use crate::config::{ConfigError, ScoringConfig, ScoringProvider};
use crate::core::error::ScoringError;
use crate::core::video::frame::JPEG_MIME;
use crate::core::video::FrameImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteDialect {
    OpenAi,
    Gemini,
}

// ---- OpenAI ----

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ChatContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatContent {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatAnswer,
}

#[derive(Debug, Deserialize)]
struct ChatAnswer {
    #[serde(default)]
    content: Option<String>,
}

// ---- Gemini ----

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

pub struct RemoteScorer {
    client: Client,
    dialect: RemoteDialect,
    endpoint: String,
    model: String,
    api_key: String,
    prompt: String,
}

impl RemoteScorer {
    pub fn from_config(config: &ScoringConfig) -> Result<Self, ConfigError> {
        let dialect = match config.provider {
            ScoringProvider::OpenAi => RemoteDialect::OpenAi,
            ScoringProvider::Gemini => RemoteDialect::Gemini,
            ScoringProvider::Demo => {
                return Err(ConfigError::UnknownProvider(
                    "demo is not a remote provider".to_string(),
                ))
            }
        };

        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey(config.provider))?;

        let endpoint = config
            .endpoint()
            .ok_or_else(|| ConfigError::UnknownProvider(config.provider.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        info!(
            "🌐 RemoteScorer: {} model={} endpoint={}",
            config.provider,
            config.model(),
            endpoint
        );

        Ok(Self {
            client,
            dialect,
            endpoint,
            model: config.model(),
            api_key,
            prompt: config.prompt.clone(),
        })
    }

    fn openai_body(&self, image: &FrameImage) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ChatContent::Text {
                        text: self.prompt.clone(),
                    },
                    ChatContent::ImageUrl {
                        image_url: ImageUrl {
                            url: image.to_data_url(),
                        },
                    },
                ],
            }],
            max_tokens: 100,
        }
    }

    fn gemini_body(&self, image: &FrameImage) -> GenerateRequest {
        GenerateRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text {
                        text: self.prompt.clone(),
                    },
                    GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: JPEG_MIME,
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
        }
    }

    async fn request_answer(&self, image: &FrameImage) -> Result<String, ScoringError> {
        let request = match self.dialect {
            RemoteDialect::OpenAi => self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&self.openai_body(image)),
            RemoteDialect::Gemini => self
                .client
                .post(&self.endpoint)
                .query(&[("key", self.api_key.as_str())])
                .json(&self.gemini_body(image)),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        extract_answer(self.dialect, &body)
    }
}

/// 从响应 JSON 中取出模型回答的文本
fn extract_answer(dialect: RemoteDialect, body: &str) -> Result<String, ScoringError> {
    let answer = match dialect {
        RemoteDialect::OpenAi => serde_json::from_str::<ChatResponse>(body)
            .ok()
            .and_then(|r| r.choices.into_iter().next())
            .and_then(|c| c.message.content),
        RemoteDialect::Gemini => serde_json::from_str::<GenerateResponse>(body)
            .ok()
            .and_then(|r| r.candidates.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text)),
    };

    answer
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ScoringError::EmptyAnswer(body.chars().take(200).collect()))
}

#[async_trait]
impl Scorer for RemoteScorer {
    fn name(&self) -> &'static str {
        match self.dialect {
            RemoteDialect::OpenAi => "openai",
            RemoteDialect::Gemini => "gemini",
        }
    }

    async fn score(&self, image: &FrameImage) -> Result<FrameScore, ScoringError> {
        let answer = self.request_answer(image).await?;
        debug!("💬 Model answer: {}", answer);
        Ok(parse_score_text(&answer))
    }
}
