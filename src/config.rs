//! 运行配置
//!
//! 所有组件在构造时接收显式的配置值，配置来源：
//! 1. 内置默认值（与网页版一致：demo 模式、2 秒抽一帧、最多 20 帧）
//! 2. 可选的 JSON5 配置文件
//! 3. 环境变量覆盖（`CLIMB_LIGHT_API_KEY`、`CLIMB_LIGHT_PROVIDER`）

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::selection::SelectionPolicy;

pub const ENV_API_KEY: &str = "CLIMB_LIGHT_API_KEY";
pub const ENV_PROVIDER: &str = "CLIMB_LIGHT_PROVIDER";

const DEFAULT_PROMPT: &str = "You are an expert at analyzing climbing videos. \
Analyze this frame and rate how likely it is a highlight moment (0-100). \
Consider: dynamic movement, challenging holds, impressive technique, reaching summits, falls, celebrations. \
Respond with ONLY a JSON object: {\"score\": <0-100>, \"reason\": \"<one short sentence>\"}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法读取配置文件 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("配置文件解析失败: {0}")]
    Parse(String),
    #[error("unknown scoring provider: {0}")]
    UnknownProvider(String),
    #[error("provider `{0}` needs an API key (set CLIMB_LIGHT_API_KEY or scoring.api_key)")]
    MissingApiKey(ScoringProvider),
    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("invalid sampling interval: {0}")]
    InvalidInterval(f64),
    #[error("invalid decoration setting `{field}`: {reason}")]
    InvalidDecoration { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scoring: ScoringConfig,
    pub sampling: SamplingConfig,
    pub selection: SelectionPolicy,
    pub upload: UploadConfig,
    pub decoration: DecorationConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// 无需凭证的演示配置
    pub fn demo() -> Self {
        Self::default()
    }

    /// 指定外部 AI 提供方与凭证
    pub fn for_provider(provider: ScoringProvider, api_key: impl Into<String>) -> Self {
        Self {
            scoring: ScoringConfig {
                provider,
                api_key: Some(api_key.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// 加载配置：文件（可选）+ 环境变量覆盖
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!(
            "⚙️ Config loaded: provider={}, interval={}s, max_frames={}, selection={:?}",
            config.scoring.provider,
            config.sampling.interval_secs,
            config.sampling.max_frames,
            config.selection
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("📖 Reading config file: {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json5(&raw)
    }

    pub fn from_json5(raw: &str) -> Result<Self, ConfigError> {
        json5::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 用环境变量覆盖凭证与提供方，`lookup` 便于测试注入
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup(ENV_PROVIDER).filter(|v| !v.trim().is_empty()) {
            self.scoring.provider = provider.parse()?;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.scoring.api_key = Some(key);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.sampling.interval_secs;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(ConfigError::InvalidInterval(interval));
        }
        self.decoration.validate()
    }
}

impl DecorationConfig {
    /// 范围端点必须是有限值；缩放必须为正。端点顺序不限
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (s0, s1) = self.scale_range;
        if !(s0.is_finite() && s1.is_finite()) || s0 <= 0.0 || s1 <= 0.0 {
            return Err(ConfigError::InvalidDecoration {
                field: "scale_range",
                reason: format!("expected two positive numbers, got ({}, {})", s0, s1),
            });
        }
        let (r0, r1) = self.rotation_range;
        if !(r0.is_finite() && r1.is_finite()) {
            return Err(ConfigError::InvalidDecoration {
                field: "rotation_range",
                reason: format!("expected two finite angles, got ({}, {})", r0, r1),
            });
        }
        Ok(())
    }
}

/// 打分策略（封闭集合，配置时选定一次）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringProvider {
    /// 无网络的伪随机打分
    #[default]
    Demo,
    /// OpenAI chat-completions 视觉接口
    #[serde(rename = "openai")]
    OpenAi,
    /// Google Gemini generateContent 接口
    Gemini,
}

impl ScoringProvider {
    pub fn default_endpoint(&self, model: &str) -> Option<String> {
        match self {
            ScoringProvider::Demo => None,
            ScoringProvider::OpenAi => {
                Some("https://api.openai.com/v1/chat/completions".to_string())
            }
            ScoringProvider::Gemini => Some(format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                model
            )),
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ScoringProvider::Demo => "demo",
            ScoringProvider::OpenAi => "gpt-4o-mini",
            ScoringProvider::Gemini => "gemini-1.5-flash",
        }
    }
}

impl fmt::Display for ScoringProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoringProvider::Demo => "demo",
            ScoringProvider::OpenAi => "openai",
            ScoringProvider::Gemini => "gemini",
        };
        f.write_str(name)
    }
}

impl FromStr for ScoringProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(ScoringProvider::Demo),
            "openai" => Ok(ScoringProvider::OpenAi),
            "gemini" => Ok(ScoringProvider::Gemini),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub provider: ScoringProvider,
    pub api_key: Option<String>,
    /// 留空时使用提供方默认地址
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub prompt: String,
    pub timeout_secs: u64,
    /// demo 模式每帧的模拟延迟
    pub demo_delay_ms: u64,
}

impl ScoringConfig {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn endpoint(&self) -> Option<String> {
        self.endpoint
            .clone()
            .or_else(|| self.provider.default_endpoint(&self.model()))
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            provider: ScoringProvider::Demo,
            api_key: None,
            endpoint: None,
            model: None,
            prompt: DEFAULT_PROMPT.to_string(),
            timeout_secs: 60,
            demo_delay_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_secs: f64,
    pub max_frames: usize,
    /// 抽出帧的最长边上限（像素）
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2.0,
            max_frames: 20,
            max_dimension: 640,
            jpeg_quality: 80,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_size_mb: u64,
    pub accepted_types: Vec<String>,
}

impl UploadConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_mb: 500,
            accepted_types: vec![
                "video/mp4".to_string(),
                "video/quicktime".to_string(),
                "video/x-msvideo".to_string(),
                "video/webm".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationConfig {
    pub enabled: bool,
    /// 每张高光图的贴纸数量
    pub count: usize,
    pub random_rotation: bool,
    pub random_scale: bool,
    pub scale_range: (f32, f32),
    /// 旋转角度范围（度）
    pub rotation_range: (f32, f32),
    pub margin: u32,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 3,
            random_rotation: true,
            random_scale: true,
            scale_range: (0.8, 1.2),
            rotation_range: (-15.0, 15.0),
            margin: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 结果槽所在目录，留空时使用系统本地数据目录
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_web_version() {
        let config = AppConfig::default();
        assert_eq!(config.scoring.provider, ScoringProvider::Demo);
        assert_eq!(config.sampling.interval_secs, 2.0);
        assert_eq!(config.sampling.max_frames, 20);
        assert_eq!(config.sampling.max_dimension, 640);
        assert_eq!(config.upload.max_size_mb, 500);
        assert_eq!(config.upload.accepted_types.len(), 4);
        assert_eq!(config.selection, SelectionPolicy::TopN { n: 5 });
        assert_eq!(config.decoration.count, 3);
    }

    #[test]
    fn test_parse_json5_config() {
        let raw = r#"{
            // comments and trailing commas are fine
            scoring: { provider: 'gemini', api_key: 'abc', },
            sampling: { interval_secs: 1.5, max_frames: 8 },
            selection: { policy: 'threshold', threshold: 70 },
            decoration: { enabled: false },
        }"#;

        let config = AppConfig::from_json5(raw).expect("config should parse");
        assert_eq!(config.scoring.provider, ScoringProvider::Gemini);
        assert_eq!(config.scoring.api_key.as_deref(), Some("abc"));
        assert_eq!(config.sampling.interval_secs, 1.5);
        assert_eq!(config.sampling.max_frames, 8);
        assert_eq!(config.sampling.max_dimension, 640);
        assert_eq!(config.selection, SelectionPolicy::Threshold { threshold: 70 });
        assert!(!config.decoration.enabled);
        assert_eq!(config.decoration.count, 3);
    }

    #[test]
    fn test_invalid_config_is_parse_error() {
        let result = AppConfig::from_json5("{ scoring: { provider: 'skynet' } }");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_PROVIDER, "OpenAI"), (ENV_API_KEY, "sk-test")]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .expect("overrides should apply");

        assert_eq!(config.scoring.provider, ScoringProvider::OpenAi);
        assert_eq!(config.scoring.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_unknown_provider_override() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| {
            (key == ENV_PROVIDER).then(|| "clippy".to_string())
        });
        assert!(matches!(result, Err(ConfigError::UnknownProvider(_))));
    }

    #[test]
    fn test_provider_endpoints() {
        let mut scoring = ScoringConfig {
            provider: ScoringProvider::Gemini,
            ..Default::default()
        };
        assert_eq!(
            scoring.endpoint().as_deref(),
            Some("https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent")
        );

        scoring.endpoint = Some("http://localhost:9000/score".to_string());
        assert_eq!(scoring.endpoint().as_deref(), Some("http://localhost:9000/score"));

        assert_eq!(ScoringConfig::default().endpoint(), None);
    }

    #[test]
    fn test_non_finite_decoration_rejected() {
        let config = AppConfig::from_json5("{ decoration: { scale_range: [0.8, Infinity] } }")
            .expect("json5 accepts Infinity");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDecoration { field: "scale_range", .. })
        ));

        let mut config = AppConfig::default();
        config.decoration.rotation_range = (f32::NAN, 15.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDecoration { field: "rotation_range", .. })
        ));
    }

    #[test]
    fn test_reversed_decoration_ranges_allowed() {
        let config =
            AppConfig::from_json5("{ decoration: { rotation_range: [15, -15], scale_range: [1.2, 0.8] } }")
                .expect("config");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = AppConfig::default();
        config.sampling.interval_secs = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval(_))
        ));
    }
}
