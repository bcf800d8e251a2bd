use thiserror::Error;

/// 上传校验失败：在任何处理开始前拒绝
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Unsupported video type `{mime}`. Please upload one of: {accepted}")]
    UnsupportedType { mime: String, accepted: String },
    #[error("Video is too large ({size_mb:.1} MB). The limit is {limit_mb} MB")]
    TooLarge { size_mb: f64, limit_mb: u64 },
    #[error("Cannot read the uploaded video: {0}")]
    Io(#[from] std::io::Error),
}

/// 抽帧失败：整个运行终止，不返回部分结果
#[derive(Debug, Error)]
pub enum MediaDecodeError {
    #[error("media tool `{tool}` could not be started: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("probing the video failed: {0}")]
    Probe(String),
    #[error("video duration is unknown or invalid: {0}")]
    InvalidDuration(f64),
    #[error("sampling interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f64),
    #[error("seeking to {at:.3}s failed: {reason}")]
    Seek { at: f64, reason: String },
    #[error("frame decode/encode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// 单帧打分失败：在本地吞掉，该帧记 0 分继续
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response has no answer text: {0}")]
    EmptyAnswer(String),
}

/// 会终止一次运行的错误
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Could not process the video, please try again ({0})")]
    MediaDecode(#[from] MediaDecodeError),
    #[error("saving results failed: {0}")]
    Store(#[from] crate::core::store::StoreError),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("rendering results failed: {0}")]
    Render(#[from] crate::core::render::RenderError),
}
