//! 上传校验：类型、大小不符时直接拒绝，不做任何处理

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::UploadConfig;
use crate::core::error::ValidationError;

const OCTET_STREAM: &str = "application/octet-stream";

/// 待处理的视频
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
    pub size_bytes: u64,
}

impl VideoUpload {
    /// 从本地文件构造；未显式给出 MIME 时按扩展名推断
    pub fn from_path(path: &Path, mime: Option<&str>) -> Result<Self, ValidationError> {
        let size_bytes = std::fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime
            .map(|m| m.trim().to_ascii_lowercase())
            .or_else(|| mime_from_path(path).map(str::to_string))
            .unwrap_or_else(|| OCTET_STREAM.to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            mime,
            size_bytes,
        })
    }
}

pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "mov" | "qt" => Some("video/quicktime"),
        "avi" => Some("video/x-msvideo"),
        "webm" => Some("video/webm"),
        "mkv" => Some("video/x-matroska"),
        _ => None,
    }
}

pub struct UploadValidator {
    accepted_types: Vec<String>,
    max_size_bytes: u64,
    max_size_mb: u64,
}

impl UploadValidator {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            accepted_types: config
                .accepted_types
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            max_size_bytes: config.max_size_bytes(),
            max_size_mb: config.max_size_mb,
        }
    }

    pub fn validate(&self, upload: &VideoUpload) -> Result<(), ValidationError> {
        if !self.accepted_types.iter().any(|t| *t == upload.mime) {
            warn!("⛔ Rejected {}: unsupported type {}", upload.name, upload.mime);
            return Err(ValidationError::UnsupportedType {
                mime: upload.mime.clone(),
                accepted: self.accepted_types.join(", "),
            });
        }

        if upload.size_bytes > self.max_size_bytes {
            warn!(
                "⛔ Rejected {}: {} bytes exceeds {} MB",
                upload.name, upload.size_bytes, self.max_size_mb
            );
            return Err(ValidationError::TooLarge {
                size_mb: upload.size_bytes as f64 / (1024.0 * 1024.0),
                limit_mb: self.max_size_mb,
            });
        }

        info!(
            "📥 Accepted {} ({}, {:.1} MB)",
            upload.name,
            upload.mime,
            upload.size_bytes as f64 / (1024.0 * 1024.0)
        );
        Ok(())
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(&UploadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn upload(mime: &str, size_bytes: u64) -> VideoUpload {
        VideoUpload {
            path: PathBuf::from("climb.mp4"),
            name: "climb.mp4".to_string(),
            mime: mime.to_string(),
            size_bytes,
        }
    }

    #[test]
    fn test_accepts_supported_types() {
        let validator = UploadValidator::default();
        for mime in ["video/mp4", "video/quicktime", "video/x-msvideo", "video/webm"] {
            assert!(validator.validate(&upload(mime, 1024)).is_ok(), "{}", mime);
        }
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let validator = UploadValidator::default();
        let err = validator
            .validate(&upload("image/gif", 1024))
            .expect_err("gif should be rejected");

        match err {
            ValidationError::UnsupportedType { mime, accepted } => {
                assert_eq!(mime, "image/gif");
                assert!(accepted.contains("video/mp4"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let validator = UploadValidator::new(&UploadConfig {
            max_size_mb: 1,
            ..Default::default()
        });

        assert!(validator.validate(&upload("video/mp4", 1024 * 1024)).is_ok());
        let err = validator
            .validate(&upload("video/mp4", 1024 * 1024 + 1))
            .expect_err("too large");
        assert!(matches!(err, ValidationError::TooLarge { limit_mb: 1, .. }));
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_path(Path::new("a/b/Climb.MP4")), Some("video/mp4"));
        assert_eq!(mime_from_path(Path::new("send.mov")), Some("video/quicktime"));
        assert_eq!(mime_from_path(Path::new("old.avi")), Some("video/x-msvideo"));
        assert_eq!(mime_from_path(Path::new("web.webm")), Some("video/webm"));
        assert_eq!(mime_from_path(Path::new("notes.txt")), None);
        assert_eq!(mime_from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_from_path_reads_size_and_mime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("boulder.webm");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(&[0u8; 2048]).expect("write");

        let upload = VideoUpload::from_path(&path, None).expect("upload");
        assert_eq!(upload.name, "boulder.webm");
        assert_eq!(upload.mime, "video/webm");
        assert_eq!(upload.size_bytes, 2048);

        let overridden = VideoUpload::from_path(&path, Some("Video/MP4")).expect("upload");
        assert_eq!(overridden.mime, "video/mp4");
    }

    #[test]
    fn test_unknown_extension_is_rejected_by_validator() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("route.txt");
        std::fs::write(&path, b"not a video").expect("write");

        let upload = VideoUpload::from_path(&path, None).expect("upload");
        assert_eq!(upload.mime, OCTET_STREAM);
        assert!(matches!(
            UploadValidator::default().validate(&upload),
            Err(ValidationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = VideoUpload::from_path(Path::new("/definitely/not/here.mp4"), None);
        assert!(matches!(result, Err(ValidationError::Io(_))));
    }
}
