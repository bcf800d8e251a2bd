//! 结果槽：本地单个 JSON 文件
//!
//! 写入先落到同目录的临时文件再 rename，读者只会看到旧值或新值。
//! 槽不存在或无法解析时 `load` 返回 `None`（视为"还没有结果"）。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::api::models::{Highlight, HighlightRecord, RunMetadata};
use crate::config::StoreConfig;

pub use crate::api::models::StoredResults;

pub const SLOT_FILE: &str = "climbLightResults.json";
const APP_DIR: &str = "climb-light";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("结果槽读写失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("结果序列化失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no local data directory available; set store.dir in the config")]
    NoDataDir,
}

/// 槽里可能出现的两种形状
#[derive(Deserialize)]
#[serde(untagged)]
enum SlotContents {
    Record(HighlightRecord),
    Legacy(Vec<Highlight>),
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    /// 在指定目录下使用默认槽文件名
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SLOT_FILE),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let dir = match &config.dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .ok_or(StoreError::NoDataDir)?
                .join(APP_DIR),
        };
        Ok(Self::new(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, highlights: &[Highlight], metadata: &RunMetadata) -> Result<(), StoreError> {
        let record = HighlightRecord {
            highlights: highlights.to_vec(),
            metadata: metadata.clone(),
        };
        let bytes = serde_json::to_vec(&record)?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| self.io_error(dir, source))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).map_err(|source| self.io_error(&tmp, source))?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_error(&self.path, source));
        }

        info!(
            "💾 Saved {} highlights ({} KB) to {}",
            highlights.len(),
            bytes.len() / 1024,
            self.path.display()
        );
        Ok(())
    }

    pub fn load(&self) -> Option<StoredResults> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("📭 No stored results at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("⚠️ Cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<SlotContents>(&raw) {
            Ok(SlotContents::Record(record)) => Some(StoredResults {
                highlights: record.highlights,
                metadata: Some(record.metadata),
            }),
            Ok(SlotContents::Legacy(highlights)) => {
                debug!("📦 Loaded legacy result array");
                Some(StoredResults {
                    highlights,
                    metadata: None,
                })
            }
            Err(e) => {
                warn!("⚠️ Ignoring unreadable results in {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// 删除结果槽；槽不存在时也算成功
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("🧹 Cleared {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(&self.path, source)),
        }
    }

    fn io_error(&self, path: &Path, source: io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
