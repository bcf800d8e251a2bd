//! 攀岩视频高光提取

use std::path::Path;

use log::info;

use crate::config::AppConfig;
use crate::core::error::HighlightError;
use crate::core::pipeline::{HighlightPipeline, ProgressFn, RunSummary};
use crate::core::render::{RenderReport, ResultRenderer};
use crate::core::store::{ResultStore, StoredResults};
use crate::core::upload::VideoUpload;

/// 高光提取器：上传 → 处理 → 查看结果
///
/// ```no_run
/// # async fn demo() -> Result<(), climb_light::core::HighlightError> {
/// use climb_light::api::HighlightProcessor;
/// use climb_light::config::AppConfig;
///
/// let processor = HighlightProcessor::create(AppConfig::demo())?;
/// processor
///     .process_upload("boulder.mp4".as_ref(), None, &|pct, msg| println!("{pct}% {msg}"))
///     .await?;
/// processor.render_results("climb-light-results".as_ref())?;
/// # Ok(())
/// # }
/// ```
pub struct HighlightProcessor {
    config: AppConfig,
    store: ResultStore,
}

impl HighlightProcessor {
    pub fn create(config: AppConfig) -> Result<Self, HighlightError> {
        config.validate()?;
        let store = ResultStore::from_config(&config.store)?;
        info!(
            "🎬 HighlightProcessor: created (provider={}, results={})",
            config.scoring.provider,
            store.path().display()
        );
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 处理一个本地视频文件，结果写入结果槽（覆盖上一次）
    ///
    /// 每次调用装配一条新的流水线，组件生命周期等于一次运行
    pub async fn process_upload(
        &self,
        path: &Path,
        mime: Option<&str>,
        progress: ProgressFn<'_>,
    ) -> Result<RunSummary, HighlightError> {
        let upload = VideoUpload::from_path(path, mime)?;
        let pipeline = HighlightPipeline::new(self.config.clone())?;
        pipeline.run(&upload, progress).await
    }

    /// 读取上一次的结果；没有结果时返回 `None`
    pub fn load_results(&self) -> Option<StoredResults> {
        self.store.load()
    }

    /// 渲染结果相册到 `out_dir`
    pub fn render_results(&self, out_dir: &Path) -> Result<RenderReport, HighlightError> {
        let results = self.load_results();
        let renderer = ResultRenderer::new(&self.config.decoration, out_dir);
        Ok(renderer.render(results.as_ref())?)
    }

    pub fn clear_results(&self) -> Result<(), HighlightError> {
        Ok(self.store.clear()?)
    }
}

impl Drop for HighlightProcessor {
    fn drop(&mut self) {
        info!("🗑️ HighlightProcessor: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{RunMetadata, ScoredFrame};
    use crate::core::error::ValidationError;
    use crate::core::scoring::tests::test_frames;

    fn processor(dir: &Path) -> HighlightProcessor {
        let mut config = AppConfig::demo();
        config.store.dir = Some(dir.to_path_buf());
        HighlightProcessor::create(config).expect("processor")
    }

    #[tokio::test]
    async fn test_rejects_non_video_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, b"beta: left hand crimp").unwrap();

        let processor = processor(dir.path());
        let result = processor.process_upload(&notes, None, &|_, _| {}).await;

        assert!(matches!(
            result,
            Err(HighlightError::Validation(ValidationError::UnsupportedType { .. }))
        ));
        assert!(processor.load_results().is_none());
    }

    #[test]
    fn test_load_render_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path());
        let highlights: Vec<_> = test_frames(2, 2.0)
            .into_iter()
            .map(|f| ScoredFrame::new(f, 88, Some("Big move".to_string())))
            .collect();
        ResultStore::new(dir.path())
            .save(&highlights, &RunMetadata::now("crag.mov"))
            .unwrap();

        let loaded = processor.load_results().expect("results");
        assert_eq!(loaded.highlights.len(), 2);

        let out = dir.path().join("gallery");
        let report = processor.render_results(&out).expect("render");
        assert_eq!(report.cards, 2);
        assert!(out.join("index.html").exists());

        processor.clear_results().unwrap();
        assert!(processor.load_results().is_none());

        let report = processor.render_results(&out).expect("empty render");
        assert_eq!(report.cards, 0);
    }

    #[test]
    fn test_create_rejects_bad_interval() {
        let mut config = AppConfig::demo();
        config.sampling.interval_secs = -2.0;
        assert!(matches!(
            HighlightProcessor::create(config),
            Err(HighlightError::Config(_))
        ));
    }
}
