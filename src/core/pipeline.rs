//! 高光提取流水线
//!
//! 校验 → 抽帧 → 逐帧打分 → 筛选 → 写入结果槽。
//! 只有校验失败和抽帧失败会终止运行；单帧打分失败记 0 分继续。

use log::{debug, info};

use crate::api::models::{Highlight, RunMetadata};
use crate::config::AppConfig;
use crate::core::error::HighlightError;
use crate::core::scoring::{build_scorer, score_all, Scorer};
use crate::core::selection::select;
use crate::core::store::ResultStore;
use crate::core::upload::{UploadValidator, VideoUpload};
use crate::core::video::{FfmpegOpener, FrameSampler, MediaOpener};

/// 进度回调：(百分比, 阶段说明)
pub type ProgressFn<'a> = &'a (dyn Fn(u8, &str) + Send + Sync);

pub const PROGRESS_LOADING: u8 = 10;
pub const PROGRESS_SAMPLED: u8 = 40;
pub const PROGRESS_SCORED: u8 = 80;
pub const PROGRESS_DONE: u8 = 100;

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub sampled: usize,
    pub failed_frames: usize,
    pub highlights: Vec<Highlight>,
    pub metadata: RunMetadata,
}

pub struct HighlightPipeline {
    config: AppConfig,
    validator: UploadValidator,
    sampler: FrameSampler,
    opener: Box<dyn MediaOpener>,
    scorer: Box<dyn Scorer>,
    store: ResultStore,
}

impl HighlightPipeline {
    /// 按配置装配：ffmpeg 抽帧、配置选定的打分策略、默认结果槽
    pub fn new(config: AppConfig) -> Result<Self, HighlightError> {
        config.validate()?;
        let opener = Box::new(FfmpegOpener::new(&config.sampling));
        let scorer = build_scorer(&config.scoring)?;
        let store = ResultStore::from_config(&config.store)?;
        Ok(Self::with_parts(config, opener, scorer, store))
    }

    pub fn with_parts(
        config: AppConfig,
        opener: Box<dyn MediaOpener>,
        scorer: Box<dyn Scorer>,
        store: ResultStore,
    ) -> Self {
        info!(
            "🎬 HighlightPipeline ready (scorer={}, selection={:?})",
            scorer.name(),
            config.selection
        );
        Self {
            validator: UploadValidator::new(&config.upload),
            sampler: FrameSampler::new(&config.sampling),
            config,
            opener,
            scorer,
            store,
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub async fn run(
        &self,
        upload: &VideoUpload,
        progress: ProgressFn<'_>,
    ) -> Result<RunSummary, HighlightError> {
        self.validator.validate(upload)?;
        progress(PROGRESS_LOADING, "Loading video...");

        let span = (PROGRESS_SAMPLED - PROGRESS_LOADING) as usize;
        let frames = self
            .sampler
            .sample_file(self.opener.as_ref(), &upload.path, &|done, total| {
                let pct = PROGRESS_LOADING as usize + span * done / total.max(1);
                progress(pct as u8, &format!("Extracting frames... {}/{}", done, total));
            })
            .await?;
        let sampled = frames.len();
        progress(PROGRESS_SAMPLED, "Analyzing frames with AI...");

        let span = (PROGRESS_SCORED - PROGRESS_SAMPLED) as usize;
        let outcome = score_all(self.scorer.as_ref(), frames, &|done, total| {
            let pct = PROGRESS_SAMPLED as usize + span * done / total.max(1);
            progress(pct as u8, &format!("Analyzing frame {}/{}", done, total));
        })
        .await;
        progress(PROGRESS_SCORED, "Selecting highlights...");

        let highlights = select(outcome.frames, self.config.selection);
        let metadata = RunMetadata::now(upload.name.clone());
        self.store.save(&highlights, &metadata)?;
        debug!(
            "Highlights at {:?}",
            highlights.iter().map(|h| h.timestamp()).collect::<Vec<_>>()
        );

        progress(PROGRESS_DONE, "Complete!");
        info!(
            "✅ {}: {} frames sampled, {} failed, {} highlights",
            upload.name,
            sampled,
            outcome.failed,
            highlights.len()
        );

        Ok(RunSummary {
            sampled,
            failed_frames: outcome.failed,
            highlights,
            metadata,
        })
    }
}

impl Drop for HighlightPipeline {
    fn drop(&mut self) {
        debug!("🗑️ HighlightPipeline released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingConfig;
    use crate::core::error::{MediaDecodeError, ValidationError};
    use crate::core::scoring::tests::MockScorer;
    use crate::core::scoring::{DemoScorer, FAILED_REASON};
    use crate::core::selection::SelectionPolicy;
    use crate::core::video::sampler::tests::FakeOpener;
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    fn config(selection: SelectionPolicy) -> AppConfig {
        AppConfig {
            sampling: SamplingConfig {
                interval_secs: 2.0,
                max_frames: 20,
                ..Default::default()
            },
            selection,
            ..Default::default()
        }
    }

    fn upload(mime: &str) -> VideoUpload {
        VideoUpload {
            path: PathBuf::from("session.mp4"),
            name: "session.mp4".to_string(),
            mime: mime.to_string(),
            size_bytes: 4 * 1024 * 1024,
        }
    }

    #[tokio::test]
    async fn test_demo_run_selects_top_three() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = HighlightPipeline::with_parts(
            config(SelectionPolicy::TopN { n: 3 }),
            Box::new(FakeOpener::new(10.0)),
            Box::new(DemoScorer::instant()),
            ResultStore::new(dir.path()),
        );

        let summary = pipeline.run(&upload("video/mp4"), &|_, _| {}).await.expect("run");

        assert_eq!(summary.sampled, 5);
        assert_eq!(summary.failed_frames, 0);
        assert_eq!(summary.highlights.len(), 3);
        let timestamps: Vec<f64> = summary.highlights.iter().map(|h| h.timestamp()).collect();
        let mut sorted = timestamps.clone();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(timestamps, sorted);
        for h in &summary.highlights {
            assert!((60..=100).contains(&h.score));
            assert!([0.0, 2.0, 4.0, 6.0, 8.0].contains(&h.timestamp()));
        }

        let stored = pipeline.store().load().expect("results saved");
        assert_eq!(stored.highlights, summary.highlights);
        assert_eq!(stored.metadata.unwrap().source_name, "session.mp4");
    }

    #[tokio::test]
    async fn test_unsupported_type_never_reaches_sampler() {
        let dir = tempfile::tempdir().unwrap();
        let opener = FakeOpener::new(10.0);
        let opened = opener.opened.clone();
        let pipeline = HighlightPipeline::with_parts(
            config(SelectionPolicy::default()),
            Box::new(opener),
            Box::new(DemoScorer::instant()),
            ResultStore::new(dir.path()),
        );

        let result = pipeline.run(&upload("image/png"), &|_, _| {}).await;

        assert!(matches!(
            result,
            Err(HighlightError::Validation(ValidationError::UnsupportedType { .. }))
        ));
        assert_eq!(opened.load(Ordering::SeqCst), 0);
        assert!(pipeline.store().load().is_none());
    }

    #[tokio::test]
    async fn test_failed_frame_scores_zero_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = HighlightPipeline::with_parts(
            config(SelectionPolicy::Threshold { threshold: 0 }),
            Box::new(FakeOpener::new(10.0)),
            Box::new(MockScorer::with_scores(vec![70, 75, 80, 85, 90]).failing_on(vec![2])),
            ResultStore::new(dir.path()),
        );

        let summary = pipeline.run(&upload("video/webm"), &|_, _| {}).await.expect("run");

        assert_eq!(summary.failed_frames, 1);
        assert_eq!(summary.highlights.len(), 5);
        let failed = &summary.highlights[2];
        assert_eq!(failed.index(), 2);
        assert_eq!(failed.score, 0);
        assert_eq!(failed.reason.as_deref(), Some(FAILED_REASON));
    }

    #[tokio::test]
    async fn test_sampling_failure_aborts_without_saving() {
        let dir = tempfile::tempdir().unwrap();
        let mut opener = FakeOpener::new(10.0);
        opener.fail_at = Some(6.0);
        let pipeline = HighlightPipeline::with_parts(
            config(SelectionPolicy::default()),
            Box::new(opener),
            Box::new(DemoScorer::instant()),
            ResultStore::new(dir.path()),
        );

        let result = pipeline.run(&upload("video/mp4"), &|_, _| {}).await;

        assert!(matches!(
            result,
            Err(HighlightError::MediaDecode(MediaDecodeError::Seek { .. }))
        ));
        assert!(pipeline.store().load().is_none());
    }

    #[tokio::test]
    async fn test_progress_milestones() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = HighlightPipeline::with_parts(
            config(SelectionPolicy::default()),
            Box::new(FakeOpener::new(4.0)),
            Box::new(DemoScorer::instant()),
            ResultStore::new(dir.path()),
        );
        let seen = Mutex::new(Vec::new());

        pipeline
            .run(&upload("video/quicktime"), &|pct, _| seen.lock().unwrap().push(pct))
            .await
            .expect("run");

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, vec![10, 25, 40, 40, 60, 80, 80, 100]);
    }

    #[test]
    fn test_new_requires_api_key_for_remote() {
        let mut config = AppConfig::default();
        config.scoring.provider = crate::config::ScoringProvider::Gemini;
        config.store.dir = Some(PathBuf::from("/tmp/unused"));
        assert!(matches!(
            HighlightPipeline::new(config),
            Err(HighlightError::Config(_))
        ));
    }
}
