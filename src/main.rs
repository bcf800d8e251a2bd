use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use climb_light::api::HighlightProcessor;
use climb_light::config::AppConfig;
use climb_light::core::render::format_timestamp;
use climb_light::init_logging;

/// 从攀岩视频中找出高光时刻
#[derive(Parser)]
#[command(name = "climb-light", version)]
struct Cli {
    /// JSON5 配置文件
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 处理视频并保存高光结果
    Process {
        video: PathBuf,
        /// 覆盖按扩展名推断的 MIME 类型
        #[arg(long)]
        mime: Option<String>,
    },
    /// 把保存的结果渲染成 HTML 相册
    Render {
        #[arg(long, default_value = "climb-light-results")]
        out: PathBuf,
    },
    /// 清除保存的结果
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let processor = HighlightProcessor::create(config)?;

    match cli.command {
        Commands::Process { video, mime } => {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{bar:40.yellow/blue} {pos:>3}% {msg}")?,
            );

            let result = processor
                .process_upload(&video, mime.as_deref(), &|pct, msg| {
                    bar.set_position(pct as u64);
                    bar.set_message(msg.to_string());
                })
                .await;
            bar.finish_and_clear();
            let summary =
                result.with_context(|| format!("processing {}", video.display()))?;

            println!(
                "🧗 {} highlights from {} sampled frames ({} failed to score)",
                summary.highlights.len(),
                summary.sampled,
                summary.failed_frames
            );
            for (i, h) in summary.highlights.iter().enumerate() {
                println!(
                    "  {:>2}. ⏱️ {}  Score: {}/100  {}",
                    i + 1,
                    format_timestamp(h.timestamp()),
                    h.score,
                    h.reason.as_deref().unwrap_or_default()
                );
            }
            println!("Run `climb-light render` to build the gallery.");
        }
        Commands::Render { out } => {
            let report = processor
                .render_results(&out)
                .with_context(|| format!("rendering into {}", out.display()))?;
            if report.cards == 0 {
                println!("📭 No highlights yet. Process a video first.");
            }
            println!("🖼️ Gallery written to {}", report.index_path.display());
        }
        Commands::Clear => {
            processor.clear_results()?;
            println!("🧹 Stored highlights cleared");
        }
    }

    Ok(())
}
