//! 结果展示
//!
//! 把结果槽中的高光渲染成一个静态相册目录：`index.html` + 每张高光一张图片。
//! 贴纸装饰失败时退回原图，不影响整体渲染。

pub mod decoration;

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::ImageOutputFormat;
use log::{debug, info, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::api::models::{Highlight, StoredResults};
use crate::config::DecorationConfig;

pub use decoration::decorate;

pub const INDEX_FILE: &str = "index.html";
pub const SHARE_TEXT: &str = "Check out my climbing highlights from Climb Light! 🧗🍌";
/// 卡片依次出现的间隔
pub const STAGGER_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("写入 {path} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 渲染结果统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub index_path: PathBuf,
    pub cards: usize,
    /// 装饰失败、退回原图的数量
    pub fallbacks: usize,
}

/// 单张卡片对应的图片文件
#[derive(Debug)]
struct CardImage {
    file_name: String,
    decorated: bool,
}

pub struct ResultRenderer {
    decoration: DecorationConfig,
    out_dir: PathBuf,
}

impl ResultRenderer {
    pub fn new(decoration: &DecorationConfig, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            decoration: decoration.clone(),
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// `None` 或空列表时渲染空状态页
    pub fn render(&self, results: Option<&StoredResults>) -> Result<RenderReport, RenderError> {
        fs::create_dir_all(&self.out_dir).map_err(|source| io_error(&self.out_dir, source))?;
        self.remove_stale_images()?;

        let highlights = results.map(|r| r.highlights.as_slice()).unwrap_or_default();
        let source_name = results
            .and_then(|r| r.metadata.as_ref())
            .map(|m| m.source_name.as_str());

        // 各张图互不依赖，可以并行装饰；collect 保持原顺序
        let images = highlights
            .par_iter()
            .enumerate()
            .map(|(i, h)| self.write_image(i + 1, h))
            .collect::<Result<Vec<_>, _>>()?;

        let fallbacks = images.iter().filter(|img| !img.decorated).count();
        let html = page(highlights, &images, source_name);
        let index_path = self.out_dir.join(INDEX_FILE);
        fs::write(&index_path, html).map_err(|source| io_error(&index_path, source))?;

        if highlights.is_empty() {
            info!("📭 No highlights yet, rendered empty page at {}", index_path.display());
        } else {
            info!(
                "🖼️ Rendered {} highlight cards ({} undecorated) to {}",
                highlights.len(),
                fallbacks,
                index_path.display()
            );
        }

        Ok(RenderReport {
            index_path,
            cards: highlights.len(),
            fallbacks,
        })
    }

    /// 删除上一次渲染留下的 `highlight-*` 图片
    fn remove_stale_images(&self) -> Result<(), RenderError> {
        let entries = fs::read_dir(&self.out_dir).map_err(|source| io_error(&self.out_dir, source))?;
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !is_card_image(&path) {
                continue;
            }
            fs::remove_file(&path).map_err(|source| io_error(&path, source))?;
            removed += 1;
        }
        if removed > 0 {
            debug!("🧹 Removed {} images from a previous render", removed);
        }
        Ok(())
    }

    fn write_image(&self, number: usize, highlight: &Highlight) -> Result<CardImage, RenderError> {
        match self.decorated_png(highlight) {
            Ok(png) => {
                let file_name = format!("highlight-{}.png", number);
                let path = self.out_dir.join(&file_name);
                fs::write(&path, png).map_err(|source| io_error(&path, source))?;
                Ok(CardImage {
                    file_name,
                    decorated: true,
                })
            }
            Err(e) => {
                warn!("⚠️ Decoration failed for highlight {}, using original: {}", number, e);
                let file_name = format!("highlight-{}.jpg", number);
                let path = self.out_dir.join(&file_name);
                fs::write(&path, &highlight.frame.image.jpeg)
                    .map_err(|source| io_error(&path, source))?;
                Ok(CardImage {
                    file_name,
                    decorated: false,
                })
            }
        }
    }

    fn decorated_png(&self, highlight: &Highlight) -> Result<Vec<u8>, image::ImageError> {
        let source = highlight.frame.image.decode()?;
        let decorated = decorate(&source, &self.decoration, &mut rand::rng());
        let mut buffer = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(decorated).write_to(&mut buffer, ImageOutputFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

impl Drop for ResultRenderer {
    fn drop(&mut self) {
        debug!("🗑️ ResultRenderer released");
    }
}

/// `highlight-<n>.png` / `highlight-<n>.jpg`
fn is_card_image(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    matches!(ext, "png" | "jpg")
        && stem
            .strip_prefix("highlight-")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn io_error(path: &Path, source: io::Error) -> RenderError {
    RenderError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// 秒数格式化为 M:SS
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn card(number: usize, highlight: &Highlight, image: &CardImage) -> String {
    let file = escape_html(&image.file_name);
    let extension = Path::new(&image.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png");
    let reason = highlight
        .reason
        .as_deref()
        .map(|r| format!("\n      <p class=\"reason\">{}</p>", escape_html(r)))
        .unwrap_or_default();

    format!(
        r#"  <figure class="card" style="animation-delay: {delay}ms">
    <img src="{file}" alt="Climbing highlight {number}">
    <figcaption>
      <p class="timestamp">⏱️ {time}</p>
      <p class="score">Score: {score}/100</p>{reason}
      <a class="download" href="{file}" download="climb-highlight-{number}.{extension}">Download</a>
    </figcaption>
  </figure>
"#,
        delay = (number as u64 - 1) * STAGGER_MS,
        file = file,
        number = number,
        time = format_timestamp(highlight.timestamp()),
        score = highlight.score,
        reason = reason,
        extension = extension,
    )
}

fn page(highlights: &[Highlight], images: &[CardImage], source_name: Option<&str>) -> String {
    let mut body = String::new();

    if highlights.is_empty() {
        body.push_str(
            "<section class=\"empty-state\">\n  <h2>No highlights yet</h2>\n  \
             <p>Process a climbing video first, then render again.</p>\n</section>\n",
        );
    } else {
        if let Some(name) = source_name {
            let _ = writeln!(body, "<p class=\"source\">From {}</p>", escape_html(name));
        }
        body.push_str("<section class=\"gallery\">\n");
        for (i, (highlight, image)) in highlights.iter().zip(images).enumerate() {
            body.push_str(&card(i + 1, highlight, image));
        }
        body.push_str("</section>\n");
        body.push_str("<button id=\"shareBtn\" type=\"button\">Share</button>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Climb Light Highlights</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #1a1a2e; color: #fff; margin: 0; padding: 2rem; }}
h1 {{ text-align: center; }}
.gallery {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 1.5rem; }}
.card {{ margin: 0; background: #24243e; border-radius: 16px; overflow: hidden; opacity: 0; animation: fadeUp 0.6s ease-out forwards; }}
.card img {{ width: 100%; display: block; }}
figcaption {{ padding: 1rem; }}
.score, .reason {{ opacity: 0.9; font-size: 0.875rem; }}
.download, #shareBtn {{ display: inline-block; background: #ffd60a; color: #1a1a2e; border: 0; border-radius: 8px; padding: 0.5rem 1rem; text-decoration: none; font-weight: 600; cursor: pointer; }}
#shareBtn {{ display: block; margin: 2rem auto 0; }}
.empty-state {{ text-align: center; opacity: 0.8; padding: 4rem 0; }}
@keyframes fadeUp {{ from {{ opacity: 0; transform: translateY(20px); }} to {{ opacity: 1; transform: none; }} }}
</style>
</head>
<body>
<h1>🧗 Climb Light 🍌</h1>
{body}<script>
const shareBtn = document.getElementById('shareBtn');
if (shareBtn) {{
  shareBtn.addEventListener('click', async () => {{
    const text = {share_text};
    if (navigator.share) {{
      try {{ await navigator.share({{ title: 'Climb Light Highlights', text, url: location.href }}); }} catch (e) {{}}
    }} else if (navigator.clipboard) {{
      await navigator.clipboard.writeText(text + ' ' + location.href);
      shareBtn.textContent = 'Copied!';
    }}
  }});
}}
</script>
</body>
</html>
"#,
        body = body,
        share_text = js_string(SHARE_TEXT),
    )
}

fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "''".to_string())
}
