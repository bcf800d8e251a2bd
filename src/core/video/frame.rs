use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use serde::{Deserialize, Serialize};

pub const JPEG_MIME: &str = "image/jpeg";

/// 抽出的一帧（创建后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub index: u32,
    /// 秒
    pub timestamp: f64,
    #[serde(flatten)]
    pub image: FrameImage,
}

impl Frame {
    pub fn new(index: u32, timestamp: f64, image: FrameImage) -> Self {
        Self {
            index,
            timestamp,
            image,
        }
    }
}

/// JPEG 编码后的静态画面
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameImage {
    #[serde(rename = "dataUrl", with = "data_url")]
    pub jpeg: Vec<u8>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl std::fmt::Debug for FrameImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.jpeg.len())
            .finish()
    }
}

impl FrameImage {
    /// 按最长边上限等比缩放（不放大），再编码为 JPEG
    pub fn from_dynamic(
        img: &DynamicImage,
        max_dimension: u32,
        quality: u8,
    ) -> Result<Self, image::ImageError> {
        let scaled = scale_to_bound(img, max_dimension);
        let (width, height) = scaled.dimensions();

        // JPEG 不支持透明通道
        let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());
        let mut buffer = Cursor::new(Vec::new());
        rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality.clamp(1, 100)))?;

        Ok(Self {
            jpeg: buffer.into_inner(),
            width,
            height,
        })
    }

    pub fn decode(&self) -> Result<DynamicImage, image::ImageError> {
        image::load_from_memory(&self.jpeg)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.jpeg)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", JPEG_MIME, self.to_base64())
    }
}

/// 最长边不超过 `max_dimension`，保持宽高比
pub fn scale_to_bound(img: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
        return img.clone();
    }
    img.resize(max_dimension, max_dimension, FilterType::Triangle)
}

/// `data:image/jpeg;base64,...` 与原始字节互转
mod data_url {
    use super::{JPEG_MIME, STANDARD};
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!(
            "data:{};base64,{}",
            JPEG_MIME,
            STANDARD.encode(bytes)
        ))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let payload = match raw.split_once(',') {
            Some((_, data)) => data,
            None => raw.as_str(),
        };
        STANDARD
            .decode(payload.trim())
            .map_err(serde::de::Error::custom)
    }
}
