//! 贴纸装饰
//!
//! 在高光图副本上随机叠加几枚手绘的香蕉色徽章，纯装饰，不改动原图。

use std::f32::consts::PI;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::point::Point;
use rand::Rng;

use crate::config::DecorationConfig;

const BANANA: Rgba<u8> = Rgba([255, 214, 10, 255]);
const PEEL: Rgba<u8> = Rgba([110, 72, 16, 255]);
const SHINE: Rgba<u8> = Rgba([255, 250, 230, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

const MIN_STICKER: u32 = 24;
const MAX_STICKER: u32 = 128;

/// 画一枚边长为 `size` 的圆形徽章，中间一颗五角星
pub fn draw_sticker(size: u32) -> RgbaImage {
    let size = size.max(MIN_STICKER);
    let mut sticker = RgbaImage::from_pixel(size, size, CLEAR);
    let c = (size / 2) as i32;
    let r = c - 1;

    draw_filled_circle_mut(&mut sticker, (c, c), r, PEEL);
    draw_filled_circle_mut(&mut sticker, (c, c), r - (r / 10).max(2), BANANA);

    let outer = r as f32 * 0.55;
    let inner = outer * 0.45;
    let star: Vec<Point<i32>> = (0..10)
        .map(|i| {
            let radius = if i % 2 == 0 { outer } else { inner };
            let angle = -PI / 2.0 + i as f32 * PI / 5.0;
            Point::new(
                c + (radius * angle.cos()).round() as i32,
                c + (radius * angle.sin()).round() as i32,
            )
        })
        .collect();
    draw_polygon_mut(&mut sticker, &star, SHINE);

    sticker
}

/// 按图片短边确定贴纸基础尺寸
fn base_size(width: u32, height: u32) -> u32 {
    (width.min(height) / 5).clamp(MIN_STICKER, MAX_STICKER)
}

/// 在两个端点之间均匀取值，端点顺序不限；端点或跨度不是有限值时返回 `None`
fn pick<R: Rng + ?Sized>(rng: &mut R, a: f32, b: f32) -> Option<f32> {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if !(lo.is_finite() && hi.is_finite() && (hi - lo).is_finite()) {
        return None;
    }
    if hi > lo {
        Some(rng.random_range(lo..hi))
    } else {
        Some(lo)
    }
}

/// 贴纸左上角坐标：尽量离边缘保留 `margin`，图片太小时退化为整个可用范围
fn place<R: Rng + ?Sized>(rng: &mut R, extent: u32, sticker: u32, margin: u32) -> i64 {
    let free = extent.saturating_sub(sticker);
    let (lo, hi) = if free > margin.saturating_mul(2) {
        (margin, free - margin)
    } else {
        (0, free)
    };
    if hi > lo {
        rng.random_range(lo..=hi) as i64
    } else {
        lo as i64
    }
}

/// 返回装饰后的副本；`count` 为 0 或未启用时原样返回
pub fn decorate<R: Rng + ?Sized>(
    image: &DynamicImage,
    config: &DecorationConfig,
    rng: &mut R,
) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    if !config.enabled || config.count == 0 {
        return canvas;
    }

    let (width, height) = image.dimensions();
    let base = base_size(width, height);
    let stencil = draw_sticker(base);

    for _ in 0..config.count {
        let scale = if config.random_scale {
            pick(rng, config.scale_range.0, config.scale_range.1).unwrap_or(1.0)
        } else {
            1.0
        };
        let side = ((base as f32 * scale).round() as u32).clamp(1, MAX_STICKER * 4);
        let mut sticker = if side == base {
            stencil.clone()
        } else {
            imageops::resize(&stencil, side, side, FilterType::Triangle)
        };

        if config.random_rotation {
            let degrees = pick(rng, config.rotation_range.0, config.rotation_range.1).unwrap_or(0.0);
            if degrees != 0.0 {
                sticker = rotate_about_center(
                    &sticker,
                    degrees.to_radians(),
                    Interpolation::Bilinear,
                    CLEAR,
                );
            }
        }

        let x = place(rng, width, side, config.margin);
        let y = place(rng, height, side, config.margin);
        imageops::overlay(&mut canvas, &sticker, x, y);
    }

    canvas
}
