//! 数値配列 ⇔ ピクセルバッファの変換

use super::{ColorFormat, PixelBuffer};
use crate::error::{ConvertError, Result};
use crate::header::ElementWidth;
use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use serde::Serialize;

/// 配列長と画像サイズの不一致をどう解消したか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizeAdjustment {
    /// 余分な値を切り捨てた
    Truncated { actual: usize, expected: usize },
    /// 不足分を0で埋めた
    Padded { actual: usize, expected: usize },
}

/// 配列長を `expected` に合わせる（切り捨て、または末尾を0埋め）
pub fn fit_values(mut values: Vec<u32>, expected: usize) -> (Vec<u32>, Option<SizeAdjustment>) {
    let actual = values.len();
    let adjustment = if actual > expected {
        values.truncate(expected);
        Some(SizeAdjustment::Truncated { actual, expected })
    } else if actual < expected {
        values.resize(expected, 0);
        Some(SizeAdjustment::Padded { actual, expected })
    } else {
        None
    };
    (values, adjustment)
}

/// デコードを許す最大ピクセル数（4096x4096）
pub const DEFAULT_MAX_DECODE_PIXELS: usize = 4096 * 4096;

/// 描画サイズを検証してピクセル数を返す
///
/// サイズは外部の定義ファイルから来るため、0 や巨大な値はここで弾く。
pub fn checked_pixel_count(width: u32, height: u32, max_pixels: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .filter(|&count| count > 0 && count <= max_pixels)
        .ok_or(ConvertError::InvalidDimensions {
            width,
            height,
            max_pixels,
        })
}

/// RGB565 → RGB888（上位ビットを下位へ複製して8bitに拡張）
pub fn rgb565_to_rgb888(value: u32) -> [u8; 3] {
    let r = ((value >> 11) & 0x1F) as u8;
    let g = ((value >> 5) & 0x3F) as u8;
    let b = (value & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

/// RGB888 → RGB565（下位ビットは切り捨て）
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u32 {
    let r5 = (r >> 3) as u32;
    let g6 = (g >> 2) as u32;
    let b5 = (b >> 3) as u32;
    (r5 << 11) | (g6 << 5) | b5
}

/// 数値配列をピクセルバッファにデコードする
///
/// 8bit 配列は `format` に関係なくグレースケールとして扱う。
/// 配列が `width * height` より長ければ余りは無視し、短ければ0として扱う。
pub fn decode(
    values: &[u32],
    width: u32,
    height: u32,
    element_width: ElementWidth,
    format: ColorFormat,
) -> PixelBuffer {
    let value_at = |x: u32, y: u32| {
        let idx = y as usize * width as usize + x as usize;
        values.get(idx).copied().unwrap_or(0)
    };

    if element_width == ElementWidth::Bits8 {
        return PixelBuffer::Gray(GrayImage::from_fn(width, height, |x, y| {
            Luma([(value_at(x, y) & 0xFF) as u8])
        }));
    }

    match format {
        ColorFormat::Rgb565 => PixelBuffer::Rgb(RgbImage::from_fn(width, height, |x, y| {
            Rgb(rgb565_to_rgb888(value_at(x, y)))
        })),
        ColorFormat::Rgb888 => PixelBuffer::Rgb(RgbImage::from_fn(width, height, |x, y| {
            let [_, r, g, b] = value_at(x, y).to_be_bytes();
            Rgb([r, g, b])
        })),
        ColorFormat::Argb8888 => PixelBuffer::Rgba(RgbaImage::from_fn(width, height, |x, y| {
            let [a, r, g, b] = value_at(x, y).to_be_bytes();
            Rgba([r, g, b, a])
        })),
    }
}

/// ピクセルバッファを数値配列にエンコードする（行優先、左上から）
///
/// グレースケールのバッファは `format` に関係なく輝度値をそのまま返す。
/// RGB565/RGB888 ではアルファを無視し、ARGB8888 でアルファが無い場合は不透明とする。
pub fn encode(buffer: &PixelBuffer, format: ColorFormat) -> Vec<u32> {
    match buffer {
        PixelBuffer::Gray(img) => img.pixels().map(|p| p[0] as u32).collect(),
        PixelBuffer::Rgb(img) => img
            .pixels()
            .map(|p| pack(format, p[0], p[1], p[2], 0xFF))
            .collect(),
        PixelBuffer::Rgba(img) => img
            .pixels()
            .map(|p| pack(format, p[0], p[1], p[2], p[3]))
            .collect(),
    }
}

fn pack(format: ColorFormat, r: u8, g: u8, b: u8, a: u8) -> u32 {
    match format {
        ColorFormat::Rgb565 => rgb888_to_rgb565(r, g, b),
        ColorFormat::Rgb888 => u32::from_be_bytes([0, r, g, b]),
        ColorFormat::Argb8888 => u32::from_be_bytes([a, r, g, b]),
    }
}
