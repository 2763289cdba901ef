//! 画像処理モジュール
//!
//! 数値配列とピクセルバッファの相互変換、サイズ推定、画像ファイルの入出力

pub mod classifier;
pub mod codec;
pub mod formats;
pub mod processor;

// 公開API
pub use classifier::{classify, ClassificationSource, ClassifiedImage};
pub use codec::{checked_pixel_count, decode, encode, fit_values, SizeAdjustment};
pub use processor::ImageProcessor;

use crate::error::{ConvertError, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 色フォーマット
///
/// 8bit 配列のグレースケールはこの列挙に含まれず、要素幅から暗黙に決まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorFormat {
    #[serde(rename = "RGB565", alias = "rgb565")]
    Rgb565,
    #[serde(rename = "RGB888", alias = "rgb888")]
    Rgb888,
    #[serde(rename = "ARGB8888", alias = "argb8888")]
    Argb8888,
}

impl Default for ColorFormat {
    fn default() -> Self {
        ColorFormat::Rgb565
    }
}

impl std::str::FromStr for ColorFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rgb565" => Ok(ColorFormat::Rgb565),
            "rgb888" => Ok(ColorFormat::Rgb888),
            "argb8888" => Ok(ColorFormat::Argb8888),
            _ => Err(ConvertError::InvalidParameter(format!("Invalid color format: {}", s))),
        }
    }
}

impl std::fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColorFormat::Rgb565 => "RGB565",
            ColorFormat::Rgb888 => "RGB888",
            ColorFormat::Argb8888 => "ARGB8888",
        };
        f.write_str(name)
    }
}

/// デコード済みのピクセルバッファ（行優先）
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    Gray(GrayImage),
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl PixelBuffer {
    pub fn width(&self) -> u32 {
        match self {
            PixelBuffer::Gray(img) => img.width(),
            PixelBuffer::Rgb(img) => img.width(),
            PixelBuffer::Rgba(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            PixelBuffer::Gray(img) => img.height(),
            PixelBuffer::Rgb(img) => img.height(),
            PixelBuffer::Rgba(img) => img.height(),
        }
    }

    /// チャンネル数（1, 3, 4）
    pub fn channels(&self) -> u8 {
        match self {
            PixelBuffer::Gray(_) => 1,
            PixelBuffer::Rgb(_) => 3,
            PixelBuffer::Rgba(_) => 4,
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            PixelBuffer::Gray(img) => DynamicImage::ImageLuma8(img),
            PixelBuffer::Rgb(img) => DynamicImage::ImageRgb8(img),
            PixelBuffer::Rgba(img) => DynamicImage::ImageRgba8(img),
        }
    }

    /// PNG として保存する
    pub fn save_png(&self, path: &Path) -> Result<()> {
        match self {
            PixelBuffer::Gray(img) => img.save_with_format(path, ImageFormat::Png)?,
            PixelBuffer::Rgb(img) => img.save_with_format(path, ImageFormat::Png)?,
            PixelBuffer::Rgba(img) => img.save_with_format(path, ImageFormat::Png)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_format_from_str() {
        assert_eq!("rgb565".parse::<ColorFormat>().unwrap(), ColorFormat::Rgb565);
        assert_eq!("RGB888".parse::<ColorFormat>().unwrap(), ColorFormat::Rgb888);
        assert_eq!("Argb8888".parse::<ColorFormat>().unwrap(), ColorFormat::Argb8888);
        assert!("rgb444".parse::<ColorFormat>().is_err());
    }

    #[test]
    fn test_color_format_display_round_trip() {
        for format in [ColorFormat::Rgb565, ColorFormat::Rgb888, ColorFormat::Argb8888] {
            assert_eq!(format.to_string().parse::<ColorFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_pixel_buffer_shape() {
        let buffer = PixelBuffer::Rgba(RgbaImage::new(3, 2));
        assert_eq!((buffer.width(), buffer.height()), (3, 2));
        assert_eq!(buffer.channels(), 4);
        assert_eq!(buffer.into_dynamic().color(), image::ColorType::Rgba8);
    }
}
