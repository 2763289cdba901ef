//! 画像ファイルの読み込みパイプライン

use super::formats::{detect_format, validate_size, ImageKind};
use super::{ColorFormat, PixelBuffer};
use crate::error::{ConvertError, Result};
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use std::path::Path;
use tracing::debug;

/// 入力画像の最大サイズ（10MB）
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub struct ImageProcessor {
    max_bytes: usize,
}

impl ImageProcessor {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// 画像ファイルを読み込み、指定フォーマットのエンコードに適したバッファにする
    pub fn load_file(&self, path: &Path, format: ColorFormat) -> Result<PixelBuffer> {
        let data = std::fs::read(path)?;
        self.process_image(data, format)
    }

    /// バイトデータから画像をデコードする
    pub fn process_image(&self, image_data: Vec<u8>, format: ColorFormat) -> Result<PixelBuffer> {
        // 1. サイズ検証
        validate_size(&image_data, self.max_bytes)?;

        // 2. フォーマット検出・検証
        let kind = detect_format(&image_data);
        if kind == ImageKind::Unknown {
            return Err(ConvertError::UnsupportedFormat("未知の画像形式です".to_string()));
        }

        // 3. デコード
        let img = image::load_from_memory(&image_data)
            .map_err(|e| ConvertError::ImageProcessing(format!("画像のデコードに失敗しました: {}", e)))?;
        debug!("Decoded {:?} image {}x{} ({:?})", kind, img.width(), img.height(), img.color());

        // 4. チャンネル構成を合わせる
        Ok(prepare_for_format(img, format))
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

/// ARGB8888 なら RGBA に展開し、それ以外はアルファを白背景に合成して RGB にする
fn prepare_for_format(img: DynamicImage, format: ColorFormat) -> PixelBuffer {
    match format {
        ColorFormat::Argb8888 => PixelBuffer::Rgba(img.to_rgba8()),
        ColorFormat::Rgb565 | ColorFormat::Rgb888 => {
            if img.color().has_alpha() {
                PixelBuffer::Rgb(flatten_on_white(&img.to_rgba8()))
            } else {
                PixelBuffer::Rgb(img.to_rgb8())
            }
        }
    }
}

/// アルファを白背景に合成する
pub fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let alpha = p[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    })
}
