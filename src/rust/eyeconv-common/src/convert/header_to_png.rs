//! ヘッダ → PNG 変換
//!
//! 出力先は `<出力ルート>/<ヘッダ名>/<配列名>.png`。

use super::{ArrayReport, BatchReport, FileReport};
use crate::config::Settings;
use crate::error::Result;
use crate::header::{extract, ExtractedArray};
use crate::image::codec::DEFAULT_MAX_DECODE_PIXELS;
use crate::image::{
    checked_pixel_count, classify, decode, fit_values, ClassifiedImage, ColorFormat, PixelBuffer, SizeAdjustment,
};
use crate::sizes::SizeRegistry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// デコード済みの配列
#[derive(Debug, Clone)]
pub struct RenderedArray {
    pub classification: ClassifiedImage,
    pub adjustment: Option<SizeAdjustment>,
    pub buffer: PixelBuffer,
}

pub struct HeaderToPngConverter {
    registry: SizeRegistry,
    color_format: ColorFormat,
    auto_detect_size: bool,
    max_pixels: usize,
}

impl HeaderToPngConverter {
    pub fn new(registry: SizeRegistry, color_format: ColorFormat, auto_detect_size: bool) -> Self {
        Self {
            registry,
            color_format,
            auto_detect_size,
            max_pixels: DEFAULT_MAX_DECODE_PIXELS,
        }
    }

    pub fn from_settings(settings: &Settings, registry: SizeRegistry) -> Self {
        Self::new(
            registry,
            settings.conversion.color_format,
            settings.conversion.auto_detect_size,
        )
        .with_max_pixels(settings.limits.max_decode_pixels)
    }

    pub fn with_max_pixels(mut self, max_pixels: usize) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// 1配列のサイズを決めてデコードする（ファイル入出力なし）
    ///
    /// 決まったサイズが0、または上限を超える場合はエラー。
    pub fn render(&self, array: &ExtractedArray) -> Result<RenderedArray> {
        let sizes = self.registry.sizes();
        let classification = if self.auto_detect_size {
            classify(&array.name, array.values.len(), sizes, self.registry.is_external())
        } else {
            ClassifiedImage::manual(sizes)
        };
        debug!(
            "{}: {} ({}x{}, {:?})",
            array.name, classification.label, classification.width, classification.height, classification.source
        );

        let expected = checked_pixel_count(classification.width, classification.height, self.max_pixels)?;
        let (values, adjustment) = fit_values(array.values.clone(), expected);
        if let Some(adjustment) = &adjustment {
            warn!("{}: data length does not match image size: {:?}", array.name, adjustment);
        }

        let buffer = decode(
            &values,
            classification.width,
            classification.height,
            array.element_width,
            self.color_format,
        );

        Ok(RenderedArray {
            classification,
            adjustment,
            buffer,
        })
    }

    /// ヘッダファイル1つを変換する
    ///
    /// 読み込みや出力ディレクトリ作成の失敗はエラー、配列ごとの保存失敗はレポートに記録する。
    pub fn convert_file(&self, path: &Path, output_root: &Path) -> Result<FileReport> {
        let text = fs::read_to_string(path)?;
        let arrays = extract(&text);

        if arrays.is_empty() {
            warn!("No array declarations found in {}", path.display());
            let mut report = FileReport::from_arrays(path.to_path_buf(), Vec::new());
            report.message = Some("no array declarations found".to_string());
            return Ok(report);
        }
        info!("Found {} array(s) in {}", arrays.len(), path.display());

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "header".to_string());
        let output_dir = output_root.join(stem);
        fs::create_dir_all(&output_dir)?;

        let reports: Vec<ArrayReport> = arrays
            .iter()
            .map(|array| self.convert_array(array, &output_dir))
            .collect();

        if !reports.iter().any(|r| r.succeeded()) {
            // 何も保存できなかったフォルダは残さない
            let _ = fs::remove_dir(&output_dir);
        }

        Ok(FileReport::from_arrays(path.to_path_buf(), reports))
    }

    fn convert_array(&self, array: &ExtractedArray, output_dir: &Path) -> ArrayReport {
        let rendered = match self.render(array) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!("Failed to render {}: {}", array.name, e);
                return ArrayReport::failed(array.name.clone(), array.values.len(), &e);
            }
        };
        let output = output_dir.join(format!("{}.png", array.name));
        let saved = rendered.buffer.save_png(&output);
        match &saved {
            Ok(()) => info!(
                "Saved {} ({}x{}, {})",
                output.display(),
                rendered.classification.width,
                rendered.classification.height,
                rendered.classification.label
            ),
            Err(e) => error!("Failed to save {}: {}", output.display(), e),
        }

        let mut report = ArrayReport {
            name: array.name.clone(),
            element_count: array.values.len(),
            width: rendered.classification.width,
            height: rendered.classification.height,
            classification: Some(rendered.classification),
            adjustment: rendered.adjustment,
            output: Some(output),
            error: None,
            error_code: None,
        };
        if let Err(e) = saved {
            report.record_error(&e);
        }
        report
    }

    /// 解決済みのファイル一覧を順に変換する
    pub fn convert_files(&self, files: &[PathBuf], output_root: &Path) -> BatchReport {
        let mut report = BatchReport::default();
        let total = files.len();

        for (i, path) in files.iter().enumerate() {
            info!("[{}/{}] Processing {}", i + 1, total, path.display());
            let file_report = match self.convert_file(path, output_root) {
                Ok(file_report) => file_report,
                Err(e) => {
                    error!("Failed to convert {}: {}", path.display(), e);
                    FileReport::failed(path.clone(), &e)
                }
            };
            report.files.push(file_report);
        }

        info!(
            "Batch finished: files {}/{}, arrays {}/{}",
            report.files_converted(),
            report.files_total(),
            report.arrays_converted(),
            report.arrays_total()
        );
        report
    }
}
