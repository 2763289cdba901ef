//! PNG → ヘッダ変換
//!
//! 個別出力では入力の相対ディレクトリ構成を保ったまま `<名前>.h` を書き、
//! マージ出力ではすべての配列を1つのヘッダにまとめる。
//! どちらも最後に出力ルートへ定義ファイル（common.h）を書き出す。

use super::{ArrayReport, BatchReport, FileReport, FileStatus};
use crate::config::Settings;
use crate::error::Result;
use crate::header::emitter::DEFINITIONS_FILE_NAME;
use crate::header::{
    emit_array, emit_combined, emit_definitions_file, make_identifier, ElementWidth, GeneratedArray,
    ImageSizeRecord, ProfileChoice,
};
use crate::image::{encode, ColorFormat, ImageProcessor};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{error, info};

pub struct PngToHeaderConverter {
    processor: ImageProcessor,
    color_format: ColorFormat,
    prefix: Option<String>,
    merge_output: bool,
    profile: ProfileChoice,
    combined_file_name: String,
}

impl PngToHeaderConverter {
    pub fn new(color_format: ColorFormat) -> Self {
        Self {
            processor: ImageProcessor::default(),
            color_format,
            prefix: None,
            merge_output: false,
            profile: ProfileChoice::Auto,
            combined_file_name: "combined_images.h".to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            processor: ImageProcessor::new(settings.limits.max_image_bytes),
            color_format: settings.conversion.color_format,
            prefix: settings.conversion.prefix.clone(),
            merge_output: settings.conversion.merge_output,
            profile: settings.conversion.screen_profile,
            combined_file_name: settings.paths.combined_file_name.clone(),
        }
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_merge_output(mut self, merge_output: bool) -> Self {
        self.merge_output = merge_output;
        self
    }

    pub fn with_profile(mut self, profile: ProfileChoice) -> Self {
        self.profile = profile;
        self
    }

    /// 画像ファイルを配列にする
    pub fn encode_image(&self, path: &Path, name: String) -> Result<GeneratedArray> {
        let buffer = self.processor.load_file(path, self.color_format)?;
        let values = encode(&buffer, self.color_format);
        Ok(GeneratedArray {
            name,
            width: buffer.width(),
            height: buffer.height(),
            element_width: ElementWidth::from(self.color_format),
            values,
        })
    }

    /// 解決済みの画像ファイル一覧を変換する
    pub fn convert_files(&self, files: &[PathBuf], input_root: &Path, output_root: &Path) -> BatchReport {
        let mut report = BatchReport::default();
        let mut records: Vec<ImageSizeRecord> = Vec::new();
        let mut merged: Vec<(usize, GeneratedArray)> = Vec::new();
        let total = files.len();

        for (i, path) in files.iter().enumerate() {
            let relative = path.strip_prefix(input_root).unwrap_or(path);
            info!("[{}/{}] Processing {}", i + 1, total, relative.display());

            let name = self.array_name(relative);
            let result = self.encode_image(path, name).and_then(|array| {
                if self.merge_output {
                    Ok((array, None))
                } else {
                    let output = self.write_single(&array, relative, output_root)?;
                    Ok((array, Some(output)))
                }
            });

            match result {
                Ok((array, output)) => {
                    info!("Converted {} ({}x{}, {} values)", array.name, array.width, array.height, array.values.len());
                    records.push(array.size_record());
                    report.files.push(FileReport::from_arrays(
                        path.clone(),
                        vec![ArrayReport {
                            name: array.name.clone(),
                            element_count: array.values.len(),
                            width: array.width,
                            height: array.height,
                            classification: None,
                            adjustment: None,
                            output,
                            error: None,
                            error_code: None,
                        }],
                    ));
                    if self.merge_output {
                        merged.push((report.files.len() - 1, array));
                    }
                }
                Err(e) => {
                    error!("Failed to convert {}: {}", path.display(), e);
                    report.files.push(FileReport::failed(path.clone(), &e));
                }
            }
        }

        if !merged.is_empty() {
            self.write_combined(&mut report, merged, output_root);
        }

        if !records.is_empty() {
            let profile = self.profile.resolve(&records);
            info!("Screen profile: {} ({})", profile, self.profile);
            let path = output_root.join(DEFINITIONS_FILE_NAME);
            match write_text(&path, &emit_definitions_file(profile, &records)) {
                Ok(()) => {
                    info!("Updated {} with {} image size definition(s)", path.display(), records.len());
                    report.definitions_file = Some(path);
                }
                Err(e) => {
                    error!("Failed to write {}: {}", path.display(), e);
                    report.errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        info!(
            "Batch finished: {}/{} file(s) converted",
            report.files_converted(),
            report.files_total()
        );
        report
    }

    /// 配列名を決める（マージ時は相対ディレクトリを名前に含める）
    fn array_name(&self, relative: &Path) -> String {
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let raw = match relative.parent().filter(|_| self.merge_output) {
            Some(parent) => {
                let dirs: Vec<String> = parent
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect();
                if dirs.is_empty() {
                    stem
                } else {
                    format!("{}_{}", dirs.join("_"), stem)
                }
            }
            None => stem,
        };

        make_identifier(&raw, self.prefix.as_deref())
    }

    fn write_single(&self, array: &GeneratedArray, relative: &Path, output_root: &Path) -> Result<PathBuf> {
        let mut output = output_root.join(relative);
        output.set_extension("h");
        write_text(&output, &emit_array(array))?;
        Ok(output)
    }

    fn write_combined(&self, report: &mut BatchReport, merged: Vec<(usize, GeneratedArray)>, output_root: &Path) {
        let path = output_root.join(&self.combined_file_name);
        let (indices, arrays): (Vec<usize>, Vec<GeneratedArray>) = merged.into_iter().unzip();

        match write_text(&path, &emit_combined(&arrays)) {
            Ok(()) => {
                info!("Wrote {} with {} array(s)", path.display(), arrays.len());
                for i in indices {
                    for array in &mut report.files[i].arrays {
                        array.output = Some(path.clone());
                    }
                }
                report.combined_file = Some(path);
            }
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                for i in indices {
                    let file = &mut report.files[i];
                    file.status = FileStatus::Failed;
                    file.message = Some(e.to_string());
                    file.error_code = Some(e.error_code().to_string());
                    for array in &mut file.arrays {
                        array.record_error(&e);
                    }
                }
                report.errors.push(format!("{}: {}", path.display(), e));
            }
        }
    }
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{extract, ScreenProfile};
    use crate::sizes::parse_definitions;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_array_name_modes() {
        let separate = PngToHeaderConverter::new(ColorFormat::Rgb565).with_prefix(Some("eye".into()));
        assert_eq!(separate.array_name(Path::new("left/3-big.png")), "eye_3_big");

        let merged = PngToHeaderConverter::new(ColorFormat::Rgb565).with_merge_output(true);
        assert_eq!(merged.array_name(Path::new("left/iris/blue.png")), "left_iris_blue");
        assert_eq!(merged.array_name(Path::new("3-eyes.png")), "img_3_eyes");
    }

    #[test]
    fn test_separate_files_mirror_structure() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::create_dir_all(input.path().join("left")).unwrap();
        let png = input.path().join("left/red.png");
        RgbImage::from_pixel(9, 1, Rgb([255, 0, 0])).save(&png).unwrap();

        let converter = PngToHeaderConverter::new(ColorFormat::Rgb565);
        let report = converter.convert_files(&[png], input.path(), output.path());
        assert!(report.is_clean());

        let header = fs::read_to_string(output.path().join("left/red.h")).unwrap();
        assert!(header.starts_with("#include \"common.h\"\n\nconst uint16_t red[RED_WIDTH*RED_HEIGHT] = {\n"));
        let arrays = extract(&header);
        assert_eq!(arrays[0].values, vec![0xF800; 9]);

        let common = fs::read_to_string(output.path().join("common.h")).unwrap();
        assert!(common.contains("#define RED_WIDTH  9\n#define RED_HEIGHT 1\n"));
        let (sizes, _) = parse_definitions(&common);
        assert_eq!(sizes, ScreenProfile::Screen160.sizes());
    }

    #[test]
    fn test_merged_output_and_auto_profile() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let small = input.path().join("small.png");
        let wide = input.path().join("wide.png");
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 128])).save(&small).unwrap();
        RgbImage::from_pixel(200, 1, Rgb([0, 0, 0])).save(&wide).unwrap();
        let broken = input.path().join("broken.png");
        fs::write(&broken, b"not a png").unwrap();

        let converter = PngToHeaderConverter::new(ColorFormat::Argb8888).with_merge_output(true);
        let report = converter.convert_files(&[small, broken, wide], input.path(), output.path());

        assert_eq!(report.files_converted(), 2);
        assert_eq!(report.files[1].status, FileStatus::Failed);
        assert_eq!(report.files[1].error_code.as_deref(), Some("UNSUPPORTED_FORMAT"));
        let combined = report.combined_file.clone().unwrap();
        assert_eq!(combined, output.path().join("combined_images.h"));

        let arrays = extract(&fs::read_to_string(&combined).unwrap());
        assert_eq!(arrays.len(), 2);
        assert_eq!(arrays[0].name, "small");
        assert_eq!(arrays[0].element_width, ElementWidth::Bits32);
        assert_eq!(arrays[0].values, vec![0x8000_00FF; 4]);

        // 長辺 200 > 160 なので 240x240
        let common = fs::read_to_string(output.path().join("common.h")).unwrap();
        assert!(common.contains("#define SCREEN_WIDTH 240\n"));
    }

    #[test]
    fn test_fixed_profile() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let png = input.path().join("dot.png");
        RgbImage::new(1, 1).save(&png).unwrap();

        let converter = PngToHeaderConverter::new(ColorFormat::Rgb888)
            .with_profile(ProfileChoice::Fixed(ScreenProfile::Screen240));
        let report = converter.convert_files(&[png], input.path(), output.path());
        assert_eq!(report.definitions_file, Some(output.path().join("common.h")));

        let header = fs::read_to_string(output.path().join("dot.h")).unwrap();
        assert!(header.contains("const uint32_t dot[DOT_WIDTH*DOT_HEIGHT] = {\n  0x00000000\n};\n"));
        let common = fs::read_to_string(output.path().join("common.h")).unwrap();
        assert!(common.contains("#define IRIS_MAP_WIDTH 471\n"));
    }

    #[test]
    fn test_no_definitions_when_nothing_converted() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let converter = PngToHeaderConverter::new(ColorFormat::Rgb565);
        let report = converter.convert_files(&[input.path().join("missing.png")], input.path(), output.path());
        assert_eq!(report.files_converted(), 0);
        assert_eq!(report.files[0].error_code.as_deref(), Some("FILE_IO"));
        assert!(report.definitions_file.is_none());
        assert!(!output.path().join("common.h").exists());
    }
}
