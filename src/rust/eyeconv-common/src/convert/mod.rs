//! バッチ変換（ヘッダ → PNG / PNG → ヘッダ）
//!
//! 1ファイルの失敗はバッチ全体を止めない。結果はレポートとして返す。

pub mod header_to_png;
pub mod png_to_header;

pub use header_to_png::HeaderToPngConverter;
pub use png_to_header::PngToHeaderConverter;

use crate::error::ConvertError;
use crate::image::{ClassifiedImage, SizeAdjustment};
use serde::Serialize;
use std::path::PathBuf;

/// 配列1つ（画像1枚）の変換結果
#[derive(Debug, Clone, Serialize)]
pub struct ArrayReport {
    pub name: String,
    pub element_count: usize,
    pub width: u32,
    pub height: u32,
    /// ヘッダ → PNG のときのサイズ判定結果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassifiedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<SizeAdjustment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `ConvertError::error_code` の値
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ArrayReport {
    /// 変換できなかった配列
    fn failed(name: String, element_count: usize, error: &ConvertError) -> Self {
        ArrayReport {
            name,
            element_count,
            width: 0,
            height: 0,
            classification: None,
            adjustment: None,
            output: None,
            error: Some(error.to_string()),
            error_code: Some(error.error_code().to_string()),
        }
    }

    fn record_error(&mut self, error: &ConvertError) {
        self.output = None;
        self.error = Some(error.to_string());
        self.error_code = Some(error.error_code().to_string());
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// ファイル単位の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// すべての配列を変換した
    Converted,
    /// 一部の配列だけ変換した
    Partial,
    /// 認識できる配列が無かった
    Skipped,
    Failed,
}

/// ファイル1つの変換結果
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub arrays: Vec<ArrayReport>,
}

impl FileReport {
    fn failed(path: PathBuf, error: &ConvertError) -> Self {
        FileReport {
            path,
            status: FileStatus::Failed,
            message: Some(error.to_string()),
            error_code: Some(error.error_code().to_string()),
            arrays: Vec::new(),
        }
    }

    /// 配列の成否から状態を決める
    fn from_arrays(path: PathBuf, arrays: Vec<ArrayReport>) -> Self {
        let converted = arrays.iter().filter(|a| a.succeeded()).count();
        let status = if arrays.is_empty() {
            FileStatus::Skipped
        } else if converted == arrays.len() {
            FileStatus::Converted
        } else if converted > 0 {
            FileStatus::Partial
        } else {
            FileStatus::Failed
        };
        FileReport {
            path,
            status,
            message: None,
            error_code: None,
            arrays,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, FileStatus::Converted | FileStatus::Partial)
    }
}

/// バッチ全体の結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    /// 生成した定義ファイル
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions_file: Option<PathBuf>,
    /// マージ出力したヘッダ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_file: Option<PathBuf>,
    /// ファイル単位に属さない出力エラー
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl BatchReport {
    pub fn files_total(&self) -> usize {
        self.files.len()
    }

    pub fn files_converted(&self) -> usize {
        self.files.iter().filter(|f| f.succeeded()).count()
    }

    /// 失敗、または一部だけ変換したファイル数
    pub fn files_failed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Failed | FileStatus::Partial))
            .count()
    }

    pub fn arrays_total(&self) -> usize {
        self.files.iter().map(|f| f.arrays.len()).sum()
    }

    pub fn arrays_converted(&self) -> usize {
        self.files
            .iter()
            .flat_map(|f| f.arrays.iter())
            .filter(|a| a.succeeded())
            .count()
    }

    /// 失敗が一つも無いか
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
            && self
                .files
                .iter()
                .all(|f| matches!(f.status, FileStatus::Converted | FileStatus::Skipped))
    }
}
