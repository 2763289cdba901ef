//! 共通エラー型定義

use std::path::PathBuf;
use thiserror::Error;

/// 変換処理の共通エラー型
///
/// 宣言の読み飛ばしやサイズ不一致は致命的ではないため、ここには含めない。
/// それらはレポートに記録され、警告ログとして出力される。
#[derive(Debug, Error)]
pub enum ConvertError {
    /// IO エラー（読み込み・書き込み失敗）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 画像のデコード・エンコード失敗
    #[error("画像処理エラー: {0}")]
    ImageProcessing(String),

    #[error("サポートされていない画像形式: {0}")]
    UnsupportedFormat(String),

    #[error("画像ファイルサイズが大きすぎます: {0} バイト（最大: {1} バイト）")]
    ImageTooLarge(usize, usize),

    /// 描画サイズが0、または上限を超えている
    #[error("画像サイズが不正です: {width}x{height}（最大: {max_pixels} ピクセル）")]
    InvalidDimensions { width: u32, height: u32, max_pixels: usize },

    /// 明示的に指定された定義ファイルが存在しない
    #[error("Definitions file not found: {}", .0.display())]
    DefinitionsNotFound(PathBuf),

    /// 明示的に指定された定義ファイルに既知のサイズ定数が一つもない
    #[error("No recognized size definitions in {}", .0.display())]
    DefinitionsParseEmpty(PathBuf),

    /// 無効なパラメータ
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON エラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result型のエイリアス
pub type Result<T> = std::result::Result<T, ConvertError>;

impl From<image::ImageError> for ConvertError {
    fn from(e: image::ImageError) -> Self {
        ConvertError::ImageProcessing(e.to_string())
    }
}

impl ConvertError {
    /// エラーコードを返す（レポート用）
    pub fn error_code(&self) -> &str {
        match self {
            ConvertError::Io(_) => "FILE_IO",
            ConvertError::ImageProcessing(_) => "IMAGE_PROCESSING_ERROR",
            ConvertError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ConvertError::ImageTooLarge(_, _) => "IMAGE_TOO_LARGE",
            ConvertError::InvalidDimensions { .. } => "INVALID_DIMENSIONS",
            ConvertError::DefinitionsNotFound(_) => "DEFINITIONS_NOT_FOUND",
            ConvertError::DefinitionsParseEmpty(_) => "DEFINITIONS_PARSE_EMPTY",
            ConvertError::InvalidParameter(_) => "INVALID_PARAMETER",
            ConvertError::Config(_) => "CONFIG_ERROR",
            ConvertError::Json(_) => "JSON_ERROR",
        }
    }
}
