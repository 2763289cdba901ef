//! eyeconv 共通ライブラリ
//!
//! 目玉ディスプレイ用ビットマップの C ヘッダと PNG の相互変換を提供

pub mod error;
pub mod sizes;
pub mod header;
pub mod image;
pub mod config;
pub mod convert;

// バージョン情報
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

// 主要な型の再エクスポート
pub use error::{ConvertError, Result};
pub use sizes::{Dimensions, SizeCategory, SizeDefinitions, SizeRegistry};
pub use header::{
    emit_array,
    emit_combined,
    emit_definitions_file,
    extract,
    ElementWidth,
    ExtractedArray,
    GeneratedArray,
    ProfileChoice,
    ScreenProfile,
};
pub use crate::image::{
    classify,
    ClassificationSource,
    ClassifiedImage,
    ColorFormat,
    ImageProcessor,
    PixelBuffer,
};
pub use config::Settings;
pub use convert::{BatchReport, FileReport, FileStatus, HeaderToPngConverter, PngToHeaderConverter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "eyeconv-common");
    }
}
