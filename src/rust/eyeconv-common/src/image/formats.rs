//! 画像フォーマット検出

use crate::error::{ConvertError, Result};
use serde::Serialize;

/// 入力画像の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Unknown,
}

/// 画像フォーマットをマジックバイトから検出
pub fn detect_format(data: &[u8]) -> ImageKind {
    if data.len() < 4 {
        return ImageKind::Unknown;
    }

    match &data[0..4] {
        [0x89, 0x50, 0x4E, 0x47] => ImageKind::Png,
        [0xFF, 0xD8, 0xFF, _] => ImageKind::Jpeg,
        [0x47, 0x49, 0x46, 0x38] => ImageKind::Gif,
        [0x42, 0x4D, _, _] => ImageKind::Bmp,
        _ => ImageKind::Unknown,
    }
}

/// ファイルサイズ制限チェック
pub fn validate_size(data: &[u8], max_bytes: usize) -> Result<()> {
    if data.len() > max_bytes {
        return Err(ConvertError::ImageTooLarge(data.len(), max_bytes));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_detection() {
        let png_header = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_format(&png_header), ImageKind::Png);
    }

    #[test]
    fn test_other_formats() {
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageKind::Jpeg);
        assert_eq!(detect_format(&[0x47, 0x49, 0x46, 0x38, 0x39, 0x61]), ImageKind::Gif);
        assert_eq!(detect_format(&[0x42, 0x4D, 0x36, 0x58]), ImageKind::Bmp);
        assert_eq!(detect_format(&[0x00, 0x00, 0x00, 0x00]), ImageKind::Unknown);
    }

    #[test]
    fn test_short_data() {
        assert_eq!(detect_format(&[0x89, 0x50]), ImageKind::Unknown);
    }

    #[test]
    fn test_size_validation() {
        assert!(validate_size(&[0u8; 1000], 1024).is_ok());
        assert!(matches!(
            validate_size(&[0u8; 2048], 1024),
            Err(ConvertError::ImageTooLarge(2048, 1024))
        ));
    }
}
