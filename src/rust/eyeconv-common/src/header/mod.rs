//! C ヘッダファイルの解析と生成

pub mod emitter;
pub mod extractor;

pub use emitter::{
    emit_array, emit_combined, emit_definitions_file, make_identifier, GeneratedArray,
    ImageSizeRecord, ProfileChoice, ScreenProfile,
};
pub use extractor::extract;

use crate::image::ColorFormat;
use serde::{Deserialize, Serialize};

/// 配列要素のビット幅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementWidth {
    Bits8,
    Bits16,
    Bits32,
}

impl ElementWidth {
    /// 生成時の C の型名
    pub fn c_type(&self) -> &'static str {
        match self {
            ElementWidth::Bits8 => "uint8_t",
            ElementWidth::Bits16 => "uint16_t",
            ElementWidth::Bits32 => "uint32_t",
        }
    }

    /// 16進表記の桁数
    pub fn hex_digits(&self) -> usize {
        match self {
            ElementWidth::Bits8 => 2,
            ElementWidth::Bits16 => 4,
            ElementWidth::Bits32 => 8,
        }
    }

    fn from_c_type(c_type: &str) -> Option<Self> {
        let normalized = c_type.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.as_str() {
            "uint8_t" | "unsigned char" => Some(ElementWidth::Bits8),
            "uint16_t" | "unsigned short" => Some(ElementWidth::Bits16),
            "uint32_t" | "unsigned int" => Some(ElementWidth::Bits32),
            _ => None,
        }
    }
}

impl From<ColorFormat> for ElementWidth {
    fn from(format: ColorFormat) -> Self {
        match format {
            ColorFormat::Rgb565 => ElementWidth::Bits16,
            ColorFormat::Rgb888 | ColorFormat::Argb8888 => ElementWidth::Bits32,
        }
    }
}

/// ヘッダから取り出した配列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArray {
    pub name: String,
    pub values: Vec<u32>,
    pub element_width: ElementWidth,
}
