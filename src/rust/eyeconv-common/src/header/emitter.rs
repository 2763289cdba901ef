//! C ヘッダテキストの生成
//!
//! 出力は決定的: 1行8要素、ゼロ埋めの大文字16進、最終行のみ末尾カンマなし。

use super::ElementWidth;
use crate::error::ConvertError;
use crate::sizes::{Dimensions, SizeCategory, SizeDefinitions};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// 1行あたりの要素数
const VALUES_PER_LINE: usize = 8;

/// 配列ヘッダが参照する定義ファイル名
pub const DEFINITIONS_FILE_NAME: &str = "common.h";

/// 生成対象の配列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArray {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub element_width: ElementWidth,
    pub values: Vec<u32>,
}

impl GeneratedArray {
    pub fn size_record(&self) -> ImageSizeRecord {
        ImageSizeRecord {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

/// 定義ファイルに書き出す画像サイズ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSizeRecord {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// 画面サイズのプロファイル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenProfile {
    #[serde(rename = "160x160")]
    Screen160,
    #[serde(rename = "240x240")]
    Screen240,
}

impl ScreenProfile {
    /// プロファイルごとの固定サイズ
    pub fn sizes(&self) -> SizeDefinitions {
        match self {
            ScreenProfile::Screen160 => SizeDefinitions::BUILT_IN,
            ScreenProfile::Screen240 => SizeDefinitions {
                iris_map: Dimensions::new(471, 75),
                sclera: Dimensions::new(375, 375),
                screen: Dimensions::new(240, 240),
                iris: Dimensions::new(150, 150),
            },
        }
    }
}

impl std::fmt::Display for ScreenProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenProfile::Screen160 => f.write_str("160x160"),
            ScreenProfile::Screen240 => f.write_str("240x240"),
        }
    }
}

/// プロファイルの選び方（設定ファイルでは "auto" / "160x160" / "240x240"）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProfileChoice {
    /// 生成した画像の長辺が160を超えれば 240x240、そうでなければ 160x160
    #[default]
    Auto,
    Fixed(ScreenProfile),
}

impl ProfileChoice {
    pub fn resolve(&self, images: &[ImageSizeRecord]) -> ScreenProfile {
        match self {
            ProfileChoice::Fixed(profile) => *profile,
            ProfileChoice::Auto => {
                let larger = images
                    .iter()
                    .map(|i| Dimensions::new(i.width, i.height).larger_side())
                    .max()
                    .unwrap_or(0);
                if larger > 160 {
                    ScreenProfile::Screen240
                } else {
                    ScreenProfile::Screen160
                }
            }
        }
    }
}

impl std::str::FromStr for ProfileChoice {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ProfileChoice::Auto),
            "160x160" | "160" => Ok(ProfileChoice::Fixed(ScreenProfile::Screen160)),
            "240x240" | "240" => Ok(ProfileChoice::Fixed(ScreenProfile::Screen240)),
            _ => Err(ConvertError::InvalidParameter(format!("Invalid screen profile: {}", s))),
        }
    }
}

impl std::fmt::Display for ProfileChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileChoice::Auto => f.write_str("auto"),
            ProfileChoice::Fixed(profile) => write!(f, "{}", profile),
        }
    }
}

impl TryFrom<String> for ProfileChoice {
    type Error = ConvertError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProfileChoice> for String {
    fn from(choice: ProfileChoice) -> Self {
        choice.to_string()
    }
}

/// C の識別子として使える名前にする
///
/// 英数字とアンダースコア以外は `_` に置き換え、数字で始まる場合は `img_` を付ける。
pub fn make_identifier(raw: &str, prefix: Option<&str>) -> String {
    let joined = match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, raw),
        _ => raw.to_string(),
    };

    let name: String = joined
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("img_{}", name)
    } else {
        name
    }
}

/// 1配列分のヘッダファイル
pub fn emit_array(array: &GeneratedArray) -> String {
    let mut out = include_line();
    write_declaration(&mut out, array);
    out
}

/// 複数配列をまとめたヘッダファイル
pub fn emit_combined(arrays: &[GeneratedArray]) -> String {
    let mut out = include_line();
    for array in arrays {
        write_declaration(&mut out, array);
        out.push('\n');
    }
    out
}

fn include_line() -> String {
    format!("#include \"{}\"\n\n", DEFINITIONS_FILE_NAME)
}

fn write_declaration(out: &mut String, array: &GeneratedArray) {
    let upper = array.name.to_uppercase();
    let digits = array.element_width.hex_digits();

    let _ = writeln!(
        out,
        "const {} {}[{}_WIDTH*{}_HEIGHT] = {{",
        array.element_width.c_type(),
        array.name,
        upper,
        upper
    );

    let lines = array.values.chunks(VALUES_PER_LINE);
    let line_count = lines.len();
    for (i, chunk) in lines.enumerate() {
        let hex: Vec<String> = chunk.iter().map(|v| format!("0x{:0width$X}", v, width = digits)).collect();
        out.push_str("  ");
        out.push_str(&hex.join(", "));
        if i + 1 < line_count {
            out.push(',');
        }
        out.push('\n');
    }

    out.push_str("};\n");
}

/// 定義ファイル（common.h）の内容
///
/// プロファイルのカテゴリ定数に続けて、生成した画像ごとの幅・高さマクロを並べる。
pub fn emit_definitions_file(profile: ScreenProfile, images: &[ImageSizeRecord]) -> String {
    let sizes = profile.sizes();
    let mut out = String::new();

    for category in SizeCategory::ALL {
        let (width_name, height_name) = category.macro_names();
        let size = sizes.get(category);
        let _ = writeln!(out, "#define {} {}", width_name, size.width);
        let _ = writeln!(out, "#define {} {}", height_name, size.height);
        out.push('\n');
    }
    out.push_str("#define SYMMETRICAL_EYELID\n\n");

    if !images.is_empty() {
        out.push_str("// Generated image size definitions\n");
        for image in images {
            let upper = image.name.to_uppercase();
            let _ = writeln!(out, "#define {}_WIDTH  {}", upper, image.width);
            let _ = writeln!(out, "#define {}_HEIGHT {}", upper, image.height);
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::extract;
    use crate::sizes::parse_definitions;

    fn array(name: &str, element_width: ElementWidth, values: Vec<u32>) -> GeneratedArray {
        GeneratedArray {
            name: name.to_string(),
            width: 3,
            height: 3,
            element_width,
            values,
        }
    }

    #[test]
    fn test_emit_array_formatting() {
        let text = emit_array(&array("eye", ElementWidth::Bits16, (1..=9).collect()));
        let expected = "\
#include \"common.h\"

const uint16_t eye[EYE_WIDTH*EYE_HEIGHT] = {
  0x0001, 0x0002, 0x0003, 0x0004, 0x0005, 0x0006, 0x0007, 0x0008,
  0x0009
};
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_emit_32bit_and_8bit() {
        let wide = emit_array(&array("argb", ElementWidth::Bits32, vec![0xFF00_00FF]));
        assert!(wide.contains("const uint32_t argb[ARGB_WIDTH*ARGB_HEIGHT] = {\n  0xFF0000FF\n};\n"));

        let narrow = emit_array(&array("gray", ElementWidth::Bits8, vec![0x0A, 0xFF]));
        assert!(narrow.contains("  0x0A, 0xFF\n"));
    }

    #[test]
    fn test_exact_multiple_of_eight_has_no_trailing_comma() {
        let text = emit_array(&array("a", ElementWidth::Bits16, vec![0; 16]));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[3].ends_with(','));
        assert!(!lines[4].ends_with(','));
        assert_eq!(lines[5], "};");
    }

    #[test]
    fn test_emitted_array_extracts_back() {
        let source = array("round_trip", ElementWidth::Bits16, (0..20).map(|v| v * 0x0101).collect());
        let extracted = extract(&emit_array(&source));
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].name, "round_trip");
        assert_eq!(extracted[0].values, source.values);
        assert_eq!(extracted[0].element_width, ElementWidth::Bits16);
    }

    #[test]
    fn test_emit_combined() {
        let text = emit_combined(&[
            array("first", ElementWidth::Bits16, vec![1]),
            array("second", ElementWidth::Bits16, vec![2]),
        ]);
        assert_eq!(text.matches("#include").count(), 1);
        let arrays = extract(&text);
        assert_eq!(arrays.len(), 2);
        assert_eq!(arrays[1].name, "second");
    }

    #[test]
    fn test_make_identifier() {
        assert_eq!(make_identifier("3-eyes", None), "img_3_eyes");
        assert_eq!(make_identifier("3-eyes", Some("")), "img_3_eyes");
        assert_eq!(make_identifier("big blue", Some("eye")), "eye_big_blue");
        assert_eq!(make_identifier("目.v2", None), "__v2");
        assert_eq!(make_identifier("1", Some("2")), "img_2_1");
    }

    #[test]
    fn test_profile_auto_selection() {
        let small = vec![ImageSizeRecord { name: "a".into(), width: 160, height: 100 }];
        assert_eq!(ProfileChoice::Auto.resolve(&small), ScreenProfile::Screen160);

        let large = vec![
            ImageSizeRecord { name: "a".into(), width: 100, height: 100 },
            ImageSizeRecord { name: "b".into(), width: 120, height: 161 },
        ];
        assert_eq!(ProfileChoice::Auto.resolve(&large), ScreenProfile::Screen240);

        let fixed = ProfileChoice::Fixed(ScreenProfile::Screen160);
        assert_eq!(fixed.resolve(&large), ScreenProfile::Screen160);
    }

    #[test]
    fn test_profile_choice_from_str() {
        assert_eq!("auto".parse::<ProfileChoice>().unwrap(), ProfileChoice::Auto);
        assert_eq!(
            "240x240".parse::<ProfileChoice>().unwrap(),
            ProfileChoice::Fixed(ScreenProfile::Screen240)
        );
        assert!("320x240".parse::<ProfileChoice>().is_err());
    }

    #[test]
    fn test_definitions_file_round_trips_through_registry() {
        let images = vec![ImageSizeRecord { name: "eye_big".into(), width: 240, height: 200 }];
        let text = emit_definitions_file(ScreenProfile::Screen240, &images);

        assert!(text.contains("#define SYMMETRICAL_EYELID\n"));
        assert!(text.contains("#define EYE_BIG_WIDTH  240\n#define EYE_BIG_HEIGHT 200\n"));

        let (sizes, found) = parse_definitions(&text);
        assert_eq!(found.len(), 8);
        assert_eq!(sizes, ScreenProfile::Screen240.sizes());
    }

    #[test]
    fn test_definitions_file_without_images() {
        let text = emit_definitions_file(ScreenProfile::Screen160, &[]);
        assert!(text.starts_with("#define IRIS_MAP_WIDTH 314\n#define IRIS_MAP_HEIGHT 50\n\n"));
        assert!(!text.contains("Generated"));
    }
}
