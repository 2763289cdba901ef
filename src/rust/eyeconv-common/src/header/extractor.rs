//! ヘッダテキストから数値配列の宣言を取り出す
//!
//! 完全な C パーサではなく、限られた宣言の形だけをパターンで認識する:
//! `[const|static ...] <整数型> <名前> [ ... ] = { <値> };`

use super::{ElementWidth, ExtractedArray};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// 配列宣言。括弧内のサイズ式は読み飛ばす。
static ARRAY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(uint8_t|uint16_t|uint32_t|unsigned\s+char|unsigned\s+short|unsigned\s+int)\s+([A-Za-z_]\w*)\s*\[[^\]]*\]\s*=\s*\{([^}]*)\}",
    )
    .unwrap()
});

/// 16進リテラル（接頭辞は小文字の `0x` のみ）
static HEX_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"0x([0-9A-Fa-f]+)").unwrap());

static WORD_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// テキスト中の認識可能な配列宣言をすべて出現順に返す
///
/// パターンに合わない宣言や、値が一つも取れない宣言は黙って読み飛ばす。
pub fn extract(text: &str) -> Vec<ExtractedArray> {
    let mut arrays = Vec::new();

    for caps in ARRAY_PATTERN.captures_iter(text) {
        let Some(element_width) = ElementWidth::from_c_type(&caps[1]) else {
            continue;
        };
        let name = caps[2].to_string();
        let values = parse_values(&caps[3]);

        if values.is_empty() {
            debug!("Skipping array {} with no values", name);
            continue;
        }

        arrays.push(ExtractedArray {
            name,
            values,
            element_width,
        });
    }

    arrays
}

/// 波括弧内の値を読む
///
/// 16進リテラルが一つでもあれば16進リテラルだけを読み、10進に見えるトークンは無視する。
/// 無ければ10進の数字トークンをすべて読む。
/// 32bit を超える値は下位32bitを残す。
fn parse_values(body: &str) -> Vec<u32> {
    if HEX_LITERAL.is_match(body) {
        return HEX_LITERAL
            .captures_iter(body)
            .map(|c| parse_hex(c.get(1).map_or("", |m| m.as_str())))
            .collect();
    }

    WORD_TOKEN
        .find_iter(body)
        .map(|m| m.as_str())
        .filter(|token| token.bytes().all(|b| b.is_ascii_digit()))
        .map(parse_decimal)
        .collect()
}

fn parse_hex(digits: &str) -> u32 {
    if digits.trim_start_matches('0').len() > 8 {
        warn!("Hex literal 0x{} exceeds 32 bits, keeping the low 32 bits", digits);
    }
    let low = &digits[digits.len().saturating_sub(8)..];
    u32::from_str_radix(low, 16).unwrap_or(0)
}

fn parse_decimal(token: &str) -> u32 {
    // 桁ごとに 2^32 の剰余を取る
    let value = token
        .bytes()
        .fold(0u64, |acc, b| (acc * 10 + (b - b'0') as u64) & 0xFFFF_FFFF);
    if token.parse::<u32>().is_err() {
        warn!("Decimal literal {} exceeds 32 bits, keeping the low 32 bits", token);
    }
    value as u32
}
