//! 配列名と要素数から画像サイズを推定する
//!
//! 判定順:
//! 1. 外部定義を読み込んでいれば要素数の完全一致（複数あれば名前のキーワードで絞る）
//! 2. 完全平方数なら正方形
//! 3. よくある縦横比 16:9, 4:3, 3:2, 1:1（倍率 1..199）
//! 4. 画面サイズ

use crate::sizes::{Dimensions, SizeCategory, SizeDefinitions};
use serde::Serialize;

/// 外部定義が無いときのフォールバックサイズ
const FIXED_DEFAULT: Dimensions = Dimensions::new(160, 160);

/// 推定に使う縦横比（この順に試す）
const COMMON_RATIOS: [(u32, u32); 4] = [(16, 9), (4, 3), (3, 2), (1, 1)];

/// サイズがどの規則で決まったか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    ExactSizeMatch,
    NameKeywordMatch,
    InferredSquare,
    InferredRatio,
    DefaultFallback,
    /// 自動判定を無効にして画面サイズを使った
    Manual,
}

/// 推定結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedImage {
    pub width: u32,
    pub height: u32,
    pub label: String,
    pub source: ClassificationSource,
}

impl ClassifiedImage {
    fn new(size: Dimensions, label: impl Into<String>, source: ClassificationSource) -> Self {
        ClassifiedImage {
            width: size.width,
            height: size.height,
            label: label.into(),
            source,
        }
    }

    /// 自動判定を使わず画面サイズで描画する場合
    pub fn manual(sizes: &SizeDefinitions) -> Self {
        Self::new(sizes.screen, "manual", ClassificationSource::Manual)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// 画像サイズを推定する
///
/// 引数のみに依存する純粋関数。
pub fn classify(
    name: &str,
    element_count: usize,
    sizes: &SizeDefinitions,
    sizes_loaded_externally: bool,
) -> ClassifiedImage {
    if sizes_loaded_externally {
        if let Some(found) = match_known_size(name, element_count, sizes) {
            return found;
        }
    }

    if element_count > 0 {
        let side = integer_sqrt(element_count);
        if side * side == element_count {
            let side = side as u32;
            return ClassifiedImage::new(
                Dimensions::new(side, side),
                "inferred square",
                ClassificationSource::InferredSquare,
            );
        }

        for (w_ratio, h_ratio) in COMMON_RATIOS {
            for scale in 1..200 {
                let (w, h) = (w_ratio * scale, h_ratio * scale);
                if w as usize * h as usize == element_count {
                    return ClassifiedImage::new(
                        Dimensions::new(w, h),
                        format!("inferred ratio ({}:{})", w_ratio, h_ratio),
                        ClassificationSource::InferredRatio,
                    );
                }
            }
        }
    }

    if sizes_loaded_externally {
        ClassifiedImage::new(sizes.screen, "definitions default", ClassificationSource::DefaultFallback)
    } else {
        ClassifiedImage::new(FIXED_DEFAULT, "fixed default", ClassificationSource::DefaultFallback)
    }
}

fn match_known_size(
    name: &str,
    element_count: usize,
    sizes: &SizeDefinitions,
) -> Option<ClassifiedImage> {
    let exact: Vec<SizeCategory> = SizeCategory::ALL
        .into_iter()
        .filter(|c| sizes.get(*c).pixel_count() == element_count)
        .collect();

    let first = *exact.first()?;
    if exact.len() == 1 {
        return Some(ClassifiedImage::new(
            sizes.get(first),
            first.label(),
            ClassificationSource::ExactSizeMatch,
        ));
    }

    let lower = name.to_lowercase();
    let by_keyword = exact
        .iter()
        .find(|c| c.keywords().iter().any(|k| lower.contains(k)));

    Some(match by_keyword {
        Some(category) => ClassifiedImage::new(
            sizes.get(*category),
            category.label(),
            ClassificationSource::NameKeywordMatch,
        ),
        None => ClassifiedImage::new(sizes.get(first), first.label(), ClassificationSource::ExactSizeMatch),
    })
}

fn integer_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: SizeDefinitions = SizeDefinitions::BUILT_IN;

    #[test]
    fn test_exact_match_with_loaded_sizes() {
        let result = classify("left_sclera", 250 * 250, &DEFAULTS, true);
        assert_eq!((result.width, result.height), (250, 250));
        assert_eq!(result.label, "sclera");
        assert_eq!(result.source, ClassificationSource::ExactSizeMatch);
    }

    #[test]
    fn test_iris_map_exact_match() {
        let result = classify("my_iris_map_tex", 15700, &DEFAULTS, true);
        assert_eq!((result.width, result.height), (314, 50));
        assert_eq!(result.label, "iris map");
    }

    #[test]
    fn test_without_loaded_sizes_falls_through() {
        // 15700 は平方数でも既知の比率でもない
        let result = classify("my_iris_map_tex", 15700, &DEFAULTS, false);
        assert_eq!((result.width, result.height), (160, 160));
        assert_eq!(result.source, ClassificationSource::DefaultFallback);
    }

    #[test]
    fn test_ambiguous_count_uses_keywords() {
        // 強膜と画面が同じ要素数になる定義
        let mut sizes = DEFAULTS;
        sizes.sclera = Dimensions::new(160, 160);

        let by_name = classify("eye_full_bg", 25600, &sizes, true);
        assert_eq!(by_name.label, "screen/full eye");
        assert_eq!(by_name.source, ClassificationSource::NameKeywordMatch);

        let unnamed = classify("pattern", 25600, &sizes, true);
        assert_eq!(unnamed.label, "sclera");
        assert_eq!(unnamed.source, ClassificationSource::ExactSizeMatch);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let mut sizes = DEFAULTS;
        sizes.iris = Dimensions::new(250, 250);
        let result = classify("LEFT_IRIS", 62500, &sizes, true);
        assert_eq!(result.label, "iris");
        assert_eq!(result.source, ClassificationSource::NameKeywordMatch);
    }

    #[test]
    fn test_square_inference() {
        let result = classify("anything", 64 * 64, &DEFAULTS, false);
        assert_eq!((result.width, result.height), (64, 64));
        assert_eq!(result.source, ClassificationSource::InferredSquare);
    }

    #[test]
    fn test_square_before_loaded_miss() {
        // 外部定義があっても一致しなければ推定に進む
        let result = classify("thing", 49, &DEFAULTS, true);
        assert_eq!((result.width, result.height), (7, 7));
    }

    #[test]
    fn test_ratio_inference_order() {
        // 16:9 の積は常に平方数 (144 * s^2) なので平方数として判定される
        let wide = classify("x", 160 * 90, &DEFAULTS, false);
        assert_eq!((wide.width, wide.height), (120, 120));
        assert_eq!(wide.source, ClassificationSource::InferredSquare);

        let four_three = classify("x", 40 * 30, &DEFAULTS, false);
        assert_eq!((four_three.width, four_three.height), (40, 30));
        assert_eq!(four_three.label, "inferred ratio (4:3)");
        assert_eq!(four_three.source, ClassificationSource::InferredRatio);

        let three_two = classify("x", 6, &DEFAULTS, false);
        assert_eq!((three_two.width, three_two.height), (3, 2));
    }

    #[test]
    fn test_fallback_uses_loaded_screen_size() {
        let mut sizes = DEFAULTS;
        sizes.screen = Dimensions::new(240, 240);
        let loaded = classify("x", 7, &sizes, true);
        assert_eq!((loaded.width, loaded.height), (240, 240));
        assert_eq!(loaded.source, ClassificationSource::DefaultFallback);

        let fixed = classify("x", 7, &sizes, false);
        assert_eq!((fixed.width, fixed.height), (160, 160));
    }

    #[test]
    fn test_integer_sqrt() {
        assert_eq!(integer_sqrt(0), 0);
        assert_eq!(integer_sqrt(15624), 124);
        assert_eq!(integer_sqrt(15625), 125);
        assert_eq!(integer_sqrt(15700), 125);
    }
}
