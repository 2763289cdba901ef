//! サイズ定義（common.h）の管理
//!
//! 虹彩マップ・強膜・画面・虹彩の4種類のサイズを保持する。
//! 外部の定義ファイルが見つからなければ組み込みのデフォルト値を使う。

use crate::error::{ConvertError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// `#define NAME VALUE` 形式の行
static DEFINE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#define\s+(\w+)\s+(\d+)").unwrap());

/// 幅と高さの組
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Dimensions { width, height }
    }

    /// 総ピクセル数
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// 長辺の長さ
    pub fn larger_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// 画像カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    IrisMap,
    Sclera,
    Screen,
    Iris,
}

impl SizeCategory {
    /// 分類の優先順
    pub const ALL: [SizeCategory; 4] = [
        SizeCategory::IrisMap,
        SizeCategory::Sclera,
        SizeCategory::Screen,
        SizeCategory::Iris,
    ];

    /// 表示用ラベル
    pub fn label(&self) -> &'static str {
        match self {
            SizeCategory::IrisMap => "iris map",
            SizeCategory::Sclera => "sclera",
            SizeCategory::Screen => "screen/full eye",
            SizeCategory::Iris => "iris",
        }
    }

    /// 配列名に含まれていればこのカテゴリとみなすキーワード
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            SizeCategory::IrisMap => &["iris_map", "irismap"],
            SizeCategory::Sclera => &["sclera"],
            SizeCategory::Screen => &["screen", "eye", "full"],
            SizeCategory::Iris => &["iris"],
        }
    }

    /// (幅マクロ名, 高さマクロ名)
    pub fn macro_names(&self) -> (&'static str, &'static str) {
        match self {
            SizeCategory::IrisMap => ("IRIS_MAP_WIDTH", "IRIS_MAP_HEIGHT"),
            SizeCategory::Sclera => ("SCLERA_WIDTH", "SCLERA_HEIGHT"),
            SizeCategory::Screen => ("SCREEN_WIDTH", "SCREEN_HEIGHT"),
            SizeCategory::Iris => ("IRIS_WIDTH", "IRIS_HEIGHT"),
        }
    }
}

/// 4カテゴリ分のサイズ定義
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDefinitions {
    pub iris_map: Dimensions,
    pub sclera: Dimensions,
    pub screen: Dimensions,
    pub iris: Dimensions,
}

impl SizeDefinitions {
    /// 組み込みのデフォルト値（160x160 画面）
    pub const BUILT_IN: SizeDefinitions = SizeDefinitions {
        iris_map: Dimensions::new(314, 50),
        sclera: Dimensions::new(250, 250),
        screen: Dimensions::new(160, 160),
        iris: Dimensions::new(100, 100),
    };

    pub fn get(&self, category: SizeCategory) -> Dimensions {
        match category {
            SizeCategory::IrisMap => self.iris_map,
            SizeCategory::Sclera => self.sclera,
            SizeCategory::Screen => self.screen,
            SizeCategory::Iris => self.iris,
        }
    }

    fn get_mut(&mut self, category: SizeCategory) -> &mut Dimensions {
        match category {
            SizeCategory::IrisMap => &mut self.iris_map,
            SizeCategory::Sclera => &mut self.sclera,
            SizeCategory::Screen => &mut self.screen,
            SizeCategory::Iris => &mut self.iris,
        }
    }

    /// 既知の定数名なら値を設定して true を返す
    pub fn set_constant(&mut self, name: &str, value: u32) -> bool {
        for category in SizeCategory::ALL {
            let (width_name, height_name) = category.macro_names();
            if name == width_name {
                self.get_mut(category).width = value;
                return true;
            }
            if name == height_name {
                self.get_mut(category).height = value;
                return true;
            }
        }
        false
    }
}

impl Default for SizeDefinitions {
    fn default() -> Self {
        Self::BUILT_IN
    }
}

/// 定義ファイルのテキストを解析する
///
/// 戻り値は（デフォルト値に上書きした定義, 認識した定数の一覧）。
/// 同じ定数が複数回現れた場合は後のものが優先される。
pub fn parse_definitions(text: &str) -> (SizeDefinitions, Vec<(String, u32)>) {
    let mut sizes = SizeDefinitions::BUILT_IN;
    let mut found: Vec<(String, u32)> = Vec::new();

    for caps in DEFINE_PATTERN.captures_iter(text) {
        let name = &caps[1];
        let Ok(value) = caps[2].parse::<u32>() else {
            continue;
        };
        if !sizes.set_constant(name, value) {
            continue;
        }
        match found.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => found.push((name.to_string(), value)),
        }
    }

    (sizes, found)
}

/// 外部ファイルから読み込んだ定義
#[derive(Debug, Clone, Serialize)]
pub struct LoadedDefinitions {
    pub sizes: SizeDefinitions,
    pub path: PathBuf,
    /// ファイル中で認識できた定数
    pub found: Vec<(String, u32)>,
}

/// 指定された定義ファイルを読み込む
///
/// ファイルが無い、または既知の定数が一つも無い場合はエラー。
pub fn load_explicit(path: &Path) -> Result<LoadedDefinitions> {
    if !path.is_file() {
        return Err(ConvertError::DefinitionsNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    let (sizes, found) = parse_definitions(&text);
    if found.is_empty() {
        return Err(ConvertError::DefinitionsParseEmpty(path.to_path_buf()));
    }
    info!("Loaded {} size definition(s) from {}", found.len(), path.display());
    Ok(LoadedDefinitions {
        sizes,
        path: path.to_path_buf(),
        found,
    })
}

/// 検索ルートを順に（再帰的に）探索し、最初に有効な定義ファイルを返す
///
/// 見つからなくてもエラーにはしない。
pub fn load(search_roots: &[PathBuf], file_name: &str) -> Option<LoadedDefinitions> {
    for root in search_roots {
        let candidates = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == file_name);

        for entry in candidates {
            let text = match std::fs::read_to_string(entry.path()) {
                Ok(text) => text,
                Err(e) => {
                    debug!("Skipping unreadable {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            let (sizes, found) = parse_definitions(&text);
            if found.is_empty() {
                debug!("No size definitions in {}", entry.path().display());
                continue;
            }
            info!("Found {} size definition(s) in {}", found.len(), entry.path().display());
            return Some(LoadedDefinitions {
                sizes,
                path: entry.into_path(),
                found,
            });
        }
    }
    None
}

/// 変換セッションで使うサイズ定義
///
/// 外部ファイルから読み込んだかどうかは分類の挙動を変えるため、値と一緒に保持する。
#[derive(Debug, Clone, Serialize)]
pub struct SizeRegistry {
    sizes: SizeDefinitions,
    source: Option<PathBuf>,
}

impl SizeRegistry {
    /// 組み込みのデフォルト値のみ
    pub fn built_in() -> Self {
        SizeRegistry {
            sizes: SizeDefinitions::BUILT_IN,
            source: None,
        }
    }

    /// 検索ルートから探す（見つからなければデフォルト値）
    pub fn discover(search_roots: &[PathBuf], file_name: &str) -> Self {
        match load(search_roots, file_name) {
            Some(loaded) => loaded.into(),
            None => {
                warn!("No {} with size definitions found, using built-in defaults", file_name);
                Self::built_in()
            }
        }
    }

    /// 明示的に指定したファイルから読み込む
    pub fn from_file(path: &Path) -> Result<Self> {
        load_explicit(path).map(Self::from)
    }

    pub fn sizes(&self) -> &SizeDefinitions {
        &self.sizes
    }

    /// 読み込み元のファイル（デフォルト値なら None）
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_external(&self) -> bool {
        self.source.is_some()
    }
}

impl From<LoadedDefinitions> for SizeRegistry {
    fn from(loaded: LoadedDefinitions) -> Self {
        SizeRegistry {
            sizes: loaded.sizes,
            source: Some(loaded.path),
        }
    }
}
