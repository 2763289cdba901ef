//! 共通設定管理モジュール

use crate::error::{ConvertError, Result};
use crate::header::ProfileChoice;
use crate::image::codec::DEFAULT_MAX_DECODE_PIXELS;
use crate::image::processor::DEFAULT_MAX_IMAGE_BYTES;
use crate::image::ColorFormat;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// 変換設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// 色フォーマット
    pub color_format: ColorFormat,

    /// 配列名のプレフィックス
    pub prefix: Option<String>,

    /// すべての配列を1つのヘッダにまとめる
    pub merge_output: bool,

    /// 定義ファイルの画面プロファイル
    pub screen_profile: ProfileChoice,

    /// 配列サイズの自動判定
    pub auto_detect_size: bool,

    /// 明示的に使う定義ファイル
    pub definitions_file: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            color_format: ColorFormat::Rgb565,
            prefix: None,
            merge_output: false,
            screen_profile: ProfileChoice::Auto,
            auto_detect_size: true,
            definitions_file: None,
        }
    }
}

/// パス設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// 定義ファイルを探すディレクトリ（この順に再帰探索）
    pub definitions_search_roots: Vec<PathBuf>,

    /// マージ出力時のファイル名
    pub combined_file_name: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            definitions_search_roots: vec![PathBuf::from(".")],
            combined_file_name: "combined_images.h".to_string(),
        }
    }
}

/// ロギング設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// ログレベル
    pub level: String,

    /// ログファイルパス（指定時はファイルにも出力）
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file_path: None,
        }
    }
}

/// 入力制限
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// 入力画像の最大バイト数
    pub max_image_bytes: usize,

    /// ヘッダから描画する画像の最大ピクセル数
    pub max_decode_pixels: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_decode_pixels: DEFAULT_MAX_DECODE_PIXELS,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub conversion: ConversionConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
    pub limits: LimitsConfig,
}

impl Settings {
    /// 設定を読み込む
    ///
    /// 読み込み優先順位：
    /// 1. 環境変数
    /// 2. 設定ファイル（`config_path`、None なら EYECONV_CONFIG で指定されたもの）
    /// 3. デフォルト値
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config_path = config_path
            .map(str::to_string)
            .or_else(|| env::var("EYECONV_CONFIG").ok());
        let mut settings = match config_path {
            Some(config_path) => Self::from_file(&config_path)?,
            None => Self::default(),
        };

        settings.override_from_env()?;

        Ok(settings)
    }

    /// 設定ファイルから読み込む
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("Failed to read config file: {}", e)))?;

        // JSON形式
        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| ConvertError::Config(format!("Failed to parse JSON config: {}", e)))
        }
        // TOML形式
        else if path.ends_with(".toml") {
            toml::from_str(&content)
                .map_err(|e| ConvertError::Config(format!("Failed to parse TOML config: {}", e)))
        }
        // YAML形式
        else if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::from_str(&content)
                .map_err(|e| ConvertError::Config(format!("Failed to parse YAML config: {}", e)))
        } else {
            Err(ConvertError::Config("Unsupported config file format".to_string()))
        }
    }

    /// 環境変数で設定を上書き
    fn override_from_env(&mut self) -> Result<()> {
        if let Ok(format) = env::var("EYECONV_COLOR_FORMAT") {
            self.conversion.color_format = format.parse()?;
        }
        if let Ok(prefix) = env::var("EYECONV_PREFIX") {
            self.conversion.prefix = Some(prefix).filter(|p| !p.is_empty());
        }
        if let Ok(merge) = env::var("EYECONV_MERGE_OUTPUT") {
            self.conversion.merge_output = parse_flag(&merge);
        }
        if let Ok(profile) = env::var("EYECONV_SCREEN_PROFILE") {
            self.conversion.screen_profile = profile.parse()?;
        }
        if let Ok(auto_detect) = env::var("EYECONV_AUTO_DETECT_SIZE") {
            self.conversion.auto_detect_size = parse_flag(&auto_detect);
        }
        if let Ok(definitions) = env::var("EYECONV_DEFINITIONS_FILE") {
            self.conversion.definitions_file = Some(PathBuf::from(definitions));
        }

        // ロギング設定
        if let Ok(log_level) = env::var("EYECONV_LOG_LEVEL") {
            self.logging.level = log_level;
        }
        if let Ok(log_file) = env::var("EYECONV_LOG_FILE") {
            self.logging.file_path = Some(PathBuf::from(log_file));
        }

        Ok(())
    }

    /// 設定を検証
    pub fn validate(&self) -> Result<()> {
        if self.paths.combined_file_name.trim().is_empty() {
            return Err(ConvertError::Config("Combined file name cannot be empty".to_string()));
        }

        if self.limits.max_image_bytes == 0 {
            return Err(ConvertError::Config("max_image_bytes must be greater than 0".to_string()));
        }

        if self.limits.max_decode_pixels == 0 {
            return Err(ConvertError::Config("max_decode_pixels must be greater than 0".to_string()));
        }

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(ConvertError::Config(format!("Invalid log level: {}", self.logging.level)));
        }

        Ok(())
    }

    /// 設定をファイルに保存
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = if path.ends_with(".json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| ConvertError::Config(format!("Failed to serialize to JSON: {}", e)))?
        } else if path.ends_with(".toml") {
            toml::to_string_pretty(self)
                .map_err(|e| ConvertError::Config(format!("Failed to serialize to TOML: {}", e)))?
        } else if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::to_string(self)
                .map_err(|e| ConvertError::Config(format!("Failed to serialize to YAML: {}", e)))?
        } else {
            return Err(ConvertError::Config("Unsupported config file format".to_string()));
        };

        std::fs::write(path, content)
            .map_err(|e| ConvertError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ScreenProfile;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.conversion.color_format, ColorFormat::Rgb565);
        assert!(settings.conversion.auto_detect_size);
        assert_eq!(settings.paths.combined_file_name, "combined_images.h");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.logging.level = "loud".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.limits.max_image_bytes = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.limits.max_decode_pixels = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eyeconv.toml");
        std::fs::write(
            &path,
            "[conversion]\ncolor_format = \"ARGB8888\"\nscreen_profile = \"240x240\"\nprefix = \"eye\"\n",
        )
        .unwrap();

        let settings = Settings::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.conversion.color_format, ColorFormat::Argb8888);
        assert_eq!(
            settings.conversion.screen_profile,
            ProfileChoice::Fixed(ScreenProfile::Screen240)
        );
        assert_eq!(settings.conversion.prefix.as_deref(), Some("eye"));
        assert!(!settings.conversion.merge_output);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_save_and_reload_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.conversion.merge_output = true;
        settings.conversion.color_format = ColorFormat::Rgb888;

        for name in ["config.json", "config.toml", "config.yaml"] {
            let path = dir.path().join(name);
            let path = path.to_str().unwrap();
            settings.save_to_file(path).unwrap();
            let loaded = Settings::from_file(path).unwrap();
            assert!(loaded.conversion.merge_output, "{}", name);
            assert_eq!(loaded.conversion.color_format, ColorFormat::Rgb888, "{}", name);
        }
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(Settings::default().save_to_file("config.ini").is_err());
    }
}
