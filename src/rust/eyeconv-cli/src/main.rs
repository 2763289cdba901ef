//! eyeconv コマンドライン
//!
//! 入力ファイルの探索、ログ初期化、設定の読み込みを行い、変換は共通ライブラリに任せる。

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use eyeconv_common::config::LoggingConfig;
use eyeconv_common::header::emitter::DEFINITIONS_FILE_NAME;
use eyeconv_common::{
    BatchReport, ColorFormat, HeaderToPngConverter, PngToHeaderConverter, ProfileChoice, SizeCategory,
    SizeRegistry, Settings, NAME, VERSION,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

/// 目玉ディスプレイ用ビットマップ変換ツール
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 設定ファイル (.json / .toml / .yaml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// ログレベル設定 (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 詳細ログ出力（debug レベル）
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 静かなモード（エラーのみ表示）
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// C ヘッダの配列を PNG に変換
    #[command(name = "h2png")]
    HeaderToPng(HeaderToPngArgs),

    /// PNG を C ヘッダに変換
    #[command(name = "png2h")]
    PngToHeader(PngToHeaderArgs),

    /// 使用されるサイズ定義を表示
    Sizes(SizesArgs),

    /// 有効な設定を表示、または保存
    Config(ConfigArgs),
}

#[derive(ClapArgs, Debug)]
struct HeaderToPngArgs {
    /// ヘッダファイル、またはそれを含むディレクトリ
    #[arg(short, long)]
    input: PathBuf,

    /// 出力ディレクトリ
    #[arg(short, long)]
    output: PathBuf,

    /// 色フォーマット (RGB565, RGB888, ARGB8888)
    #[arg(short, long)]
    format: Option<ColorFormat>,

    /// サイズ定義ファイル（探索せずにこれを使う）
    #[arg(short, long)]
    definitions: Option<PathBuf>,

    /// サイズの自動判定を無効にし、画面サイズで出力
    #[arg(long)]
    no_auto_size: bool,

    /// 結果を JSON で出力
    #[arg(long)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct PngToHeaderArgs {
    /// PNG ファイル、またはそれを含むディレクトリ
    #[arg(short, long)]
    input: PathBuf,

    /// 出力ディレクトリ
    #[arg(short, long)]
    output: PathBuf,

    /// 色フォーマット (RGB565, RGB888, ARGB8888)
    #[arg(short, long)]
    format: Option<ColorFormat>,

    /// 配列名のプレフィックス
    #[arg(short, long)]
    prefix: Option<String>,

    /// すべての配列を1つのヘッダにまとめる
    #[arg(short, long)]
    merge: bool,

    /// common.h の画面プロファイル (auto, 160x160, 240x240)
    #[arg(short, long)]
    screen: Option<ProfileChoice>,

    /// 結果を JSON で出力
    #[arg(long)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct SizesArgs {
    /// サイズ定義ファイル（探索せずにこれを使う）
    #[arg(short, long)]
    definitions: Option<PathBuf>,

    /// 追加の探索ディレクトリ（設定の探索ルートの後に探す）
    #[arg(short, long)]
    search: Vec<PathBuf>,

    /// 結果を JSON で出力
    #[arg(long)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct ConfigArgs {
    /// 保存先 (.json / .toml / .yaml)。省略時は JSON を標準出力へ
    #[arg(short, long)]
    write: Option<String>,
}

fn main() -> Result<()> {
    let Args {
        config,
        log_level,
        verbose,
        quiet,
        command,
    } = Args::parse();

    let mut settings = Settings::load(config.as_deref()).context("設定の読み込みに失敗しました")?;
    if let Some(level) = log_level {
        settings.logging.level = level;
    }
    settings.validate().context("設定が不正です")?;

    init_logging(&settings.logging, verbose, quiet)?;
    info!("{} {} starting", NAME, VERSION);

    match command {
        Command::HeaderToPng(args) => run_header_to_png(settings, args),
        Command::PngToHeader(args) => run_png_to_header(settings, args),
        Command::Sizes(args) => run_sizes(settings, args),
        Command::Config(args) => run_config(settings, args),
    }
}

/// ログ初期化（標準エラー出力と、設定されていればファイル）
fn init_logging(logging: &LoggingConfig, verbose: bool, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        logging.level.parse::<Level>().unwrap_or(Level::INFO)
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let file_layer = match &logging.file_path {
        Some(path) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("ログファイルを開けません: {}", path.display()))?;
            // ファイルにはANSIエスケープコードを出力しない
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    // 標準出力は結果（サマリ / JSON）専用
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(env_filter)
        .init();

    Ok(())
}

fn run_header_to_png(mut settings: Settings, args: HeaderToPngArgs) -> Result<()> {
    if let Some(format) = args.format {
        settings.conversion.color_format = format;
    }
    if args.no_auto_size {
        settings.conversion.auto_detect_size = false;
    }
    if args.definitions.is_some() {
        settings.conversion.definitions_file = args.definitions;
    }

    let (files, input_root) = collect_files(&args.input, is_header_file)?;
    if files.is_empty() {
        warn!("No .h files found under {}", args.input.display());
    }

    let registry = resolve_registry(&settings, &[input_root])?;
    info!(
        "Color format: {}, size detection: {}",
        settings.conversion.color_format,
        if settings.conversion.auto_detect_size { "auto" } else { "manual" }
    );

    let converter = HeaderToPngConverter::from_settings(&settings, registry);
    let report = converter.convert_files(&files, &args.output);
    finish(&report, args.json)
}

fn run_png_to_header(mut settings: Settings, args: PngToHeaderArgs) -> Result<()> {
    if let Some(format) = args.format {
        settings.conversion.color_format = format;
    }
    if args.prefix.is_some() {
        settings.conversion.prefix = args.prefix;
    }
    if args.merge {
        settings.conversion.merge_output = true;
    }
    if let Some(screen) = args.screen {
        settings.conversion.screen_profile = screen;
    }

    let (files, input_root) = collect_files(&args.input, is_png_file)?;
    if files.is_empty() {
        warn!("No .png files found under {}", args.input.display());
    }
    info!(
        "Color format: {}, merge output: {}",
        settings.conversion.color_format, settings.conversion.merge_output
    );

    let converter = PngToHeaderConverter::from_settings(&settings);
    let report = converter.convert_files(&files, &input_root, &args.output);
    finish(&report, args.json)
}

fn run_sizes(mut settings: Settings, args: SizesArgs) -> Result<()> {
    if args.definitions.is_some() {
        settings.conversion.definitions_file = args.definitions;
    }
    let registry = resolve_registry(&settings, &args.search)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&registry)?);
        return Ok(());
    }

    match registry.source() {
        Some(path) => println!("Source: {}", path.display()),
        None => println!("Source: built-in defaults"),
    }
    for category in SizeCategory::ALL {
        println!("  {:<16} {}", category.label(), registry.sizes().get(category));
    }
    Ok(())
}

fn run_config(settings: Settings, args: ConfigArgs) -> Result<()> {
    match args.write {
        Some(path) => {
            settings
                .save_to_file(&path)
                .with_context(|| format!("設定を保存できません: {}", path))?;
            info!("Settings written to {}", path);
        }
        None => println!("{}", serde_json::to_string_pretty(&settings)?),
    }
    Ok(())
}

/// サイズ定義を決める
///
/// 明示されたファイルが読めなければエラー。探索は設定の探索ルート、追加ルートの順。
fn resolve_registry(settings: &Settings, extra_roots: &[PathBuf]) -> Result<SizeRegistry> {
    if let Some(path) = &settings.conversion.definitions_file {
        return SizeRegistry::from_file(path)
            .with_context(|| format!("定義ファイルを読み込めません: {}", path.display()));
    }

    let mut roots = settings.paths.definitions_search_roots.clone();
    roots.extend(extra_roots.iter().cloned());
    let registry = SizeRegistry::discover(&roots, DEFINITIONS_FILE_NAME);
    if let Some(source) = registry.source() {
        info!("Using size definitions from {}", source.display());
    }
    Ok(registry)
}

fn is_header_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "h")
}

fn is_png_file(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.to_string_lossy().eq_ignore_ascii_case("png"))
}

/// 入力ファイルを集める（ディレクトリなら再帰、パス順）
///
/// 戻り値の2つ目は相対パスの基準になる入力ルート。
fn collect_files(input: &Path, accept: fn(&Path) -> bool) -> Result<(Vec<PathBuf>, PathBuf)> {
    if input.is_file() {
        let root = input.parent().map(Path::to_path_buf).unwrap_or_default();
        return Ok((vec![input.to_path_buf()], root));
    }
    if !input.is_dir() {
        bail!("入力が見つかりません: {}", input.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("ディレクトリを読めません: {}", input.display()))?;
        if entry.file_type().is_file() && accept(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok((files, input.to_path_buf()))
}

/// サマリを出力し、失敗があれば終了コードを非ゼロにする
fn finish(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!(
            "Files: {}/{} converted, arrays: {}/{} converted",
            report.files_converted(),
            report.files_total(),
            report.arrays_converted(),
            report.arrays_total()
        );
        for file in report.files.iter().filter(|f| !f.succeeded()) {
            match (&file.message, &file.error_code) {
                (Some(message), Some(code)) => {
                    println!("  {:?} {}: [{}] {}", file.status, file.path.display(), code, message)
                }
                (Some(message), None) => println!("  {:?} {}: {}", file.status, file.path.display(), message),
                _ => println!("  {:?} {}", file.status, file.path.display()),
            }
            for array in file.arrays.iter().filter(|a| !a.succeeded()) {
                println!(
                    "    {}: [{}] {}",
                    array.name,
                    array.error_code.as_deref().unwrap_or("-"),
                    array.error.as_deref().unwrap_or("")
                );
            }
        }
        if let Some(path) = &report.combined_file {
            println!("Combined header: {}", path.display());
        }
        if let Some(path) = &report.definitions_file {
            println!("Definitions: {}", path.display());
        }
        for error in &report.errors {
            println!("  Error: {}", error);
        }
    }

    if !report.is_clean() {
        bail!("{}", failure_summary(report));
    }
    Ok(())
}

/// 失敗の要約（読み飛ばしたファイルは失敗に数えない）
fn failure_summary(report: &BatchReport) -> String {
    let mut summary = format!(
        "{} of {} file(s) did not convert cleanly",
        report.files_failed(),
        report.files_total()
    );
    if !report.errors.is_empty() {
        summary.push_str(&format!(", {} output error(s)", report.errors.len()));
    }
    summary
}
