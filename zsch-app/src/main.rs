use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use zsch_config::{AppConfig, ConfigError, OutputFormat};
use zsch_engine::EditSettings;
use zsch_io::{DocumentSaver, SchFacade};

mod demo;

use demo::{Demo, DemoOptions, DemoReport};

#[derive(Parser)]
#[command(name = "zsch")]
#[command(about = "Hierarchical schematic document model demo", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report format, overrides `[output] format`
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Directory to save every sheet into, overrides `[output] directory`
    #[arg(long, value_name = "DIR")]
    save: Option<PathBuf>,

    /// Date stamped on every sheet, defaults to today
    #[arg(long)]
    date: Option<String>,

    /// Reset all component references before reporting
    #[arg(long)]
    clear_annotation: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    let args = Args::parse();
    let config = load_configuration(args.config.clone());
    init_logging(&config);
    info!("启动 ZSCH 原理图示例");

    if let Err(err) = run(&args, &config) {
        error!(error = %err, "执行失败");
        eprintln!("错误：{err:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args, config: &AppConfig) -> anyhow::Result<()> {
    let options = DemoOptions {
        settings: EditSettings {
            max_undo_depth: config.editor.max_undo_depth,
            hit_accuracy: config.editor.hit_accuracy,
        },
        cleanup_after_load: config.editor.cleanup_after_load,
        clear_annotation: args.clear_annotation,
        date: args
            .date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string()),
    };
    let demo = demo::run_demo(&options).context("构建示例原理图失败")?;

    let save_dir = args.save.clone().or_else(|| config.output.directory.clone());
    if let Some(dir) = save_dir {
        save_all(&demo, &dir)?;
    }

    let format = args.format.map(OutputFormat::from).unwrap_or(config.output.format);
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&demo.report).context("序列化报告失败")?;
            println!("{json}");
        }
        OutputFormat::Text => print_report(&demo.report),
    }
    Ok(())
}

fn save_all(demo: &Demo, dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("创建输出目录 {} 失败", dir.display()))?;
    let facade = SchFacade::new();
    for id in demo.registry.iter() {
        let Some(screen) = demo.schematic.screen(id) else {
            continue;
        };
        let path = dir.join(screen.file_name());
        facade
            .save(screen, &path)
            .with_context(|| format!("保存图纸 {} 失败", path.display()))?;
        info!(path = %path.display(), "图纸已保存");
    }
    Ok(())
}

fn print_report(report: &DemoReport) {
    println!("ZSCH 层次原理图示例（日期 {}）", report.date);
    println!("图纸列表：");
    for screen in &report.screens {
        println!(
            "  - {} {}：引用 {} 次，图元 {} 个，撤销 {} 步，重做 {} 步",
            screen.id, screen.file, screen.ref_count, screen.items, screen.undo, screen.redo
        );
    }
    println!("实例路径：{}", report.sheet_paths.join(", "));
    println!("连接性清理修改了 {} 张图纸", report.cleaned_screens);
    if report.duplicate_time_stamps.is_empty() {
        println!("没有重复的时间戳");
    } else {
        println!(
            "重复的时间戳：{}，已替换 {} 处",
            report.duplicate_time_stamps.join(", "),
            report.replaced_time_stamps
        );
    }
    println!(
        "T 形连接处{}放置连接点",
        if report.junction_needed { "需要" } else { "无需" }
    );
    println!("拖动选择共拾取 {} 个图元", report.drag_picked);
    for entry in &report.annotations {
        println!("  - {} => {}", entry.path, entry.reference);
    }
    if report.annotations_cleared > 0 {
        println!("已清除 {} 个元件的位号", report.annotations_cleared);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 日志写到 stderr，stdout 只留给报告
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
