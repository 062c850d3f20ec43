use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `ZSCH_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 指向配置文件的环境变量。
pub const CONFIG_ENV: &str = "ZSCH_CONFIG";

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 编辑会话参数。
#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    /// 撤销栈深度，0 表示不限。
    #[serde(default = "EditorConfig::default_max_undo_depth")]
    pub max_undo_depth: usize,
    /// 命中容差（nm）。
    #[serde(default)]
    pub hit_accuracy: i32,
    /// 加载后是否立即做连接性清理。
    #[serde(default = "EditorConfig::default_cleanup_after_load")]
    pub cleanup_after_load: bool,
}

impl EditorConfig {
    fn default_max_undo_depth() -> usize {
        100
    }

    fn default_cleanup_after_load() -> bool {
        true
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo_depth: Self::default_max_undo_depth(),
            hit_accuracy: 0,
            cleanup_after_load: Self::default_cleanup_after_load(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// 保存图纸的目录；为空时不保存。
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let cfg = AppConfig::discover().expect("discover should succeed");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.editor.max_undo_depth, 100);
        assert_eq!(cfg.editor.hit_accuracy, 0);
        assert!(cfg.editor.cleanup_after_load);
        assert_eq!(cfg.output.format, OutputFormat::Text);
        assert!(cfg.output.directory.is_none());
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [editor]
            max_undo_depth = 8
            hit_accuracy = 250000
            cleanup_after_load = false

            [output]
            format = "json"
            directory = "../out"
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.editor.max_undo_depth, 8);
        assert_eq!(cfg.editor.hit_accuracy, 250_000);
        assert!(!cfg.editor.cleanup_after_load);
        assert_eq!(cfg.output.format, OutputFormat::Json);
        assert_eq!(
            cfg.output
                .directory
                .as_deref()
                .map(|p| p.to_string_lossy().to_string()),
            Some("../out".to_string())
        );
    }

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[editor]\nhit_accuracy = 10").unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.editor.hit_accuracy, 10);
        assert_eq!(cfg.editor.max_undo_depth, 100);
        assert!(cfg.editor.cleanup_after_load);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn unknown_format_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[output]\nformat = \"yaml\"").unwrap();

        let err = AppConfig::from_file(file.path()).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::from_file(dir.path().join("absent.toml")).expect_err("should fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
