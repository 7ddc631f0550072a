use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::session::state::{clamp_wait_time, DEFAULT_WAIT_TIME};
use crate::session::{SelectionMode, SessionOptions, StudyMode};
use crate::storage::{FilterMode, ALL_CATEGORIES};

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `ENABLE_FILE_LOGS` 开启时的日志目录
    pub log_dir: Option<PathBuf>,
    pub wait_time: Duration,
    pub auto_advance: bool,
    pub study_mode: StudyMode,
    pub selection_mode: SelectionMode,
    pub filter_mode: FilterMode,
    /// 未设置时使用上次选择的分类
    pub category: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let db_path = std::env::var("FLASHCARDS_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/flashcards.db"));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = std::env::var("ENABLE_FILE_LOGS")
            .ok()
            .and_then(|value| parse_bool(&value))
            .unwrap_or(false)
            .then(|| {
                std::env::var("LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./logs"))
            });

        let wait_time = env_parse::<u64>("FLASHCARDS_WAIT_SECS")
            .map(|secs| clamp_wait_time(Duration::from_secs(secs)))
            .unwrap_or(DEFAULT_WAIT_TIME);

        let auto_advance = std::env::var("FLASHCARDS_AUTO_ADVANCE")
            .ok()
            .and_then(|value| parse_bool(&value))
            .unwrap_or(true);

        let category = std::env::var("FLASHCARDS_CATEGORY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            db_path,
            log_level,
            log_dir,
            wait_time,
            auto_advance,
            study_mode: env_parse("FLASHCARDS_MODE").unwrap_or_default(),
            selection_mode: env_parse("FLASHCARDS_SELECTION").unwrap_or_default(),
            filter_mode: env_parse("FLASHCARDS_FILTER").unwrap_or_default(),
            category,
        }
    }

    /// 构造会话配置；`last_category` 为配置存储中记录的最近分类
    pub fn session_options(&self, last_category: Option<String>) -> SessionOptions {
        SessionOptions {
            category: self
                .category
                .clone()
                .or(last_category)
                .unwrap_or_else(|| ALL_CATEGORIES.to_string()),
            filter_mode: self.filter_mode,
            selection_mode: self.selection_mode,
            study_mode: self.study_mode,
            wait_time: self.wait_time,
            auto_advance: self.auto_advance,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
