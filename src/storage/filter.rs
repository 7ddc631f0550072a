//! 词汇筛选条件
//!
//! 分类 + 复习/归档状态共同决定"可抽取集合"（eligible set）。
//! `WordFilter::matches` 与 `WordFilter::sql_clause` 必须保持同一语义。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::VocabularyEntry;

/// 表示"全部分类"的哨兵值
pub const ALL_CATEGORIES: &str = "all";

/// 复习/归档筛选模式，三者互斥
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// 未归档的条目
    #[default]
    Normal,
    /// 待复习且未归档的条目
    ReviewOnly,
    /// 已归档的条目
    ArchivedOnly,
}

impl FilterMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            FilterMode::Normal => "normal",
            FilterMode::ReviewOnly => "review",
            FilterMode::ArchivedOnly => "archived",
        }
    }

    /// 条目是否满足该模式的状态谓词
    pub fn admits(self, entry: &VocabularyEntry) -> bool {
        match self {
            FilterMode::Normal => !entry.archived,
            FilterMode::ReviewOnly => entry.needs_review && !entry.archived,
            FilterMode::ArchivedOnly => entry.archived,
        }
    }

    fn sql_predicate(self) -> &'static str {
        match self {
            FilterMode::Normal => "archived = 0",
            FilterMode::ReviewOnly => "needs_review = 1 AND archived = 0",
            FilterMode::ArchivedOnly => "archived = 1",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "all" => Ok(FilterMode::Normal),
            "review" | "review_only" | "review-only" => Ok(FilterMode::ReviewOnly),
            "archived" | "archived_only" | "archived-only" => Ok(FilterMode::ArchivedOnly),
            other => Err(format!("unknown filter mode: {other}")),
        }
    }
}

/// 分类 + 状态的组合筛选条件
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordFilter {
    /// 分类名，或 [`ALL_CATEGORIES`]
    pub category: String,
    pub mode: FilterMode,
}

impl Default for WordFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl WordFilter {
    pub fn new(category: impl Into<String>, mode: FilterMode) -> Self {
        Self {
            category: category.into(),
            mode,
        }
    }

    /// 全部分类、正常模式
    pub fn all() -> Self {
        Self::new(ALL_CATEGORIES, FilterMode::Normal)
    }

    pub fn is_all_categories(&self) -> bool {
        self.category == ALL_CATEGORIES
    }

    pub fn matches(&self, entry: &VocabularyEntry) -> bool {
        (self.is_all_categories() || entry.category == self.category) && self.mode.admits(entry)
    }

    /// 生成 WHERE 子句；分类参数绑定到 `?1`
    pub(crate) fn sql_clause(&self) -> String {
        format!(
            "(?1 = '{}' OR category = ?1) AND {}",
            ALL_CATEGORIES,
            self.mode.sql_predicate()
        )
    }
}
