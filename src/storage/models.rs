//! 数据模型定义
//!
//! 词汇条目的结构体，以及与数据库行之间的转换。

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

use crate::storage::{StorageError, StorageResult};

/// `SELECT` 词汇条目时使用的列清单
pub(crate) const ENTRY_COLUMNS: &str = "id, chinese, pinyin, spanish, category, needs_review, \
     archived, explanation, literal_translation, sort_order, created_at, updated_at";

// ============================================================
// VocabularyEntry - 词汇条目
// ============================================================

/// 词汇条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    /// 唯一标识 (UUID)，创建后不变
    pub id: String,
    /// 汉字
    pub chinese: String,
    /// 拼音
    pub pinyin: String,
    /// 西班牙语释义
    pub spanish: String,
    /// 分类标签（自由文本）
    pub category: String,
    /// 是否标记为待复习
    pub needs_review: bool,
    /// 是否已归档
    pub archived: bool,
    /// 补充说明
    pub explanation: Option<String>,
    /// 字面直译
    pub literal_translation: Option<String>,
    /// 插入顺序，顺序抽词时按此排序
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VocabularyEntry {
    /// 从数据库行解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            chinese: row.get("chinese")?,
            pinyin: row.get("pinyin")?,
            spanish: row.get("spanish")?,
            category: row.get("category")?,
            needs_review: row.get::<_, i32>("needs_review")? != 0,
            archived: row.get::<_, i32>("archived")? != 0,
            explanation: row.get("explanation")?,
            literal_translation: row.get("literal_translation")?,
            sort_order: row.get("sort_order")?,
            created_at: parse_datetime(row.get::<_, String>("created_at")?),
            updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
        })
    }

    /// 插入到数据库
    pub fn insert(&self, conn: &Connection) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO vocabulary (
                id, chinese, pinyin, spanish, category, needs_review, archived,
                explanation, literal_translation, sort_order, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12
            )
            "#,
            params![
                self.id,
                self.chinese,
                self.pinyin,
                self.spanish,
                self.category,
                self.needs_review as i32,
                self.archived as i32,
                self.explanation,
                self.literal_translation,
                self.sort_order,
                format_datetime(self.created_at),
                format_datetime(self.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 更新数据库记录（id、sort_order、created_at 不变）
    pub fn update(&self, conn: &Connection) -> StorageResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE vocabulary SET
                chinese = ?2, pinyin = ?3, spanish = ?4, category = ?5,
                needs_review = ?6, archived = ?7, explanation = ?8,
                literal_translation = ?9, updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                self.id,
                self.chinese,
                self.pinyin,
                self.spanish,
                self.category,
                self.needs_review as i32,
                self.archived as i32,
                self.explanation,
                self.literal_translation,
                format_datetime(self.updated_at),
            ],
        )?;

        if affected == 0 {
            return Err(StorageError::NotFound(format!("vocabulary entry {}", self.id)));
        }
        Ok(())
    }
}

// ============================================================
// NewVocabularyEntry - 新增条目输入
// ============================================================

/// 新增词汇条目的输入
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVocabularyEntry {
    pub chinese: String,
    pub pinyin: String,
    pub spanish: String,
    pub category: String,
    pub explanation: Option<String>,
    pub literal_translation: Option<String>,
}

impl NewVocabularyEntry {
    pub fn new(
        chinese: impl Into<String>,
        pinyin: impl Into<String>,
        spanish: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            chinese: chinese.into(),
            pinyin: pinyin.into(),
            spanish: spanish.into(),
            category: category.into(),
            explanation: None,
            literal_translation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_literal_translation(mut self, literal: impl Into<String>) -> Self {
        self.literal_translation = Some(literal.into());
        self
    }

    /// 校验必填字段并生成完整条目
    ///
    /// 必填字段去除首尾空白后不能为空；可选字段为空白时视为 None。
    pub fn into_entry(self, sort_order: i64) -> StorageResult<VocabularyEntry> {
        let now = Utc::now();
        Ok(VocabularyEntry {
            id: uuid::Uuid::new_v4().to_string(),
            chinese: required("chinese", self.chinese)?,
            pinyin: required("pinyin", self.pinyin)?,
            spanish: required("spanish", self.spanish)?,
            category: required("category", self.category)?,
            needs_review: false,
            archived: false,
            explanation: optional(self.explanation),
            literal_translation: optional(self.literal_translation),
            sort_order,
            created_at: now,
            updated_at: now,
        })
    }
}

// ============================================================
// EntryPatch - 编辑条目
// ============================================================

/// 编辑条目时的部分更新；`None` 表示保持原值
///
/// 可选文本字段使用 `Some(String::new())` 清空。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    pub chinese: Option<String>,
    pub pinyin: Option<String>,
    pub spanish: Option<String>,
    pub category: Option<String>,
    pub explanation: Option<String>,
    pub literal_translation: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.chinese.is_none()
            && self.pinyin.is_none()
            && self.spanish.is_none()
            && self.category.is_none()
            && self.explanation.is_none()
            && self.literal_translation.is_none()
    }

    /// 应用到已有条目上，返回校验后的新值
    pub fn apply(self, entry: &VocabularyEntry) -> StorageResult<VocabularyEntry> {
        let mut updated = entry.clone();
        if let Some(chinese) = self.chinese {
            updated.chinese = required("chinese", chinese)?;
        }
        if let Some(pinyin) = self.pinyin {
            updated.pinyin = required("pinyin", pinyin)?;
        }
        if let Some(spanish) = self.spanish {
            updated.spanish = required("spanish", spanish)?;
        }
        if let Some(category) = self.category {
            updated.category = required("category", category)?;
        }
        if let Some(explanation) = self.explanation {
            updated.explanation = optional(Some(explanation));
        }
        if let Some(literal) = self.literal_translation {
            updated.literal_translation = optional(Some(literal));
        }
        updated.updated_at = Utc::now();
        Ok(updated)
    }
}

fn required(field: &str, value: String) -> StorageResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidEntry(format!("{} 不能为空", field)));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================
// 辅助函数
// ============================================================

/// 解析数据库中的时间字符串，兼容 RFC3339 与 SQLite datetime() 格式
pub(crate) fn parse_datetime(s: String) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return dt.with_timezone(&Utc);
    }
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
