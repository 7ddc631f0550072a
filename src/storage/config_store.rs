//! 配置键值存储
//!
//! 保存最近选择的分类与断点续学信息（resume point）。
//! 断点数据以 JSON 存储；解析失败时视为不存在，不会中断会话。

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ErrorKind;
use crate::storage::{lock_connection, StorageError, StorageResult};

/// 最近选择的分类
pub const KEY_LAST_CATEGORY: &str = "last_category";
/// 断点续学
pub const KEY_RESUME_POINT: &str = "resume_point";

/// 持久化的断点：最近一次的 (条目, 阶段)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedResumePoint {
    pub entry_id: String,
    /// 仅用于日志与展示
    pub chinese: String,
    pub phase: u8,
    pub saved_at: DateTime<Utc>,
}

impl PersistedResumePoint {
    pub fn new(entry_id: impl Into<String>, chinese: impl Into<String>, phase: u8) -> Self {
        Self {
            entry_id: entry_id.into(),
            chinese: chinese.into(),
            phase,
            saved_at: Utc::now(),
        }
    }
}

/// 键值配置仓库
#[derive(Clone)]
pub struct ConfigStore {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock_connection(&self.conn)
    }

    /// 获取配置值，不存在时返回 None
    pub fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM app_config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 插入或覆盖配置值
    pub fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO app_config (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    /// 删除配置值，返回是否删除了记录
    pub fn delete(&self, key: &str) -> StorageResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM app_config WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    // ========== 最近分类 ==========

    pub fn last_category(&self) -> StorageResult<Option<String>> {
        self.get(KEY_LAST_CATEGORY)
    }

    pub fn set_last_category(&self, category: &str) -> StorageResult<()> {
        self.set(KEY_LAST_CATEGORY, category)
    }

    // ========== 断点续学 ==========

    /// 读取断点
    ///
    /// 数据损坏时记录警告并返回 None。
    pub fn load_resume_point(&self) -> StorageResult<Option<PersistedResumePoint>> {
        let Some(raw) = self.get(KEY_RESUME_POINT)? else {
            return Ok(None);
        };

        match serde_json::from_str::<PersistedResumePoint>(&raw) {
            Ok(point) => Ok(Some(point)),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    kind = ErrorKind::ResumeDataCorrupt.as_str(),
                    "resume point is corrupt, ignoring"
                );
                Ok(None)
            }
        }
    }

    pub fn save_resume_point(&self, point: &PersistedResumePoint) -> StorageResult<()> {
        let raw = serde_json::to_string(point)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set(KEY_RESUME_POINT, &raw)
    }

    pub fn clear_resume_point(&self) -> StorageResult<()> {
        self.delete(KEY_RESUME_POINT)?;
        Ok(())
    }
}
