//! SQLite 本地存储模块
//!
//! 提供本地 SQLite 数据库存储功能，支持：
//! - 词汇条目的持久化与筛选查询
//! - 配置与断点续学（resume point）的键值存储
//! - 分隔文本的批量导入与导出

// ============================================================
// 子模块声明
// ============================================================

pub mod config_store;
pub mod filter;
pub mod migrations;
pub mod models;
pub mod transfer;
pub mod vocabulary;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use config_store::{ConfigStore, PersistedResumePoint};
pub use filter::{FilterMode, WordFilter, ALL_CATEGORIES};
pub use migrations::run_migrations;
pub use models::*;
pub use transfer::{export_delimited, import_delimited, ImportReport, ImportRowError};
pub use vocabulary::{VocabularyRepository, VocabularyStats};

// ============================================================
// 依赖导入
// ============================================================

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("迁移错误: {0}")]
    Migration(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("数据未找到: {0}")]
    NotFound(String),

    #[error("无效的词汇条目: {0}")]
    InvalidEntry(String),

    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// Storage - 统一存储结构体
// ============================================================

/// 统一存储结构体
///
/// 持有共享连接，提供对各 Repository 的便捷访问。
/// 多个学习会话共享同一个 `Storage`，所有写操作都在连接锁内的事务中完成。
#[derive(Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Storage {
    /// 打开（或创建）数据库文件并运行迁移
    ///
    /// 自动启用 WAL 模式与外键约束。
    ///
    /// # Example
    /// ```ignore
    /// let storage = Storage::open("./data/flashcards.db")?;
    /// ```
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let connection = Connection::open(path)?;

        // 启用 WAL 模式以提高并发性能
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        Self::from_connection(connection, path.to_string_lossy().to_string())
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch("PRAGMA foreign_keys=ON;")?;

        Self::from_connection(connection, ":memory:".to_string())
    }

    fn from_connection(connection: Connection, db_path: String) -> StorageResult<Self> {
        migrations::run_migrations(&connection)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path,
        })
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// 获取连接锁
    pub fn get_connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock_connection(&self.conn)
    }

    /// 获取词汇仓库
    pub fn vocabulary(&self) -> VocabularyRepository {
        VocabularyRepository::new(Arc::clone(&self.conn))
    }

    /// 获取配置仓库
    pub fn config(&self) -> ConfigStore {
        ConfigStore::new(Arc::clone(&self.conn))
    }

    /// 执行事务
    ///
    /// # Example
    /// ```ignore
    /// let result = storage.transaction(|conn| {
    ///     conn.execute("DELETE FROM vocabulary", [])?;
    ///     Ok(42)
    /// })?;
    /// ```
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        run_in_transaction(&self.conn, f)
    }
}

/// 获取共享连接的锁
pub(crate) fn lock_connection(
    conn: &Arc<Mutex<Connection>>,
) -> StorageResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StorageError::LockError(e.to_string()))
}

/// 在连接锁内执行事务；闭包返回错误时回滚
pub(crate) fn run_in_transaction<F, T>(conn: &Arc<Mutex<Connection>>, f: F) -> StorageResult<T>
where
    F: FnOnce(&Connection) -> StorageResult<T>,
{
    let mut guard = lock_connection(conn)?;

    let tx = guard.transaction()?;
    let result = f(&tx)?;
    tx.commit()?;

    Ok(result)
}

// ============================================================
// 测试
// ============================================================
