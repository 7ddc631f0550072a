//! 词汇条目数据库操作
//!
//! 提供词汇的 CRUD、按筛选条件查询可抽取集合，以及复习/归档标记的原子切换。

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::storage::models::ENTRY_COLUMNS;
use crate::storage::{
    lock_connection, run_in_transaction, EntryPatch, NewVocabularyEntry, StorageError,
    StorageResult, VocabularyEntry, WordFilter,
};

/// 词汇统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VocabularyStats {
    pub total: i64,
    pub needs_review: i64,
    pub archived: i64,
    pub categories: i64,
}

/// 词汇数据库操作仓库
///
/// 持有共享连接；多个会话可各自持有一个实例。
/// 所有"读-改-写"操作在同一事务内完成，保证并发会话间的原子性。
#[derive(Clone)]
pub struct VocabularyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VocabularyRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock_connection(&self.conn)
    }

    pub(crate) fn shared_connection(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }

    // ============================================================
    // 查询
    // ============================================================

    /// 根据 ID 获取条目
    pub fn get(&self, id: &str) -> StorageResult<Option<VocabularyEntry>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn, id)
    }

    /// 获取满足筛选条件的条目，按插入顺序排列
    ///
    /// 顺序抽词依赖此排序的稳定性。
    pub fn eligible(&self, filter: &WordFilter) -> StorageResult<Vec<VocabularyEntry>> {
        let conn = self.get_conn()?;
        Self::eligible_internal(&conn, filter)
    }

    /// 满足筛选条件的条目数
    pub fn count_eligible(&self, filter: &WordFilter) -> StorageResult<i64> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT COUNT(*) FROM vocabulary WHERE {}",
            filter.sql_clause()
        );
        let count = conn.query_row(&sql, params![filter.category], |row| row.get(0))?;
        Ok(count)
    }

    /// 获取全部条目（含归档），按插入顺序
    pub fn all(&self) -> StorageResult<Vec<VocabularyEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM vocabulary ORDER BY sort_order ASC, id ASC",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], |row| VocabularyEntry::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// 获取所有分类名（去重、排序）
    pub fn categories(&self) -> StorageResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT category FROM vocabulary ORDER BY category ASC")?;
        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(categories)
    }

    /// 获取统计信息
    pub fn stats(&self) -> StorageResult<VocabularyStats> {
        let conn = self.get_conn()?;
        let stats = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN needs_review = 1 AND archived = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN archived = 1 THEN 1 ELSE 0 END), 0),
                COUNT(DISTINCT category)
            FROM vocabulary
            "#,
            [],
            |row| {
                Ok(VocabularyStats {
                    total: row.get(0)?,
                    needs_review: row.get(1)?,
                    archived: row.get(2)?,
                    categories: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        let conn = self.get_conn()?;
        let exists: bool =
            conn.query_row("SELECT EXISTS(SELECT 1 FROM vocabulary)", [], |row| row.get(0))?;
        Ok(!exists)
    }

    // ============================================================
    // 写入
    // ============================================================

    /// 新增条目
    pub fn add(&self, new_entry: NewVocabularyEntry) -> StorageResult<VocabularyEntry> {
        run_in_transaction(&self.conn, |conn| Self::add_internal(conn, new_entry))
    }

    /// 批量新增；任一条目失败时整批回滚
    pub fn add_batch(
        &self,
        entries: Vec<NewVocabularyEntry>,
    ) -> StorageResult<Vec<VocabularyEntry>> {
        run_in_transaction(&self.conn, |conn| {
            entries
                .into_iter()
                .map(|entry| Self::add_internal(conn, entry))
                .collect()
        })
    }

    /// 编辑条目
    pub fn update(&self, id: &str, patch: EntryPatch) -> StorageResult<VocabularyEntry> {
        run_in_transaction(&self.conn, |conn| {
            let existing = Self::require_internal(conn, id)?;
            let updated = patch.apply(&existing)?;
            updated.update(conn)?;
            Ok(updated)
        })
    }

    /// 删除条目
    pub fn delete(&self, id: &str) -> StorageResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM vocabulary WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StorageError::NotFound(format!("vocabulary entry {}", id)));
        }
        tracing::debug!(id, "vocabulary entry deleted");
        Ok(())
    }

    /// 切换"待复习"标记并返回更新后的条目
    pub fn toggle_review(&self, id: &str) -> StorageResult<VocabularyEntry> {
        self.toggle_flag(id, "needs_review")
    }

    /// 切换"已归档"标记并返回更新后的条目
    pub fn toggle_archived(&self, id: &str) -> StorageResult<VocabularyEntry> {
        self.toggle_flag(id, "archived")
    }

    fn toggle_flag(&self, id: &str, column: &'static str) -> StorageResult<VocabularyEntry> {
        let entry = run_in_transaction(&self.conn, |conn| {
            let sql = format!(
                "UPDATE vocabulary SET {column} = 1 - {column}, updated_at = ?2 WHERE id = ?1"
            );
            let affected = conn.execute(
                &sql,
                params![id, crate::storage::models::format_datetime(chrono::Utc::now())],
            )?;
            if affected == 0 {
                return Err(StorageError::NotFound(format!("vocabulary entry {}", id)));
            }
            Self::require_internal(conn, id)
        })?;

        tracing::debug!(
            id,
            flag = column,
            needs_review = entry.needs_review,
            archived = entry.archived,
            "vocabulary flag toggled"
        );
        Ok(entry)
    }

    // ============================================================
    // 内部实现方法（接受 &Connection，可在事务内复用）
    // ============================================================

    pub(crate) fn get_internal(conn: &Connection, id: &str) -> StorageResult<Option<VocabularyEntry>> {
        let sql = format!("SELECT {} FROM vocabulary WHERE id = ?1", ENTRY_COLUMNS);
        let entry = conn
            .query_row(&sql, params![id], |row| VocabularyEntry::from_row(row))
            .optional()?;
        Ok(entry)
    }

    fn require_internal(conn: &Connection, id: &str) -> StorageResult<VocabularyEntry> {
        Self::get_internal(conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("vocabulary entry {}", id)))
    }

    pub(crate) fn eligible_internal(
        conn: &Connection,
        filter: &WordFilter,
    ) -> StorageResult<Vec<VocabularyEntry>> {
        let sql = format!(
            "SELECT {} FROM vocabulary WHERE {} ORDER BY sort_order ASC, id ASC",
            ENTRY_COLUMNS,
            filter.sql_clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![filter.category], |row| VocabularyEntry::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub(crate) fn add_internal(
        conn: &Connection,
        new_entry: NewVocabularyEntry,
    ) -> StorageResult<VocabularyEntry> {
        let next_order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM vocabulary",
            [],
            |row| row.get(0),
        )?;
        let entry = new_entry.into_entry(next_order)?;
        entry.insert(conn)?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FilterMode, Storage, ALL_CATEGORIES};

    fn setup() -> VocabularyRepository {
        Storage::in_memory()
            .expect("Failed to create in-memory storage")
            .vocabulary()
    }

    fn word(chinese: &str, category: &str) -> NewVocabularyEntry {
        NewVocabularyEntry::new(chinese, "pīn", "Palabra", category)
    }

    #[test]
    fn test_add_and_get() {
        let repo = setup();
        let added = repo
            .add(word("你好", "Saludos").with_explanation("saludo básico"))
            .unwrap();

        let fetched = repo.get(&added.id).unwrap().unwrap();
        assert_eq!(fetched, added);
        assert_eq!(fetched.explanation.as_deref(), Some("saludo básico"));
    }

    #[test]
    fn test_add_assigns_increasing_sort_order() {
        let repo = setup();
        let first = repo.add(word("一", "Números")).unwrap();
        let second = repo.add(word("二", "Números")).unwrap();
        assert!(second.sort_order > first.sort_order);

        let listed = repo.eligible(&WordFilter::all()).unwrap();
        let chinese: Vec<_> = listed.iter().map(|e| e.chinese.as_str()).collect();
        assert_eq!(chinese, vec!["一", "二"]);
    }

    #[test]
    fn test_add_rejects_blank_category() {
        let repo = setup();
        let result = repo.add(word("你好", "  "));
        assert!(matches!(result, Err(StorageError::InvalidEntry(_))));
        assert!(repo.is_empty().unwrap());
    }

    #[test]
    fn test_eligible_respects_category_and_flags() {
        let repo = setup();
        let red = repo.add(word("红色", "Colores")).unwrap();
        let blue = repo.add(word("蓝色", "Colores")).unwrap();
        repo.add(word("一", "Números")).unwrap();

        repo.toggle_review(&red.id).unwrap();
        repo.toggle_archived(&blue.id).unwrap();

        let colors = repo
            .eligible(&WordFilter::new("Colores", FilterMode::Normal))
            .unwrap();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].id, red.id);

        let review = repo
            .eligible(&WordFilter::new(ALL_CATEGORIES, FilterMode::ReviewOnly))
            .unwrap();
        assert_eq!(review.len(), 1);

        let archived = repo
            .eligible(&WordFilter::new(ALL_CATEGORIES, FilterMode::ArchivedOnly))
            .unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, blue.id);

        assert_eq!(repo.count_eligible(&WordFilter::all()).unwrap(), 2);
    }

    #[test]
    fn test_toggle_review_twice_restores_flag() {
        let repo = setup();
        let entry = repo.add(word("谢谢", "Saludos")).unwrap();

        let toggled = repo.toggle_review(&entry.id).unwrap();
        assert!(toggled.needs_review);
        let restored = repo.toggle_review(&entry.id).unwrap();
        assert!(!restored.needs_review);
    }

    #[test]
    fn test_toggle_unknown_id_is_not_found() {
        let repo = setup();
        let result = repo.toggle_archived("missing");
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_update_and_delete() {
        let repo = setup();
        let entry = repo.add(word("老师", "Aula")).unwrap();

        let patch = EntryPatch {
            spanish: Some("Profesor/a".to_string()),
            ..Default::default()
        };
        let updated = repo.update(&entry.id, patch).unwrap();
        assert_eq!(updated.spanish, "Profesor/a");
        assert_eq!(repo.get(&entry.id).unwrap().unwrap().spanish, "Profesor/a");

        repo.delete(&entry.id).unwrap();
        assert!(repo.get(&entry.id).unwrap().is_none());
        assert!(matches!(
            repo.delete(&entry.id),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_with_invalid_patch_keeps_row() {
        let repo = setup();
        let entry = repo.add(word("学生", "Aula")).unwrap();

        let patch = EntryPatch {
            chinese: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(repo.update(&entry.id, patch).is_err());
        assert_eq!(repo.get(&entry.id).unwrap().unwrap().chinese, "学生");
    }

    #[test]
    fn test_categories_and_stats() {
        let repo = setup();
        let a = repo.add(word("红色", "Colores")).unwrap();
        repo.add(word("一", "Números")).unwrap();
        repo.add(word("二", "Números")).unwrap();
        repo.toggle_review(&a.id).unwrap();

        assert_eq!(repo.categories().unwrap(), vec!["Colores", "Números"]);

        let stats = repo.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.needs_review, 1);
        assert_eq!(stats.archived, 0);
        assert_eq!(stats.categories, 2);
    }

    #[test]
    fn test_concurrent_toggles_are_atomic() {
        let repo = setup();
        let entry = repo.add(word("妈妈", "Familia")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                let id = entry.id.clone();
                std::thread::spawn(move || repo.toggle_review(&id).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 偶数次切换后回到原值
        assert!(!repo.get(&entry.id).unwrap().unwrap().needs_review);
    }
}
