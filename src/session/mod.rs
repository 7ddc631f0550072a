//! 闪卡学习会话
//!
//! - `mode`: 学习模式与每个阶段的可见字段表
//! - `selector`: 随机 / 顺序抽词策略
//! - `clock`: 单调时钟抽象（测试中可手动推进）
//! - `state`: 会话状态机与计时自动推进
//!
//! 会话通过 [`VocabularySource`] 与 [`ResumeStore`] 两个接口访问存储，
//! 每个会话持有独立的 [`SessionMachine`]，存储在会话之间共享。

pub mod clock;
pub mod mode;
pub mod selector;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use mode::{PhaseView, SelectionMode, StudyMode};
pub use selector::WordSelector;
pub use state::{SessionMachine, SessionOptions, SessionState, SessionView, Transition};

pub use crate::storage::{FilterMode, WordFilter, ALL_CATEGORIES};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::storage::{
    ConfigStore, PersistedResumePoint, StorageError, StorageResult, VocabularyEntry,
    VocabularyRepository,
};

/// 会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("存储不可用: {0}")]
    Store(#[from] StorageError),

    #[error("分类 '{category}' 在 '{mode}' 模式下没有可学习的词汇")]
    SelectionExhausted { category: String, mode: FilterMode },
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Store(_) => ErrorKind::StoreUnavailable,
            SessionError::SelectionExhausted { .. } => ErrorKind::SelectionExhausted,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// 会话读取词汇所需的存储接口
pub trait VocabularySource: Send + Sync {
    /// 满足筛选条件的条目，顺序稳定
    fn eligible(&self, filter: &WordFilter) -> StorageResult<Vec<VocabularyEntry>>;

    fn entry(&self, id: &str) -> StorageResult<Option<VocabularyEntry>>;

    fn toggle_review(&self, id: &str) -> StorageResult<VocabularyEntry>;

    fn toggle_archived(&self, id: &str) -> StorageResult<VocabularyEntry>;
}

/// 会话写入断点与最近分类的接口；写入失败不影响会话状态
pub trait ResumeStore: Send + Sync {
    fn load_resume_point(&self) -> StorageResult<Option<PersistedResumePoint>>;

    fn save_resume_point(&self, point: &PersistedResumePoint) -> StorageResult<()>;

    fn clear_resume_point(&self) -> StorageResult<()>;

    fn save_last_category(&self, category: &str) -> StorageResult<()>;
}

impl VocabularySource for VocabularyRepository {
    fn eligible(&self, filter: &WordFilter) -> StorageResult<Vec<VocabularyEntry>> {
        VocabularyRepository::eligible(self, filter)
    }

    fn entry(&self, id: &str) -> StorageResult<Option<VocabularyEntry>> {
        self.get(id)
    }

    fn toggle_review(&self, id: &str) -> StorageResult<VocabularyEntry> {
        VocabularyRepository::toggle_review(self, id)
    }

    fn toggle_archived(&self, id: &str) -> StorageResult<VocabularyEntry> {
        VocabularyRepository::toggle_archived(self, id)
    }
}

impl ResumeStore for ConfigStore {
    fn load_resume_point(&self) -> StorageResult<Option<PersistedResumePoint>> {
        ConfigStore::load_resume_point(self)
    }

    fn save_resume_point(&self, point: &PersistedResumePoint) -> StorageResult<()> {
        ConfigStore::save_resume_point(self, point)
    }

    fn clear_resume_point(&self) -> StorageResult<()> {
        ConfigStore::clear_resume_point(self)
    }

    fn save_last_category(&self, category: &str) -> StorageResult<()> {
        self.set_last_category(category)
    }
}
