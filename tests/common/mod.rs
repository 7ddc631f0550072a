#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hanzi_flashcards::session::{
    ManualClock, ResumeStore, SelectionMode, SessionMachine, SessionOptions, VocabularySource,
    WordSelector,
};
use hanzi_flashcards::storage::{
    NewVocabularyEntry, PersistedResumePoint, Storage, StorageError, StorageResult,
    VocabularyEntry, VocabularyRepository, WordFilter,
};

pub fn storage_with(words: &[(&str, &str)]) -> Storage {
    let storage = Storage::in_memory().unwrap();
    let repo = storage.vocabulary();
    for (chinese, category) in words {
        repo.add(NewVocabularyEntry::new(*chinese, "pinyin", "español", *category))
            .unwrap();
    }
    storage
}

/// 顺序抽词 + 手动时钟的会话
pub fn sequential_session(storage: &Storage) -> (SessionMachine, ManualClock) {
    let clock = ManualClock::new();
    let machine = SessionMachine::from_storage(storage, SessionOptions::default())
        .with_clock(Arc::new(clock.clone()))
        .with_selector(WordSelector::with_seed(SelectionMode::Sequential, 2024));
    (machine, clock)
}

fn unavailable() -> StorageError {
    StorageError::LockError("store offline".to_string())
}

/// 可随时切换为失败状态的词汇源
pub struct FlakySource {
    inner: VocabularyRepository,
    failing: AtomicBool,
}

impl FlakySource {
    pub fn new(inner: VocabularyRepository) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

impl VocabularySource for FlakySource {
    fn eligible(&self, filter: &WordFilter) -> StorageResult<Vec<VocabularyEntry>> {
        self.check()?;
        self.inner.eligible(filter)
    }

    fn entry(&self, id: &str) -> StorageResult<Option<VocabularyEntry>> {
        self.check()?;
        self.inner.get(id)
    }

    fn toggle_review(&self, id: &str) -> StorageResult<VocabularyEntry> {
        self.check()?;
        self.inner.toggle_review(id)
    }

    fn toggle_archived(&self, id: &str) -> StorageResult<VocabularyEntry> {
        self.check()?;
        self.inner.toggle_archived(id)
    }
}

/// 所有写入都失败的断点存储
pub struct BrokenResumeStore;

impl ResumeStore for BrokenResumeStore {
    fn load_resume_point(&self) -> StorageResult<Option<PersistedResumePoint>> {
        Err(unavailable())
    }

    fn save_resume_point(&self, _point: &PersistedResumePoint) -> StorageResult<()> {
        Err(unavailable())
    }

    fn clear_resume_point(&self) -> StorageResult<()> {
        Err(unavailable())
    }

    fn save_last_category(&self, _category: &str) -> StorageResult<()> {
        Err(unavailable())
    }
}
