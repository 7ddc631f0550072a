//! 抽词策略
//!
//! - 随机：每次抽取时重新查询可抽取集合，均匀选择，允许重复
//! - 顺序：失效后首次抽取时固化有序列表，游标逐一推进，末尾回绕到 0，不重新洗牌

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::mode::SelectionMode;
use super::{SessionError, SessionResult, VocabularySource};
use crate::storage::{VocabularyEntry, WordFilter};

pub struct WordSelector {
    mode: SelectionMode,
    cached: Option<Vec<VocabularyEntry>>,
    cursor: usize,
    rng: StdRng,
}

impl WordSelector {
    pub fn new(mode: SelectionMode) -> Self {
        Self::with_rng(mode, StdRng::from_os_rng())
    }

    /// 固定种子，用于可复现的测试
    pub fn with_seed(mode: SelectionMode, seed: u64) -> Self {
        Self::with_rng(mode, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mode: SelectionMode, rng: StdRng) -> Self {
        Self {
            mode,
            cached: None,
            cursor: 0,
            rng,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        if self.mode != mode {
            self.mode = mode;
            self.invalidate();
        }
    }

    /// 丢弃缓存列表并将游标归零
    pub fn invalidate(&mut self) {
        self.cached = None;
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// 抽取下一个词；失败时选择器状态不变
    pub fn draw(
        &mut self,
        source: &dyn VocabularySource,
        filter: &WordFilter,
    ) -> SessionResult<VocabularyEntry> {
        match self.mode {
            SelectionMode::Random => self.draw_random(source, filter),
            SelectionMode::Sequential => self.draw_sequential(source, filter),
        }
    }

    fn draw_random(
        &mut self,
        source: &dyn VocabularySource,
        filter: &WordFilter,
    ) -> SessionResult<VocabularyEntry> {
        let eligible = source.eligible(filter)?;
        eligible
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| exhausted(filter))
    }

    fn draw_sequential(
        &mut self,
        source: &dyn VocabularySource,
        filter: &WordFilter,
    ) -> SessionResult<VocabularyEntry> {
        if self.cached.is_none() {
            let list = source.eligible(filter)?;
            if list.is_empty() {
                return Err(exhausted(filter));
            }
            tracing::debug!(
                category = %filter.category,
                mode = %filter.mode,
                size = list.len(),
                "Sequential list materialized"
            );
            self.cached = Some(list);
            self.cursor = 0;
        }

        let list = match self.cached.as_ref() {
            Some(list) if !list.is_empty() => list,
            _ => return Err(exhausted(filter)),
        };

        let index = self.cursor % list.len();
        let entry = list[index].clone();
        self.cursor = (index + 1) % list.len();
        Ok(entry)
    }

    /// 条目标记变化后同步缓存列表
    ///
    /// 不再满足筛选条件的条目移出列表，新满足的条目按排序位置插入；
    /// 游标始终指向同一个"下一个"条目。
    pub fn reconcile(&mut self, entry: &VocabularyEntry, filter: &WordFilter) {
        let Some(list) = self.cached.as_mut() else {
            return;
        };

        let position = list.iter().position(|e| e.id == entry.id);
        match (position, filter.matches(entry)) {
            (Some(index), true) => list[index] = entry.clone(),
            (Some(index), false) => {
                list.remove(index);
                if index < self.cursor {
                    self.cursor -= 1;
                }
                if list.is_empty() {
                    self.invalidate();
                } else {
                    self.cursor %= list.len();
                }
            }
            (None, true) => {
                let index = list.partition_point(|e| {
                    (e.sort_order, e.id.as_str()) < (entry.sort_order, entry.id.as_str())
                });
                list.insert(index, entry.clone());
                if index < self.cursor {
                    self.cursor += 1;
                }
            }
            (None, false) => {}
        }
    }
}

fn exhausted(filter: &WordFilter) -> SessionError {
    SessionError::SelectionExhausted {
        category: filter.category.clone(),
        mode: filter.mode,
    }
}
