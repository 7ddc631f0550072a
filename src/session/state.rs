//! 会话状态机
//!
//! 每个学习会话持有一个 [`SessionMachine`]。所有状态转换通过 `&mut self` 串行执行；
//! 存储操作失败时状态保持不变，断点写入失败只记录日志。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::clock::{Clock, SystemClock};
use super::mode::{SelectionMode, StudyMode};
use super::selector::WordSelector;
use super::{ResumeStore, SessionResult, VocabularySource};
use crate::error::ErrorKind;
use crate::storage::{
    FilterMode, PersistedResumePoint, Storage, VocabularyEntry, WordFilter, ALL_CATEGORIES,
};

pub const MIN_WAIT_TIME: Duration = Duration::from_secs(1);
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(10);
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(3);

/// 会话初始配置
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub category: String,
    pub filter_mode: FilterMode,
    pub selection_mode: SelectionMode,
    pub study_mode: StudyMode,
    pub wait_time: Duration,
    pub auto_advance: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            category: ALL_CATEGORIES.to_string(),
            filter_mode: FilterMode::Normal,
            selection_mode: SelectionMode::Random,
            study_mode: StudyMode::Standard3Phase,
            wait_time: DEFAULT_WAIT_TIME,
            auto_advance: true,
        }
    }
}

/// 会话状态
///
/// 不变量：`current_word` 为 None 时 `phase == 0`；
/// 有当前词时 `phase` 位于学习模式的 `[initial_phase, terminal_phase]` 区间内。
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub current_word: Option<VocabularyEntry>,
    /// 0 = 空闲
    pub phase: u8,
    pub is_playing: bool,
    pub phase_start_time: Option<Instant>,
    pub words_studied: u32,
    pub selected_category: String,
    /// 只追加，用于回看
    pub word_history: Vec<VocabularyEntry>,
    pub history_cursor: usize,
    pub selection_mode: SelectionMode,
    pub filter_mode: FilterMode,
    pub study_mode: StudyMode,
    pub wait_time: Duration,
    pub auto_advance: bool,
    /// 本会话是否已经开始过（断点只恢复一次）
    pub session_started: bool,
}

impl SessionState {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            current_word: None,
            phase: 0,
            is_playing: false,
            phase_start_time: None,
            words_studied: 0,
            selected_category: options.category,
            word_history: Vec::new(),
            history_cursor: 0,
            selection_mode: options.selection_mode,
            filter_mode: options.filter_mode,
            study_mode: options.study_mode,
            wait_time: clamp_wait_time(options.wait_time),
            auto_advance: options.auto_advance,
            session_started: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_word.is_none()
    }

    pub fn filter(&self) -> WordFilter {
        WordFilter::new(self.selected_category.clone(), self.filter_mode)
    }
}

/// 一次操作导致的状态变化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "phase")]
pub enum Transition {
    /// 空闲状态下的推进请求，未做任何事
    Idle,
    /// 同一个词进入下一阶段
    NextPhase(u8),
    NewWord,
    /// 从持久化断点恢复
    Resumed,
    Back,
    NoOp,
}

/// 展示层快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub phase: u8,
    pub study_mode: StudyMode,
    pub label: &'static str,
    pub entry_id: Option<String>,
    pub chinese: Option<String>,
    pub pinyin: Option<String>,
    pub spanish: Option<String>,
    pub explanation: Option<String>,
    pub literal_translation: Option<String>,
    pub category: Option<String>,
    pub needs_review: bool,
    pub archived: bool,
    pub triggers_audio: bool,
    pub is_playing: bool,
    pub auto_advance: bool,
    pub remaining: Option<Duration>,
    pub wait_time: Duration,
    pub words_studied: u32,
    pub can_go_back: bool,
    pub history_position: usize,
    pub history_len: usize,
    pub selected_category: String,
    pub filter_mode: FilterMode,
    pub selection_mode: SelectionMode,
}

pub fn clamp_wait_time(wait: Duration) -> Duration {
    wait.clamp(MIN_WAIT_TIME, MAX_WAIT_TIME)
}

pub struct SessionMachine {
    state: SessionState,
    selector: WordSelector,
    vocabulary: Arc<dyn VocabularySource>,
    resume: Arc<dyn ResumeStore>,
    clock: Arc<dyn Clock>,
}

impl SessionMachine {
    pub fn new(
        vocabulary: Arc<dyn VocabularySource>,
        resume: Arc<dyn ResumeStore>,
        options: SessionOptions,
    ) -> Self {
        let selector = WordSelector::new(options.selection_mode);
        Self {
            state: SessionState::new(options),
            selector,
            vocabulary,
            resume,
            clock: Arc::new(SystemClock),
        }
    }

    /// 使用同一个数据库的词汇仓库与配置仓库
    pub fn from_storage(storage: &Storage, options: SessionOptions) -> Self {
        Self::new(
            Arc::new(storage.vocabulary()),
            Arc::new(storage.config()),
            options,
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_selector(mut self, selector: WordSelector) -> Self {
        self.state.selection_mode = selector.mode();
        self.selector = selector;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// 顺序抽词游标
    pub fn sequential_cursor(&self) -> usize {
        self.selector.cursor()
    }

    // ============================================================
    // 核心转换
    // ============================================================

    /// 开始一个新词
    ///
    /// 会话首次开始且没有当前词时，优先恢复持久化断点（每个会话最多一次）。
    pub fn start_new_word(&mut self) -> SessionResult<Transition> {
        let filter = self.state.filter();

        if self.state.current_word.is_none() && !self.state.session_started {
            if let Some((entry, phase)) = self.find_resume_point(&filter)? {
                tracing::info!(
                    entry_id = %entry.id,
                    chinese = %entry.chinese,
                    phase,
                    "Resuming previous session"
                );
                self.enter_word(entry, phase);
                return Ok(Transition::Resumed);
            }
        }

        let entry = self.selector.draw(self.vocabulary.as_ref(), &filter)?;
        let phase = self.state.study_mode.initial_phase();
        self.enter_word(entry, phase);
        Ok(Transition::NewWord)
    }

    /// 推进到下一阶段；终止阶段之后抽取新词并计数
    pub fn advance(&mut self) -> SessionResult<Transition> {
        if self.state.current_word.is_none() {
            return Ok(Transition::Idle);
        }

        let mode = self.state.study_mode;
        if self.state.phase < mode.terminal_phase() {
            self.state.phase += 1;
            self.state.phase_start_time = Some(self.clock.now());
            self.persist_resume_point();
            tracing::debug!(phase = self.state.phase, "Phase advanced");
            return Ok(Transition::NextPhase(self.state.phase));
        }

        // 先抽词，失败时不修改任何状态
        let filter = self.state.filter();
        let entry = self.selector.draw(self.vocabulary.as_ref(), &filter)?;
        self.state.words_studied += 1;
        self.enter_word(entry, mode.initial_phase());
        Ok(Transition::NewWord)
    }

    /// 回到历史中的上一个词，阶段重置为学习模式的初始阶段
    pub fn go_back(&mut self) -> Transition {
        if self.state.current_word.is_none() || self.state.history_cursor == 0 {
            return Transition::NoOp;
        }

        let cursor = self.state.history_cursor - 1;
        let Some(entry) = self.state.word_history.get(cursor).cloned() else {
            return Transition::NoOp;
        };

        self.state.history_cursor = cursor;
        self.state.current_word = Some(entry);
        self.state.phase = self.state.study_mode.initial_phase();
        self.state.phase_start_time = Some(self.clock.now());
        self.persist_resume_point();
        tracing::debug!(history_cursor = cursor, "Went back in history");
        Transition::Back
    }

    /// 切换播放/暂停；空闲时不做任何事。返回切换后的状态
    pub fn toggle_play(&mut self) -> bool {
        if self.state.current_word.is_none() {
            return self.state.is_playing;
        }

        self.state.is_playing = !self.state.is_playing;
        if self.state.is_playing {
            self.state.phase_start_time = Some(self.clock.now());
        }
        self.state.is_playing
    }

    pub fn pause(&mut self) {
        self.state.is_playing = false;
    }

    /// 回到空闲状态并清零计数；历史记录保留
    pub fn reset(&mut self) {
        self.state.current_word = None;
        self.state.phase = 0;
        self.state.is_playing = false;
        self.state.phase_start_time = None;
        self.state.words_studied = 0;
        tracing::debug!("Session reset");
    }

    // ============================================================
    // 计时
    // ============================================================

    /// 当前阶段的自动推进截止时间；未在播放或关闭自动推进时为 None
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.state.is_playing || !self.state.auto_advance || self.state.current_word.is_none()
        {
            return None;
        }
        let started = self.state.phase_start_time?;
        let wait = self
            .state
            .study_mode
            .phase_wait(self.state.phase, self.state.wait_time);
        Some(started + wait)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(self.clock.now()))
    }

    /// 截止时间已到时执行一次推进
    pub fn poll(&mut self) -> SessionResult<Option<Transition>> {
        match self.next_deadline() {
            Some(deadline) if self.clock.now() >= deadline => self.advance().map(Some),
            _ => Ok(None),
        }
    }

    // ============================================================
    // 筛选与设置
    // ============================================================

    pub fn set_category(&mut self, category: impl Into<String>) -> bool {
        let category = category.into();
        if self.state.selected_category == category {
            return false;
        }

        self.state.selected_category = category;
        if let Err(e) = self.resume.save_last_category(&self.state.selected_category) {
            tracing::warn!(
                error = %e,
                kind = ErrorKind::StoreUnavailable.as_str(),
                "Failed to persist last category"
            );
        }
        self.on_filter_changed();
        true
    }

    pub fn set_filter_mode(&mut self, mode: FilterMode) -> bool {
        if self.state.filter_mode == mode {
            return false;
        }
        self.state.filter_mode = mode;
        self.on_filter_changed();
        true
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) -> bool {
        if self.state.selection_mode == mode {
            return false;
        }
        self.state.selection_mode = mode;
        self.selector.set_mode(mode);
        self.on_filter_changed();
        true
    }

    /// 切换学习模式；有当前词时回到新模式的初始阶段并重新计时
    pub fn set_study_mode(&mut self, mode: StudyMode) -> bool {
        if self.state.study_mode == mode {
            return false;
        }
        self.state.study_mode = mode;
        if self.state.current_word.is_some() {
            self.state.phase = mode.initial_phase();
            self.state.phase_start_time = Some(self.clock.now());
            self.persist_resume_point();
        }
        true
    }

    /// 设置等待时长（限制在 1–10 秒），返回实际生效值
    pub fn set_wait_time(&mut self, wait: Duration) -> Duration {
        self.state.wait_time = clamp_wait_time(wait);
        self.state.wait_time
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.state.auto_advance = enabled;
    }

    // ============================================================
    // 复习 / 归档
    // ============================================================

    pub fn toggle_review(&mut self, id: &str) -> SessionResult<VocabularyEntry> {
        let updated = self.vocabulary.toggle_review(id)?;
        self.refresh_entry(&updated);
        Ok(updated)
    }

    pub fn toggle_archived(&mut self, id: &str) -> SessionResult<VocabularyEntry> {
        let updated = self.vocabulary.toggle_archived(id)?;
        self.refresh_entry(&updated);
        Ok(updated)
    }

    /// 切换当前词的复习标记；空闲时返回 None
    pub fn toggle_current_review(&mut self) -> SessionResult<Option<VocabularyEntry>> {
        match self.current_id() {
            Some(id) => self.toggle_review(&id).map(Some),
            None => Ok(None),
        }
    }

    pub fn toggle_current_archived(&mut self) -> SessionResult<Option<VocabularyEntry>> {
        match self.current_id() {
            Some(id) => self.toggle_archived(&id).map(Some),
            None => Ok(None),
        }
    }

    // ============================================================
    // 展示
    // ============================================================

    pub fn view(&self) -> SessionView {
        let state = &self.state;
        let phase_view = state.study_mode.view(state.phase);
        let word = state.current_word.as_ref();
        let reveal = |visible: bool, pick: fn(&VocabularyEntry) -> Option<String>| {
            if visible {
                word.and_then(pick)
            } else {
                None
            }
        };

        SessionView {
            phase: state.phase,
            study_mode: state.study_mode,
            label: phase_view.label,
            entry_id: word.map(|w| w.id.clone()),
            chinese: reveal(phase_view.show_chinese, |w| Some(w.chinese.clone())),
            pinyin: reveal(phase_view.show_pinyin, |w| Some(w.pinyin.clone())),
            spanish: reveal(phase_view.show_spanish, |w| Some(w.spanish.clone())),
            explanation: reveal(phase_view.show_extras, |w| w.explanation.clone()),
            literal_translation: reveal(phase_view.show_extras, |w| w.literal_translation.clone()),
            category: word.map(|w| w.category.clone()),
            needs_review: word.is_some_and(|w| w.needs_review),
            archived: word.is_some_and(|w| w.archived),
            triggers_audio: word.is_some() && phase_view.triggers_audio,
            is_playing: state.is_playing,
            auto_advance: state.auto_advance,
            remaining: self.remaining(),
            wait_time: state.wait_time,
            words_studied: state.words_studied,
            can_go_back: word.is_some() && state.history_cursor > 0,
            history_position: if word.is_some() { state.history_cursor + 1 } else { 0 },
            history_len: state.word_history.len(),
            selected_category: state.selected_category.clone(),
            filter_mode: state.filter_mode,
            selection_mode: state.selection_mode,
        }
    }

    // ============================================================
    // 内部
    // ============================================================

    fn current_id(&self) -> Option<String> {
        self.state.current_word.as_ref().map(|w| w.id.clone())
    }

    fn enter_word(&mut self, entry: VocabularyEntry, phase: u8) {
        tracing::debug!(entry_id = %entry.id, chinese = %entry.chinese, phase, "Word entered");
        self.state.word_history.push(entry.clone());
        self.state.history_cursor = self.state.word_history.len() - 1;
        self.state.current_word = Some(entry);
        self.state.phase = phase;
        self.state.phase_start_time = Some(self.clock.now());
        self.state.is_playing = true;
        self.state.session_started = true;
        self.persist_resume_point();
    }

    /// 读取断点：读取失败视为不存在；条目查询失败向上传播
    fn find_resume_point(
        &self,
        filter: &WordFilter,
    ) -> SessionResult<Option<(VocabularyEntry, u8)>> {
        let point = match self.resume.load_resume_point() {
            Ok(point) => point,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    kind = ErrorKind::StoreUnavailable.as_str(),
                    "Failed to load resume point, drawing a fresh word"
                );
                None
            }
        };
        let Some(point) = point else {
            return Ok(None);
        };

        match self.vocabulary.entry(&point.entry_id)? {
            Some(entry) if filter.matches(&entry) => {
                let phase = self.state.study_mode.clamp_phase(point.phase);
                Ok(Some((entry, phase)))
            }
            _ => {
                tracing::debug!(entry_id = %point.entry_id, "Resume point no longer eligible");
                Ok(None)
            }
        }
    }

    fn on_filter_changed(&mut self) {
        self.selector.invalidate();
        if let Err(e) = self.resume.clear_resume_point() {
            tracing::warn!(
                error = %e,
                kind = ErrorKind::StoreUnavailable.as_str(),
                "Failed to clear resume point"
            );
        }
        self.state.current_word = None;
        self.state.phase = 0;
        self.state.is_playing = false;
        self.state.phase_start_time = None;
        tracing::debug!(
            category = %self.state.selected_category,
            filter = %self.state.filter_mode,
            selection = %self.state.selection_mode,
            "Filter changed, session idle"
        );
    }

    fn refresh_entry(&mut self, updated: &VocabularyEntry) {
        if let Some(current) = self.state.current_word.as_mut() {
            if current.id == updated.id {
                *current = updated.clone();
            }
        }
        for entry in self
            .state
            .word_history
            .iter_mut()
            .filter(|e| e.id == updated.id)
        {
            *entry = updated.clone();
        }
        let filter = self.state.filter();
        self.selector.reconcile(updated, &filter);
    }

    fn persist_resume_point(&self) {
        let Some(word) = self.state.current_word.as_ref() else {
            return;
        };
        let point = PersistedResumePoint::new(word.id.clone(), word.chinese.clone(), self.state.phase);
        if let Err(e) = self.resume.save_resume_point(&point) {
            tracing::warn!(
                error = %e,
                kind = ErrorKind::StoreUnavailable.as_str(),
                "Failed to persist resume point"
            );
        }
    }
}
