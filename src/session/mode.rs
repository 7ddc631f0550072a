//! 学习模式
//!
//! 三种模式共用同一套计时/推进机制，区别只在阶段数量与每个阶段可见的内容：
//!
//! | 模式 | 阶段 | 内容 |
//! |---|---|---|
//! | `Standard3Phase` | 1 → 2 → 3 | 汉字 → +拼音/释义 → +发音 |
//! | `FullReveal` | 1 | 全部内容 + 发音 |
//! | `Listening2Phase` | 1 → 2 | 仅发音（等待 1.5 倍） → 全部内容 |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 单个阶段的可见性
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseView {
    pub show_chinese: bool,
    pub show_pinyin: bool,
    pub show_spanish: bool,
    /// 说明与直译
    pub show_extras: bool,
    pub triggers_audio: bool,
    pub label: &'static str,
}

impl PhaseView {
    const HIDDEN: PhaseView = PhaseView {
        show_chinese: false,
        show_pinyin: false,
        show_spanish: false,
        show_extras: false,
        triggers_audio: false,
        label: "",
    };

    const WORD_ONLY: PhaseView = PhaseView {
        show_chinese: true,
        label: "Fase 1: Identifica la palabra",
        ..Self::HIDDEN
    };

    const TRANSLATION: PhaseView = PhaseView {
        show_chinese: true,
        show_pinyin: true,
        show_spanish: true,
        show_extras: true,
        triggers_audio: false,
        label: "Fase 2: Pinyin y traducción",
    };

    const PRONUNCIATION: PhaseView = PhaseView {
        triggers_audio: true,
        label: "Fase 3: Escucha la pronunciación",
        ..Self::TRANSLATION
    };

    const EVERYTHING: PhaseView = PhaseView {
        triggers_audio: true,
        label: "Palabra completa",
        ..Self::TRANSLATION
    };

    const AUDIO_ONLY: PhaseView = PhaseView {
        triggers_audio: true,
        label: "Fase 1: Escucha",
        ..Self::HIDDEN
    };

    const LISTENING_REVEAL: PhaseView = PhaseView {
        label: "Fase 2: Comprueba",
        ..Self::TRANSLATION
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    #[default]
    Standard3Phase,
    FullReveal,
    Listening2Phase,
}

impl StudyMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            StudyMode::Standard3Phase => "standard",
            StudyMode::FullReveal => "full",
            StudyMode::Listening2Phase => "listening",
        }
    }

    pub const fn initial_phase(self) -> u8 {
        1
    }

    /// 该阶段之后抽取新词
    pub const fn terminal_phase(self) -> u8 {
        match self {
            StudyMode::Standard3Phase => 3,
            StudyMode::FullReveal => 1,
            StudyMode::Listening2Phase => 2,
        }
    }

    /// 将阶段限制在本模式的有效范围内
    pub fn clamp_phase(self, phase: u8) -> u8 {
        phase.clamp(self.initial_phase(), self.terminal_phase())
    }

    /// 阶段 0（空闲）或越界阶段返回全隐藏视图
    pub fn view(self, phase: u8) -> PhaseView {
        match (self, phase) {
            (StudyMode::Standard3Phase, 1) => PhaseView::WORD_ONLY,
            (StudyMode::Standard3Phase, 2) => PhaseView::TRANSLATION,
            (StudyMode::Standard3Phase, 3) => PhaseView::PRONUNCIATION,
            (StudyMode::FullReveal, 1) => PhaseView::EVERYTHING,
            (StudyMode::Listening2Phase, 1) => PhaseView::AUDIO_ONLY,
            (StudyMode::Listening2Phase, 2) => PhaseView::LISTENING_REVEAL,
            _ => PhaseView::HIDDEN,
        }
    }

    pub fn wait_multiplier(self, phase: u8) -> f64 {
        match (self, phase) {
            (StudyMode::Listening2Phase, 1) => 1.5,
            _ => 1.0,
        }
    }

    /// 某阶段的实际等待时长
    pub fn phase_wait(self, phase: u8, base: Duration) -> Duration {
        base.mul_f64(self.wait_multiplier(phase))
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "flashcard" | "standard3phase" => Ok(StudyMode::Standard3Phase),
            "full" | "full_reveal" | "reveal" | "fullreveal" => Ok(StudyMode::FullReveal),
            "listening" | "listen" | "listening2phase" => Ok(StudyMode::Listening2Phase),
            other => Err(format!("unknown study mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Random,
    Sequential,
}

impl SelectionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            SelectionMode::Random => "random",
            SelectionMode::Sequential => "sequential",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "shuffle" => Ok(SelectionMode::Random),
            "sequential" | "ordered" | "in-order" => Ok(SelectionMode::Sequential),
            other => Err(format!("unknown selection mode: {other}")),
        }
    }
}
