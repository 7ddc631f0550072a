//! 抽词与阶段推进的性质测试
//!
//! - 顺序抽词：N 个条目抽 N+1 次，前 N 次覆盖全部条目，第 N+1 次回到第一个
//! - 随机抽词：每次结果都属于当前筛选条件的可抽取集合
//! - 终止阶段推进：计数恰好 +1，阶段回到初始阶段

use proptest::prelude::*;

use hanzi_flashcards::session::{
    SelectionMode, SessionMachine, SessionOptions, StudyMode, WordSelector,
};
use hanzi_flashcards::storage::{
    FilterMode, NewVocabularyEntry, Storage, WordFilter, ALL_CATEGORIES,
};

const CATEGORIES: [&str; 3] = ["Números", "Colores", "Familia"];

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// (分类下标, 待复习, 已归档)
fn arb_word() -> impl Strategy<Value = (usize, bool, bool)> {
    (0usize..CATEGORIES.len(), any::<bool>(), any::<bool>())
}

fn arb_filter_mode() -> impl Strategy<Value = FilterMode> {
    prop_oneof![
        Just(FilterMode::Normal),
        Just(FilterMode::ReviewOnly),
        Just(FilterMode::ArchivedOnly),
    ]
}

fn arb_study_mode() -> impl Strategy<Value = StudyMode> {
    prop_oneof![
        Just(StudyMode::Standard3Phase),
        Just(StudyMode::FullReveal),
        Just(StudyMode::Listening2Phase),
    ]
}

fn arb_category() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(ALL_CATEGORIES.to_string()),
        (0usize..CATEGORIES.len()).prop_map(|i| CATEGORIES[i].to_string()),
    ]
}

fn build_storage(words: &[(usize, bool, bool)]) -> Storage {
    let storage = Storage::in_memory().unwrap();
    let repo = storage.vocabulary();
    for (i, (category, review, archived)) in words.iter().enumerate() {
        let entry = repo
            .add(NewVocabularyEntry::new(
                format!("词{i}"),
                format!("ci{i}"),
                format!("palabra {i}"),
                CATEGORIES[*category],
            ))
            .unwrap();
        if *review {
            repo.toggle_review(&entry.id).unwrap();
        }
        if *archived {
            repo.toggle_archived(&entry.id).unwrap();
        }
    }
    storage
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// PBT-1: 顺序抽词在 N+1 次后回绕
    #[test]
    fn sequential_draws_wrap_after_n(count in 1usize..12, seed in any::<u64>()) {
        let words: Vec<(usize, bool, bool)> = (0..count).map(|i| (i % CATEGORIES.len(), false, false)).collect();
        let storage = build_storage(&words);
        let repo = storage.vocabulary();
        let filter = WordFilter::all();
        let expected: Vec<String> = repo.eligible(&filter).unwrap().into_iter().map(|e| e.id).collect();

        let mut selector = WordSelector::with_seed(SelectionMode::Sequential, seed);
        let drawn: Vec<String> = (0..=count)
            .map(|_| selector.draw(&repo, &filter).unwrap().id)
            .collect();

        prop_assert_eq!(&drawn[..count], &expected[..]);
        prop_assert_eq!(&drawn[count], &drawn[0]);
    }

    /// PBT-2: 随机抽词不会越过筛选条件
    #[test]
    fn random_draws_stay_within_filter(
        words in proptest::collection::vec(arb_word(), 1..16),
        category in arb_category(),
        mode in arb_filter_mode(),
        seed in any::<u64>(),
    ) {
        let storage = build_storage(&words);
        let repo = storage.vocabulary();
        let filter = WordFilter::new(category, mode);
        let eligible: Vec<String> = repo.eligible(&filter).unwrap().into_iter().map(|e| e.id).collect();

        let mut selector = WordSelector::with_seed(SelectionMode::Random, seed);
        for _ in 0..10 {
            match selector.draw(&repo, &filter) {
                Ok(entry) => {
                    prop_assert!(filter.matches(&entry));
                    prop_assert!(eligible.contains(&entry.id));
                }
                Err(_) => prop_assert!(eligible.is_empty()),
            }
        }
    }

    /// PBT-3: 筛选条件变化后顺序抽词从新列表的第一个开始
    #[test]
    fn filter_change_restarts_from_first_eligible(
        words in proptest::collection::vec(arb_word(), 1..16),
        warmup in 0usize..5,
        mode in arb_filter_mode(),
    ) {
        let storage = build_storage(&words);
        let mut machine = SessionMachine::from_storage(&storage, SessionOptions::default())
            .with_selector(WordSelector::with_seed(SelectionMode::Sequential, 1));

        for _ in 0..warmup {
            if machine.start_new_word().is_err() {
                break;
            }
        }

        let changed = machine.set_filter_mode(mode);
        if !changed {
            machine.set_category(CATEGORIES[0]);
            machine.set_category(ALL_CATEGORIES);
        }
        prop_assert_eq!(machine.sequential_cursor(), 0);
        prop_assert!(machine.state().current_word.is_none());

        let expected = storage.vocabulary().eligible(&machine.state().filter()).unwrap();
        match machine.start_new_word() {
            Ok(_) => {
                let current = machine.state().current_word.as_ref().unwrap();
                prop_assert_eq!(&current.id, &expected[0].id);
            }
            Err(_) => prop_assert!(expected.is_empty()),
        }
    }

    /// PBT-4: 终止阶段推进恰好计数一次
    #[test]
    fn terminal_advance_counts_once(mode in arb_study_mode(), rounds in 1usize..6) {
        let words = vec![(0, false, false), (1, false, false)];
        let storage = build_storage(&words);
        let mut machine = SessionMachine::from_storage(&storage, SessionOptions {
            study_mode: mode,
            ..SessionOptions::default()
        });
        machine.start_new_word().unwrap();

        for round in 0..rounds {
            while machine.state().phase < mode.terminal_phase() {
                machine.advance().unwrap();
            }
            machine.advance().unwrap();
            prop_assert_eq!(machine.state().words_studied as usize, round + 1);
            prop_assert_eq!(machine.state().phase, mode.initial_phase());
        }
    }
}
