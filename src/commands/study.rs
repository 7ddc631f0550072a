//! 交互式学习
//!
//! 单个异步事件循环同时等待两类事件：stdin 的一行命令，以及当前阶段的截止时间。
//! 截止时间通过 `sleep_until` 调度，最多每 100ms 复查一次，不做忙等待。

use std::fmt::Write as _;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;

use super::{CommandResult, StudyArgs};
use crate::config::Config;
use crate::error::ErrorKind;
use crate::seed;
use crate::session::{
    SelectionMode, SessionError, SessionMachine, SessionOptions, SessionResult, SessionView,
    StudyMode, Transition,
};
use crate::storage::{FilterMode, Storage};

/// 播放中的最大复查间隔
const PLAYING_TICK: Duration = Duration::from_millis(100);
/// 暂停或空闲时的复查间隔
const IDLE_TICK: Duration = Duration::from_secs(1);

const HELP: &str = "\
commands:
  n          next phase (starts a word when idle)
  s          new word
  p          play / pause
  b          back to the previous word
  r          reset session
  m          toggle needs-review on the current word
  a          toggle archived on the current word
  c [name]   set category (no name: list categories)
  f <mode>   filter: normal, review, archived
  o <mode>   selection: random, sequential
  v <mode>   study mode: standard, full, listening
  w <secs>   seconds per phase (1-10)
  h          help
  q          quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub async fn run(storage: Storage, config: &Config, args: StudyArgs) -> CommandResult {
    seed::seed_if_empty(&storage.vocabulary())?;

    let last_category = match storage.config().last_category() {
        Ok(category) => category,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read last category");
            None
        }
    };
    let options = apply_args(config.session_options(last_category), args);
    tracing::info!(
        category = %options.category,
        mode = %options.study_mode,
        selection = %options.selection_mode,
        filter = %options.filter_mode,
        wait_secs = options.wait_time.as_secs_f64(),
        "study session started"
    );

    let mut machine = SessionMachine::from_storage(&storage, options);
    println!("{HELP}\n");
    let started = machine.start_new_word();
    report(&machine, started);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let wake = next_wake(&machine);

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if handle_command(&mut machine, &storage, line.trim()) == Flow::Quit {
                    break;
                }
            }
            _ = tokio::time::sleep_until(wake) => {
                match machine.poll() {
                    Ok(Some(transition)) => render(&machine, transition),
                    Ok(None) => {}
                    Err(e) => {
                        machine.pause();
                        print_error(&e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    tracing::info!(
        words_studied = machine.state().words_studied,
        "study session ended"
    );
    println!("Words studied: {}", machine.state().words_studied);
    Ok(())
}

fn apply_args(mut options: SessionOptions, args: StudyArgs) -> SessionOptions {
    if let Some(category) = args.category {
        options.category = category;
    }
    if let Some(mode) = args.mode {
        options.study_mode = mode;
    }
    if let Some(selection) = args.selection {
        options.selection_mode = selection;
    }
    if let Some(filter) = args.filter {
        options.filter_mode = filter;
    }
    if let Some(secs) = args.wait {
        options.wait_time = Duration::from_secs(secs);
    }
    if args.manual {
        options.auto_advance = false;
    }
    options
}

fn next_wake(machine: &SessionMachine) -> Instant {
    let delay = match machine.remaining() {
        Some(remaining) => remaining.min(PLAYING_TICK),
        None => IDLE_TICK,
    };
    Instant::now() + delay
}

fn handle_command(machine: &mut SessionMachine, storage: &Storage, line: &str) -> Flow {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "" | "n" => {
            let result = if machine.state().is_idle() {
                machine.start_new_word()
            } else {
                machine.advance()
            };
            report(machine, result);
        }
        "s" => {
            let result = machine.start_new_word();
            report(machine, result);
        }
        "p" => {
            let playing = machine.toggle_play();
            println!("{}", if playing { "▶ playing" } else { "⏸ paused" });
        }
        "b" => match machine.go_back() {
            Transition::NoOp => println!("No previous word"),
            transition => render(machine, transition),
        },
        "r" => {
            machine.reset();
            println!("Session reset. Press s to start.");
        }
        "m" => match machine.toggle_current_review() {
            Ok(Some(entry)) => println!(
                "{} {}",
                entry.chinese,
                if entry.needs_review { "marked for review" } else { "no longer marked for review" }
            ),
            Ok(None) => println!("No current word"),
            Err(e) => print_error(&e),
        },
        "a" => match machine.toggle_current_archived() {
            Ok(Some(entry)) => println!(
                "{} {}",
                entry.chinese,
                if entry.archived { "archived" } else { "restored" }
            ),
            Ok(None) => println!("No current word"),
            Err(e) => print_error(&e),
        },
        "c" if arg.is_empty() => match storage.vocabulary().categories() {
            Ok(categories) => println!("categories: all, {}", categories.join(", ")),
            Err(e) => print_error(&SessionError::from(e)),
        },
        "c" => {
            if machine.set_category(arg) {
                println!("Category: {arg}. Press s to start.");
            }
        }
        "f" => match arg.parse::<FilterMode>() {
            Ok(mode) => {
                if machine.set_filter_mode(mode) {
                    println!("Filter: {mode}. Press s to start.");
                }
            }
            Err(e) => println!("{e}"),
        },
        "o" => match arg.parse::<SelectionMode>() {
            Ok(mode) => {
                if machine.set_selection_mode(mode) {
                    println!("Selection: {mode}. Press s to start.");
                }
            }
            Err(e) => println!("{e}"),
        },
        "v" => match arg.parse::<StudyMode>() {
            Ok(mode) => {
                if machine.set_study_mode(mode) && !machine.state().is_idle() {
                    render(machine, Transition::NoOp);
                }
            }
            Err(e) => println!("{e}"),
        },
        "w" => match arg.parse::<u64>() {
            Ok(secs) => {
                let wait = machine.set_wait_time(Duration::from_secs(secs));
                println!("Seconds per phase: {}", wait.as_secs());
            }
            Err(_) => println!("expected a number of seconds"),
        },
        "h" | "?" => println!("{HELP}"),
        "q" => return Flow::Quit,
        other => println!("unknown command: {other} (h for help)"),
    }

    Flow::Continue
}

fn report(machine: &SessionMachine, result: SessionResult<Transition>) {
    match result {
        Ok(transition) => render(machine, transition),
        Err(e) => print_error(&e),
    }
}

fn render(machine: &SessionMachine, transition: Transition) {
    if transition == Transition::Idle {
        println!("Nothing to advance. Press s to start.");
        return;
    }
    print!("{}", render_view(&machine.view(), transition));
    if machine.view().triggers_audio {
        // 终端响铃作为发音提示
        print!("\x07");
    }
}

fn print_error(error: &SessionError) {
    match error.kind() {
        ErrorKind::SelectionExhausted => {
            println!("{error}");
            println!("Change the category (c), the filter (f) or add words, then press s.");
        }
        kind => {
            tracing::error!(error = %error, kind = %kind, "session operation failed");
            println!("Error: {error}");
        }
    }
}

/// 将会话快照渲染为文本
pub fn render_view(view: &SessionView, transition: Transition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "────────────────────────────────");
    if transition == Transition::Resumed {
        let _ = writeln!(out, "↺ Resuming where you left off");
    }
    let _ = writeln!(
        out,
        "{}   [{} · {} · {} · {}]",
        view.label, view.study_mode, view.selected_category, view.filter_mode, view.selection_mode
    );

    if let Some(chinese) = &view.chinese {
        let _ = writeln!(out, "    {chinese}");
    }
    if let Some(pinyin) = &view.pinyin {
        let _ = writeln!(out, "    {pinyin}");
    }
    if let Some(spanish) = &view.spanish {
        let _ = writeln!(out, "    {spanish}");
    }
    if let Some(literal) = &view.literal_translation {
        let _ = writeln!(out, "    literal: {literal}");
    }
    if let Some(explanation) = &view.explanation {
        let _ = writeln!(out, "    {explanation}");
    }
    if view.triggers_audio {
        let _ = writeln!(out, "    🔊");
    }

    let mut flags = Vec::new();
    if view.needs_review {
        flags.push("review");
    }
    if view.archived {
        flags.push("archived");
    }
    let timer = match (view.is_playing, view.auto_advance) {
        (false, _) => "paused".to_string(),
        (true, false) => "manual".to_string(),
        (true, true) => format!("auto {}s", view.wait_time.as_secs()),
    };
    let _ = writeln!(
        out,
        "words studied: {} | {}/{} | {}{}",
        view.words_studied,
        view.history_position,
        view.history_len,
        timer,
        if flags.is_empty() {
            String::new()
        } else {
            format!(" | {}", flags.join(", "))
        }
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::WordSelector;
    use crate::storage::NewVocabularyEntry;

    fn machine_with_word() -> (Storage, SessionMachine) {
        let storage = Storage::in_memory().unwrap();
        storage
            .vocabulary()
            .add(NewVocabularyEntry::new("你好", "nǐ hǎo", "Hola", "Saludos"))
            .unwrap();
        let machine = SessionMachine::from_storage(&storage, SessionOptions::default())
            .with_selector(WordSelector::with_seed(SelectionMode::Sequential, 5));
        (storage, machine)
    }

    #[test]
    fn test_render_hides_fields_by_phase() {
        let (_storage, mut machine) = machine_with_word();
        machine.start_new_word().unwrap();

        let first = render_view(&machine.view(), Transition::NewWord);
        assert!(first.contains("你好"));
        assert!(!first.contains("nǐ hǎo"));
        assert!(!first.contains("🔊"));

        machine.advance().unwrap();
        machine.advance().unwrap();
        let third = render_view(&machine.view(), Transition::NextPhase(3));
        assert!(third.contains("nǐ hǎo") && third.contains("Hola"));
        assert!(third.contains("🔊"));
    }

    #[test]
    fn test_handle_command_controls_session() {
        let (storage, mut machine) = machine_with_word();

        assert_eq!(handle_command(&mut machine, &storage, "n"), Flow::Continue);
        assert_eq!(machine.state().phase, 1);

        handle_command(&mut machine, &storage, "n");
        assert_eq!(machine.state().phase, 2);

        handle_command(&mut machine, &storage, "p");
        assert!(!machine.state().is_playing);

        handle_command(&mut machine, &storage, "v full");
        assert_eq!(machine.state().study_mode, StudyMode::FullReveal);
        assert_eq!(machine.state().phase, 1);

        handle_command(&mut machine, &storage, "w 42");
        assert_eq!(machine.state().wait_time, Duration::from_secs(10));

        handle_command(&mut machine, &storage, "f archived");
        assert_eq!(machine.state().filter_mode, FilterMode::ArchivedOnly);
        assert!(machine.state().is_idle());

        assert_eq!(handle_command(&mut machine, &storage, "q"), Flow::Quit);
    }

    #[test]
    fn test_apply_args_overrides_options() {
        let args = StudyArgs {
            category: Some("Colores".into()),
            wait: Some(7),
            manual: true,
            ..StudyArgs::default()
        };
        let options = apply_args(SessionOptions::default(), args);
        assert_eq!(options.category, "Colores");
        assert_eq!(options.wait_time, Duration::from_secs(7));
        assert!(!options.auto_advance);
        assert_eq!(options.filter_mode, FilterMode::Normal);
    }
}
