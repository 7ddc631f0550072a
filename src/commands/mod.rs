//! 命令行入口
//!
//! - `study`: 交互式闪卡学习（默认命令）
//! - `vocabulary`: 词库管理、导入导出、初始词汇

pub mod study;
pub mod vocabulary;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::session::{SelectionMode, StudyMode};
use crate::storage::{FilterMode, Storage};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "hanzi-flashcards")]
#[command(about = "Mandarin vocabulary flashcards with timed reveal phases")]
#[command(version)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "FLASHCARDS_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive study session
    Study(StudyArgs),
    /// Add a vocabulary entry
    Add(AddArgs),
    /// Edit fields of an existing entry
    Edit(EditArgs),
    /// Delete an entry
    Delete { id: String },
    /// List entries
    List(ListArgs),
    /// List categories
    Categories,
    /// Show vocabulary statistics
    Stats,
    /// Flip the needs-review flag of an entry
    ToggleReview { id: String },
    /// Flip the archived flag of an entry
    ToggleArchived { id: String },
    /// Import entries from a delimited file with a header row
    Import(TransferArgs),
    /// Export all entries to a delimited file
    Export(TransferArgs),
    /// Insert the starter vocabulary
    Seed {
        /// Insert even when the vocabulary is not empty
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct StudyArgs {
    /// Category to study ("all" for every category)
    #[arg(short, long)]
    pub category: Option<String>,

    /// Study mode: standard, full, listening
    #[arg(short, long)]
    pub mode: Option<StudyMode>,

    /// Word selection: random, sequential
    #[arg(short, long)]
    pub selection: Option<SelectionMode>,

    /// Filter: normal, review, archived
    #[arg(short, long)]
    pub filter: Option<FilterMode>,

    /// Seconds per phase (1-10)
    #[arg(short, long)]
    pub wait: Option<u64>,

    /// Disable timer-driven advance
    #[arg(long)]
    pub manual: bool,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub chinese: String,
    pub pinyin: String,
    pub spanish: String,
    pub category: String,

    #[arg(long)]
    pub explanation: Option<String>,

    #[arg(long)]
    pub literal: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub chinese: Option<String>,

    #[arg(long)]
    pub pinyin: Option<String>,

    #[arg(long)]
    pub spanish: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Empty string clears the explanation
    #[arg(long)]
    pub explanation: Option<String>,

    /// Empty string clears the literal translation
    #[arg(long)]
    pub literal: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(short, long)]
    pub category: Option<String>,

    /// normal, review or archived; omitted lists every entry
    #[arg(short, long)]
    pub filter: Option<FilterMode>,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    pub path: PathBuf,

    /// Field delimiter; `\t` for tab
    #[arg(short, long, default_value = ",")]
    pub delimiter: String,
}

impl TransferArgs {
    pub fn delimiter(&self) -> Result<char, String> {
        match self.delimiter.as_str() {
            "\\t" | "tab" => Ok('\t'),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c != '"' && c != '\n' => Ok(c),
                    _ => Err(format!("invalid delimiter: {other:?}")),
                }
            }
        }
    }
}

/// 打开数据库并分派子命令
pub async fn run(cli: Cli, config: Config) -> CommandResult {
    let db_path = cli.db.unwrap_or_else(|| config.db_path.clone());
    let storage = Storage::open(&db_path)?;
    tracing::debug!(path = %db_path.display(), "database opened");

    match cli.command.unwrap_or(Command::Study(StudyArgs::default())) {
        Command::Study(args) => study::run(storage, &config, args).await,
        Command::Add(args) => vocabulary::add(&storage, args),
        Command::Edit(args) => vocabulary::edit(&storage, args),
        Command::Delete { id } => vocabulary::delete(&storage, &id),
        Command::List(args) => vocabulary::list(&storage, args),
        Command::Categories => vocabulary::categories(&storage),
        Command::Stats => vocabulary::stats(&storage),
        Command::ToggleReview { id } => vocabulary::toggle_review(&storage, &id),
        Command::ToggleArchived { id } => vocabulary::toggle_archived(&storage, &id),
        Command::Import(args) => vocabulary::import(&storage, args),
        Command::Export(args) => vocabulary::export(&storage, args),
        Command::Seed { force } => vocabulary::seed(&storage, force),
    }
}
