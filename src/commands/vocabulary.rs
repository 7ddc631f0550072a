//! 词库管理命令

use std::fs::File;
use std::io::{BufReader, BufWriter};

use super::{AddArgs, CommandResult, EditArgs, ListArgs, TransferArgs};
use crate::seed;
use crate::storage::{
    export_delimited, import_delimited, EntryPatch, NewVocabularyEntry, Storage,
    VocabularyEntry, WordFilter, ALL_CATEGORIES,
};

pub fn add(storage: &Storage, args: AddArgs) -> CommandResult {
    let mut new_entry = NewVocabularyEntry::new(args.chinese, args.pinyin, args.spanish, args.category);
    new_entry.explanation = args.explanation;
    new_entry.literal_translation = args.literal;

    let entry = storage.vocabulary().add(new_entry)?;
    println!("Added {}", format_entry(&entry));
    Ok(())
}

pub fn edit(storage: &Storage, args: EditArgs) -> CommandResult {
    let patch = EntryPatch {
        chinese: args.chinese,
        pinyin: args.pinyin,
        spanish: args.spanish,
        category: args.category,
        explanation: args.explanation,
        literal_translation: args.literal,
    };
    if patch.is_empty() {
        return Err("nothing to edit: pass at least one field flag".into());
    }

    let entry = storage.vocabulary().update(&args.id, patch)?;
    println!("Updated {}", format_entry(&entry));
    Ok(())
}

pub fn delete(storage: &Storage, id: &str) -> CommandResult {
    storage.vocabulary().delete(id)?;
    println!("Deleted {id}");
    Ok(())
}

pub fn list(storage: &Storage, args: ListArgs) -> CommandResult {
    let repo = storage.vocabulary();
    let category = args.category.unwrap_or_else(|| ALL_CATEGORIES.to_string());

    let entries = match args.filter {
        Some(mode) => repo.eligible(&WordFilter::new(category, mode))?,
        None => repo
            .all()?
            .into_iter()
            .filter(|e| category == ALL_CATEGORIES || e.category == category)
            .collect(),
    };

    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    println!("{} entries", entries.len());
    Ok(())
}

pub fn categories(storage: &Storage) -> CommandResult {
    for category in storage.vocabulary().categories()? {
        println!("{category}");
    }
    Ok(())
}

pub fn stats(storage: &Storage) -> CommandResult {
    let stats = storage.vocabulary().stats()?;
    println!("entries:      {}", stats.total);
    println!("categories:   {}", stats.categories);
    println!("needs review: {}", stats.needs_review);
    println!("archived:     {}", stats.archived);
    Ok(())
}

pub fn toggle_review(storage: &Storage, id: &str) -> CommandResult {
    let entry = storage.vocabulary().toggle_review(id)?;
    println!("{}", format_entry(&entry));
    Ok(())
}

pub fn toggle_archived(storage: &Storage, id: &str) -> CommandResult {
    let entry = storage.vocabulary().toggle_archived(id)?;
    println!("{}", format_entry(&entry));
    Ok(())
}

pub fn import(storage: &Storage, args: TransferArgs) -> CommandResult {
    let delimiter = args.delimiter()?;
    let file = File::open(&args.path)?;
    let report = import_delimited(&storage.vocabulary(), BufReader::new(file), delimiter)?;

    println!(
        "Imported {} entries, rejected {}",
        report.accepted, report.rejected
    );
    for error in &report.errors {
        println!("  [{}] {}", error.kind(), error);
    }
    Ok(())
}

pub fn export(storage: &Storage, args: TransferArgs) -> CommandResult {
    let delimiter = args.delimiter()?;
    let file = File::create(&args.path)?;
    let count = export_delimited(&storage.vocabulary(), BufWriter::new(file), delimiter)?;
    println!("Exported {count} entries to {}", args.path.display());
    Ok(())
}

pub fn seed(storage: &Storage, force: bool) -> CommandResult {
    let repo = storage.vocabulary();
    let inserted = if force {
        seed::seed(&repo)?
    } else {
        seed::seed_if_empty(&repo)?
    };

    if inserted == 0 {
        println!("Vocabulary is not empty; use --force to insert the starter set anyway");
    } else {
        println!("Inserted {inserted} starter entries");
    }
    Ok(())
}

/// 单行展示：`id  汉字 (pinyin) = español [分类] 标记`
pub fn format_entry(entry: &VocabularyEntry) -> String {
    let mut line = format!(
        "{}  {} ({}) = {} [{}]",
        entry.id, entry.chinese, entry.pinyin, entry.spanish, entry.category
    );
    if entry.needs_review {
        line.push_str(" *review");
    }
    if entry.archived {
        line.push_str(" *archived");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_entry_flags() {
        let storage = Storage::in_memory().unwrap();
        let repo = storage.vocabulary();
        let entry = repo
            .add(NewVocabularyEntry::new("你好", "nǐ hǎo", "Hola", "Saludos"))
            .unwrap();
        assert!(format_entry(&entry).ends_with("你好 (nǐ hǎo) = Hola [Saludos]"));

        let flagged = repo.toggle_review(&entry.id).unwrap();
        assert!(format_entry(&flagged).ends_with("*review"));
    }
}
