//! 分隔文本导入/导出
//!
//! 首行为表头，列顺序任意：
//! `chinese, pinyin, spanish, category[, explanation, literal_translation, needs_review, archived]`。
//! 支持双引号包裹的字段（字段内 `""` 表示一个引号，可跨行）。
//! 单行校验失败只跳过该行并计入报告，不会中断整批导入。

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::Serialize;

use crate::error::ErrorKind;
use crate::storage::{
    run_in_transaction, NewVocabularyEntry, StorageError, StorageResult, VocabularyEntry,
    VocabularyRepository,
};

/// 导出时的列顺序
const EXPORT_COLUMNS: [&str; 8] = [
    "chinese",
    "pinyin",
    "spanish",
    "category",
    "explanation",
    "literal_translation",
    "needs_review",
    "archived",
];

/// 被拒绝的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRowError {
    /// 记录起始行号（从 1 开始，含表头）
    pub line: usize,
    pub reason: String,
}

impl ImportRowError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ImportRowInvalid
    }
}

impl fmt::Display for ImportRowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// 导入结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub accepted: usize,
    pub rejected: usize,
    pub errors: Vec<ImportRowError>,
}

impl ImportReport {
    fn reject(&mut self, line: usize, reason: impl Into<String>) {
        self.rejected += 1;
        self.errors.push(ImportRowError {
            line,
            reason: reason.into(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Chinese,
    Pinyin,
    Spanish,
    Category,
    Explanation,
    LiteralTranslation,
    NeedsReview,
    Archived,
}

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "chinese" | "hanzi" | "中文" => Some(Column::Chinese),
            "pinyin" | "拼音" => Some(Column::Pinyin),
            "spanish" | "español" | "espanol" | "translation" => Some(Column::Spanish),
            "category" | "categoría" | "categoria" => Some(Column::Category),
            "explanation" | "explicación" | "explicacion" => Some(Column::Explanation),
            "literal_translation" | "literal" => Some(Column::LiteralTranslation),
            "needs_review" | "review" => Some(Column::NeedsReview),
            "archived" => Some(Column::Archived),
            _ => None,
        }
    }
}

const REQUIRED_COLUMNS: [(Column, &str); 4] = [
    (Column::Chinese, "chinese"),
    (Column::Pinyin, "pinyin"),
    (Column::Spanish, "spanish"),
    (Column::Category, "category"),
];

#[derive(Debug)]
struct Record {
    line: usize,
    fields: Vec<String>,
}

/// 从分隔文本导入词汇
///
/// 表头缺少必填列时整批失败（返回 `InvalidEntry`）；数据库错误时整批回滚。
pub fn import_delimited<R: Read>(
    repo: &VocabularyRepository,
    mut reader: R,
    delimiter: char,
) -> StorageResult<ImportReport> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    let mut records = parse_records(input.trim_start_matches('\u{feff}'), delimiter).into_iter();
    let Some(header) = records.next() else {
        return Ok(ImportReport::default());
    };

    let columns: HashMap<Column, usize> = header
        .fields
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| Column::from_header(name).map(|col| (col, idx)))
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|(col, _)| !columns.contains_key(col))
        .map(|(_, name)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(StorageError::InvalidEntry(format!(
            "表头缺少必填列: {}",
            missing.join(", ")
        )));
    }

    let mut report = ImportReport::default();
    let mut rows = Vec::new();

    for record in records {
        match row_to_entry(&record, &columns) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                tracing::debug!(
                    line = record.line,
                    %reason,
                    kind = ErrorKind::ImportRowInvalid.as_str(),
                    "import row rejected"
                );
                report.reject(record.line, reason);
            }
        }
    }

    report.accepted = insert_rows(repo.shared_connection(), rows)?;

    tracing::info!(
        accepted = report.accepted,
        rejected = report.rejected,
        "vocabulary import finished"
    );
    Ok(report)
}

struct ImportRow {
    entry: NewVocabularyEntry,
    needs_review: bool,
    archived: bool,
}

fn row_to_entry(record: &Record, columns: &HashMap<Column, usize>) -> Result<ImportRow, String> {
    let field = |col: Column| -> String {
        columns
            .get(&col)
            .and_then(|idx| record.fields.get(*idx))
            .cloned()
            .unwrap_or_default()
    };

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|(col, _)| field(*col).trim().is_empty())
        .map(|(_, name)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing required field(s): {}", missing.join(", ")));
    }

    let mut entry = NewVocabularyEntry::new(
        field(Column::Chinese),
        field(Column::Pinyin),
        field(Column::Spanish),
        field(Column::Category),
    );
    entry.explanation = Some(field(Column::Explanation));
    entry.literal_translation = Some(field(Column::LiteralTranslation));

    Ok(ImportRow {
        entry,
        needs_review: parse_flag(&field(Column::NeedsReview))?,
        archived: parse_flag(&field(Column::Archived))?,
    })
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" | "sí" | "si" => Ok(true),
        other => Err(format!("invalid flag value: {other}")),
    }
}

fn insert_rows(conn: &Arc<Mutex<Connection>>, rows: Vec<ImportRow>) -> StorageResult<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    run_in_transaction(conn, |conn| {
        let mut next_order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM vocabulary",
            [],
            |row| row.get(0),
        )?;

        let mut inserted = 0;
        for row in rows {
            let mut entry = row.entry.into_entry(next_order)?;
            entry.needs_review = row.needs_review;
            entry.archived = row.archived;
            entry.insert(conn)?;
            next_order += 1;
            inserted += 1;
        }
        Ok(inserted)
    })
}

/// 导出全部词汇为分隔文本，返回导出条数
pub fn export_delimited<W: Write>(
    repo: &VocabularyRepository,
    mut writer: W,
    delimiter: char,
) -> StorageResult<usize> {
    let entries = repo.all()?;
    let sep = delimiter.to_string();

    writeln!(writer, "{}", EXPORT_COLUMNS.join(&sep))?;
    for entry in &entries {
        writeln!(writer, "{}", export_line(entry, delimiter))?;
    }
    writer.flush()?;

    tracing::info!(count = entries.len(), "vocabulary exported");
    Ok(entries.len())
}

fn export_line(entry: &VocabularyEntry, delimiter: char) -> String {
    let fields = [
        entry.chinese.as_str(),
        entry.pinyin.as_str(),
        entry.spanish.as_str(),
        entry.category.as_str(),
        entry.explanation.as_deref().unwrap_or(""),
        entry.literal_translation.as_deref().unwrap_or(""),
        if entry.needs_review { "1" } else { "0" },
        if entry.archived { "1" } else { "0" },
    ];
    fields
        .iter()
        .map(|field| quote_field(field, delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

fn quote_field(field: &str, delimiter: char) -> String {
    let needs_quotes = field.contains(delimiter)
        || field.contains('"')
        || field.contains('\n')
        || field.contains('\r')
        || field.trim() != field;
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// 将文本切分为记录；空行被跳过
fn parse_records(input: &str, delimiter: char) -> Vec<Record> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted_record = false;
    let mut line = 1;
    let mut record_line = 1;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quoted_record = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                let blank = !quoted_record && fields.len() == 1 && fields[0].trim().is_empty();
                if !blank {
                    records.push(Record {
                        line: record_line,
                        fields: std::mem::take(&mut fields),
                    });
                }
                fields.clear();
                quoted_record = false;
                line += 1;
                record_line = line;
            }
            c if c == delimiter => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !fields.is_empty() || quoted_record {
        fields.push(field);
        records.push(Record {
            line: record_line,
            fields,
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FilterMode, Storage, WordFilter, ALL_CATEGORIES};

    fn setup() -> VocabularyRepository {
        Storage::in_memory()
            .expect("Failed to create in-memory storage")
            .vocabulary()
    }

    #[test]
    fn test_parse_records_with_quotes() {
        let input = "a,b,c\n\"x, y\",\"he said \"\"hi\"\"\",z\r\n\n\"multi\nline\",2,3";
        let records = parse_records(input, ',');

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].fields, vec!["x, y", "he said \"hi\"", "z"]);
        assert_eq!(records[1].line, 2);
        assert_eq!(records[2].fields[0], "multi\nline");
        assert_eq!(records[2].line, 4);
    }

    #[test]
    fn test_import_counts_accepted_and_rejected() {
        let repo = setup();
        let csv = "\
chinese,pinyin,spanish,category,explanation
你好,nǐ hǎo,Hola,Saludos,saludo común
谢谢,,Gracias,Saludos,
,yī,Uno,Números,
三,sān,Tres,Números,
";
        let report = import_delimited(&repo, csv.as_bytes(), ',').unwrap();

        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.errors[0].line, 3);
        assert!(report.errors[0].reason.contains("pinyin"));
        assert_eq!(report.errors[1].line, 4);

        let all = repo.eligible(&WordFilter::all()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].explanation.as_deref(), Some("saludo común"));
        assert_eq!(all[1].explanation, None);
    }

    #[test]
    fn test_import_header_any_order_and_semicolon() {
        let repo = setup();
        let input = "category;spanish;pinyin;chinese;archived\nColores;Rojo;hóng sè;红色;1\n";
        let report = import_delimited(&repo, input.as_bytes(), ';').unwrap();
        assert_eq!(report.accepted, 1);

        let archived = repo
            .eligible(&WordFilter::new(ALL_CATEGORIES, FilterMode::ArchivedOnly))
            .unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].chinese, "红色");
    }

    #[test]
    fn test_import_rejects_bad_flag_value() {
        let repo = setup();
        let input = "chinese,pinyin,spanish,category,needs_review\n月,yuè,Mes,Tiempo,maybe\n";
        let report = import_delimited(&repo, input.as_bytes(), ',').unwrap();
        assert_eq!(report.accepted, 0);
        assert_eq!(report.rejected, 1);
    }

    #[test]
    fn test_import_missing_header_column_fails() {
        let repo = setup();
        let input = "chinese,pinyin,category\n你好,nǐ hǎo,Saludos\n";
        let result = import_delimited(&repo, input.as_bytes(), ',');
        assert!(matches!(result, Err(StorageError::InvalidEntry(_))));
    }

    #[test]
    fn test_import_empty_input() {
        let repo = setup();
        let report = import_delimited(&repo, "".as_bytes(), ',').unwrap();
        assert_eq!(report, ImportReport::default());
    }

    #[test]
    fn test_export_then_import_preserves_entries() {
        let source = setup();
        source
            .add(
                NewVocabularyEntry::new("问题", "wèn tí", "Pregunta, duda", "Aula")
                    .with_literal_translation("preguntar \"tema\""),
            )
            .unwrap();
        let flagged = source
            .add(NewVocabularyEntry::new("答案", "dá àn", "Respuesta", "Aula"))
            .unwrap();
        source.toggle_review(&flagged.id).unwrap();

        let mut buffer = Vec::new();
        let exported = export_delimited(&source, &mut buffer, ',').unwrap();
        assert_eq!(exported, 2);

        let target = setup();
        let report = import_delimited(&target, buffer.as_slice(), ',').unwrap();
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, 0);

        let imported = target.all().unwrap();
        assert_eq!(imported[0].spanish, "Pregunta, duda");
        assert_eq!(
            imported[0].literal_translation.as_deref(),
            Some("preguntar \"tema\"")
        );
        assert!(imported[1].needs_review);
    }
}
