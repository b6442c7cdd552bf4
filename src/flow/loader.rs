use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::flow::step::{FlowData, Step, StepOption};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("failed to read flow file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One validation finding, surfaced to the user in the startup notice.
#[derive(Clone, Debug)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
        }
    }
}

pub const REQUIRED_HEADERS: [&str; 2] = ["StepID", "Title"];

const DESC_HEADERS: [&str; 3] = ["Desc1", "Desc2", "Desc3"];

pub fn load_file(path: &Path) -> Result<(FlowData, Vec<Issue>), FlowError> {
    let text = fs::read_to_string(path)?;
    Ok(load_str(&text))
}

/// Parse, validate, and build a flow. Never fails: on fatal issues the
/// returned flow contains a single synthetic error step so the UI can still
/// render something.
pub fn load_str(text: &str) -> (FlowData, Vec<Issue>) {
    let rows = parse_csv(text);
    let (records, mut issues) = map_records(&rows);
    issues.extend(validate(&records));

    let valid = !issues.iter().any(|i| i.severity == Severity::Error);

    let mut steps: HashMap<String, Step> = HashMap::new();
    if valid {
        for rec in &records {
            steps.insert(rec.id.clone(), build_step(rec));
        }
    }

    if !valid || steps.is_empty() {
        warn!("flow data invalid, falling back to placeholder step");
        let placeholder = error_step();
        let start = placeholder.id.clone();
        let mut steps = HashMap::new();
        steps.insert(start.clone(), placeholder);
        return (
            FlowData {
                steps,
                start,
                valid: false,
            },
            issues,
        );
    }

    // Flows conventionally start at step "1"; fall back to the first row
    // when a sheet numbers itself differently.
    let start = if steps.contains_key("1") {
        "1".to_string()
    } else {
        records[0].id.clone()
    };

    (
        FlowData {
            steps,
            start,
            valid: true,
        },
        issues,
    )
}

fn error_step() -> Step {
    Step {
        id: "1".to_string(),
        title: "Error".to_string(),
        description: "The flow data contains errors. Fix the source file and reload.".to_string(),
        note: String::new(),
        options: Vec::new(),
        default_next: String::new(),
        auto_select: false,
    }
}

/// Header-mapped view of one CSV data row.
#[derive(Clone, Debug, Default)]
struct Record {
    id: String,
    title: String,
    descriptions: Vec<String>,
    note: String,
    /// (text, next) pairs, raw from the sheet; either half may be empty.
    options: [(String, String); 3],
    default_next: String,
    non_auto_select: String,
    /// 1-based line number in the sheet, for messages.
    line: usize,
}

fn map_records(rows: &[Vec<String>]) -> (Vec<Record>, Vec<Issue>) {
    let mut issues = Vec::new();

    let Some(header) = rows.first() else {
        issues.push(Issue::error("flow data is empty".to_string()));
        return (Vec::new(), issues);
    };
    let header: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    for required in REQUIRED_HEADERS {
        if !header.iter().any(|h| h == required) {
            issues.push(Issue::error(format!(
                "required column \"{required}\" is missing from the flow data"
            )));
        }
    }

    let col = |name: &str| header.iter().position(|h| h == name);
    let field = |row: &[String], idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let id_col = col("StepID");
    let title_col = col("Title");
    let note_col = col("Note");
    let default_col = col("DefaultNext");
    let non_auto_col = col("NonAutoSelect");
    let desc_cols: Vec<Option<usize>> = DESC_HEADERS.iter().map(|h| col(h)).collect();
    let option_cols: Vec<(Option<usize>, Option<usize>)> = (1..=3)
        .map(|n| {
            (
                col(&format!("Option{n}Text")),
                col(&format!("Option{n}Next")),
            )
        })
        .collect();

    let mut records = Vec::new();
    for (i, row) in rows.iter().enumerate().skip(1) {
        let id = field(row, id_col);
        if id.is_empty() {
            continue; // blank row
        }

        let mut rec = Record {
            id,
            title: field(row, title_col),
            note: field(row, note_col),
            default_next: strip_to_prefix(&field(row, default_col)),
            non_auto_select: field(row, non_auto_col),
            line: i + 1,
            ..Record::default()
        };
        rec.descriptions = desc_cols
            .iter()
            .map(|c| field(row, *c))
            .filter(|d| !d.is_empty())
            .collect();
        for (slot, (text_col, next_col)) in rec.options.iter_mut().zip(&option_cols) {
            *slot = (
                field(row, *text_col),
                strip_to_prefix(&field(row, *next_col)),
            );
        }
        records.push(rec);
    }

    (records, issues)
}

/// Step references in the sheets are sometimes written as "to 5"; strip the
/// connective so both forms resolve.
fn strip_to_prefix(value: &str) -> String {
    match value.strip_prefix("to ") {
        Some(rest) => rest.trim_start().to_string(),
        None => value.to_string(),
    }
}

fn validate(records: &[Record]) -> Vec<Issue> {
    let mut issues = Vec::new();

    if records.is_empty() {
        issues.push(Issue::error("flow data has no step rows".to_string()));
        return issues;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for rec in records {
        if !seen.insert(&rec.id) {
            issues.push(Issue::error(format!(
                "duplicate StepID \"{}\" on line {}",
                rec.id, rec.line
            )));
        }
    }

    let all_ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    for rec in records {
        if !rec.default_next.is_empty() && !all_ids.contains(rec.default_next.as_str()) {
            issues.push(Issue::warning(format!(
                "step {}: the \"Next\" button points at unknown step \"{}\"",
                rec.id, rec.default_next
            )));
        }
        for (text, next) in &rec.options {
            if !text.is_empty() && next.is_empty() {
                issues.push(Issue::error(format!(
                    "step {}: option \"{text}\" has no next step",
                    rec.id
                )));
            } else if !next.is_empty() && !all_ids.contains(next.as_str()) {
                issues.push(Issue::warning(format!(
                    "step {}: option \"{text}\" points at unknown step \"{next}\"",
                    rec.id
                )));
            }
        }
    }

    issues
}

fn build_step(rec: &Record) -> Step {
    let options = rec
        .options
        .iter()
        .filter(|(text, next)| !text.is_empty() && !next.is_empty())
        .map(|(text, next)| StepOption {
            text: text.clone(),
            next: next.clone(),
        })
        .collect();

    // Auto-selection is on unless the sheet explicitly opts the step out.
    let flag = rec.non_auto_select.trim();
    let non_auto = flag == "1" || flag.eq_ignore_ascii_case("true");

    Step {
        id: rec.id.clone(),
        title: rec.title.clone(),
        description: rec.descriptions.join("\n"),
        note: rec.note.clone(),
        options,
        default_next: rec.default_next.clone(),
        auto_select: !non_auto,
    }
}

/// Quote-aware CSV split: double quotes delimit fields, `""` escapes a quote
/// inside a quoted field, and CR/LF/CRLF all end a row outside quotes.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                row.push(std::mem::take(&mut field));
            }
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}
