//! Comma-separated rule file: `pattern,entry,formatter,persister` per row.
//!
//! Blank lines and `#` comments are ignored, as is a leading header row.
//! Commas inside a pattern's parameter list do not split fields.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{RuleStorageHandler, StorageError};
use crate::rule::RuleRecord;

const HEADER: &str = "pattern,entry,formatter,persister";
const FIELD_COUNT: usize = 4;

/// File-backed rule storage.
pub struct CsvRulesStorage {
    path: PathBuf,
}

impl CsvRulesStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse file contents. Every data row becomes a record, in file order.
    ///
    /// A row with a single field yields a blank entry; fields past the fourth
    /// are kept in [`RuleRecord::extra`]. Both fail rule parsing, so the
    /// loader skips and reports them by position like any malformed record.
    pub fn parse(contents: &str) -> Vec<RuleRecord> {
        let mut records = Vec::new();
        let mut seen_row = false;

        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = split_fields(line);
            let is_header = !seen_row
                && fields
                    .first()
                    .is_some_and(|f| f.eq_ignore_ascii_case("pattern"));
            seen_row = true;
            if is_header {
                continue;
            }

            if fields.len() < 2 || fields.len() > FIELD_COUNT {
                debug!(line = idx + 1, fields = fields.len(), "rule row has wrong field count");
            }

            let extra = if fields.len() > FIELD_COUNT {
                fields.split_off(FIELD_COUNT)
            } else {
                Vec::new()
            };
            let optional = |i: usize| fields.get(i).filter(|f| !f.is_empty()).cloned();
            records.push(RuleRecord {
                pattern: fields[0].clone(),
                entry: fields.get(1).cloned().unwrap_or_default(),
                formatter: optional(2),
                persister: optional(3),
                extra,
            });
        }

        records
    }

    /// Render records as file contents, header included.
    pub fn render(records: &[RuleRecord]) -> Result<String, StorageError> {
        let mut out = String::with_capacity(HEADER.len() + 1 + records.len() * 48);
        out.push_str(HEADER);
        out.push('\n');

        for record in records {
            if !record.extra.is_empty() {
                return Err(StorageError::Unrepresentable {
                    pattern: record.pattern.clone(),
                    reason: format!("{} field(s) beyond the persister", record.extra.len()),
                });
            }
            let formatter = record.formatter.as_deref().unwrap_or("");
            let persister = record.persister.as_deref().unwrap_or("");
            for field in [record.entry.as_str(), formatter, persister] {
                if field.contains(',') || field.contains('\n') {
                    return Err(StorageError::Unrepresentable {
                        pattern: record.pattern.clone(),
                        reason: format!("field '{}' contains a separator", field),
                    });
                }
            }
            if record.pattern.contains('\n') || split_fields(&record.pattern).len() != 1 {
                return Err(StorageError::Unrepresentable {
                    pattern: record.pattern.clone(),
                    reason: "pattern contains a separator".to_string(),
                });
            }
            out.push_str(&format!(
                "{},{},{},{}\n",
                record.pattern, record.entry, formatter, persister
            ));
        }

        Ok(out)
    }
}

impl RuleStorageHandler for CsvRulesStorage {
    fn load(&self) -> Result<Vec<RuleRecord>, StorageError> {
        let contents = fs::read_to_string(&self.path)?;
        let records = Self::parse(&contents);
        debug!(path = %self.path.display(), count = records.len(), "read rule file");
        Ok(records)
    }

    /// Writes to a dotted `.tmp` sibling first, then renames over the
    /// target so readers never see a partial file.
    fn save(&self, records: &[RuleRecord]) -> Result<(), StorageError> {
        let contents = Self::render(records)?;
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("rules.csv");
        let tmp_path = self.path.with_file_name(format!(".{}.tmp", file_name));

        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;

        info!(path = %self.path.display(), count = records.len(), "wrote rule file");
        Ok(())
    }

    fn watch_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Split on commas that are not inside parentheses; fields are trimmed.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in line.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
