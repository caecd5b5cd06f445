pub mod delimited;
pub mod resolver;
pub mod sheet;

use std::{
    collections::HashMap,
    path::Path,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::core::PackError;

pub use delimited::parse_delimited;
pub use resolver::{
    resolve,
    resolve_rename,
};
pub use sheet::parse_sheet;

/// Ordered filename mapping with unique keys.
///
/// Inserting an existing key replaces its value in place, so iteration order is
/// the order in which keys were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced value when `key` was already present.
    pub fn insert(&mut self, key: String, value: String) -> Option<String> {
        match self.index.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&position| self.entries[position].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl Serialize for MappingTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MappingTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = MappingTable::new();
        for (key, value) in iter {
            table.insert(key.into(), value.into());
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row_number: usize,
    pub missing_columns: Vec<String>,
    pub raw_values: (String, String), // (key column, value column)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRow {
    pub row_number: usize,
    pub key: String,
    pub first_row_number: usize,
    pub first_value: String,
    pub new_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostics {
    pub skipped_rows: Vec<SkippedRow>,
    pub duplicate_rows: Vec<DuplicateRow>,
}

impl ParseDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.skipped_rows.is_empty() && self.duplicate_rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedMapping {
    pub table: MappingTable,
    pub diagnostics: ParseDiagnostics,
    pub key_label: String,
    pub value_label: String,
}

impl ParsedMapping {
    pub fn status_message(&self) -> String {
        if self.table.is_empty() {
            format!("No file mappings found in columns {} and {}", self.key_label, self.value_label)
        } else {
            format!(
                "Loaded {} file mappings from columns {} and {}",
                self.table.len(),
                self.key_label,
                self.value_label
            )
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MappingOptions {
    pub key_column: usize,   // Zero-based, 16 = "Q"
    pub value_column: usize, // Zero-based, 17 = "R"
    pub sheet_header_rows: usize,
    pub delimited_header_rows: usize,
    pub delimiter: char,
}

fn default_sheet_header_rows() -> usize {
    1
}

fn default_delimiter() -> char {
    ','
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            key_column: 16,
            value_column: 17,
            sheet_header_rows: default_sheet_header_rows(),
            delimited_header_rows: 0,
            delimiter: default_delimiter(),
        }
    }
}

impl MappingOptions {
    pub fn key_label(&self) -> String {
        column_label(self.key_column)
    }

    pub fn value_label(&self) -> String {
        column_label(self.value_column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MappingKind {
    Spreadsheet,
    DelimitedText,
}

impl MappingKind {
    pub fn from_file_name(file_name: &str) -> Result<Self, PackError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xls" => Ok(MappingKind::Spreadsheet),
            "csv" => Ok(MappingKind::DelimitedText),
            _ => Err(PackError::UnsupportedMappingFileType(file_name.to_string())),
        }
    }
}

pub fn parse_mapping(
    kind: MappingKind,
    bytes: &[u8],
    options: &MappingOptions,
) -> Result<ParsedMapping, PackError> {
    match kind {
        MappingKind::Spreadsheet => parse_sheet(bytes, options),
        MappingKind::DelimitedText => parse_delimited(bytes, options),
    }
}

/// Reads a mapping file from disk, dispatching on its extension.
pub fn load_mapping_file(path: &Path, options: &MappingOptions) -> Result<ParsedMapping, PackError> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let kind = MappingKind::from_file_name(file_name)?;
    let bytes = std::fs::read(path)?;
    parse_mapping(kind, &bytes, options)
}

/// Zero-based column index to spreadsheet letters: 0 -> "A", 16 -> "Q", 26 -> "AA".
pub fn column_label(index: usize) -> String {
    let mut label = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Last column of an xlsx sheet ("XFD").
pub const MAX_COLUMN_INDEX: usize = 16_383;

/// Spreadsheet letters to zero-based column index. Returns None for non-letters
/// and for labels past `XFD`.
pub fn column_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }

    label
        .chars()
        .try_fold(0usize, |acc, c| {
            let c = c.to_ascii_uppercase();
            if !c.is_ascii_uppercase() {
                return None;
            }
            acc.checked_mul(26)?.checked_add(c as usize - 'A' as usize + 1)
        })
        .map(|n| n - 1)
        .filter(|index| *index <= MAX_COLUMN_INDEX)
}

/// Row classification shared by both source forms.
pub(crate) struct TableBuilder {
    table: MappingTable,
    diagnostics: ParseDiagnostics,
    first_seen: HashMap<String, (usize, String)>,
    key_label: String,
    value_label: String,
}

impl TableBuilder {
    pub(crate) fn new(options: &MappingOptions) -> Self {
        Self {
            table: MappingTable::new(),
            diagnostics: ParseDiagnostics::default(),
            first_seen: HashMap::new(),
            key_label: options.key_label(),
            value_label: options.value_label(),
        }
    }

    pub(crate) fn push_row(&mut self, row_number: usize, key: String, value: String) {
        if key.is_empty() || value.is_empty() {
            let mut missing_columns = Vec::new();
            if key.is_empty() {
                missing_columns.push(self.key_label.clone());
            }
            if value.is_empty() {
                missing_columns.push(self.value_label.clone());
            }
            tracing::debug!("Row {} skipped, missing {:?}", row_number, missing_columns);
            self.diagnostics.skipped_rows.push(SkippedRow {
                row_number,
                missing_columns,
                raw_values: (key, value),
            });
            return;
        }

        match self.first_seen.get(&key) {
            Some((first_row_number, first_value)) => {
                tracing::debug!(
                    "Row {} overrides mapping for '{}' from row {}",
                    row_number,
                    key,
                    first_row_number
                );
                self.diagnostics.duplicate_rows.push(DuplicateRow {
                    row_number,
                    key: key.clone(),
                    first_row_number: *first_row_number,
                    first_value: first_value.clone(),
                    new_value: value.clone(),
                });
            }
            None => {
                self.first_seen.insert(key.clone(), (row_number, value.clone()));
            }
        }

        self.table.insert(key, value);
    }

    pub(crate) fn finish(self) -> ParsedMapping {
        tracing::info!(
            "Parsed {} mappings ({} skipped rows, {} duplicate keys)",
            self.table.len(),
            self.diagnostics.skipped_rows.len(),
            self.diagnostics.duplicate_rows.len()
        );

        ParsedMapping {
            table: self.table,
            diagnostics: self.diagnostics,
            key_label: self.key_label,
            value_label: self.value_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_labels() {
        assert_eq!(column_label(0), "A");
        assert_eq!(column_label(16), "Q");
        assert_eq!(column_label(17), "R");
        assert_eq!(column_label(25), "Z");
        assert_eq!(column_label(26), "AA");
        assert_eq!(column_label(701), "ZZ");

        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("q"), Some(16));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index("XFD"), Some(MAX_COLUMN_INDEX));
        assert_eq!(column_index("XFE"), None);
        assert_eq!(column_index("ZZZZZZZZZZZZZZZ"), None);
        assert_eq!(column_index(&"Z".repeat(40)), None);
    }

    #[test]
    fn test_table_last_write_wins() {
        let mut table = MappingTable::new();
        assert_eq!(table.insert("a.heic".into(), "b.heic".into()), None);
        assert_eq!(table.insert("x.png".into(), "y.png".into()), None);
        assert_eq!(table.insert("a.heic".into(), "c.heic".into()), Some("b.heic".to_string()));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a.heic"), Some("c.heic"));
        let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a.heic", "x.png"]);
    }

    #[test]
    fn test_builder_classifies_rows() {
        let mut builder = TableBuilder::new(&MappingOptions::default());
        builder.push_row(2, "a.heic".into(), "b.heic".into());
        builder.push_row(3, "".into(), "orphan.heic".into());
        builder.push_row(4, "a.heic".into(), "c.heic".into());
        builder.push_row(5, "a.heic".into(), "d.heic".into());
        let parsed = builder.finish();

        assert_eq!(parsed.table.get("a.heic"), Some("d.heic"));
        assert_eq!(parsed.diagnostics.skipped_rows.len(), 1);
        assert_eq!(parsed.diagnostics.skipped_rows[0].missing_columns, vec!["Q".to_string()]);

        let duplicates = &parsed.diagnostics.duplicate_rows;
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[1].row_number, 5);
        assert_eq!(duplicates[1].first_row_number, 2);
        assert_eq!(duplicates[1].first_value, "b.heic");
        assert_eq!(duplicates[1].new_value, "d.heic");
    }

    #[test]
    fn test_mapping_kind_dispatch() {
        assert_eq!(MappingKind::from_file_name("map.XLSX").unwrap(), MappingKind::Spreadsheet);
        assert_eq!(MappingKind::from_file_name("legacy.xls").unwrap(), MappingKind::Spreadsheet);
        assert_eq!(MappingKind::from_file_name("map.csv").unwrap(), MappingKind::DelimitedText);
        assert!(matches!(
            MappingKind::from_file_name("map.txt"),
            Err(PackError::UnsupportedMappingFileType(_))
        ));
        assert!(MappingKind::from_file_name("noextension").is_err());
    }

    #[test]
    fn test_status_message() {
        let empty = ParsedMapping {
            key_label: "Q".into(),
            value_label: "R".into(),
            ..Default::default()
        };
        assert_eq!(empty.status_message(), "No file mappings found in columns Q and R");

        let loaded = ParsedMapping {
            table: [("a", "b")].into_iter().collect(),
            ..empty
        };
        assert_eq!(loaded.status_message(), "Loaded 1 file mappings from columns Q and R");
    }
}
