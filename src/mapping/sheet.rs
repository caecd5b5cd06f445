//! Mapping extraction from `.xlsx` workbooks.
//!
//! A workbook is a zip bundle of SpreadsheetML parts. Only the first worksheet and
//! the optional shared-string table are read; the XML is scanned with regular
//! expressions since the cell subset we need is small and flat.

use std::{
    io::{
        Cursor,
        Read,
    },
    sync::OnceLock,
};

use regex::{
    Captures,
    Regex,
};
use zip::ZipArchive;

use super::{
    column_index,
    MappingOptions,
    ParsedMapping,
    TableBuilder,
};
use crate::core::PackError;

const FIRST_SHEET: &str = "xl/worksheets/sheet1.xml";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";

struct SheetPatterns {
    worksheet_name: Regex,
    row: Regex,
    cell: Regex,
    value: Regex,
    text_run: Regex,
    phonetic_run: Regex,
    shared_item: Regex,
    attr_ref: Regex,
    attr_type: Regex,
    entity: Regex,
}

fn patterns() -> &'static SheetPatterns {
    static PATTERNS: OnceLock<SheetPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("sheet pattern is valid");
        SheetPatterns {
            worksheet_name: re(r"(?i)worksheets/sheet(\d*)\.xml$"),
            row: re(r"(?s)<(?:\w+:)?row\b([^>]*?)(?:/>|>(.*?)</(?:\w+:)?row>)"),
            cell: re(r"(?s)<(?:\w+:)?c\b([^>]*?)(?:/>|>(.*?)</(?:\w+:)?c>)"),
            value: re(r"(?s)<(?:\w+:)?v(?:\s[^>]*)?>(.*?)</(?:\w+:)?v>"),
            text_run: re(r"(?s)<(?:\w+:)?t(?:\s[^>]*)?>(.*?)</(?:\w+:)?t>"),
            phonetic_run: re(r"(?s)<(?:\w+:)?rPh\b.*?</(?:\w+:)?rPh>"),
            shared_item: re(r"(?s)<(?:\w+:)?si\b[^>]*?(?:/>|>(.*?)</(?:\w+:)?si>)"),
            attr_ref: re(r#"(?:^|\s)r\s*=\s*["']([^"']*)["']"#),
            attr_type: re(r#"(?:^|\s)t\s*=\s*["']([^"']*)["']"#),
            entity: re(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);"),
        }
    })
}

pub fn parse_sheet(bytes: &[u8], options: &MappingOptions) -> Result<ParsedMapping, PackError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PackError::MalformedWorkbook(e.to_string()))?;

    let sheet_name = locate_worksheet(&archive).ok_or(PackError::MissingWorksheet)?;
    tracing::debug!("Reading worksheet part {}", sheet_name);
    let sheet_xml = read_part(&mut archive, &sheet_name)?;

    let shared_strings = if archive.index_for_name(SHARED_STRINGS).is_some() {
        parse_shared_strings(&read_part(&mut archive, SHARED_STRINGS)?)
    } else {
        Vec::new()
    };

    let mut builder = TableBuilder::new(options);
    let p = patterns();

    for (position, row) in p.row.captures_iter(&sheet_xml).enumerate() {
        if position < options.sheet_header_rows {
            continue;
        }

        let attributes = row.get(1).map_or("", |m| m.as_str());
        let row_number = attribute(&p.attr_ref, attributes)
            .and_then(|r| r.trim().parse::<usize>().ok())
            .unwrap_or(position + 1);

        let content = row.get(2).map_or("", |m| m.as_str());
        let cells = read_cells(content, &shared_strings);
        if cells.iter().all(|(_, value)| value.is_empty()) {
            continue;
        }

        let value_at = |column: usize| {
            cells
                .iter()
                .find(|(index, _)| *index == column)
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        };

        builder.push_row(row_number, value_at(options.key_column), value_at(options.value_column));
    }

    Ok(builder.finish())
}

fn locate_worksheet(archive: &ZipArchive<Cursor<&[u8]>>) -> Option<String> {
    if archive.index_for_name(FIRST_SHEET).is_some() {
        return Some(FIRST_SHEET.to_string());
    }

    // Lowest-numbered worksheet part wins
    archive
        .file_names()
        .filter_map(|name| {
            let captures = patterns().worksheet_name.captures(name)?;
            let number = captures[1].parse::<u64>().unwrap_or(u64::MAX);
            Some((number, name.to_string()))
        })
        .min()
        .map(|(_, name)| name)
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String, PackError> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| PackError::MalformedWorkbook(format!("{}: {}", name, e)))?;

    let mut buffer = Vec::new();
    part.read_to_end(&mut buffer)
        .map_err(|e| PackError::MalformedWorkbook(format!("{}: {}", name, e)))?;

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn parse_shared_strings(xml: &str) -> Vec<String> {
    let p = patterns();
    p.shared_item
        .captures_iter(xml)
        .map(|item| {
            let body = item.get(1).map_or("", |m| m.as_str());
            concat_text_runs(body)
        })
        .collect()
}

/// Concatenates the `<t>` runs of a rich-text body, ignoring phonetic hints.
fn concat_text_runs(body: &str) -> String {
    let p = patterns();
    let without_phonetics = p.phonetic_run.replace_all(body, "");
    p.text_run
        .captures_iter(&without_phonetics)
        .map(|run| unescape_xml(&run[1]))
        .collect()
}

/// Returns (column index, resolved value) for every cell of a row body.
fn read_cells(row_content: &str, shared_strings: &[String]) -> Vec<(usize, String)> {
    let p = patterns();
    let mut cells = Vec::new();
    let mut next_column = 0usize;

    for cell in p.cell.captures_iter(row_content) {
        let attributes = cell.get(1).map_or("", |m| m.as_str());
        let body = cell.get(2).map_or("", |m| m.as_str());

        let column = attribute(&p.attr_ref, attributes)
            .and_then(|reference| {
                let letters: String =
                    reference.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
                column_index(&letters)
            })
            .unwrap_or(next_column);
        next_column = column + 1;

        let value = match attribute(&p.attr_type, attributes) {
            Some("inlineStr") => concat_text_runs(body),
            Some("s") => {
                let raw = first_value(body);
                raw.trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| shared_strings.get(index).cloned())
                    .unwrap_or(raw)
            }
            _ => first_value(body),
        };

        cells.push((column, value));
    }

    cells
}

fn first_value(cell_body: &str) -> String {
    patterns()
        .value
        .captures(cell_body)
        .map(|v| unescape_xml(&v[1]))
        .unwrap_or_default()
}

fn attribute<'a>(pattern: &Regex, attributes: &'a str) -> Option<&'a str> {
    pattern.captures(attributes).and_then(|c| c.get(1)).map(|m| m.as_str())
}

pub(crate) fn unescape_xml(text: &str) -> String {
    patterns()
        .entity
        .replace_all(text, |captures: &Captures| {
            let entity = &captures[1];
            match entity {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        entity[1..].parse::<u32>().ok()
                    };
                    code.and_then(char::from_u32)
                        .map(String::from)
                        .unwrap_or_else(|| captures[0].to_string())
                }
            }
        })
        .into_owned()
}
