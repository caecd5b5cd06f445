use super::{
    MappingOptions,
    ParsedMapping,
    TableBuilder,
};
use crate::core::PackError;

/// Parses newline-separated records split on `options.delimiter`.
///
/// Quotes carry no meaning here: fields are split on every delimiter, then trimmed
/// and stripped of `"` characters. Records end at `\n`; a lone `\r` stays inside its field.
pub fn parse_delimited(bytes: &[u8], options: &MappingOptions) -> Result<ParsedMapping, PackError> {
    let delimiter = u8::try_from(options.delimiter)
        .ok()
        .filter(|d| d.is_ascii())
        .ok_or_else(|| {
            PackError::Custom(format!("Delimiter '{}' must be a single ASCII character", options.delimiter))
        })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_reader(bytes);

    let mut builder = TableBuilder::new(options);
    let mut record = csv::ByteRecord::new();
    let mut position = 0usize;

    while reader.read_byte_record(&mut record)? {
        let fields: Vec<String> = record.iter().map(clean_field).collect();
        if fields.iter().all(|field| field.is_empty()) {
            continue;
        }

        position += 1;
        if position <= options.delimited_header_rows {
            continue;
        }

        let row_number = record.position().map(|p| p.line() as usize).unwrap_or(position);
        let field = |index: usize| fields.get(index).cloned().unwrap_or_default();

        builder.push_row(row_number, field(options.key_column), field(options.value_column));
    }

    Ok(builder.finish())
}

fn clean_field(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, value: &str) -> String {
        let mut fields = vec!["".to_string(); 16];
        fields[0] = "id".to_string();
        fields.push(key.to_string());
        fields.push(value.to_string());
        fields.join(",")
    }

    #[test]
    fn test_parses_designated_columns() {
        let text = format!("{}\n{}\r\n", row("a.heic", "b.heic"), row(" \"x.png\" ", "y.png"));

        let parsed = parse_delimited(text.as_bytes(), &MappingOptions::default()).unwrap();

        assert_eq!(parsed.table.len(), 2);
        assert_eq!(parsed.table.get("a.heic"), Some("b.heic"));
        assert_eq!(parsed.table.get("x.png"), Some("y.png"));
        assert!(parsed.diagnostics.is_clean());
    }

    #[test]
    fn test_lone_carriage_return_does_not_split_records() {
        let text = format!("{}\rtrailing\n{}\r\n", row("a.heic", "b.heic"), row("c.heic", "d.heic"));

        let parsed = parse_delimited(text.as_bytes(), &MappingOptions::default()).unwrap();

        assert_eq!(parsed.table.len(), 2);
        assert_eq!(parsed.table.get("a.heic"), Some("b.heic\rtrailing"));
        assert_eq!(parsed.table.get("c.heic"), Some("d.heic"));
        assert!(parsed.diagnostics.is_clean());
    }

    #[test]
    fn test_short_record_is_skipped() {
        let text = format!("x,y\n{}\n", row("a.heic", "b.heic"));

        let parsed = parse_delimited(text.as_bytes(), &MappingOptions::default()).unwrap();

        assert_eq!(parsed.table.len(), 1);
        assert!(!parsed.table.contains_key("x"));
        let skipped = &parsed.diagnostics.skipped_rows;
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].row_number, 1);
        assert_eq!(skipped[0].missing_columns, vec!["Q".to_string(), "R".to_string()]);
    }

    #[test]
    fn test_no_header_skipped_by_default() {
        let text = [row("Original", "Renamed"), row("a.heic", "b.heic")].join("\n");

        let parsed = parse_delimited(text.as_bytes(), &MappingOptions::default()).unwrap();
        assert_eq!(parsed.table.get("Original"), Some("Renamed"));

        let options = MappingOptions { delimited_header_rows: 1, ..Default::default() };
        let parsed = parse_delimited(text.as_bytes(), &options).unwrap();
        assert!(!parsed.table.contains_key("Original"));
        assert_eq!(parsed.table.len(), 1);
    }

    #[test]
    fn test_duplicates_and_blank_lines() {
        let text =
            [row("a.heic", "b.heic"), String::new(), ",,,".to_string(), row("a.heic", "c.heic")]
                .join("\n");

        let parsed = parse_delimited(text.as_bytes(), &MappingOptions::default()).unwrap();

        assert_eq!(parsed.table.get("a.heic"), Some("c.heic"));
        assert!(parsed.diagnostics.skipped_rows.is_empty());
        let duplicates = &parsed.diagnostics.duplicate_rows;
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].row_number, 4);
        assert_eq!(duplicates[0].first_row_number, 1);
        assert_eq!(duplicates[0].first_value, "b.heic");
        assert_eq!(duplicates[0].new_value, "c.heic");
    }

    #[test]
    fn test_custom_delimiter_and_columns() {
        let options = MappingOptions {
            key_column: 0,
            value_column: 1,
            delimiter: ';',
            ..Default::default()
        };

        let parsed = parse_delimited(b"one.heic;uno.heic\ntwo.heic;\n", &options).unwrap();

        assert_eq!(parsed.table.get("one.heic"), Some("uno.heic"));
        assert_eq!(parsed.diagnostics.skipped_rows.len(), 1);
        assert_eq!(parsed.diagnostics.skipped_rows[0].missing_columns, vec!["B".to_string()]);

        let bad = MappingOptions { delimiter: '→', ..Default::default() };
        assert!(parse_delimited(b"a", &bad).is_err());
    }
}
