use super::MappingTable;

/// Final output name for `original_name`: the mapped target, or the name itself.
pub fn resolve(original_name: &str, table: &MappingTable) -> String {
    table.get(original_name).unwrap_or(original_name).to_string()
}

/// Resolves a name and reports the original when a rename happened.
pub fn resolve_rename(original_name: &str, table: &MappingTable) -> (String, Option<String>) {
    let final_name = resolve(original_name, table);
    let renamed_from = (final_name != original_name).then(|| original_name.to_string());
    (final_name, renamed_from)
}
