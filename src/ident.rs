//! Identifier sanitiser.
//!
//! Arbitrary user column names become safe SQL identifiers through one
//! deterministic mapping. The mapping is injective enough for the
//! domain; two distinct names collapsing onto the same identifier is a
//! configuration error the caller must surface.

/// Sanitise a column name: lower-case, spaces to `_`, strip every byte
/// outside `[a-z0-9_]`.
pub fn sanitise(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// The canonical lookup-table name for a fact column.
pub fn lookup_table_name(fact_column: &str) -> String {
    format!("{}_lookup", sanitise(fact_column))
}

/// Find sanitised-name collisions among a set of column names.
pub fn find_collisions<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    use std::collections::HashMap;
    let mut seen: HashMap<String, u32> = HashMap::new();
    for name in names {
        *seen.entry(sanitise(name)).or_default() += 1;
    }
    let mut collisions: Vec<String> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect();
    collisions.sort();
    collisions
}
