// Table Descriptor Model
//
// One entry of the ordered input to the join-query assembler. The first
// descriptor is the FROM base, every later one is LEFT JOINed onto it.

use serde::{Deserialize, Serialize};

/// A table's contribution to an assembled join query.
///
/// `columns` and `join_condition` are trusted SQL fragments: they are copied
/// into the query text verbatim and never parsed by the assembler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Fully-qualified source table name (e.g. `spotify_cata.silver.dimuser`)
    pub table: String,
    /// Alias used to qualify columns in the generated query
    pub alias: String,
    /// Comma-ready column fragment for the SELECT list
    #[serde(alias = "cols")]
    pub columns: String,
    /// Predicate relating this alias to a previously introduced one.
    /// Ignored on the first descriptor.
    #[serde(
        default,
        alias = "condition",
        alias = "joinCondition",
        skip_serializing_if = "Option::is_none"
    )]
    pub join_condition: Option<String>,
}

impl TableDescriptor {
    /// Descriptor for the base (FROM) table
    pub fn base(
        table: impl Into<String>,
        alias: impl Into<String>,
        columns: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            columns: columns.into(),
            join_condition: None,
        }
    }

    /// Descriptor for a LEFT JOINed table
    pub fn joined(
        table: impl Into<String>,
        alias: impl Into<String>,
        columns: impl Into<String>,
        join_condition: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            columns: columns.into(),
            join_condition: Some(join_condition.into()),
        }
    }

    /// The join condition, if present and not blank
    pub fn condition(&self) -> Option<&str> {
        self.join_condition
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_notebook_keys() {
        let json = r#"{
            "table": "spotify_cata.silver.dimuser",
            "alias": "dimuser",
            "cols": "dimuser.user_id, dimuser.user_name",
            "condition": "factstream.user_id = dimuser.user_id"
        }"#;

        let descriptor: TableDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.columns, "dimuser.user_id, dimuser.user_name");
        assert_eq!(
            descriptor.condition(),
            Some("factstream.user_id = dimuser.user_id")
        );
    }

    #[test]
    fn test_deserialize_camel_case_condition() {
        let json = r#"{"table": "dimuser", "alias": "u", "columns": "u.name", "joinCondition": "f.user_id = u.user_id"}"#;
        let descriptor: TableDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.condition(), Some("f.user_id = u.user_id"));
    }

    #[test]
    fn test_base_descriptor_has_no_condition() {
        let json = r#"{"table": "factstream", "alias": "f", "columns": "f.id"}"#;
        let descriptor: TableDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor, TableDescriptor::base("factstream", "f", "f.id"));
        assert!(descriptor.condition().is_none());
    }

    #[test]
    fn test_blank_condition_counts_as_missing() {
        let descriptor = TableDescriptor::joined("dimuser", "u", "u.name", "   ");
        assert!(descriptor.condition().is_none());
    }
}
