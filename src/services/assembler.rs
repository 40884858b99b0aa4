// Join-Query Assembler
//
// Renders `SELECT ... FROM ... LEFT JOIN ...` text from an ordered slice of
// TableDescriptors. The first descriptor is the FROM base; every later
// descriptor is LEFT JOINed in input order using its own join condition.
// Column and condition fragments are trusted literals and are copied as-is.

use thiserror::Error;

use crate::models::{QueryLayout, TableDescriptor};

/// Input errors detected before any text is rendered
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("No table descriptors supplied; a join query needs at least a base table")]
    EmptySequence,

    #[error("Descriptor {index} (alias '{alias}') has no join condition")]
    MissingJoinCondition { index: usize, alias: String },
}

/// Stateless assembler for star-schema join queries
pub struct JoinQueryAssembler;

impl JoinQueryAssembler {
    /// Assemble a single-line query
    pub fn assemble(descriptors: &[TableDescriptor]) -> Result<String, AssemblyError> {
        Self::assemble_with(descriptors, QueryLayout::Compact)
    }

    /// Assemble a query using the given layout.
    ///
    /// Both layouts produce the same tokens in the same order; only the
    /// whitespace between clauses differs.
    pub fn assemble_with(
        descriptors: &[TableDescriptor],
        layout: QueryLayout,
    ) -> Result<String, AssemblyError> {
        let (base, joins) = descriptors
            .split_first()
            .ok_or(AssemblyError::EmptySequence)?;

        // Validate every join before rendering anything
        let conditions = joins
            .iter()
            .enumerate()
            .map(|(offset, descriptor)| {
                descriptor
                    .condition()
                    .ok_or_else(|| AssemblyError::MissingJoinCondition {
                        index: offset + 1,
                        alias: descriptor.alias.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (clause_sep, column_sep, list_open) = match layout {
            QueryLayout::Compact => (" ", ", ", " "),
            QueryLayout::Pretty => ("\n", ",\n    ", "\n    "),
        };

        let mut sql = String::from("SELECT");
        sql.push_str(list_open);

        // 1. SELECT list
        for (i, descriptor) in descriptors.iter().enumerate() {
            if i > 0 {
                sql.push_str(column_sep);
            }
            sql.push_str(&descriptor.columns);
        }

        // 2. FROM
        sql.push_str(clause_sep);
        sql.push_str("FROM ");
        sql.push_str(&base.table);
        sql.push_str(" AS ");
        sql.push_str(&base.alias);

        // 3. LEFT JOINs, in input order
        for (descriptor, condition) in joins.iter().zip(conditions) {
            sql.push_str(clause_sep);
            sql.push_str("LEFT JOIN ");
            sql.push_str(&descriptor.table);
            sql.push_str(" AS ");
            sql.push_str(&descriptor.alias);
            sql.push_str(" ON ");
            sql.push_str(condition);
        }

        Ok(sql)
    }
}
