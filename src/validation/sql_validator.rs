use std::collections::HashSet;

use sqlparser::ast::Statement;
use sqlparser::dialect::{DatabricksDialect, Dialect, GenericDialect};
use sqlparser::parser::Parser;

use crate::api::middleware::AppError;
use crate::models::TableDescriptor;

/// SQL validation for assembled queries before they reach the engine
pub struct SqlValidator;

impl SqlValidator {
    /// Validate that the SQL is exactly one SELECT query.
    ///
    /// Descriptor fragments are copied verbatim into the query, so a fragment
    /// carrying `; DROP TABLE ...` shows up here as a second statement.
    pub fn validate_select_only(sql: &str) -> Result<String, AppError> {
        let ast = Self::parse(sql)?;

        if ast.is_empty() {
            return Err(AppError::InvalidSql("Empty SQL query".to_string()));
        }

        if ast.len() > 1 {
            return Err(AppError::InvalidSql(format!(
                "Expected a single SELECT statement, found {} statements",
                ast.len()
            )));
        }

        match &ast[0] {
            Statement::Query(_) => Ok(sql.to_string()),
            Statement::Insert { .. } => Err(AppError::InvalidSql(
                "INSERT statements are not allowed. Only SELECT queries are permitted.".to_string(),
            )),
            Statement::Drop { .. } => Err(AppError::InvalidSql(
                "DROP statements are not allowed. Only SELECT queries are permitted.".to_string(),
            )),
            other => Err(AppError::InvalidSql(format!(
                "Only SELECT queries are permitted. Found: {}",
                other
            ))),
        }
    }

    /// Reject descriptor lists that reuse an alias.
    ///
    /// Aliases are compared case-insensitively, matching how unquoted
    /// identifiers resolve in the engine.
    pub fn check_unique_aliases(descriptors: &[TableDescriptor]) -> Result<(), AppError> {
        let mut seen = HashSet::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let alias = descriptor.alias.trim().to_lowercase();
            if !seen.insert(alias) {
                return Err(AppError::Validation(format!(
                    "Alias '{}' is used by more than one table descriptor",
                    descriptor.alias
                )));
            }
        }

        Ok(())
    }

    /// Parse with the Databricks dialect, falling back to the generic one
    fn parse(sql: &str) -> Result<Vec<Statement>, AppError> {
        Self::parse_with(&DatabricksDialect {}, sql)
            .or_else(|_| Self::parse_with(&GenericDialect {}, sql))
    }

    fn parse_with(dialect: &dyn Dialect, sql: &str) -> Result<Vec<Statement>, AppError> {
        Parser::new(dialect)
            .try_with_sql(sql)
            .and_then(|mut parser| parser.parse_statements())
            .map_err(|e| AppError::InvalidSql(format!("SQL parsing error: {}", e)))
    }
}
