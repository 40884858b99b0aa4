use std::time::Instant;

use crate::api::middleware::AppError;
use crate::models::{AssembleResponse, Query, QueryLayout, TableDescriptor};
use crate::services::assembler::JoinQueryAssembler;
use crate::services::datafusion::SqlEngine;
use crate::validation::SqlValidator;

/// Assembles join queries from descriptors and runs them on an engine
pub struct QueryService {
    strict_aliases: bool,
}

impl QueryService {
    /// `strict_aliases` rejects duplicate descriptor aliases before assembly
    pub fn new(strict_aliases: bool) -> Self {
        Self { strict_aliases }
    }

    /// Assemble the query text for a descriptor list
    pub fn assemble(
        &self,
        descriptors: &[TableDescriptor],
        layout: QueryLayout,
    ) -> Result<AssembleResponse, AppError> {
        if self.strict_aliases {
            SqlValidator::check_unique_aliases(descriptors)?;
        }

        let query = JoinQueryAssembler::assemble_with(descriptors, layout).map_err(|e| {
            tracing::warn!("Rejected descriptor list: {}", e);
            e
        })?;

        tracing::info!("Assembled join query over {} table(s)", descriptors.len());
        tracing::debug!("{}", query);

        Ok(AssembleResponse {
            query,
            table_count: descriptors.len(),
        })
    }

    /// Assemble, validate and execute a join query.
    ///
    /// Engine failures are logged and propagated unmodified.
    pub async fn execute(
        &self,
        descriptors: &[TableDescriptor],
        layout: QueryLayout,
        engine: &dyn SqlEngine,
    ) -> Result<Query, AppError> {
        let assembled = self.assemble(descriptors, layout)?;
        let mut query = Query::new(assembled.query);

        SqlValidator::validate_select_only(&query.query_text)?;

        let start_time = Instant::now();
        query.mark_executing();

        let result = match engine.execute(&query.query_text).await {
            Ok(result) => result,
            Err(e) => {
                query.mark_failed(e.to_string());
                tracing::error!(
                    "Query {} failed on {}: {}",
                    query.id,
                    engine.engine_name(),
                    query.error_message.as_deref().unwrap_or_default()
                );
                return Err(e);
            }
        };

        tracing::info!(
            "Query {} returned {} row(s) in {}ms",
            query.id,
            result.row_count,
            start_time.elapsed().as_millis()
        );
        query.mark_completed(result);

        Ok(query)
    }
}
