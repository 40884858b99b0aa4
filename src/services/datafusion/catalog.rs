// DataFusion CatalogManager
//
// Registers file-backed tables (silver outputs, lookup files) with a
// SessionContext so assembled join queries can resolve them by name.

use anyhow::{anyhow, Context, Result};
use datafusion::prelude::*;

use crate::models::{FileFormat, TableRegistration};

/// Manages table registration for DataFusion
///
/// # Architecture
/// ```text
/// CatalogManager
///   └── Catalog (e.g., "spotify_cata")
///       └── Schema (e.g., "silver")
///           └── Tables (e.g., "dimuser", "factstream")
/// ```
pub struct DataFusionCatalogManager {
    /// Session context for table registration
    ctx: SessionContext,
}

impl DataFusionCatalogManager {
    /// Create a new CatalogManager with a SessionContext
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Register a file or directory as a table, replacing any table of the same name.
    ///
    /// # Example
    /// ```rust,ignore
    /// catalog_manager.register(&TableRegistration {
    ///     name: "spotify_cata.silver.dimuser".into(),
    ///     path: "/data/silver/DimUser/data".into(),
    ///     format: FileFormat::Parquet,
    /// }).await?;
    ///
    /// // Now can query: SELECT * FROM spotify_cata.silver.dimuser
    /// ```
    pub async fn register(&mut self, registration: &TableRegistration) -> Result<()> {
        if self.ctx.table_exist(registration.name.as_str())? {
            self.ctx.deregister_table(registration.name.as_str())?;
        }

        let name = registration.name.as_str();
        let path = registration.path.as_str();

        match registration.format {
            FileFormat::Parquet => {
                self.ctx
                    .register_parquet(name, path, ParquetReadOptions::default())
                    .await
            }
            FileFormat::Csv => self.ctx.register_csv(name, path, CsvReadOptions::new()).await,
            FileFormat::Json => {
                self.ctx
                    .register_json(name, path, NdJsonReadOptions::default())
                    .await
            }
        }
        .with_context(|| format!("Failed to register table '{}' from {}", name, path))?;

        tracing::info!(
            "Registered {} table {} from {}",
            registration.format.extension(),
            name,
            path
        );

        Ok(())
    }

    /// Register every table, logging (not failing on) tables that cannot be read.
    ///
    /// Silver tables only exist after their ingest pipeline has run once, so a
    /// missing or half-written table at startup is expected.
    pub async fn register_all(&mut self, registrations: &[TableRegistration]) -> Vec<String> {
        let mut skipped = Vec::new();

        for registration in registrations {
            if let Err(e) = self.register(registration).await {
                tracing::warn!("Skipping table {}: {:#}", registration.name, e);
                skipped.push(registration.name.clone());
            }
        }

        skipped
    }

    /// List tables registered in the session's default schema
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let options = self.ctx.copied_config().options().catalog.clone();

        let catalog = self.ctx.catalog(&options.default_catalog).ok_or_else(|| {
            anyhow!("Default catalog '{}' not found", options.default_catalog)
        })?;

        let schema = catalog.schema(&options.default_schema).ok_or_else(|| {
            anyhow!("Default schema '{}' not found", options.default_schema)
        })?;

        let mut tables = schema.table_names();
        tables.sort();
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_register_csv_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "dimuser.csv", "user_id,user_name\n1,ADA\n2,GRACE\n");

        let ctx = SessionContext::new();
        let mut manager = DataFusionCatalogManager::new(ctx.clone());
        manager
            .register(&TableRegistration {
                name: "dimuser".to_string(),
                path,
                format: FileFormat::Csv,
            })
            .await
            .unwrap();

        assert_eq!(manager.list_tables().unwrap(), vec!["dimuser".to_string()]);

        let batches = ctx
            .sql("SELECT user_name FROM dimuser WHERE user_id = 2")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 1);
    }

    #[tokio::test]
    async fn test_register_replaces_existing_table() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_file(dir.path(), "a.csv", "id\n1\n");
        let second = write_file(dir.path(), "b.csv", "id\n1\n2\n");

        let ctx = SessionContext::new();
        let mut manager = DataFusionCatalogManager::new(ctx.clone());
        for path in [first, second] {
            manager
                .register(&TableRegistration {
                    name: "t".to_string(),
                    path,
                    format: FileFormat::Csv,
                })
                .await
                .unwrap();
        }

        let batches = ctx
            .sql("SELECT id FROM t")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 2);
    }

    #[tokio::test]
    async fn test_register_all_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(dir.path(), "dimuser.csv", "user_id\n1\n");
        let bad = write_file(dir.path(), "dimartist.json", "{not json");

        let mut manager = DataFusionCatalogManager::new(SessionContext::new());
        let skipped = manager
            .register_all(&[
                TableRegistration {
                    name: "dimuser".to_string(),
                    path: good,
                    format: FileFormat::Csv,
                },
                TableRegistration {
                    name: "dimartist".to_string(),
                    path: bad,
                    format: FileFormat::Json,
                },
            ])
            .await;

        assert_eq!(skipped, vec!["dimartist".to_string()]);
        assert_eq!(manager.list_tables().unwrap(), vec!["dimuser".to_string()]);
    }
}
