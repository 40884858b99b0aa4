// Table Registration Model
//
// Describes a file-backed table that the SQL engine should expose under a
// (possibly three-part) name, e.g. a silver table written by an ingest
// pipeline.

use serde::{Deserialize, Serialize};

/// On-disk file format of a table or an ingest source
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Parquet,
    Csv,
    #[serde(alias = "ndjson")]
    Json,
}

impl FileFormat {
    /// File extension used to discover files of this format
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Parquet => "parquet",
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }
}

/// A table the SQL engine registers at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRegistration {
    /// Name queries refer to (`dimuser` or `spotify_cata.silver.dimuser`)
    pub name: String,
    /// File or directory holding the table data
    pub path: String,
    #[serde(default)]
    pub format: FileFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        let format: FileFormat = serde_json::from_str(r#""ndjson""#).unwrap();
        assert_eq!(format, FileFormat::Json);
        assert!(serde_json::from_str::<FileFormat>(r#""delta""#).is_err());
    }

    #[test]
    fn test_registration_defaults_to_parquet() {
        let registration: TableRegistration =
            serde_json::from_str(r#"{"name": "dimuser", "path": "/silver/DimUser/data"}"#).unwrap();
        assert_eq!(registration.format, FileFormat::Parquet);
        assert_eq!(registration.format.extension(), "parquet");
    }
}
