pub mod api;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::config::BackendConfig;
use crate::error::BackendError;

pub use api::ApiBackend;
pub use sqlite::SqliteBackend;

/// One release as returned by a search backend
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReleaseRow {
    pub id: i64,
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub team: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub cat: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub genre: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub url: String,
    /// Size in bytes, as reported by the backend
    #[serde(deserialize_with = "null_as_default")]
    pub size: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub files: i64,
    /// Release time, seconds since the epoch
    #[serde(rename = "preAt", deserialize_with = "epoch_seconds")]
    pub pre_at: i64,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    null_as_default(d)
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

// The API reports preAt as a float on some rows, and as null on a few.
fn epoch_seconds<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.map_or(0, |secs| secs as i64))
}

/// Search releases by free-text query. An empty query means "latest releases".
/// Implementations return at most `max` rows, newest first where the backend
/// has an order of its own.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max: usize) -> Result<Vec<ReleaseRow>, BackendError>;

    fn name(&self) -> &'static str;
}

/// Backend for running the bot without any release database.
pub struct NullBackend;

#[async_trait]
impl SearchBackend for NullBackend {
    async fn search(&self, _query: &str, _max: usize) -> Result<Vec<ReleaseRow>, BackendError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Build the backend selected in configuration.
pub fn from_config(config: &BackendConfig) -> Result<Arc<dyn SearchBackend>> {
    let backend: Arc<dyn SearchBackend> = match config {
        BackendConfig::None => Arc::new(NullBackend),
        BackendConfig::Sqlite { database_path } => Arc::new(SqliteBackend::open(database_path)?),
        BackendConfig::Api {
            base_url,
            timeout_secs,
        } => Arc::new(ApiBackend::new(
            base_url,
            Duration::from_secs(*timeout_secs),
        )?),
    };
    info!("Search backend: {}", backend.name());
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_from_api_json() {
        let json = r#"{
            "id": 7, "name": "Some.Release-GRP", "team": "GRP", "cat": "TV",
            "genre": null, "url": "", "size": 1234.5, "files": 3, "preAt": 1500000000.75
        }"#;
        let row: ReleaseRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.name, "Some.Release-GRP");
        assert_eq!(row.genre, "");
        assert_eq!(row.size, 1234.5);
        assert_eq!(row.files, 3);
        assert_eq!(row.pre_at, 1_500_000_000);
    }

    #[test]
    fn test_row_missing_fields_default() {
        let row: ReleaseRow = serde_json::from_str(r#"{"id": 1, "name": "X"}"#).unwrap();
        assert_eq!(row.team, "");
        assert_eq!(row.pre_at, 0);
    }

    #[test]
    fn test_row_null_numbers_default_to_zero() {
        let json = r#"{
            "id": 9, "name": "Some.Release-GRP", "team": "GRP", "cat": "TV",
            "genre": "", "url": "", "size": null, "files": null, "preAt": null
        }"#;
        let row: ReleaseRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, 9);
        assert_eq!(row.size, 0.0);
        assert_eq!(row.files, 0);
        assert_eq!(row.pre_at, 0);
    }

    #[tokio::test]
    async fn test_null_backend_returns_nothing() {
        let rows = NullBackend.search("anything", 5).await.unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_from_config_none() {
        let backend = from_config(&BackendConfig::None).unwrap();
        assert_eq!(backend.name(), "none");
    }
}
