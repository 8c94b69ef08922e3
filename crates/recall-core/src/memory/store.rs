//! ============================================================================
//! Memory Store - Qdrant vector database operations
//! ============================================================================
//! Stores and retrieves memory records using vector similarity search,
//! partitioned by user id. An invalid connection or collection fails
//! construction, so a broken deployment is caught at process start.
//! ============================================================================

use qdrant_client::qdrant::{
    point_id::PointIdOptions, points_selector::PointsSelectorOneOf, Condition,
    CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::embeddings::EMBEDDING_DIM;
use super::types::MemoryRecord;
use crate::error::{RecallError, Result};

/// Memory store backed by a Qdrant collection
pub struct MemoryStore {
    client: Qdrant,
    collection: String,
}

impl MemoryStore {
    /// Connect to Qdrant and ensure the collection exists
    pub async fn connect(connection_string: &str, collection: &str) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", connection_string);

        let client = Qdrant::from_url(connection_string).build().map_err(|e| {
            RecallError::store_unavailable(format!("Failed to create Qdrant client: {}", e))
        })?;

        let store = Self {
            client,
            collection: collection.to_string(),
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    /// Ensure the configured collection exists
    async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(|e| {
                RecallError::store_unavailable(format!(
                    "Failed to check collection existence: {}",
                    e
                ))
            })?;

        if !exists {
            info!("Creating collection: {}", self.collection);

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(self.collection.as_str()).vectors_config(
                        VectorParamsBuilder::new(EMBEDDING_DIM as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| {
                    RecallError::store_unavailable(format!("Failed to create collection: {}", e))
                })?;

            info!("Collection {} created successfully", self.collection);
        } else {
            debug!("Collection {} already exists", self.collection);
        }

        Ok(())
    }

    /// Store one record with its embedding
    pub async fn upsert(&self, record: &MemoryRecord, embedding: Vec<f32>) -> Result<()> {
        debug!("Storing record {} for user {}", record.id, record.user_id);

        let payload: HashMap<String, Value> = [
            ("user_id".to_string(), Value::from(record.user_id.clone())),
            ("text".to_string(), Value::from(record.text.clone())),
            ("created_at".to_string(), Value::from(record.created_at)),
        ]
        .into_iter()
        .collect();

        let point = PointStruct::new(record.id.to_string(), embedding, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), vec![point]))
            .await
            .map_err(|e| {
                RecallError::store_unavailable(format!("Failed to upsert record: {}", e))
            })?;

        Ok(())
    }

    /// Search a user's records by similarity to a query vector,
    /// ranked order as returned by the store
    pub async fn search(
        &self,
        user_id: &str,
        query_embedding: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<MemoryRecord>> {
        debug!("Searching records for user {} (limit: {})", user_id, limit);

        let filter = Filter::must([Condition::matches("user_id", user_id.to_string())]);

        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.collection.as_str(), query_embedding, limit)
                    .filter(filter)
                    .with_payload(true),
            )
            .await
            .map_err(|e| {
                RecallError::store_unavailable(format!("Failed to search records: {}", e))
            })?;

        let records: Vec<MemoryRecord> = search_result
            .result
            .into_iter()
            .filter_map(|point| record_from_point(point.id, point.payload))
            .collect();

        debug!("Found {} matching records", records.len());
        Ok(records)
    }

    /// Non-semantic scroll over a user's records
    pub async fn scroll(&self, user_id: &str, limit: u64) -> Result<Vec<MemoryRecord>> {
        debug!("Listing records for user {} (limit: {})", user_id, limit);

        let filter = Filter::must([Condition::matches("user_id", user_id.to_string())]);

        let scroll_result = self
            .client
            .scroll(
                ScrollPointsBuilder::new(self.collection.as_str())
                    .filter(filter)
                    .limit(limit as u32)
                    .with_payload(true),
            )
            .await
            .map_err(|e| {
                RecallError::store_unavailable(format!("Failed to scroll records: {}", e))
            })?;

        let records: Vec<MemoryRecord> = scroll_result
            .result
            .into_iter()
            .filter_map(|point| record_from_point(point.id, point.payload))
            .collect();

        Ok(records)
    }

    /// Delete every record owned by a user
    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        info!("Deleting all records for user {}", user_id);

        let filter = Filter::must([Condition::matches("user_id", user_id.to_string())]);

        self.client
            .delete_points(
                DeletePointsBuilder::new(self.collection.as_str())
                    .points(PointsSelectorOneOf::Filter(filter)),
            )
            .await
            .map_err(|e| {
                RecallError::store_unavailable(format!("Failed to delete records: {}", e))
            })?;

        Ok(())
    }
}

/// Rebuild a record from a retrieved point; points with foreign id shapes
/// or missing payload fields are skipped
fn record_from_point(
    point_id: Option<qdrant_client::qdrant::PointId>,
    payload: HashMap<String, Value>,
) -> Option<MemoryRecord> {
    let id = extract_uuid_from_point_id(point_id?)?;

    Some(MemoryRecord {
        id,
        user_id: get_string(&payload, "user_id")?,
        text: get_string(&payload, "text")?,
        created_at: get_i64(&payload, "created_at").unwrap_or(0),
    })
}

// Helper to extract UUID from PointId
fn extract_uuid_from_point_id(point_id: qdrant_client::qdrant::PointId) -> Option<Uuid> {
    match point_id.point_id_options? {
        PointIdOptions::Uuid(uuid_str) => Uuid::parse_str(&uuid_str).ok(),
        PointIdOptions::Num(_) => None, // We use UUID strings, not numeric IDs
    }
}

// Helper functions to extract values from payload
fn get_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
}

fn get_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| v.as_integer())
}
