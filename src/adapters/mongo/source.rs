//! MongoDB source store implementation
//!
//! Implements the ordered-paginated-query primitive: filter to records
//! strictly after the checkpoint under the `_id` order, sort ascending,
//! limit to the batch size. Documents are emitted as relaxed Extended
//! JSON, which is the wire shape the Transform stage normalizes.

use crate::adapters::mongo::client::{is_connection, map_driver_error, MongoConnection};
use crate::adapters::traits::SourceStore;
use crate::domain::checkpoint::Checkpoint;
use crate::domain::errors::FerryError;
use crate::domain::result::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use serde_json::Value;
use std::sync::Arc;

/// MongoDB-backed record source
pub struct MongoSource {
    connection: Arc<MongoConnection>,
}

impl MongoSource {
    pub fn new(connection: Arc<MongoConnection>) -> Self {
        Self { connection }
    }

    async fn run_query(&self, filter: Document, limit: usize) -> Result<Vec<Value>> {
        let client = self.connection.acquire().await?;
        let config = self.connection.config();
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);

        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .limit(limit as i64)
            .max_time(self.connection.operation_timeout())
            .build();

        let fetch = async {
            let mut cursor = collection.find(filter, options).await?;
            let mut records = Vec::with_capacity(limit);
            while let Some(document) = cursor.try_next().await? {
                records.push(Bson::Document(document).into_relaxed_extjson());
            }
            Ok::<_, mongodb::error::Error>(records)
        };

        match fetch.await {
            Ok(records) => Ok(records),
            Err(e) => {
                let mapped = map_driver_error(&e);
                if is_connection(&mapped) {
                    self.connection.invalidate().await;
                }
                Err(FerryError::Extract(mapped))
            }
        }
    }
}

#[async_trait]
impl SourceStore for MongoSource {
    async fn fetch_after(
        &self,
        checkpoint: Option<&Checkpoint>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let mut filter = Document::new();
        if let Some(checkpoint) = checkpoint {
            let last_id = ObjectId::parse_str(checkpoint.as_str()).map_err(|e| {
                FerryError::Validation(format!(
                    "invalid checkpoint '{}': {}",
                    checkpoint.as_str(),
                    e
                ))
            })?;
            filter.insert("_id", doc! { "$gt": last_id });
        }

        self.run_query(filter, limit).await
    }
}
