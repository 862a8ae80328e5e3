//! MongoDB client and collection wrapper
//!
//! Thin typed wrapper over the MongoDB driver. Connection and server
//! selection carry short timeouts so an unreachable store fails the
//! operation quickly instead of hanging request handlers.

use bson::{doc, Document};
use futures_util::StreamExt;
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::types::LedgerError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, LedgerError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| LedgerError::Store(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| LedgerError::Store(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, LedgerError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, LedgerError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), LedgerError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| LedgerError::Store(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document. The ledger is append-only: this is the only way
    /// a document ever enters a collection.
    pub async fn insert_one(&self, item: T) -> Result<(), LedgerError> {
        self.inner
            .insert_one(item)
            .await
            .map_err(|e| LedgerError::Store(format!("Insert failed: {}", e)))?;

        Ok(())
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, LedgerError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| LedgerError::Store(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, LedgerError> {
        let cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| LedgerError::Store(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Update one document. Restricted by the callers to the single
    /// permitted mutation: the `processed: false -> true` flag flip.
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, LedgerError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| LedgerError::Store(format!("Update failed: {}", e)))
    }

    /// Run a `$match`/`$group` aggregation that sums `field` over documents
    /// matching `filter`, returning 0 when nothing matches.
    pub async fn aggregate_sum(
        &self,
        filter: Document,
        field: &str,
    ) -> Result<i64, LedgerError> {
        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$group": { "_id": null, "total": { "$sum": format!("${}", field) } } },
        ];

        let mut cursor = self
            .inner
            .aggregate(pipeline)
            .await
            .map_err(|e| LedgerError::Store(format!("Aggregation failed: {}", e)))?;

        if let Some(result) = cursor.next().await {
            let doc = result
                .map_err(|e| LedgerError::Store(format!("Aggregation cursor failed: {}", e)))?;
            let total = doc
                .get_i64("total")
                .or_else(|_| doc.get_i32("total").map(i64::from))
                .unwrap_or(0);
            return Ok(total);
        }

        Ok(0)
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}
