use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use scylla::value::{CqlValue, Row};

use super::{SessionProvider, StoreError, delivery_tables::DeliveryTable};

/// One stored row, cells in projection order
pub type RawRow = Vec<Option<CqlValue>>;

/// Read side of the delivery store
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Run the full projection query and return every row.
    async fn fetch_rows(&self) -> Result<Vec<RawRow>, StoreError>;
}

/// Delivery store backed by the shared Cassandra session
pub struct CassandraDeliveryStore {
    provider: Arc<SessionProvider>,
}

impl CassandraDeliveryStore {
    pub fn new(provider: Arc<SessionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl DeliveryStore for CassandraDeliveryStore {
    async fn fetch_rows(&self) -> Result<Vec<RawRow>, StoreError> {
        let session = self.provider.session().await?;

        let mut rows = session
            .query_iter(DeliveryTable::select_all(), ())
            .await?
            .rows_stream::<Row>()?;

        let mut raw_rows = Vec::new();
        while let Some(row) = rows.try_next().await? {
            raw_rows.push(row.columns);
        }

        tracing::debug!(
            "Fetched {} rows from {}",
            raw_rows.len(),
            DeliveryTable::TABLE_NAME
        );
        Ok(raw_rows)
    }
}
