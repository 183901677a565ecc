use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{
    db::{
        StoreError,
        delivery_store::{DeliveryStore, RawRow},
        delivery_tables::DeliveryTable,
    },
    models::delivery::{DeliveryRecord, RowError, identifier},
    services::filter::FilterOptions,
};

/// Delivery records loaded for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct DeliveryDataset {
    records: Vec<DeliveryRecord>,
    options: FilterOptions,
    quarantined: usize,
}

impl DeliveryDataset {
    pub fn new(records: Vec<DeliveryRecord>, quarantined: usize) -> Self {
        let options = FilterOptions::from_records(&records);
        Self {
            records,
            options,
            quarantined,
        }
    }

    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    /// Filter choices observed in the loaded records
    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Number of stored rows skipped because they did not fit the schema
    pub fn quarantined(&self) -> usize {
        self.quarantined
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Loads the delivery table once and hands out the cached copy afterwards.
pub struct DeliveryLoader {
    store: Arc<dyn DeliveryStore>,
    cache: OnceCell<Arc<DeliveryDataset>>,
}

impl DeliveryLoader {
    pub fn new(store: Arc<dyn DeliveryStore>) -> Self {
        Self {
            store,
            cache: OnceCell::new(),
        }
    }

    /// Return the cached dataset, querying the store on first use.
    ///
    /// A failed load leaves the cache empty so nothing stale is ever served.
    pub async fn load(&self) -> Result<Arc<DeliveryDataset>, LoadError> {
        if let Some(dataset) = self.cache.get() {
            tracing::debug!("Serving {} cached deliveries", dataset.len());
            return Ok(dataset.clone());
        }

        let dataset = self
            .cache
            .get_or_try_init(|| async {
                tracing::info!("Loading deliveries from {}", DeliveryTable::TABLE_NAME);
                let rows = self.store.fetch_rows().await?;
                let dataset = build_dataset(rows)?;
                tracing::info!(
                    "Loaded {} deliveries ({} quarantined)",
                    dataset.len(),
                    dataset.quarantined()
                );
                Ok::<_, LoadError>(Arc::new(dataset))
            })
            .await?;

        Ok(dataset.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.initialized()
    }
}

/// Convert raw rows into records, quarantining rows that fail the schema.
pub fn build_dataset(rows: Vec<RawRow>) -> Result<DeliveryDataset, LoadError> {
    let mut records = Vec::with_capacity(rows.len());
    let mut quarantined = 0;

    for row in rows {
        match DeliveryRecord::from_row(&row) {
            Ok(record) => records.push(record),
            Err(RowError::InvalidDate { column, value }) => {
                return Err(LoadError::InvalidDate {
                    delivery_id: row_delivery_id(&row),
                    column,
                    value,
                });
            }
            Err(e) => {
                quarantined += 1;
                tracing::warn!(
                    "Skipping delivery {}: {}",
                    row_delivery_id(&row).unwrap_or_else(|| "<unknown>".to_string()),
                    e
                );
            }
        }
    }

    Ok(DeliveryDataset::new(records, quarantined))
}

fn row_delivery_id(row: &RawRow) -> Option<String> {
    let position = DeliveryTable::COLUMNS
        .iter()
        .position(|c| *c == DeliveryTable::COLUMN_DELIVERY_ID)?;
    row.get(position)
        .and_then(|cell| identifier(DeliveryTable::COLUMN_DELIVERY_ID, cell).ok())
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Delivery {} has an invalid {column}: {value}", .delivery_id.as_deref().unwrap_or("<unknown>"))]
    InvalidDate {
        delivery_id: Option<String>,
        column: &'static str,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scylla::errors::NewSessionError;
    use scylla::value::CqlValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn row(id: &str, arrival: &str, region: Option<&str>) -> RawRow {
        let text = |s: &str| Some(CqlValue::Text(s.to_string()));
        vec![
            text("Gulu"),
            text("R-1"),
            text(id),
            text(arrival),
            Some(CqlValue::Int(10)),
            Some(CqlValue::Double(80.0)),
            text("Maize"),
            text("Food"),
            text("2024-01-01"),
            text("Monday"),
            text("DC-1"),
            text("Driver"),
            region.map(|r| CqlValue::Text(r.to_string())),
            Some(CqlValue::Double(1.0)),
            Some(CqlValue::Double(1.0)),
            Some(CqlValue::Double(0.0)),
            text("Delivered"),
            text("High"),
            text("Truck"),
            Some(CqlValue::Double(4.0)),
            Some(CqlValue::Double(2.0)),
            text("W1"),
        ]
    }

    struct CountingStore {
        rows: Vec<RawRow>,
        calls: AtomicUsize,
        fail_first: bool,
    }

    impl CountingStore {
        fn new(rows: Vec<RawRow>) -> Self {
            Self {
                rows,
                calls: AtomicUsize::new(0),
                fail_first: false,
            }
        }
    }

    #[async_trait]
    impl DeliveryStore for CountingStore {
        async fn fetch_rows(&self) -> Result<Vec<RawRow>, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(StoreError::Connect {
                    contact_point: "test",
                    source: NewSessionError::EmptyKnownNodesList,
                });
            }
            Ok(self.rows.clone())
        }
    }

    #[test]
    fn test_invalid_date_names_numeric_delivery_id() {
        let mut bad = row("ignored", "31/12/2024", Some("North"));
        bad[2] = Some(CqlValue::BigInt(4711));

        match build_dataset(vec![bad]) {
            Err(LoadError::InvalidDate { delivery_id, .. }) => {
                assert_eq!(delivery_id.as_deref(), Some("4711"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_queries_store_once() {
        let store = Arc::new(CountingStore::new(vec![
            row("D-1", "2024-01-01", Some("North")),
            row("D-2", "2024-01-02", Some("South")),
        ]));
        let loader = DeliveryLoader::new(store.clone());

        let first = loader.load().await.unwrap();
        let second = loader.load().await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first.options().regions, vec!["North", "South"]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert!(loader.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let mut store = CountingStore::new(vec![row("D-1", "2024-01-01", Some("North"))]);
        store.fail_first = true;
        let store = Arc::new(store);
        let loader = DeliveryLoader::new(store.clone());

        assert!(matches!(loader.load().await, Err(LoadError::Store(_))));
        assert!(!loader.is_loaded());

        let dataset = loader.load().await.unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_build_dataset_quarantines_schema_failures() {
        let dataset = build_dataset(vec![
            row("D-1", "2024-01-01", Some("North")),
            row("D-2", "2024-01-01", None),
            vec![Some(CqlValue::Text("short".into()))],
        ])
        .unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.quarantined(), 2);
        assert_eq!(dataset.records()[0].delivery_id, "D-1");
    }

    #[test]
    fn test_build_dataset_fails_on_malformed_date() {
        let result = build_dataset(vec![
            row("D-1", "2024-01-01", Some("North")),
            row("D-2", "not a date", Some("North")),
        ]);

        match result {
            Err(LoadError::InvalidDate {
                delivery_id,
                column,
                value,
            }) => {
                assert_eq!(delivery_id.as_deref(), Some("D-2"));
                assert_eq!(column, "arrival_date");
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
