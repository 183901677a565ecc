use std::{sync::Arc, time::Duration};

use scylla::client::{session::Session, session_builder::SessionBuilder};
use scylla::errors::{NewSessionError, NextRowError, PagerExecutionError, TypeCheckError};
use tokio::sync::RwLock;

pub mod delivery_store;
pub mod delivery_tables;

/// Cassandra node the dashboard reads from
pub const CONTACT_POINT: &str = "127.0.0.1:9042";

/// Keyspace holding the delivery table
pub const KEYSPACE: &str = "logistics";

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the process-wide store session.
///
/// The session is opened on the first call to [`SessionProvider::session`] and
/// shared by every later caller until [`SessionProvider::close`] drops it.
pub struct SessionProvider {
    session: RwLock<Option<Arc<Session>>>,
}

impl SessionProvider {
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    /// Get the shared session, connecting if none is open yet
    pub async fn session(&self) -> Result<Arc<Session>, StoreError> {
        if let Some(session) = self.session.read().await.clone() {
            return Ok(session);
        }

        let mut slot = self.session.write().await;
        if let Some(session) = slot.as_ref() {
            return Ok(session.clone());
        }

        tracing::info!("Connecting to {} (keyspace {})", CONTACT_POINT, KEYSPACE);
        let session = SessionBuilder::new()
            .known_node(CONTACT_POINT)
            .connection_timeout(CONNECTION_TIMEOUT)
            .use_keyspace(KEYSPACE, false)
            .build()
            .await
            .map_err(|source| StoreError::Connect {
                contact_point: CONTACT_POINT,
                source,
            })?;
        tracing::info!("Connected to {}", CONTACT_POINT);

        let session = Arc::new(session);
        *slot = Some(session.clone());
        Ok(session)
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Drop the shared session. Returns false if none was open.
    pub async fn close(&self) -> bool {
        let closed = self.session.write().await.take().is_some();
        if closed {
            tracing::info!("Closed session to {}", CONTACT_POINT);
        }
        closed
    }
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to connect to {contact_point}: {source}")]
    Connect {
        contact_point: &'static str,
        #[source]
        source: NewSessionError,
    },

    #[error("Query failed: {0}")]
    Query(#[from] PagerExecutionError),

    #[error("Unexpected result columns: {0}")]
    TypeCheck(#[from] TypeCheckError),

    #[error("Failed to read row: {0}")]
    Row(#[from] NextRowError),
}
