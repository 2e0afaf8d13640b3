//! Connection pool for the PostgreSQL repository.
//!
//! ## Key Components
//! - [`SmartPool`] - bb8 pool of diesel-async connections, health-checked on creation

use std::sync::Arc;
use std::time::Duration;

use diesel_async::{
    pooled_connection::{bb8::Pool, AsyncDieselConnectionManager},
    AsyncPgConnection, RunQueryDsl,
};
use tracing::debug;

use crate::data::error::RepositoryError;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection<'a> =
    diesel_async::pooled_connection::bb8::PooledConnection<'a, AsyncPgConnection>;

/// Pool sizing and timeouts
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub connection_timeout: Duration,
}

/// Connection pool shared by every repository call.
pub struct SmartPool {
    inner: Arc<DbPool>,
}

impl SmartPool {
    /// Create a new SmartPool with the given database URL.
    ///
    /// Performs a `SELECT 1` right away so that connection problems surface at
    /// startup rather than on the first request.
    pub async fn new(database_url: &str, settings: PoolSettings) -> Result<Self, RepositoryError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

        let pool = Pool::builder()
            .max_size(settings.max_connections)
            .connection_timeout(settings.connection_timeout)
            .idle_timeout(Some(Duration::from_secs(300)))
            .max_lifetime(Some(Duration::from_secs(3600)))
            .build(manager)
            .await
            .map_err(|e| RepositoryError::Pool(format!("Failed to create pool: {}", e)))?;

        {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| RepositoryError::Pool(format!("Failed to get connection: {}", e)))?;
            diesel::sql_query("SELECT 1").execute(&mut conn).await?;
        }

        debug!(
            max_connections = settings.max_connections,
            "PostgreSQL pool ready"
        );

        Ok(Self {
            inner: Arc::new(pool),
        })
    }

    /// Get a connection from the pool.
    pub async fn get(&self) -> Result<DbConnection<'_>, RepositoryError> {
        self.inner
            .get()
            .await
            .map_err(|e| RepositoryError::Pool(format!("Failed to get connection: {}", e)))
    }
}
