use crate::config::{ConfigSource, DatabaseConfig, ProcessEnv};
use crate::error::{PortalError, Result};
use libsql::{Builder, Connection, Database};
use tokio::sync::OnceCell;
use tracing::info;

static DATABASE: OnceCell<DatabaseManager> = OnceCell::const_new();

pub struct DatabaseManager {
    db: Database,
}

impl DatabaseManager {
    /// Open a remote libSQL database, or a local file for non-URL paths
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db = if config.is_remote() {
            let auth_token = config.auth_token.clone().ok_or_else(|| {
                PortalError::Config("DATABASE_AUTH_TOKEN is required for remote databases".to_string())
            })?;
            info!("Connecting to libSQL database at {}", config.url);
            Builder::new_remote(config.url.clone(), auth_token).build().await
        } else {
            info!("Opening local database at {}", config.url);
            Builder::new_local(&config.url).build().await
        }
        .map_err(|e| PortalError::Database {
            message: format!("Failed to connect to database: {e}"),
        })?;

        Ok(Self { db })
    }

    /// Get a connection to the database
    pub fn get_connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| PortalError::Database {
            message: format!("Failed to get database connection: {e}"),
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        let mut rows = conn
            .query("SELECT 1", ())
            .await
            .map_err(|e| PortalError::Database {
                message: format!("Health check query failed: {e}"),
            })?;
        rows.next().await.map_err(|e| PortalError::Database {
            message: format!("Failed to read health check row: {e}"),
        })?;
        Ok(())
    }
}

/// The process-wide database handle, opened from the environment on first use.
pub async fn database() -> Result<&'static DatabaseManager> {
    database_from(&ProcessEnv).await
}

/// Like [`database`] but reading configuration from `source`.
///
/// Only the first successful call opens a database; concurrent first callers
/// wait on the same initialisation, and later calls return it regardless of
/// `source`. A failed attempt leaves the cell empty so the next call retries.
pub async fn database_from<S: ConfigSource + ?Sized>(source: &S) -> Result<&'static DatabaseManager> {
    DATABASE
        .get_or_try_init(|| async {
            let config = DatabaseConfig::from_source(source)?;
            DatabaseManager::connect(&config).await
        })
        .await
}
