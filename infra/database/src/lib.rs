//! # Database Infrastructure
//!
//! Connection management for [SurrealDB](https://surrealdb.com) plus the generic
//! append-only store every versioned table is built on.
//!
//! ## Key Features
//! - **Engine Agnostic**: `mem://`, `rocksdb://`, `ws://` and `http://` via the `any` engine.
//! - **Resilient Connectivity**: health checks with exponential backoff during startup.
//! - **Checksummed Migrations**: per-module scripts applied once and tracked in `migrasjon`.
//! - **Versioned Store**: [`VersionedStore`] inserts sparse revisions and folds them back
//!   into entities as of any instant. The rows of one operation are committed together as
//!   a [`Batch`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use lreg_database::{Database, DatabaseError, Migration};
//!
//! const MIGRATIONS: &[Migration] =
//!     &[Migration::new("demo", "0001", "DEFINE TABLE IF NOT EXISTS demo SCHEMALESS;")];
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), DatabaseError> {
//!     let db = Database::builder()
//!         .url("mem://")
//!         .session("lreg", "register")
//!         .migrations(MIGRATIONS.iter().copied())
//!         .init()
//!         .await?;
//!
//!     let _version = db.version().await?;
//!     Ok(())
//! }
//! ```

mod error;
mod migrations;
mod versioned;

pub use error::{DatabaseError, DatabaseErrorExt};
pub use migrations::{Migration, MigrationReport};
pub use versioned::{Batch, Nullstilt, VersionedStore, VersionedTable, from_micros, to_micros};

use migrations::MigrationRunner;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use tracing::{info, instrument, warn};

const HEALTH_ATTEMPTS: u32 = 3;

/// Inner state of the [`Database`] wrapper.
#[derive(Debug)]
pub struct DatabaseInner {
    instance: Surreal<Any>,
    ns: String,
    db: String,
    report: MigrationReport,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        info!(ns = %self.ns, db = %self.db, "SurrealDB session handle dropped");
    }
}

/// Shared `SurrealDB` handle. Derefs to the client.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub fn namespace(&self) -> &str {
        &self.inner.ns
    }

    pub fn database(&self) -> &str {
        &self.inner.db
    }

    /// Migrations applied or skipped while connecting.
    pub fn migration_report(&self) -> &MigrationReport {
        &self.inner.report
    }

    /// Applies migrations that have not run yet on this database.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Migration`] when an applied script has changed,
    /// [`DatabaseError::Surreal`] when a script fails.
    #[instrument(skip_all, fields(count = migrations.len()))]
    pub async fn migrate(&self, migrations: &[Migration]) -> Result<MigrationReport, DatabaseError> {
        MigrationRunner::new(&self.inner.instance).run(migrations).await
    }
}

impl Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.inner.instance
    }
}

/// Fluent builder for a `SurrealDB` connection.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    url: Option<String>,
    ns: Option<String>,
    db: Option<String>,
    auth: Option<(String, String)>,
    migrations: Vec<Migration>,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn session(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.ns = Some(namespace.into());
        self.db = Some(database.into());
        self
    }

    /// Root credentials used right after connecting.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Appends migrations; they run in insertion order.
    pub fn migrations(mut self, migrations: impl IntoIterator<Item = Migration>) -> Self {
        self.migrations.extend(migrations);
        self
    }

    /// Connects, health-checks, signs in, selects the session and applies migrations.
    ///
    /// # Errors
    /// * [`DatabaseError::Validation`] if URL, namespace or database are missing.
    /// * [`DatabaseError::Connection`] if the engine fails to start or stays unhealthy.
    /// * [`DatabaseError::Auth`] if the credentials are rejected.
    /// * [`DatabaseError::Surreal`] if session activation fails.
    /// * [`DatabaseError::Migration`] if an applied script has changed.
    #[instrument(skip(self), fields(url = self.url, ns = self.ns, db = self.db))]
    pub async fn init(self) -> Result<Database, DatabaseError> {
        let url = required(self.url, "URL is required")?;
        let ns = required(self.ns, "Namespace is required")?;
        let db = required(self.db, "Database is required")?;

        let instance = connect(&url).await.map_err(|e| DatabaseError::Connection {
            message: e.to_string().into(),
            context: Some("Initializing engine".into()),
        })?;

        let mut delay = Duration::from_millis(500);
        for attempt in 1..=HEALTH_ATTEMPTS {
            if instance.health().await.is_ok() {
                break;
            }
            if attempt == HEALTH_ATTEMPTS {
                return Err(DatabaseError::Connection {
                    message: "Unhealthy after retries".into(),
                    context: Some(url.into()),
                });
            }
            warn!(attempt, ?delay, "Database not ready, retrying...");
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        if let Some((username, password)) = self.auth {
            instance.signin(Root { username, password }).await.map_err(|e| {
                DatabaseError::Auth { message: e.to_string().into(), context: Some(url.into()) }
            })?;
        }

        instance.use_ns(&ns).use_db(&db).await.context("Activating session")?;

        let version =
            instance.version().await.map_or_else(|_| "unknown".to_owned(), |v| v.to_string());
        info!(namespace = %ns, database = %db, %version, "SurrealDB connection established");

        let report = MigrationRunner::new(&instance).run(&self.migrations).await?;
        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "Database migrations up to date"
        );

        Ok(Database { inner: Arc::new(DatabaseInner { instance, ns, db, report }) })
    }
}

fn required(value: Option<String>, message: &'static str) -> Result<String, DatabaseError> {
    value.ok_or(DatabaseError::Validation { message: message.into(), context: None })
}
