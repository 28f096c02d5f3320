use fxhash::FxHashMap;
use sha2::{Digest, Sha256};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;
use tracing::{debug, info};

use crate::error::{DatabaseError, DatabaseErrorExt};

const BOOTSTRAP: &str = "
    DEFINE TABLE IF NOT EXISTS migrasjon SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS migrasjon_nokkel ON migrasjon FIELDS modul, versjon UNIQUE;
";

/// A versioned SurrealQL script owned by one module.
///
/// Scripts are applied once, in the order given, and tracked by checksum: editing a script
/// after it has been applied is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub module: &'static str,
    pub version: &'static str,
    pub script: &'static str,
}

impl Migration {
    #[must_use]
    pub const fn new(module: &'static str, version: &'static str, script: &'static str) -> Self {
        Self { module, version, script }
    }

    /// Hex-encoded SHA-256 of the script.
    #[must_use]
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.script.as_bytes()))
    }

    fn key(&self) -> String {
        format!("{}:{}", self.module, self.version)
    }
}

/// Outcome of a migration run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, SurrealValue)]
struct AppliedMigration {
    modul: String,
    versjon: String,
    sjekksum: String,
}

#[derive(Debug)]
pub(crate) struct MigrationRunner<'a> {
    db: &'a Surreal<Any>,
}

impl<'a> MigrationRunner<'a> {
    pub(crate) const fn new(db: &'a Surreal<Any>) -> Self {
        Self { db }
    }

    pub(crate) async fn run(&self, migrations: &[Migration]) -> Result<MigrationReport, DatabaseError> {
        self.db
            .query(BOOTSTRAP)
            .await
            .context("Bootstrapping migration table")?
            .check()
            .map_err(surrealdb::Error::from)?;

        let applied = self.applied().await?;
        let mut report = MigrationReport::default();

        for migration in migrations {
            let key = migration.key();
            let checksum = migration.checksum();
            if let Some(existing) = applied.get(&key) {
                ensure_checksum_match(migration, &existing.sjekksum, &checksum)?;
                debug!(migration = %key, "Already applied");
                report.skipped.push(key);
                continue;
            }

            self.apply(migration, checksum).await?;
            info!(migration = %key, "Applied migration");
            report.applied.push(key);
        }

        Ok(report)
    }

    async fn applied(&self) -> Result<FxHashMap<String, AppliedMigration>, DatabaseError> {
        let entries = self
            .db
            .query("SELECT modul, versjon, sjekksum FROM migrasjon")
            .await
            .context("Loading applied migrations")?
            .take::<Vec<AppliedMigration>>(0)
            .context("Parsing applied migrations")?;

        Ok(entries.into_iter().map(|entry| (format!("{}:{}", entry.modul, entry.versjon), entry)).collect())
    }

    async fn apply(&self, migration: &Migration, checksum: String) -> Result<(), DatabaseError> {
        let query = format!(
            "BEGIN TRANSACTION;
            {}
            CREATE migrasjon CONTENT {{ modul: $modul, versjon: $versjon, sjekksum: $sjekksum, tidspunkt: time::now() }} RETURN NONE;
            COMMIT TRANSACTION;",
            migration.script,
        );

        self.db
            .query(&query)
            .bind(("modul", migration.module))
            .bind(("versjon", migration.version))
            .bind(("sjekksum", checksum))
            .await
            .context(format!("Running migration {}", migration.key()))?
            .check()
            .map_err(surrealdb::Error::from)
            .context(format!("Migration {} failed", migration.key()))?;

        Ok(())
    }
}

fn ensure_checksum_match(
    migration: &Migration,
    stored: &str,
    current: &str,
) -> Result<(), DatabaseError> {
    if stored != current {
        return Err(DatabaseError::Migration {
            message: format!(
                "Checksum mismatch for {} (stored {stored}, script {current})",
                migration.key()
            )
            .into(),
            context: Some("Migration already applied with a different script".into()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_stable_sha256_hex() {
        let migration = Migration::new("demo", "0001", "DEFINE TABLE demo;");
        let checksum = migration.checksum();
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, Migration::new("other", "0002", "DEFINE TABLE demo;").checksum());
        assert_ne!(checksum, Migration::new("demo", "0001", "DEFINE TABLE demo2;").checksum());
    }

    #[test]
    fn mismatch_is_refused() {
        let migration = Migration::new("demo", "0001", "DEFINE TABLE demo;");
        assert!(ensure_checksum_match(&migration, "a", "a").is_ok());
        let err = ensure_checksum_match(&migration, "a", "b").unwrap_err();
        assert!(matches!(err, DatabaseError::Migration { .. }));
    }
}
