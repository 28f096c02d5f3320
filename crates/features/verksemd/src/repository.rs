//! Versioned verksemder.
//!
//! At most one lineage per organisasjonsnummer is active at any instant. Creating a known
//! organisasjonsnummer returns or reactivates its lineage; updating one lineage deactivates
//! any other active lineage carrying the same number. The rows of each write commit in one
//! transaction, but the checks read before it without locking, so two concurrent writers
//! can still race.

use chrono::{DateTime, Utc};
use lreg_database::{Batch, Database, DatabaseError, VersionedStore};
use lreg_domain::verksemd::{NyVerksemd, Verksemd, VerksemdDiff};
use lreg_domain::versioned::{LineageId, Revision, Versioned};
use tracing::{debug, info, instrument, warn};

use crate::error::{VerksemdError, VerksemdErrorExt};
use crate::table::VerksemdTable;

const SEARCH: &str = "string::contains(string::lowercase(namn ?? ''), $term) \
    OR string::contains(organisasjonsnummer ?? '', $term)";
const BY_ORGNUMMER: &str = "organisasjonsnummer = $orgnummer";

#[derive(Debug, Clone)]
pub struct VerksemdRepository {
    store: VersionedStore<VerksemdTable>,
}

impl VerksemdRepository {
    pub const fn new(database: Database) -> Self {
        Self { store: VersionedStore::new(database) }
    }

    /// Registers a verksemd, deduplicating on organisasjonsnummer.
    ///
    /// An active lineage is returned as is. A deactivated one is reactivated, carrying the
    /// fields that differ from `ny`. Otherwise a new lineage starts.
    ///
    /// # Errors
    ///
    /// [`VerksemdError::Storage`] for database failures.
    #[instrument(skip(self, ny), fields(orgnummer = %ny.organisasjonsnummer))]
    pub async fn create(&self, ny: NyVerksemd) -> Result<LineageId, VerksemdError> {
        let mut known = self.folded_by_orgnummer(&ny.organisasjonsnummer, Utc::now()).await?;
        known.sort_by_key(|r| (r.tidspunkt, r.id));

        if let Some(active) = known.iter().rev().find(|r| r.is_aktiv()) {
            debug!(id = active.original, "Verksemd already registered");
            return Ok(active.original);
        }

        if let Some(inactive) = known.pop() {
            let id = inactive.original;
            let previous = inactive.restore::<Verksemd>().map_err(DatabaseError::from)?;
            let carried = Verksemd::diff(&previous, &ny.into_verksemd(id));
            self.store.append_reactivate(id, carried).await.context("Reactivating verksemd")?;
            info!(id, "Reactivated verksemd");
            return Ok(id);
        }

        let id =
            self.store.create_lineage(&ny.into_verksemd(0)).await.context("Creating verksemd")?;
        info!(id, "Created verksemd");
        Ok(id)
    }

    /// # Errors
    ///
    /// [`VerksemdError::Storage`] for database failures.
    pub async fn get(
        &self,
        id: LineageId,
        at: DateTime<Utc>,
    ) -> Result<Option<Verksemd>, VerksemdError> {
        self.store.get(id, at).await.context(format!("Reading verksemd {id}"))
    }

    /// Active verksemder as of `at`, all of them when `ids` is `None`.
    ///
    /// # Errors
    ///
    /// [`VerksemdError::Storage`] for database failures.
    pub async fn list(
        &self,
        ids: Option<&[LineageId]>,
        at: DateTime<Utc>,
    ) -> Result<Vec<Verksemd>, VerksemdError> {
        self.store.get_by_lineage(ids, at).await.context("Listing verksemder")
    }

    /// Case-insensitive substring search on namn and organisasjonsnummer over every stored
    /// revision; matches are returned as they look at `at`.
    ///
    /// # Errors
    ///
    /// [`VerksemdError::Storage`] for database failures.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        term: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<Verksemd>, VerksemdError> {
        let lineages = self
            .store
            .lineages_where(SEARCH, [("term", term.trim().to_lowercase())])
            .await
            .context("Searching verksemder")?;
        self.list(Some(lineages.as_slice()), at).await
    }

    /// The active verksemd registered under `orgnummer` at `at`.
    ///
    /// # Errors
    ///
    /// [`VerksemdError::Storage`] for database failures.
    pub async fn get_by_orgnummer(
        &self,
        orgnummer: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Verksemd>, VerksemdError> {
        let latest = self
            .folded_by_orgnummer(orgnummer, at)
            .await?
            .into_iter()
            .filter(Revision::is_aktiv)
            .max_by_key(|r| (r.tidspunkt, r.id));

        match latest {
            Some(revision) => Ok(revision.materialize().map_err(DatabaseError::from)?),
            None => Ok(None),
        }
    }

    /// Appends the changed fields of `verksemd` and returns the folded result.
    ///
    /// Other active lineages with the same organisasjonsnummer are deactivated in the same
    /// transaction as the update row.
    ///
    /// # Errors
    ///
    /// [`VerksemdError::NotFound`] when the lineage is not active,
    /// [`VerksemdError::Storage`] for database failures; nothing is written then.
    #[instrument(skip(self, verksemd), fields(id = verksemd.id))]
    pub async fn update(&self, verksemd: &Verksemd) -> Result<Verksemd, VerksemdError> {
        let id = verksemd.id;
        let now = Utc::now();
        let current = self.get(id, now).await?.ok_or(VerksemdError::NotFound { id })?;

        let duplicates: Vec<LineageId> = self
            .folded_by_orgnummer(&verksemd.organisasjonsnummer, now)
            .await?
            .into_iter()
            .filter(|r| r.is_aktiv() && r.original != id)
            .map(|r| r.original)
            .collect();

        let mut batch = Batch::<VerksemdTable>::new();
        for &duplicate in &duplicates {
            batch.deactivate(duplicate);
        }
        batch.update(&current, verksemd);
        self.store.commit(batch).await.context("Updating verksemd")?;

        for duplicate in duplicates {
            warn!(
                duplicate,
                orgnummer = %verksemd.organisasjonsnummer,
                "Deactivated other active lineage with the same organisasjonsnummer"
            );
        }
        self.get(id, Utc::now()).await?.ok_or(VerksemdError::NotFound { id })
    }

    /// Re-appends the current payload with `aktiv = false`.
    ///
    /// # Errors
    ///
    /// [`VerksemdError::NotFound`] when the lineage is not active,
    /// [`VerksemdError::Storage`] for database failures.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: LineageId) -> Result<(), VerksemdError> {
        let current = self.get(id, Utc::now()).await?.ok_or(VerksemdError::NotFound { id })?;
        self.store.append(id, Some(false), current.snapshot()).await.context("Deleting verksemd")?;
        info!(id, "Deactivated verksemd");
        Ok(())
    }

    /// Folded lineages, active or not, whose state at `at` carries `orgnummer`.
    async fn folded_by_orgnummer(
        &self,
        orgnummer: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<Revision<VerksemdDiff>>, VerksemdError> {
        let lineages = self
            .store
            .lineages_where(BY_ORGNUMMER, [("orgnummer", orgnummer.to_owned())])
            .await
            .context("Looking up organisasjonsnummer")?;

        let folded = self
            .store
            .folded(Some(lineages.as_slice()), at)
            .await
            .context("Folding verksemder")?;
        Ok(folded
            .into_iter()
            .filter(|r| r.felt.organisasjonsnummer.as_deref() == Some(orgnummer))
            .collect())
    }
}
