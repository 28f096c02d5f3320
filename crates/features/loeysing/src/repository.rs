//! Versioned løysingar.
//!
//! A løysing is identified by its url and the organisasjonsnummer of its owner. Creating a
//! known pair returns the existing lineage, reactivating it when it has been deleted.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use lreg_database::{Database, DatabaseError, VersionedStore};
use lreg_domain::constants::VERKSEMD;
use lreg_domain::loeysing::{Loeysing, LoeysingDiff, LoeysingExpanded};
use lreg_domain::nettadresse::Nettadresse;
use lreg_domain::verksemd::Verksemd;
use lreg_domain::versioned::{LineageId, Revision};
use lreg_verksemd::VerksemdRepository;
use tracing::{debug, info, instrument};

use crate::error::{LoeysingError, LoeysingErrorExt};
use crate::table::LoeysingTable;

const SEARCH: &str = "string::contains(string::lowercase(namn ?? ''), $term) \
    OR string::contains(string::lowercase(url ?? ''), $term) \
    OR string::contains(orgnummer ?? '', $term)";
const BY_ORGNUMMER: &str = "orgnummer = $orgnummer";

fn by_owner() -> String {
    format!(
        "verksemd_id IN (SELECT VALUE original FROM {VERKSEMD} \
         WHERE string::contains(string::lowercase(namn ?? ''), $term) \
         OR string::contains(organisasjonsnummer ?? '', $term))"
    )
}

#[derive(Debug, Clone)]
pub struct LoeysingRepository {
    store: VersionedStore<LoeysingTable>,
}

impl LoeysingRepository {
    pub const fn new(database: Database) -> Self {
        Self { store: VersionedStore::new(database) }
    }

    /// Registers a løysing, deduplicating on url and orgnummer.
    ///
    /// An active match is returned untouched and an inactive one is reactivated without
    /// changing its fields.
    ///
    /// # Errors
    ///
    /// [`LoeysingError::Storage`] for database failures.
    #[instrument(skip(self, namn, url), fields(url = %url))]
    pub async fn create(
        &self,
        namn: &str,
        url: &Nettadresse,
        orgnummer: &str,
        verksemd_id: Option<LineageId>,
    ) -> Result<LineageId, LoeysingError> {
        match self.find_by_url_and_orgnummer(url, orgnummer).await? {
            Some(existing) if existing.is_aktiv() => {
                debug!(id = existing.original, "Løysing already registered");
                Ok(existing.original)
            }
            Some(inactive) => {
                let id = inactive.original;
                self.store
                    .append_reactivate(id, LoeysingDiff::default())
                    .await
                    .context("Reactivating løysing")?;
                info!(id, "Reactivated løysing");
                Ok(id)
            }
            None => {
                let loeysing = Loeysing {
                    id: 0,
                    namn: namn.to_owned(),
                    url: url.clone(),
                    orgnummer: orgnummer.to_owned(),
                    verksemd_id,
                };
                let id = self.store.create_lineage(&loeysing).await.context("Creating løysing")?;
                info!(id, "Created løysing");
                Ok(id)
            }
        }
    }

    /// The latest folded lineage, active or not, that has carried `orgnummer` and whose
    /// url is the same as `url`.
    ///
    /// # Errors
    ///
    /// [`LoeysingError::Storage`] for database failures.
    pub async fn find_by_url_and_orgnummer(
        &self,
        url: &Nettadresse,
        orgnummer: &str,
    ) -> Result<Option<Revision<LoeysingDiff>>, LoeysingError> {
        let lineages = self
            .store
            .lineages_where(BY_ORGNUMMER, [("orgnummer", orgnummer.to_owned())])
            .await
            .context("Looking up orgnummer")?;

        let folded = self
            .store
            .folded(Some(lineages.as_slice()), Utc::now())
            .await
            .context("Folding løysingar")?;

        Ok(folded
            .into_iter()
            .filter(|r| r.felt.url.as_ref().is_some_and(|known| known.same_url(url)))
            .max_by_key(|r| (r.is_aktiv(), r.tidspunkt, r.id)))
    }

    /// # Errors
    ///
    /// [`LoeysingError::Storage`] for database failures.
    pub async fn get(
        &self,
        id: LineageId,
        at: DateTime<Utc>,
    ) -> Result<Option<Loeysing>, LoeysingError> {
        self.store.get(id, at).await.context(format!("Reading løysing {id}"))
    }

    /// Active løysingar as of `at`, all of them when `ids` is `None`.
    ///
    /// # Errors
    ///
    /// [`LoeysingError::Storage`] for database failures.
    pub async fn list(
        &self,
        ids: Option<&[LineageId]>,
        at: DateTime<Utc>,
    ) -> Result<Vec<Loeysing>, LoeysingError> {
        self.store.get_by_lineage(ids, at).await.context("Listing løysingar")
    }

    /// Case-insensitive substring search on namn, url and orgnummer over every stored
    /// revision; matches are returned as they look at `at`.
    ///
    /// # Errors
    ///
    /// [`LoeysingError::Storage`] for database failures.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        term: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<Loeysing>, LoeysingError> {
        let lineages = self
            .store
            .lineages_where(SEARCH, [("term", term.trim().to_lowercase())])
            .await
            .context("Searching løysingar")?;
        self.list(Some(lineages.as_slice()), at).await
    }

    /// Løysingar owned by a verksemd whose namn or organisasjonsnummer contains `term`.
    ///
    /// # Errors
    ///
    /// [`LoeysingError::Storage`] for database failures.
    #[instrument(skip(self))]
    pub async fn search_by_owning_org(
        &self,
        term: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<Loeysing>, LoeysingError> {
        let lineages = self
            .store
            .lineages_where(&by_owner(), [("term", term.trim().to_lowercase())])
            .await
            .context("Searching løysingar by owner")?;
        self.list(Some(lineages.as_slice()), at).await
    }

    /// Appends the fields of `loeysing` that changed.
    ///
    /// # Errors
    ///
    /// [`LoeysingError::NotFound`] when the lineage is not active,
    /// [`LoeysingError::Storage`] for database failures.
    #[instrument(skip(self, loeysing), fields(id = loeysing.id))]
    pub async fn update(&self, loeysing: &Loeysing) -> Result<(), LoeysingError> {
        let id = loeysing.id;
        self.store.append_update(loeysing).await.map_err(|e| match e {
            DatabaseError::NotFound { .. } => LoeysingError::NotFound { id },
            source => LoeysingError::Storage { source, context: Some("Updating løysing".into()) },
        })?;
        info!(id, "Updated løysing");
        Ok(())
    }

    /// Appends a deactivation row.
    ///
    /// # Errors
    ///
    /// [`LoeysingError::NotFound`] when the lineage is not active,
    /// [`LoeysingError::Storage`] for database failures.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: LineageId) -> Result<(), LoeysingError> {
        if self.get(id, Utc::now()).await?.is_none() {
            return Err(LoeysingError::NotFound { id });
        }
        self.store.append_deactivate(id).await.context("Deleting løysing")?;
        info!(id, "Deactivated løysing");
        Ok(())
    }
}

/// Pairs each løysing with its owner as of `at`. Owners are fetched in one batch.
///
/// # Errors
///
/// [`LoeysingError::Verksemd`] when the owners cannot be read.
pub async fn expand(
    verksemder: &VerksemdRepository,
    loeysingar: Vec<Loeysing>,
    at: DateTime<Utc>,
) -> Result<Vec<LoeysingExpanded>, LoeysingError> {
    let owner_ids: Vec<LineageId> = loeysingar
        .iter()
        .filter_map(|l| l.verksemd_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let owners: BTreeMap<LineageId, Verksemd> = verksemder
        .list(Some(owner_ids.as_slice()), at)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    Ok(loeysingar
        .into_iter()
        .map(|loeysing| {
            let owner = loeysing.verksemd_id.and_then(|id| owners.get(&id).cloned());
            LoeysingExpanded::new(loeysing, owner)
        })
        .collect())
}
