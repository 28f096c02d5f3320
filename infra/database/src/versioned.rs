//! Generic append-only storage for [`Versioned`] entities.
//!
//! Each table holds one row per revision with the header columns
//! `rad_id, original, tidspunkt, aktiv` followed by the entity columns. Row ids come from
//! a per-table counter in `sekvens`. Rows are only ever created, and every write goes
//! through a [`Batch`] committed as one transaction.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use lreg_domain::constants::SEKVENS;
use lreg_domain::versioned::{LineageId, Revision, RowId, Sparse, Versioned, fold_at};
use surrealdb::types::SurrealValue;
use tracing::{debug, instrument};

use crate::Database;
use crate::error::{DatabaseError, DatabaseErrorExt};

type DiffOf<T> = <<T as VersionedTable>::Model as Versioned>::Diff;

/// Mapping between a versioned entity and its storage row.
pub trait VersionedTable: Send + Sync + 'static {
    type Model: Versioned;
    type Row: SurrealValue + Debug + Send + Sync + 'static;

    /// Table name. Must be a plain identifier.
    const NAME: &'static str;

    /// Comma-separated entity columns, selected after the header columns and written by
    /// [`VersionedStore::commit`].
    const COLUMNS: &'static str;

    /// `rad_id` and `original` of the row are assigned by [`VersionedStore::commit`].
    fn to_row(revision: Revision<DiffOf<Self>>) -> Self::Row;

    /// # Errors
    ///
    /// [`DatabaseError::Internal`] for rows that cannot be decoded.
    fn from_row(row: Self::Row) -> Result<Revision<DiffOf<Self>>, DatabaseError>;
}

/// Microseconds since the Unix epoch, the stored form of `tidspunkt`.
pub fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// # Errors
///
/// [`DatabaseError::Internal`] when the value is outside the representable range.
pub fn from_micros(micros: i64) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| DatabaseError::Internal {
        message: format!("tidspunkt {micros} out of range").into(),
        context: None,
    })
}

/// Append-only store over one [`VersionedTable`].
#[derive(Debug)]
pub struct VersionedStore<T> {
    db: Database,
    table: PhantomData<fn() -> T>,
}

impl<T> Clone for VersionedStore<T> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), table: PhantomData }
    }
}

impl<T: VersionedTable> VersionedStore<T> {
    pub const fn new(db: Database) -> Self {
        Self { db, table: PhantomData }
    }

    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Raw revisions recorded at or before `at`, optionally limited to some lineages.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Surreal`] for query failures, [`DatabaseError::Internal`] for
    /// undecodable rows.
    #[instrument(skip(self, lineages), fields(table = T::NAME, lineages = lineages.map(<[LineageId]>::len)))]
    pub async fn revisions(
        &self,
        lineages: Option<&[LineageId]>,
        at: DateTime<Utc>,
    ) -> Result<Vec<Revision<DiffOf<T>>>, DatabaseError> {
        if lineages.is_some_and(<[LineageId]>::is_empty) {
            return Ok(Vec::new());
        }

        let filter = if lineages.is_some() { "AND original IN $lineages" } else { "" };
        let sql = format!(
            "SELECT rad_id, original, tidspunkt, aktiv, {columns} FROM {table} \
             WHERE tidspunkt <= $at {filter}",
            columns = T::COLUMNS,
            table = T::NAME,
        );

        let rows = self
            .db
            .query(&sql)
            .bind(("at", to_micros(at)))
            .bind(("lineages", lineages.map(<[LineageId]>::to_vec).unwrap_or_default()))
            .await
            .context(format!("Selecting {} revisions", T::NAME))?
            .take::<Vec<T::Row>>(0)
            .context(format!("Decoding {} revisions", T::NAME))?;

        rows.into_iter().map(T::from_row).collect()
    }

    /// One folded record per lineage, active or not.
    ///
    /// # Errors
    ///
    /// See [`Self::revisions`].
    pub async fn folded(
        &self,
        lineages: Option<&[LineageId]>,
        at: DateTime<Utc>,
    ) -> Result<Vec<Revision<DiffOf<T>>>, DatabaseError> {
        Ok(fold_at(self.revisions(lineages, at).await?, at))
    }

    /// Active entities as of `at`, ordered by lineage id.
    ///
    /// # Errors
    ///
    /// See [`Self::revisions`]; [`DatabaseError::Versioned`] when an active lineage is
    /// missing a required field.
    pub async fn get_by_lineage(
        &self,
        lineages: Option<&[LineageId]>,
        at: DateTime<Utc>,
    ) -> Result<Vec<T::Model>, DatabaseError> {
        let mut entities = Vec::new();
        for folded in self.folded(lineages, at).await? {
            if let Some(entity) = folded.materialize::<T::Model>()? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    /// # Errors
    ///
    /// See [`Self::get_by_lineage`].
    pub async fn get(
        &self,
        lineage: LineageId,
        at: DateTime<Utc>,
    ) -> Result<Option<T::Model>, DatabaseError> {
        Ok(self.get_by_lineage(Some(std::slice::from_ref(&lineage)), at).await?.into_iter().next())
    }

    /// Distinct lineages with at least one row matching `condition`, at any time.
    ///
    /// `condition` is a SurrealQL expression over the table's columns; values go through
    /// `bindings`, never into the condition text.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Surreal`] for query failures.
    #[instrument(skip(self, bindings), fields(table = T::NAME))]
    pub async fn lineages_where(
        &self,
        condition: &str,
        bindings: impl IntoIterator<Item = (&'static str, String)>,
    ) -> Result<Vec<LineageId>, DatabaseError> {
        let sql = format!("SELECT VALUE original FROM {} WHERE {condition}", T::NAME);
        let mut query = self.db.query(&sql);
        for binding in bindings {
            query = query.bind(binding);
        }

        let lineages = query
            .await
            .context(format!("Searching {}", T::NAME))?
            .take::<Vec<LineageId>>(0)
            .context(format!("Decoding {} lineages", T::NAME))?;

        Ok(lineages.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
    }

    /// Starts a new lineage with the full payload of `entity`. The entity's own id is ignored.
    ///
    /// # Errors
    ///
    /// See [`Self::commit`].
    #[instrument(skip(self, entity), fields(table = T::NAME))]
    pub async fn create_lineage(&self, entity: &T::Model) -> Result<LineageId, DatabaseError> {
        let mut batch = Batch::<T>::new();
        batch.create(entity);
        let id = self.commit_one(batch).await?;
        debug!(id, "Created lineage");
        Ok(id)
    }

    /// Appends the fields of `desired` that differ from the current state of its lineage.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::NotFound`] when the lineage has no active state.
    #[instrument(skip(self, desired), fields(table = T::NAME, id = desired.lineage()))]
    pub async fn append_update(&self, desired: &T::Model) -> Result<(), DatabaseError> {
        let lineage = desired.lineage();
        let current = self
            .get(lineage, Utc::now())
            .await?
            .ok_or(DatabaseError::NotFound { table: T::NAME, id: lineage })?;

        let mut batch = Batch::<T>::new();
        batch.update(&current, desired);
        self.commit(batch).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Self::commit`].
    pub async fn append_deactivate(&self, lineage: LineageId) -> Result<(), DatabaseError> {
        let mut batch = Batch::<T>::new();
        batch.deactivate(lineage);
        self.commit(batch).await?;
        Ok(())
    }

    /// Marks the lineage active again, optionally carrying changed fields.
    ///
    /// # Errors
    ///
    /// See [`Self::commit`].
    pub async fn append_reactivate(
        &self,
        lineage: LineageId,
        carried: DiffOf<T>,
    ) -> Result<(), DatabaseError> {
        let mut batch = Batch::<T>::new();
        batch.reactivate(lineage, carried);
        self.commit(batch).await?;
        Ok(())
    }

    /// Inserts one revision for an existing lineage.
    ///
    /// # Errors
    ///
    /// See [`Self::commit`].
    #[instrument(skip(self, felt), fields(table = T::NAME, changed = !felt.is_empty()))]
    pub async fn append(
        &self,
        lineage: LineageId,
        aktiv: Option<bool>,
        felt: DiffOf<T>,
    ) -> Result<RowId, DatabaseError> {
        let mut batch = Batch::<T>::new();
        batch.append(lineage, aktiv, felt);
        self.commit_one(batch).await
    }

    /// Inserts every queued revision in one transaction and returns their row ids in
    /// queue order.
    ///
    /// Row ids are taken from the table's counter inside the same transaction, so a failed
    /// batch leaves neither rows nor a gap behind.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Surreal`] when any statement fails; nothing is written then.
    #[instrument(skip(self, batch), fields(table = T::NAME, rows = batch.len()))]
    pub async fn commit(&self, batch: Batch<T>) -> Result<Vec<RowId>, DatabaseError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let count = batch.len();
        let tidspunkt = Utc::now();
        let (lineages, rows): (Vec<Option<LineageId>>, Vec<T::Row>) = batch
            .rows
            .into_iter()
            .map(|pending| {
                let row = T::to_row(Revision {
                    id: 0,
                    original: pending.lineage.unwrap_or_default(),
                    tidspunkt,
                    aktiv: pending.aktiv,
                    felt: pending.felt,
                });
                (pending.lineage, row)
            })
            .unzip();

        let last = self
            .db
            .query(batch_script::<T>(count))
            .bind(("rader", rows))
            .bind(("linjer", lineages))
            .await
            .context(format!("Inserting into {}", T::NAME))?
            .check()
            .map_err(surrealdb::Error::from)
            .context(format!("Inserting into {}", T::NAME))?
            .take::<Option<RowId>>(0)
            .context(format!("Allocating {} ids", T::NAME))?
            .ok_or_else(|| DatabaseError::Internal {
                message: "sequence returned no value".into(),
                context: Some(T::NAME.into()),
            })?;

        let first = last - RowId::try_from(count).unwrap_or(RowId::MAX) + 1;
        Ok((first..=last).collect())
    }

    async fn commit_one(&self, batch: Batch<T>) -> Result<RowId, DatabaseError> {
        self.commit(batch).await?.pop().ok_or_else(|| DatabaseError::Internal {
            message: "batch returned no row id".into(),
            context: Some(T::NAME.into()),
        })
    }
}

/// One revision waiting for [`VersionedStore::commit`]. `lineage` is `None` for the first
/// row of a new lineage.
#[derive(Debug)]
struct Pending<D> {
    lineage: Option<LineageId>,
    aktiv: Option<bool>,
    felt: D,
}

/// Revisions written together by [`VersionedStore::commit`].
#[derive(Debug)]
pub struct Batch<T: VersionedTable> {
    rows: Vec<Pending<DiffOf<T>>>,
}

impl<T: VersionedTable> Default for Batch<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: VersionedTable> Batch<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row of a new lineage carrying the full payload of `entity`.
    pub fn create(&mut self, entity: &T::Model) -> &mut Self {
        self.rows.push(Pending { lineage: None, aktiv: Some(true), felt: entity.snapshot() });
        self
    }

    pub fn append(&mut self, lineage: LineageId, aktiv: Option<bool>, felt: DiffOf<T>) -> &mut Self {
        self.rows.push(Pending { lineage: Some(lineage), aktiv, felt });
        self
    }

    /// Fields of `desired` that differ from `current`, appended to `current`'s lineage.
    pub fn update(&mut self, current: &T::Model, desired: &T::Model) -> &mut Self {
        self.append(current.lineage(), None, <T::Model as Versioned>::diff(current, desired))
    }

    pub fn deactivate(&mut self, lineage: LineageId) -> &mut Self {
        self.append(lineage, Some(false), <DiffOf<T> as Default>::default())
    }

    pub fn reactivate(&mut self, lineage: LineageId, carried: DiffOf<T>) -> &mut Self {
        self.append(lineage, Some(true), carried)
    }
}

/// Transaction inserting `count` rows bound as `$rader`, with their lineages in `$linjer`.
///
/// The first statement bumps the counter and returns the last id of the batch; row `i`
/// gets id `last - (count - 1 - i)`.
fn batch_script<T: VersionedTable>(count: usize) -> String {
    let table = T::NAME;
    let counter = format!("{SEKVENS}:{table}");
    let columns: Vec<&str> = ["tidspunkt", "aktiv"]
        .into_iter()
        .chain(T::COLUMNS.split(',').map(str::trim).filter(|c| !c.is_empty()))
        .collect();

    let mut script = format!(
        "BEGIN TRANSACTION;\n\
         UPSERT ONLY {counter} SET neste = (neste ?? 0) + {count} RETURN VALUE neste;\n"
    );
    for i in 0..count {
        let id = format!("((SELECT VALUE neste FROM ONLY {counter}) - {})", count - 1 - i);
        let values: Vec<String> =
            columns.iter().map(|c| format!("{c} = $rader[{i}].{c}")).collect();
        script.push_str(&format!(
            "CREATE {table} SET rad_id = {id}, original = $linjer[{i}] ?? {id}, {} RETURN NONE;\n",
            values.join(", "),
        ));
    }
    script.push_str("COMMIT TRANSACTION;");
    script
}

/// Columns explicitly cleared by a revision, stored as the `nullstilt` column.
///
/// Optional entity fields have a tri-state diff slot: `None` leaves the field unchanged,
/// `Some(None)` clears it and `Some(Some(v))` sets it. Only the value goes into the
/// field's own column, so clearing is recorded here.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Nullstilt(Vec<String>);

impl Nullstilt {
    pub fn from_column(column: Option<Vec<String>>) -> Self {
        Self(column.unwrap_or_default())
    }

    /// Stored value of `slot`; records `column` when the slot clears it.
    pub fn store<V>(&mut self, column: &str, slot: Option<Option<V>>) -> Option<V> {
        match slot {
            Some(None) => {
                self.0.push(column.to_owned());
                None
            }
            Some(value) => value,
            None => None,
        }
    }

    /// Tri-state slot for a stored `value` of `column`.
    pub fn load<V>(&self, column: &str, value: Option<V>) -> Option<Option<V>> {
        match value {
            Some(value) => Some(Some(value)),
            None if self.0.iter().any(|c| c == column) => Some(None),
            None => None,
        }
    }

    /// `None` when nothing was cleared, keeping sparse rows sparse.
    pub fn into_column(self) -> Option<Vec<String>> {
        (!self.0.is_empty()).then_some(self.0)
    }
}

/// Migration script defining a versioned table and its indexes.
#[macro_export]
macro_rules! versioned_table_script {
    ($table:literal) => {
        concat!(
            "DEFINE TABLE IF NOT EXISTS ", $table, " SCHEMALESS;\n",
            "DEFINE INDEX IF NOT EXISTS ", $table, "_rad_id ON ", $table, " FIELDS rad_id UNIQUE;\n",
            "DEFINE INDEX IF NOT EXISTS ", $table, "_original ON ", $table, " FIELDS original;\n",
            "DEFINE INDEX IF NOT EXISTS ", $table, "_tidspunkt ON ", $table, " FIELDS tidspunkt;\n",
        )
    };
}
