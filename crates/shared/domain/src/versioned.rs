//! # Append-only versioning
//!
//! Every change to a versioned entity is stored as a new [`Revision`]. A revision carries
//! the lineage it belongs to (`original`), when it was recorded (`tidspunkt`), an optional
//! active flag and a sparse record of changed fields. The current state of an entity, or
//! its state at any past instant, is rebuilt by [`fold`]ing its revisions in order.
//!
//! The sparse record and the [`Versioned`] glue are generated per entity by
//! `#[lreg_derive::versioned_model]`.

use std::collections::BTreeMap;
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use lreg_derive::lreg_error;

/// Identifier of a lineage: the row id of its first revision.
pub type LineageId = i64;

/// Identifier of a single stored revision.
pub type RowId = i64;

#[lreg_error]
pub enum VersionedError {
    #[error("Lineage {lineage} folds without a value for `{field}`")]
    Incomplete { lineage: LineageId, field: &'static str },
}

/// A record of optional fields where `None` means "unchanged".
pub trait Sparse: Clone + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Overlays `later` on top of `self`: later non-null values win.
    #[must_use]
    fn merge(self, later: Self) -> Self;

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An entity stored as an append-only sequence of sparse revisions.
pub trait Versioned: Clone + Debug + Send + Sync + 'static {
    type Diff: Sparse;

    fn lineage(&self) -> LineageId;

    fn is_aktiv(&self) -> bool;

    /// Every payload field set. Used for the first row of a lineage.
    fn snapshot(&self) -> Self::Diff;

    /// Fields of `next` that differ from `previous`.
    fn diff(previous: &Self, next: &Self) -> Self::Diff;

    /// Rebuilds the entity from a folded record.
    ///
    /// # Errors
    ///
    /// [`VersionedError::Incomplete`] when a required field was never set.
    fn restore(lineage: LineageId, aktiv: bool, diff: Self::Diff) -> Result<Self, VersionedError>;
}

/// One stored row of a versioned table.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision<D> {
    pub id: RowId,
    pub original: LineageId,
    pub tidspunkt: DateTime<Utc>,
    pub aktiv: Option<bool>,
    pub felt: D,
}

impl<D: Sparse> Revision<D> {
    /// Combines an earlier revision with a later one of the same lineage.
    ///
    /// Header fields come from `later`; `aktiv` and payload fields take the later value
    /// when it is set.
    #[must_use]
    pub fn combine(self, later: Self) -> Self {
        Self {
            id: later.id,
            original: later.original,
            tidspunkt: later.tidspunkt,
            aktiv: later.aktiv.or(self.aktiv),
            felt: self.felt.merge(later.felt),
        }
    }

    pub fn is_aktiv(&self) -> bool {
        self.aktiv == Some(true)
    }

    /// Restores the entity regardless of the active flag.
    ///
    /// # Errors
    ///
    /// Propagates [`Versioned::restore`] failures.
    pub fn restore<V: Versioned<Diff = D>>(self) -> Result<V, VersionedError> {
        let aktiv = self.is_aktiv();
        V::restore(self.original, aktiv, self.felt)
    }

    /// Restores the entity when the folded record is active.
    ///
    /// # Errors
    ///
    /// Propagates [`Versioned::restore`] failures.
    pub fn materialize<V: Versioned<Diff = D>>(self) -> Result<Option<V>, VersionedError> {
        if self.is_aktiv() { self.restore().map(Some) } else { Ok(None) }
    }

    fn order_key(&self) -> (DateTime<Utc>, RowId) {
        (self.tidspunkt, self.id)
    }
}

/// Folds revisions into one record per lineage, ordered by lineage id.
///
/// Within a lineage revisions are applied by `(tidspunkt, id)` ascending, so equal
/// timestamps are broken by row id.
pub fn fold<D: Sparse>(rows: impl IntoIterator<Item = Revision<D>>) -> Vec<Revision<D>> {
    let mut lineages: BTreeMap<LineageId, Vec<Revision<D>>> = BTreeMap::new();
    for row in rows {
        lineages.entry(row.original).or_default().push(row);
    }

    lineages
        .into_values()
        .filter_map(|mut revisions| {
            revisions.sort_by_key(Revision::order_key);
            revisions.into_iter().reduce(Revision::combine)
        })
        .collect()
}

/// Like [`fold`], ignoring revisions recorded after `at`.
pub fn fold_at<D: Sparse>(
    rows: impl IntoIterator<Item = Revision<D>>,
    at: DateTime<Utc>,
) -> Vec<Revision<D>> {
    fold(rows.into_iter().filter(|row| row.tidspunkt <= at))
}

/// Folds and materializes the active entities.
///
/// # Errors
///
/// [`VersionedError::Incomplete`] when an active lineage lacks a required field.
pub fn materialize_all<V: Versioned>(
    rows: impl IntoIterator<Item = Revision<V::Diff>>,
    at: DateTime<Utc>,
) -> Result<Vec<V>, VersionedError> {
    let mut entities = Vec::new();
    for folded in fold_at(rows, at) {
        if let Some(entity) = folded.materialize::<V>()? {
            entities.push(entity);
        }
    }
    Ok(entities)
}
