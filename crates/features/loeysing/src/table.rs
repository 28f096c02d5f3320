//! Storage row of the `loeysing` table. A revision that clears `verksemd_id` lists it in
//! `nullstilt`.

use lreg_database::{DatabaseError, Nullstilt, VersionedTable, from_micros, to_micros};
use lreg_domain::constants::LOEYSING;
use lreg_domain::loeysing::{Loeysing, LoeysingDiff};
use lreg_domain::nettadresse::Nettadresse;
use lreg_domain::versioned::Revision;
use surrealdb::types::SurrealValue;

#[derive(Debug, SurrealValue)]
pub struct LoeysingRad {
    rad_id: i64,
    original: i64,
    tidspunkt: i64,
    aktiv: Option<bool>,
    namn: Option<String>,
    url: Option<String>,
    orgnummer: Option<String>,
    verksemd_id: Option<i64>,
    nullstilt: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct LoeysingTable;

impl VersionedTable for LoeysingTable {
    type Model = Loeysing;
    type Row = LoeysingRad;

    const NAME: &'static str = LOEYSING;
    const COLUMNS: &'static str = "namn, url, orgnummer, verksemd_id, nullstilt";

    fn to_row(revision: Revision<LoeysingDiff>) -> LoeysingRad {
        let felt = revision.felt;
        let mut nullstilt = Nullstilt::default();
        let verksemd_id = nullstilt.store("verksemd_id", felt.verksemd_id);
        LoeysingRad {
            rad_id: revision.id,
            original: revision.original,
            tidspunkt: to_micros(revision.tidspunkt),
            aktiv: revision.aktiv,
            namn: felt.namn,
            url: felt.url.map(|url| url.to_string()),
            orgnummer: felt.orgnummer,
            verksemd_id,
            nullstilt: nullstilt.into_column(),
        }
    }

    fn from_row(row: LoeysingRad) -> Result<Revision<LoeysingDiff>, DatabaseError> {
        let url = row
            .url
            .as_deref()
            .map(Nettadresse::parse)
            .transpose()
            .map_err(|e| DatabaseError::Internal {
                message: e.to_string().into(),
                context: Some(format!("url of row {}", row.rad_id).into()),
            })?;

        Ok(Revision {
            id: row.rad_id,
            original: row.original,
            tidspunkt: from_micros(row.tidspunkt)?,
            aktiv: row.aktiv,
            felt: LoeysingDiff {
                namn: row.namn,
                url,
                orgnummer: row.orgnummer,
                verksemd_id: Nullstilt::from_column(row.nullstilt)
                    .load("verksemd_id", row.verksemd_id),
            },
        })
    }
}
