//! Storage row of the `verksemd` table.
//!
//! Nested value objects are flattened into one column per field, except the optional
//! postal address which is stored as a nested object so that "no address" and "address
//! without values" stay distinct. Optional fields cleared by a revision are listed in
//! `nullstilt`.

use lreg_database::{DatabaseError, Nullstilt, VersionedTable, from_micros, to_micros};
use lreg_domain::constants::VERKSEMD;
use lreg_domain::verksemd::{
    Fylke, InstitusjonellSektorKode, Kommune, Naeringskode, Organisasjonsform, Postadresse,
    Verksemd, VerksemdDiff,
};
use lreg_domain::versioned::Revision;
use surrealdb::types::SurrealValue;

#[derive(Debug, SurrealValue)]
pub struct PostadresseRad {
    postnummer: Option<String>,
    poststad: Option<String>,
}

#[derive(Debug, SurrealValue)]
pub struct VerksemdRad {
    rad_id: i64,
    original: i64,
    tidspunkt: i64,
    aktiv: Option<bool>,
    namn: Option<String>,
    organisasjonsnummer: Option<String>,
    institusjonell_sektorkode: Option<String>,
    institusjonell_sektorkode_beskrivelse: Option<String>,
    naeringskode: Option<String>,
    naeringskode_beskrivelse: Option<String>,
    organisasjonsform_kode: Option<String>,
    organisasjonsform_omtale: Option<String>,
    fylkesnummer: Option<String>,
    fylke: Option<String>,
    kommunenummer: Option<String>,
    kommune: Option<String>,
    postadresse: Option<PostadresseRad>,
    tal_tilsette: Option<i64>,
    forvaltningsnivaa: Option<String>,
    tenesteromraade: Option<String>,
    under_avviking: Option<bool>,
    nullstilt: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct VerksemdTable;

impl VersionedTable for VerksemdTable {
    type Model = Verksemd;
    type Row = VerksemdRad;

    const NAME: &'static str = VERKSEMD;
    const COLUMNS: &'static str = "namn, organisasjonsnummer, \
        institusjonell_sektorkode, institusjonell_sektorkode_beskrivelse, \
        naeringskode, naeringskode_beskrivelse, organisasjonsform_kode, organisasjonsform_omtale, \
        fylkesnummer, fylke, kommunenummer, kommune, postadresse, tal_tilsette, \
        forvaltningsnivaa, tenesteromraade, under_avviking, nullstilt";

    fn to_row(revision: Revision<VerksemdDiff>) -> VerksemdRad {
        let felt = revision.felt;
        let (institusjonell_sektorkode, institusjonell_sektorkode_beskrivelse) =
            split(felt.institusjonell_sektor_kode.map(|k| (k.kode, k.beskrivelse)));
        let (naeringskode, naeringskode_beskrivelse) =
            split(felt.naeringskode.map(|k| (k.kode, k.beskrivelse)));
        let (organisasjonsform_kode, organisasjonsform_omtale) =
            split(felt.organisasjonsform.map(|f| (f.kode, f.omtale)));
        let (fylkesnummer, fylke) = split(felt.fylke.map(|f| (f.fylkesnummer, f.fylke)));
        let (kommunenummer, kommune) = split(felt.kommune.map(|k| (k.kommunenummer, k.kommune)));
        let mut nullstilt = Nullstilt::default();
        let postadresse = nullstilt.store("postadresse", felt.postadresse);
        let forvaltningsnivaa = nullstilt.store("forvaltningsnivaa", felt.forvaltningsnivaa);
        let tenesteromraade = nullstilt.store("tenesteromraade", felt.tenesteromraade);

        VerksemdRad {
            rad_id: revision.id,
            original: revision.original,
            tidspunkt: to_micros(revision.tidspunkt),
            aktiv: revision.aktiv,
            namn: felt.namn,
            organisasjonsnummer: felt.organisasjonsnummer,
            institusjonell_sektorkode,
            institusjonell_sektorkode_beskrivelse,
            naeringskode,
            naeringskode_beskrivelse,
            organisasjonsform_kode,
            organisasjonsform_omtale,
            fylkesnummer,
            fylke,
            kommunenummer,
            kommune,
            postadresse: postadresse
                .map(|p| PostadresseRad { postnummer: p.postnummer, poststad: p.poststad }),
            tal_tilsette: felt.tal_tilsette.map(i64::from),
            forvaltningsnivaa,
            tenesteromraade,
            under_avviking: felt.under_avviking,
            nullstilt: nullstilt.into_column(),
        }
    }

    fn from_row(row: VerksemdRad) -> Result<Revision<VerksemdDiff>, DatabaseError> {
        let tal_tilsette = row
            .tal_tilsette
            .map(i32::try_from)
            .transpose()
            .map_err(|e| DatabaseError::Internal {
                message: e.to_string().into(),
                context: Some(format!("tal_tilsette of row {}", row.rad_id).into()),
            })?;
        let nullstilt = Nullstilt::from_column(row.nullstilt);

        Ok(Revision {
            id: row.rad_id,
            original: row.original,
            tidspunkt: from_micros(row.tidspunkt)?,
            aktiv: row.aktiv,
            felt: VerksemdDiff {
                namn: row.namn,
                organisasjonsnummer: row.organisasjonsnummer,
                institusjonell_sektor_kode: row
                    .institusjonell_sektorkode
                    .zip(row.institusjonell_sektorkode_beskrivelse)
                    .map(|(kode, beskrivelse)| InstitusjonellSektorKode { kode, beskrivelse }),
                naeringskode: row
                    .naeringskode
                    .zip(row.naeringskode_beskrivelse)
                    .map(|(kode, beskrivelse)| Naeringskode { kode, beskrivelse }),
                organisasjonsform: row
                    .organisasjonsform_kode
                    .zip(row.organisasjonsform_omtale)
                    .map(|(kode, omtale)| Organisasjonsform { kode, omtale }),
                fylke: row
                    .fylkesnummer
                    .zip(row.fylke)
                    .map(|(fylkesnummer, fylke)| Fylke { fylkesnummer, fylke }),
                kommune: row
                    .kommunenummer
                    .zip(row.kommune)
                    .map(|(kommunenummer, kommune)| Kommune { kommunenummer, kommune }),
                postadresse: nullstilt.load(
                    "postadresse",
                    row.postadresse
                        .map(|p| Postadresse { postnummer: p.postnummer, poststad: p.poststad }),
                ),
                tal_tilsette,
                forvaltningsnivaa: nullstilt.load("forvaltningsnivaa", row.forvaltningsnivaa),
                tenesteromraade: nullstilt.load("tenesteromraade", row.tenesteromraade),
                under_avviking: row.under_avviking,
            },
        })
    }
}

fn split(pair: Option<(String, String)>) -> (Option<String>, Option<String>) {
    pair.map_or((None, None), |(a, b)| (Some(a), Some(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn full_diff() -> VerksemdDiff {
        VerksemdDiff {
            namn: Some("Digitaliseringsdirektoratet".into()),
            organisasjonsnummer: Some("991825827".into()),
            institusjonell_sektor_kode: Some(InstitusjonellSektorKode {
                kode: "6100".into(),
                beskrivelse: "Statsforvaltningen".into(),
            }),
            naeringskode: Some(Naeringskode { kode: "84.110".into(), beskrivelse: "Generell".into() }),
            organisasjonsform: Some(Organisasjonsform { kode: "ORGL".into(), omtale: "Organisasjonsledd".into() }),
            fylke: Some(Fylke::default()),
            kommune: Some(Kommune { kommunenummer: "4601".into(), kommune: "BERGEN".into() }),
            postadresse: Some(Some(Postadresse { postnummer: None, poststad: None })),
            tal_tilsette: Some(1000),
            forvaltningsnivaa: Some(None),
            tenesteromraade: Some(Some(String::new())),
            under_avviking: Some(false),
        }
    }

    #[test]
    fn row_mapping_keeps_every_field() {
        let revision = Revision {
            id: 3,
            original: 1,
            tidspunkt: Utc.timestamp_opt(1_700_000_000, 123_000).single().unwrap(),
            aktiv: Some(true),
            felt: full_diff(),
        };
        let back = VerksemdTable::from_row(VerksemdTable::to_row(revision.clone())).unwrap();
        assert_eq!(back, revision);
    }

    #[test]
    fn sparse_rows_stay_sparse() {
        let revision = Revision {
            id: 4,
            original: 1,
            tidspunkt: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
            aktiv: None,
            felt: VerksemdDiff { namn: Some("Nytt namn".into()), ..VerksemdDiff::default() },
        };
        let row = VerksemdTable::to_row(revision.clone());
        assert!(row.postadresse.is_none());
        assert!(row.kommunenummer.is_none());
        assert!(row.nullstilt.is_none());
        assert_eq!(VerksemdTable::from_row(row).unwrap(), revision);
    }

    #[test]
    fn cleared_fields_survive_the_row_mapping() {
        let revision = Revision {
            id: 5,
            original: 1,
            tidspunkt: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
            aktiv: None,
            felt: VerksemdDiff {
                postadresse: Some(None),
                forvaltningsnivaa: Some(None),
                ..VerksemdDiff::default()
            },
        };
        let row = VerksemdTable::to_row(revision.clone());
        assert!(row.postadresse.is_none() && row.forvaltningsnivaa.is_none());
        assert_eq!(
            row.nullstilt.as_deref(),
            Some(&["postadresse".to_owned(), "forvaltningsnivaa".to_owned()][..])
        );
        assert_eq!(VerksemdTable::from_row(row).unwrap(), revision);
    }
}
