//! Verksemder: organizations owning løysingar, keyed by organisasjonsnummer.

use lreg_derive::versioned_model;
use serde::{Deserialize, Serialize};

use crate::versioned::LineageId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct InstitusjonellSektorKode {
    pub kode: String,
    pub beskrivelse: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Naeringskode {
    pub kode: String,
    pub beskrivelse: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Organisasjonsform {
    pub kode: String,
    pub omtale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Fylke {
    pub fylkesnummer: String,
    pub fylke: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Kommune {
    pub kommunenummer: String,
    pub kommune: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Postadresse {
    pub postnummer: Option<String>,
    pub poststad: Option<String>,
}

/// A verksemd as seen at some instant. `id` is the lineage id.
#[versioned_model]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Verksemd {
    #[versioned(lineage)]
    #[cfg_attr(feature = "server", schema(value_type = i64))]
    pub id: LineageId,
    pub namn: String,
    pub organisasjonsnummer: String,
    pub institusjonell_sektor_kode: InstitusjonellSektorKode,
    pub naeringskode: Naeringskode,
    pub organisasjonsform: Organisasjonsform,
    pub fylke: Fylke,
    pub kommune: Kommune,
    pub postadresse: Option<Postadresse>,
    pub tal_tilsette: i32,
    pub forvaltningsnivaa: Option<String>,
    pub tenesteromraade: Option<String>,
    #[versioned(aktiv)]
    #[serde(default = "aktiv_default")]
    pub aktiv: bool,
    #[serde(default)]
    pub under_avviking: bool,
}

const fn aktiv_default() -> bool {
    true
}

/// Payload for registering a verksemd, usually mapped from Enhetsregisteret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NyVerksemd {
    pub namn: String,
    pub organisasjonsnummer: String,
    pub institusjonell_sektor_kode: InstitusjonellSektorKode,
    pub naeringskode: Naeringskode,
    pub organisasjonsform: Organisasjonsform,
    pub fylke: Fylke,
    pub kommune: Kommune,
    pub postadresse: Option<Postadresse>,
    pub tal_tilsette: i32,
    pub forvaltningsnivaa: Option<String>,
    pub tenesteromraade: Option<String>,
    #[serde(default)]
    pub under_avviking: bool,
}

impl NyVerksemd {
    /// Active entity for the given lineage.
    #[must_use]
    pub fn into_verksemd(self, id: LineageId) -> Verksemd {
        Verksemd {
            id,
            namn: self.namn,
            organisasjonsnummer: self.organisasjonsnummer,
            institusjonell_sektor_kode: self.institusjonell_sektor_kode,
            naeringskode: self.naeringskode,
            organisasjonsform: self.organisasjonsform,
            fylke: self.fylke,
            kommune: self.kommune,
            postadresse: self.postadresse,
            tal_tilsette: self.tal_tilsette,
            forvaltningsnivaa: self.forvaltningsnivaa,
            tenesteromraade: self.tenesteromraade,
            aktiv: true,
            under_avviking: self.under_avviking,
        }
    }
}

impl From<Verksemd> for NyVerksemd {
    fn from(verksemd: Verksemd) -> Self {
        Self {
            namn: verksemd.namn,
            organisasjonsnummer: verksemd.organisasjonsnummer,
            institusjonell_sektor_kode: verksemd.institusjonell_sektor_kode,
            naeringskode: verksemd.naeringskode,
            organisasjonsform: verksemd.organisasjonsform,
            fylke: verksemd.fylke,
            kommune: verksemd.kommune,
            postadresse: verksemd.postadresse,
            tal_tilsette: verksemd.tal_tilsette,
            forvaltningsnivaa: verksemd.forvaltningsnivaa,
            tenesteromraade: verksemd.tenesteromraade,
            under_avviking: verksemd.under_avviking,
        }
    }
}
