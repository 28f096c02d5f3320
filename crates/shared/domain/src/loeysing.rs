//! Løysingar: websites and other digital solutions under supervision.

use lreg_derive::versioned_model;
use serde::{Deserialize, Serialize};

use crate::nettadresse::Nettadresse;
use crate::verksemd::Verksemd;
use crate::versioned::LineageId;

/// A løysing as seen at some instant. `id` is the lineage id.
#[versioned_model]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Loeysing {
    #[versioned(lineage)]
    #[cfg_attr(feature = "server", schema(value_type = i64))]
    pub id: LineageId,
    pub namn: String,
    #[cfg_attr(feature = "server", schema(value_type = String, example = "https://www.uutilsynet.no"))]
    pub url: Nettadresse,
    pub orgnummer: String,
    #[serde(default)]
    #[cfg_attr(feature = "server", schema(value_type = Option<i64>))]
    pub verksemd_id: Option<LineageId>,
}

/// A løysing with its owning verksemd resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LoeysingExpanded {
    #[cfg_attr(feature = "server", schema(value_type = i64))]
    pub id: LineageId,
    pub namn: String,
    #[cfg_attr(feature = "server", schema(value_type = String))]
    pub url: Nettadresse,
    pub verksemd: Option<Verksemd>,
}

impl LoeysingExpanded {
    #[must_use]
    pub fn new(loeysing: Loeysing, verksemd: Option<Verksemd>) -> Self {
        Self { id: loeysing.id, namn: loeysing.namn, url: loeysing.url, verksemd }
    }
}
