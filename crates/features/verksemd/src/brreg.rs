//! Enhetsregisteret (Brønnøysundregistra) lookup.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lreg_domain::config::RegistryConfig;
use lreg_domain::verksemd::{
    Fylke, InstitusjonellSektorKode, Kommune, Naeringskode, NyVerksemd, Organisasjonsform,
    Postadresse,
};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::VerksemdError;

/// A unit as returned by `GET /enhetsregisteret/api/enheter/{orgnummer}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrregVerksemd {
    pub organisasjonsnummer: String,
    pub navn: String,
    #[serde(default)]
    pub organisasjonsform: Option<BrregKode>,
    #[serde(default)]
    pub naeringskode1: Option<BrregKode>,
    #[serde(default)]
    pub antall_ansatte: Option<i32>,
    #[serde(default)]
    pub overordnet_enhet: Option<String>,
    #[serde(default)]
    pub postadresse: Option<BrregAdresse>,
    #[serde(default)]
    pub forretningsadresse: Option<BrregAdresse>,
    #[serde(default)]
    pub institusjonell_sektorkode: Option<BrregKode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BrregKode {
    pub kode: String,
    #[serde(default)]
    pub beskrivelse: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BrregAdresse {
    #[serde(default)]
    pub postnummer: Option<String>,
    #[serde(default)]
    pub poststed: Option<String>,
    #[serde(default)]
    pub kommune: Option<String>,
    #[serde(default)]
    pub kommunenummer: Option<String>,
}

impl From<BrregVerksemd> for NyVerksemd {
    fn from(enhet: BrregVerksemd) -> Self {
        let kode = |k: Option<BrregKode>| k.unwrap_or_default();
        let adresse = enhet.forretningsadresse;

        let naeringskode = kode(enhet.naeringskode1);
        let organisasjonsform = kode(enhet.organisasjonsform);
        let sektor = kode(enhet.institusjonell_sektorkode);

        Self {
            namn: enhet.navn,
            organisasjonsnummer: enhet.organisasjonsnummer,
            institusjonell_sektor_kode: InstitusjonellSektorKode {
                kode: sektor.kode,
                beskrivelse: sektor.beskrivelse,
            },
            naeringskode: Naeringskode {
                kode: naeringskode.kode,
                beskrivelse: naeringskode.beskrivelse,
            },
            organisasjonsform: Organisasjonsform {
                kode: organisasjonsform.kode,
                omtale: organisasjonsform.beskrivelse,
            },
            fylke: Fylke::default(),
            kommune: adresse
                .as_ref()
                .map(|a| Kommune {
                    kommunenummer: a.kommunenummer.clone().unwrap_or_default(),
                    kommune: a.kommune.clone().unwrap_or_default(),
                })
                .unwrap_or_default(),
            postadresse: adresse
                .map(|a| Postadresse { postnummer: a.postnummer, poststad: a.poststed }),
            tal_tilsette: enhet.antall_ansatte.unwrap_or_default(),
            forvaltningsnivaa: None,
            tenesteromraade: None,
            under_avviking: false,
        }
    }
}

/// Source of organization data keyed by organisasjonsnummer.
#[async_trait]
pub trait Organisasjonsregister: Debug + Send + Sync {
    /// # Errors
    ///
    /// [`VerksemdError::Registry`], with `not_found` set when the unit does not exist.
    async fn hent(&self, orgnummer: &str) -> Result<BrregVerksemd, VerksemdError>;
}

/// HTTP client for Enhetsregisteret.
#[derive(Debug, Clone)]
pub struct BrregKlient {
    http: reqwest::Client,
    url: String,
}

impl BrregKlient {
    /// # Errors
    ///
    /// [`VerksemdError::Internal`] when the HTTP client cannot be built.
    pub fn new(config: &RegistryConfig) -> Result<Self, VerksemdError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("loeysingsregister/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VerksemdError::Internal {
                message: e.to_string().into(),
                context: Some("Building registry client".into()),
            })?;

        Ok(Self { http, url: config.url.trim_end_matches('/').to_owned() })
    }
}

#[async_trait]
impl Organisasjonsregister for BrregKlient {
    #[instrument(skip(self))]
    async fn hent(&self, orgnummer: &str) -> Result<BrregVerksemd, VerksemdError> {
        let failure = |message: String, not_found: bool| VerksemdError::Registry {
            orgnummer: orgnummer.to_owned(),
            message: message.into(),
            not_found,
        };

        let response = self
            .http
            .get(format!("{}/{orgnummer}", self.url))
            .send()
            .await
            .map_err(|e| failure(e.to_string(), false))?;

        match response.status() {
            status if status.is_success() => {
                let enhet = response
                    .json::<BrregVerksemd>()
                    .await
                    .map_err(|e| failure(format!("Unreadable response: {e}"), false))?;
                debug!(navn = %enhet.navn, "Registry lookup succeeded");
                Ok(enhet)
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(failure("Unknown organisasjonsnummer".to_owned(), true))
            }
            status => {
                warn!(%status, "Registry lookup failed");
                Err(failure(format!("Registry answered {status}"), false))
            }
        }
    }
}

/// Maps registry records into new verksemder.
#[derive(Debug, Clone)]
pub struct VerksemdService {
    register: Arc<dyn Organisasjonsregister>,
}

impl VerksemdService {
    pub fn new(register: Arc<dyn Organisasjonsregister>) -> Self {
        Self { register }
    }

    /// Looks up `orgnummer` and maps the result. The fylke is left empty.
    ///
    /// # Errors
    ///
    /// Propagates [`Organisasjonsregister::hent`] failures.
    pub async fn get_verksemd_data(&self, orgnummer: &str) -> Result<NyVerksemd, VerksemdError> {
        self.register.hent(orgnummer).await.map(NyVerksemd::from)
    }
}
