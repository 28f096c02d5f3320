//! Verksemd feature slice: versioned organizations and their Enhetsregisteret lookup.
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use lreg_database::Database;
//! use lreg_verksemd::{MIGRATIONS, VerksemdRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::builder()
//!     .url("mem://")
//!     .session("lreg", "register")
//!     .migrations(MIGRATIONS.iter().copied())
//!     .init()
//!     .await?;
//! let verksemder = VerksemdRepository::new(db);
//! let found = verksemder.search("direktoratet", Utc::now()).await?;
//! # Ok(())
//! # }
//! ```
mod brreg;
mod error;
#[cfg(feature = "server")]
mod handlers;
mod repository;
mod table;

pub use brreg::{
    BrregAdresse, BrregKlient, BrregKode, BrregVerksemd, Organisasjonsregister, VerksemdService,
};
pub use error::{VerksemdError, VerksemdErrorExt};
#[cfg(feature = "server")]
pub use handlers::{NyVerksemdBase, router};
pub use repository::VerksemdRepository;
pub use table::{PostadresseRad, VerksemdRad, VerksemdTable};

use lreg_database::{Database, Migration, versioned_table_script};
use lreg_domain::config::ApiConfig;
use lreg_kernel::domain::registry::InitializedSlice;
use std::sync::Arc;

/// Schema owned by this slice.
pub const MIGRATIONS: &[Migration] = &[
    Migration::new("verksemd", "0001", versioned_table_script!("verksemd")),
    Migration::new(
        "verksemd",
        "0002",
        "DEFINE INDEX IF NOT EXISTS verksemd_organisasjonsnummer ON verksemd FIELDS organisasjonsnummer;",
    ),
];

/// Verksemd feature state.
#[lreg_derive::lreg_slice]
pub struct Verksemder {
    pub repository: VerksemdRepository,
    pub service: VerksemdService,
}

/// Initialize the verksemd feature against Enhetsregisteret.
///
/// # Errors
/// Returns an error if the registry client cannot be built.
pub fn init(database: &Database, config: &ApiConfig) -> Result<InitializedSlice, VerksemdError> {
    let register = BrregKlient::new(&config.registry)?;
    Ok(init_with(database, Arc::new(register)))
}

/// Initialize the verksemd feature with any [`Organisasjonsregister`].
pub fn init_with(database: &Database, register: Arc<dyn Organisasjonsregister>) -> InitializedSlice {
    let slice = Verksemder::new(VerksemderInner {
        repository: VerksemdRepository::new(database.clone()),
        service: VerksemdService::new(register),
    });

    tracing::info!("Verksemd slice initialized");
    InitializedSlice::new(slice)
}
