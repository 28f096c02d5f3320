//! Løysing feature slice: versioned solutions and their owning verksemd.
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use lreg_database::Database;
//! use lreg_domain::nettadresse::Nettadresse;
//! use lreg_loeysing::{LoeysingRepository, MIGRATIONS};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::builder()
//!     .url("mem://")
//!     .session("lreg", "register")
//!     .migrations(MIGRATIONS.iter().copied())
//!     .init()
//!     .await?;
//! let loeysingar = LoeysingRepository::new(db);
//! let url = Nettadresse::parse("www.uutilsynet.no")?;
//! let id = loeysingar.create("Tilsynet", &url, "991825827", None).await?;
//! let found = loeysingar.get(id, Utc::now()).await?;
//! # Ok(())
//! # }
//! ```
mod error;
#[cfg(feature = "server")]
mod handlers;
mod repository;
mod table;

pub use error::{LoeysingError, LoeysingErrorExt};
#[cfg(feature = "server")]
pub use handlers::{LoeysingBody, NyLoeysing, router};
pub use repository::{LoeysingRepository, expand};
pub use table::{LoeysingRad, LoeysingTable};

use lreg_database::{Database, Migration, versioned_table_script};
use lreg_kernel::domain::registry::InitializedSlice;
use lreg_verksemd::VerksemdRepository;

/// Schema owned by this slice.
pub const MIGRATIONS: &[Migration] = &[
    Migration::new("loeysing", "0001", versioned_table_script!("loeysing")),
    Migration::new(
        "loeysing",
        "0002",
        "DEFINE INDEX IF NOT EXISTS loeysing_orgnummer ON loeysing FIELDS orgnummer;",
    ),
];

/// Løysing feature state. Owners are read through the verksemd repository.
#[lreg_derive::lreg_slice]
pub struct Loeysingar {
    pub repository: LoeysingRepository,
    pub verksemder: VerksemdRepository,
}

/// Initialize the løysing feature.
pub fn init(database: &Database) -> InitializedSlice {
    let slice = Loeysingar::new(LoeysingarInner {
        repository: LoeysingRepository::new(database.clone()),
        verksemder: VerksemdRepository::new(database.clone()),
    });

    tracing::info!("Løysing slice initialized");
    InitializedSlice::new(slice)
}
