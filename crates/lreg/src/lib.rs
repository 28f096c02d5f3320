//! Facade crate for the løysingsregister features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it composes other crates, it does not implement business logic.
//!
//! ## Usage
//! - Add `lreg` with the `server` feature for the HTTP surface.
//! - Apply [`migrations`] when connecting, then call `lreg::init` to build the feature
//!   slices.

use lreg_database::Migration;
pub use lreg_domain as domain;
pub use lreg_kernel as kernel;

#[cfg(feature = "server")]
use lreg_database::Database;
#[cfg(feature = "server")]
use lreg_domain::config::ApiConfig;

/// Feature registry for runtime introspection.
pub mod features {
    pub use lreg_loeysing as loeysing;
    pub use lreg_verksemd as verksemd;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        "loeysing",
        "verksemd",
        #[cfg(feature = "server")]
        "server",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Every feature's schema, verksemd first.
pub fn migrations() -> impl Iterator<Item = Migration> {
    features::verksemd::MIGRATIONS.iter().chain(features::loeysing::MIGRATIONS).copied()
}

#[cfg(feature = "server")]
pub mod server {
    use lreg_kernel::server::ApiState;
    use utoipa_axum::router::OpenApiRouter;

    pub use lreg_kernel::server::router::system_router;

    /// System routes plus every feature's `/v1` routes.
    pub fn router() -> OpenApiRouter<ApiState> {
        system_router()
            .merge(crate::features::verksemd::router())
            .merge(crate::features::loeysing::router())
    }
}

/// Initialize all features for server mode.
///
/// # Errors
/// Returns an error if any feature initialization fails.
#[cfg(feature = "server")]
pub fn init(
    config: &ApiConfig,
    database: &Database,
) -> Result<Vec<domain::registry::InitializedSlice>, Box<dyn std::error::Error + Send + Sync>> {
    let slices = vec![
        features::verksemd::init(database, config)?,
        features::loeysing::init(database),
    ];

    Ok(slices)
}
