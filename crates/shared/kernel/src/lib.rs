//! Kernel utilities shared across slices.
//! Keep this crate lightweight: configuration loading, input validation at the HTTP
//! boundary and, behind the `server` feature, the shared Axum state and error type.
//!
//! ## Config loading
//! ```rust,no_run
//! use lreg_kernel::config::load_config;
//! use lreg_kernel::domain::config::ApiConfig;
//!
//! let cfg: ApiConfig = load_config(Some("server")).unwrap_or_default();
//! assert!(cfg.server.port > 0);
//! ```
//!
//! ## Validation
//! ```rust
//! use lreg_kernel::validation;
//!
//! assert!(validation::orgnummer("938644500").is_ok());
//! assert!(validation::orgnummer("123456789").is_err());
//! assert_eq!(validation::id_list(" 1, 2 ").unwrap(), vec![1, 2]);
//! ```
pub mod config;
#[cfg(feature = "server")]
pub mod server;
pub mod validation;

pub use lreg_domain as domain;
