//! Request state: configuration, the SurrealDB handle and the registered feature slices
//! (`Verksemder`, `Loeysingar`, ...), looked up by type.

use fxhash::FxHashMap;
use lreg_database::Database;
use lreg_domain::config::ApiConfig;
use lreg_domain::registry::{FeatureSlice, InitializedSlice};
use std::any::TypeId;
use std::borrow::Cow;
use std::sync::Arc;

#[lreg_derive::lreg_error]
pub enum ApiStateError {
    #[error("State validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[error("Feature slice {slice} is not registered")]
    MissingSlice { slice: &'static str },
}

#[derive(Debug)]
struct Inner {
    config: ApiConfig,
    database: Database,
    slices: FxHashMap<TypeId, InitializedSlice>,
}

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct ApiState {
    inner: Arc<Inner>,
}

impl ApiState {
    #[must_use]
    pub fn builder() -> ApiStateBuilder {
        ApiStateBuilder::default()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// The register database, also checked by `/health`.
    pub fn database(&self) -> &Database {
        &self.inner.database
    }

    /// The registered slice of type `T`.
    ///
    /// # Errors
    /// [`ApiStateError::MissingSlice`] when the feature was not initialized.
    pub fn try_get_slice<T: FeatureSlice>(&self) -> Result<&T, ApiStateError> {
        self.inner
            .slices
            .get(&TypeId::of::<T>())
            .and_then(InitializedSlice::downcast_ref::<T>)
            .ok_or(ApiStateError::MissingSlice { slice: short_type_name::<T>() })
    }
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

#[derive(Debug, Default)]
pub struct ApiStateBuilder {
    config: Option<ApiConfig>,
    database: Option<Database>,
    slices: FxHashMap<TypeId, InitializedSlice>,
}

impl ApiStateBuilder {
    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn db(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Registers a feature slice; a later slice of the same type replaces the earlier one.
    #[must_use]
    pub fn register_slice(mut self, slice: InitializedSlice) -> Self {
        self.slices.insert(slice.id, slice);
        self
    }

    /// # Errors
    /// [`ApiStateError::Validation`] when the database is missing.
    pub fn build(self) -> Result<ApiState, ApiStateError> {
        let database = self.database.ok_or_else(|| ApiStateError::Validation {
            message: "Database not provided".into(),
            context: None,
        })?;
        let config = self.config.unwrap_or_default();

        Ok(ApiState { inner: Arc::new(Inner { config, database, slices: self.slices }) })
    }
}
