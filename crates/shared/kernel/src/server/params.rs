//! Query parameters shared by the list endpoints.

use chrono::{DateTime, Utc};
use lreg_domain::versioned::LineageId;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::server::ApiError;
use crate::validation;

/// `?atTime=`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AtTimeQuery {
    /// RFC 3339 instant; defaults to now.
    pub at_time: Option<String>,
}

impl AtTimeQuery {
    /// # Errors
    /// [`ApiError::BadRequest`] for malformed instants.
    pub fn at(&self) -> Result<DateTime<Utc>, ApiError> {
        Ok(validation::instant(self.at_time.as_deref())?)
    }
}

/// `?ids=&search=&atTime=`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Comma-separated lineage ids.
    pub ids: Option<String>,
    /// Case-insensitive substring.
    pub search: Option<String>,
    /// RFC 3339 instant; defaults to now.
    pub at_time: Option<String>,
}

impl ListQuery {
    /// # Errors
    /// [`ApiError::BadRequest`] for malformed instants.
    pub fn at(&self) -> Result<DateTime<Utc>, ApiError> {
        Ok(validation::instant(self.at_time.as_deref())?)
    }

    /// `None` when no `ids` parameter was given.
    ///
    /// # Errors
    /// [`ApiError::BadRequest`] for malformed id lists.
    pub fn ids(&self) -> Result<Option<Vec<LineageId>>, ApiError> {
        self.ids.as_deref().map(validation::id_list).transpose().map_err(ApiError::from)
    }

    /// The search term, ignoring blank values.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|term| !term.is_empty())
    }
}
