use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use lreg_derive::{api_handler, api_model};
use lreg_domain::constants::VERKSEMD_TAG;
use lreg_domain::verksemd::Verksemd;
use lreg_domain::versioned::LineageId;
use lreg_kernel::server::params::{AtTimeQuery, ListQuery};
use lreg_kernel::server::{ApiError, ApiState, ErrorResponse};
use lreg_kernel::validation;
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::{VerksemdError, Verksemder};

/// Body of `POST /v1/verksemd`. The rest of the record comes from Enhetsregisteret.
#[api_model(deny_unknown_fields = false)]
pub struct NyVerksemdBase {
    pub organisasjonsnummer: String,
}

impl From<VerksemdError> for ApiError {
    fn from(err: VerksemdError) -> Self {
        match err {
            VerksemdError::Validation { .. } => Self::bad_request(err.to_string()),
            VerksemdError::NotFound { .. } | VerksemdError::Registry { not_found: true, .. } => {
                Self::not_found(err.to_string())
            }
            VerksemdError::Registry { .. } => Self::BadGateway { message: err.to_string().into() },
            VerksemdError::Storage { .. } | VerksemdError::Internal { .. } => {
                Self::Internal { message: err.to_string().into(), context: None }
            }
        }
    }
}

/// Routes under `/v1/verksemd`.
pub fn router() -> OpenApiRouter<ApiState> {
    let routes = OpenApiRouter::new()
        .routes(routes!(list_verksemder, create_verksemd))
        .routes(routes!(filter_verksemder))
        .routes(routes!(get_verksemd, update_verksemd, delete_verksemd));

    OpenApiRouter::new().nest("/v1/verksemd", routes)
}

fn verksemder(state: &ApiState) -> Result<&Verksemder, ApiError> {
    Ok(state.try_get_slice::<Verksemder>()?)
}

#[api_handler(
    get,
    path = "/{id}",
    params(("id" = i64, Path, description = "Lineage id"), AtTimeQuery),
    responses(
        (status = OK, body = Verksemd),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = VERKSEMD_TAG,
)]
async fn get_verksemd(
    State(state): State<ApiState>,
    Path(id): Path<LineageId>,
    Query(query): Query<AtTimeQuery>,
) -> Result<Json<Verksemd>, ApiError> {
    let at = query.at()?;
    verksemder(&state)?
        .repository
        .get(id, at)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Verksemd {id} not found")))
}

#[api_handler(
    get,
    path = "/",
    params(AtTimeQuery),
    responses(
        (status = OK, body = Vec<Verksemd>),
        (status = NO_CONTENT, description = "No active verksemder"),
    ),
    tag = VERKSEMD_TAG,
)]
async fn list_verksemder(
    State(state): State<ApiState>,
    Query(query): Query<AtTimeQuery>,
) -> Result<Response, ApiError> {
    let at = query.at()?;
    let list = verksemder(&state)?.repository.list(None, at).await?;
    if list.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(list).into_response())
}

#[api_handler(
    get,
    path = "/list",
    params(ListQuery),
    responses(
        (status = OK, body = Vec<Verksemd>),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = VERKSEMD_TAG,
)]
async fn filter_verksemder(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Verksemd>>, ApiError> {
    let at = query.at()?;
    let ids = query.ids()?;
    let repository = &verksemder(&state)?.repository;

    let list = match (ids, query.search()) {
        (Some(ids), Some(term)) => {
            let mut found = repository.search(term, at).await?;
            found.retain(|v| ids.contains(&v.id));
            found
        }
        (None, Some(term)) => repository.search(term, at).await?,
        (Some(ids), None) => repository.list(Some(ids.as_slice()), at).await?,
        (None, None) => repository.list(None, at).await?,
    };
    Ok(Json(list))
}

#[api_handler(
    post,
    path = "/",
    request_body = NyVerksemdBase,
    responses(
        (status = OK, body = Verksemd),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = NOT_FOUND, description = "Unknown in Enhetsregisteret", body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = VERKSEMD_TAG,
)]
async fn create_verksemd(
    State(state): State<ApiState>,
    Json(body): Json<NyVerksemdBase>,
) -> Result<Json<Verksemd>, ApiError> {
    let orgnummer = validation::orgnummer(&body.organisasjonsnummer)?;
    let slice = verksemder(&state)?;

    let ny = slice.service.get_verksemd_data(&orgnummer).await?;
    let namn = ny.namn.clone();
    let id = slice.repository.create(ny).await?;
    info!(id, %namn, %orgnummer, "Stored verksemd");

    slice
        .repository
        .get(id, Utc::now())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::from(format!("Verksemd {id} is not active after create")))
}

#[api_handler(
    put,
    path = "/{id}",
    params(("id" = i64, Path, description = "Lineage id")),
    request_body = Verksemd,
    responses(
        (status = OK, body = Verksemd),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = VERKSEMD_TAG,
)]
async fn update_verksemd(
    State(state): State<ApiState>,
    Path(id): Path<LineageId>,
    Json(mut verksemd): Json<Verksemd>,
) -> Result<Json<Verksemd>, ApiError> {
    verksemd.id = id;
    let updated = verksemder(&state)?.repository.update(&verksemd).await?;
    Ok(Json(updated))
}

#[api_handler(
    delete,
    path = "/{id}",
    params(("id" = i64, Path, description = "Lineage id")),
    responses(
        (status = OK, description = "Deactivated"),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = VERKSEMD_TAG,
)]
async fn delete_verksemd(
    State(state): State<ApiState>,
    Path(id): Path<LineageId>,
) -> Result<StatusCode, ApiError> {
    verksemder(&state)?.repository.delete(id).await?;
    Ok(StatusCode::OK)
}
