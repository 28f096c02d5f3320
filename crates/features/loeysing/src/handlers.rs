use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use lreg_derive::{api_handler, api_model};
use lreg_domain::constants::LOEYSING_TAG;
use lreg_domain::loeysing::{Loeysing, LoeysingExpanded};
use lreg_domain::versioned::LineageId;
use lreg_kernel::server::params::{AtTimeQuery, ListQuery};
use lreg_kernel::server::{ApiError, ApiState, ErrorResponse};
use lreg_kernel::validation;
use lreg_verksemd::VerksemdRepository;
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::{LoeysingError, Loeysingar, expand};

/// Body of `POST /v1/loeysing`.
#[api_model(deny_unknown_fields = false)]
pub struct NyLoeysing {
    pub namn: Option<String>,
    pub url: Option<String>,
    pub orgnummer: String,
}

/// Body of `PUT /v1/loeysing`. A missing `verksemdId` is resolved from the orgnummer.
#[api_model(deny_unknown_fields = false)]
pub struct LoeysingBody {
    #[cfg_attr(feature = "server", schema(value_type = i64))]
    pub id: LineageId,
    pub namn: Option<String>,
    pub url: Option<String>,
    pub orgnummer: String,
    #[serde(default)]
    #[cfg_attr(feature = "server", schema(value_type = Option<i64>))]
    pub verksemd_id: Option<LineageId>,
}

impl From<LoeysingError> for ApiError {
    fn from(err: LoeysingError) -> Self {
        match err {
            LoeysingError::Validation { .. } => Self::bad_request(err.to_string()),
            LoeysingError::NotFound { .. } => Self::not_found(err.to_string()),
            LoeysingError::Verksemd { source, .. } => Self::from(source),
            LoeysingError::Storage { .. } | LoeysingError::Internal { .. } => {
                Self::Internal { message: err.to_string().into(), context: None }
            }
        }
    }
}

/// Routes under `/v1/loeysing`.
pub fn router() -> OpenApiRouter<ApiState> {
    let routes = OpenApiRouter::new()
        .routes(routes!(list_loeysingar, create_loeysing, update_loeysing))
        .routes(routes!(list_expanded))
        .routes(routes!(search_by_owner))
        .routes(routes!(get_loeysing, delete_loeysing));

    OpenApiRouter::new().nest("/v1/loeysing", routes)
}

fn loeysingar(state: &ApiState) -> Result<&Loeysingar, ApiError> {
    Ok(state.try_get_slice::<Loeysingar>()?)
}

async fn owner_of(
    verksemder: &VerksemdRepository,
    orgnummer: &str,
) -> Result<Option<LineageId>, ApiError> {
    Ok(verksemder.get_by_orgnummer(orgnummer, Utc::now()).await?.map(|v| v.id))
}

/// Lists by ids, search term or both; both together intersect.
async fn filtered(slice: &Loeysingar, query: &ListQuery) -> Result<Vec<Loeysing>, ApiError> {
    let at = query.at()?;
    let ids = query.ids()?;
    let repository = &slice.repository;

    let list = match (ids, query.search()) {
        (Some(ids), Some(term)) => {
            let mut found = repository.search(term, at).await?;
            found.retain(|l| ids.contains(&l.id));
            found
        }
        (None, Some(term)) => repository.search(term, at).await?,
        (Some(ids), None) => repository.list(Some(ids.as_slice()), at).await?,
        (None, None) => repository.list(None, at).await?,
    };
    Ok(list)
}

#[api_handler(
    get,
    path = "/{id}",
    params(("id" = i64, Path, description = "Lineage id"), AtTimeQuery),
    responses(
        (status = OK, body = Loeysing),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = LOEYSING_TAG,
)]
async fn get_loeysing(
    State(state): State<ApiState>,
    Path(id): Path<LineageId>,
    Query(query): Query<AtTimeQuery>,
) -> Result<Json<Loeysing>, ApiError> {
    let at = query.at()?;
    loeysingar(&state)?
        .repository
        .get(id, at)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Løysing {id} not found")))
}

#[api_handler(
    get,
    path = "/",
    params(ListQuery),
    responses(
        (status = OK, body = Vec<Loeysing>),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = LOEYSING_TAG,
)]
async fn list_loeysingar(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Loeysing>>, ApiError> {
    Ok(Json(filtered(loeysingar(&state)?, &query).await?))
}

#[api_handler(
    get,
    path = "/expanded",
    params(ListQuery),
    responses(
        (status = OK, body = Vec<LoeysingExpanded>),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = LOEYSING_TAG,
)]
async fn list_expanded(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<LoeysingExpanded>>, ApiError> {
    let slice = loeysingar(&state)?;
    let list = filtered(slice, &query).await?;
    Ok(Json(expand(&slice.verksemder, list, query.at()?).await?))
}

#[api_handler(
    get,
    path = "/owner",
    params(ListQuery),
    responses(
        (status = OK, body = Vec<Loeysing>),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = LOEYSING_TAG,
)]
async fn search_by_owner(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Loeysing>>, ApiError> {
    let at = query.at()?;
    let term = query.search().ok_or_else(|| ApiError::bad_request("Missing search term"))?;
    let list = loeysingar(&state)?.repository.search_by_owning_org(term, at).await?;
    Ok(Json(list))
}

#[api_handler(
    post,
    path = "/",
    request_body = NyLoeysing,
    responses(
        (status = CREATED, description = "Created; see the Location header"),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = LOEYSING_TAG,
)]
async fn create_loeysing(
    State(state): State<ApiState>,
    Json(body): Json<NyLoeysing>,
) -> Result<impl IntoResponse, ApiError> {
    let namn = validation::namn(body.namn.as_deref())?;
    let url = validation::url(body.url.as_deref())?;
    let orgnummer = validation::orgnummer(&body.orgnummer)?;
    let slice = loeysingar(&state)?;

    let verksemd_id = owner_of(&slice.verksemder, &orgnummer).await?;
    let id = slice.repository.create(&namn, &url, &orgnummer, verksemd_id).await?;
    info!(id, %url, %orgnummer, "Stored løysing");

    Ok((StatusCode::CREATED, [(header::LOCATION, format!("/v1/loeysing/{id}"))]))
}

#[api_handler(
    put,
    path = "/",
    request_body = LoeysingBody,
    responses(
        (status = NO_CONTENT, description = "Updated"),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = LOEYSING_TAG,
)]
async fn update_loeysing(
    State(state): State<ApiState>,
    Json(body): Json<LoeysingBody>,
) -> Result<StatusCode, ApiError> {
    let namn = validation::namn(body.namn.as_deref())?;
    let url = validation::url(body.url.as_deref())?;
    let orgnummer = validation::orgnummer(&body.orgnummer)?;
    let slice = loeysingar(&state)?;

    let verksemd_id = match body.verksemd_id {
        Some(id) => Some(id),
        None => owner_of(&slice.verksemder, &orgnummer).await?,
    };
    let loeysing = Loeysing { id: body.id, namn, url, orgnummer, verksemd_id };
    slice.repository.update(&loeysing).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[api_handler(
    delete,
    path = "/{id}",
    params(("id" = i64, Path, description = "Lineage id")),
    responses(
        (status = NO_CONTENT, description = "Deactivated"),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = LOEYSING_TAG,
)]
async fn delete_loeysing(
    State(state): State<ApiState>,
    Path(id): Path<LineageId>,
) -> Result<StatusCode, ApiError> {
    loeysingar(&state)?.repository.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
