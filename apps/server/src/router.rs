use axum::Router;
use lreg::kernel::server::ApiState;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    info(title = "Løysingsregister", description = "Versioned register of løysingar and verksemder"),
    tags(
        (name = "System", description = "Service information"),
        (name = "Løysing", description = "Solutions under supervision"),
        (name = "Verksemd", description = "Organizations owning løysingar"),
    )
)]
struct ApiDoc;

pub(crate) fn init(state: ApiState) -> Router {
    let (openapi_routes, api_doc) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(lreg::server::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .split_for_parts();

    let scalar_routes = Scalar::with_url("/api", api_doc);

    Router::new().merge(openapi_routes).merge(scalar_routes)
}
