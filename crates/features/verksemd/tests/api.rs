use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use lreg_database::Database;
use lreg_domain::verksemd::Verksemd;
use lreg_kernel::server::ApiState;
use lreg_verksemd::{
    BrregKode, BrregVerksemd, MIGRATIONS, Organisasjonsregister, VerksemdError, init_with, router,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Debug)]
struct FastRegister;

#[async_trait]
impl Organisasjonsregister for FastRegister {
    async fn hent(&self, orgnummer: &str) -> Result<BrregVerksemd, VerksemdError> {
        match orgnummer {
            "938644500" => Ok(BrregVerksemd {
                organisasjonsnummer: orgnummer.to_owned(),
                navn: "Testdirektoratet".to_owned(),
                organisasjonsform: Some(BrregKode {
                    kode: "ORGL".into(),
                    beskrivelse: "Organisasjonsledd".into(),
                }),
                antall_ansatte: Some(7),
                ..BrregVerksemd::default()
            }),
            "889640782" => Ok(BrregVerksemd {
                organisasjonsnummer: orgnummer.to_owned(),
                navn: "Arbeids- og velferdsetaten".to_owned(),
                antall_ansatte: Some(20),
                ..BrregVerksemd::default()
            }),
            "991825827" => Err(VerksemdError::Registry {
                orgnummer: orgnummer.to_owned(),
                message: "Registry answered 503 Service Unavailable".into(),
                not_found: false,
            }),
            _ => Err(VerksemdError::Registry {
                orgnummer: orgnummer.to_owned(),
                message: "Unknown organisasjonsnummer".into(),
                not_found: true,
            }),
        }
    }
}

async fn app() -> Router {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .migrations(MIGRATIONS.iter().copied())
        .init()
        .await
        .expect("connect to mem://");

    let state = ApiState::builder()
        .register_slice(init_with(&db, Arc::new(FastRegister)))
        .db(db)
        .build()
        .expect("state");

    let (router, _api) = router().with_state(state).split_for_parts();
    router
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn create(app: &Router) -> Verksemd {
    register(app, "938644500").await
}

async fn register(app: &Router, orgnummer: &str) -> Verksemd {
    let (status, body) = send(
        app,
        Method::POST,
        "/v1/verksemd",
        Some(json!({ "organisasjonsnummer": orgnummer })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    serde_json::from_value(body).unwrap()
}

async fn put(app: &Router, verksemd: &Verksemd) -> (StatusCode, Value) {
    let uri = format!("/v1/verksemd/{}", verksemd.id);
    send(app, Method::PUT, &uri, Some(serde_json::to_value(verksemd).unwrap())).await
}

#[tokio::test]
async fn empty_register_lists_no_content() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/v1/verksemd", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn create_fetches_registry_data() {
    let app = app().await;
    let created = create(&app).await;
    assert_eq!(created.namn, "Testdirektoratet");
    assert_eq!(created.organisasjonsform.kode, "ORGL");
    assert_eq!(created.tal_tilsette, 7);

    let (status, body) = send(&app, Method::GET, &format!("/v1/verksemd/{}", created.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organisasjonsnummer"], "938644500");

    let again = create(&app).await;
    assert_eq!(again.id, created.id);

    let (status, body) = send(&app, Method::GET, "/v1/verksemd", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn create_rejects_bad_orgnummer_and_unknown_units() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/verksemd",
        Some(json!({ "organisasjonsnummer": "123456789" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/verksemd",
        Some(json!({ "organisasjonsnummer": "123456785" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/verksemd",
        Some(json!({ "organisasjonsnummer": "991825827" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], 502);
}

#[tokio::test]
async fn update_then_delete() {
    let app = app().await;
    let mut verksemd = create(&app).await;
    verksemd.namn = "Omdøypt direktorat".to_owned();

    let uri = format!("/v1/verksemd/{}", verksemd.id);
    let (status, body) =
        send(&app, Method::PUT, &uri, Some(serde_json::to_value(&verksemd).unwrap())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["namn"], "Omdøypt direktorat");

    let (status, body) = send(&app, Method::GET, "/v1/verksemd/list?search=omd%C3%B8ypt", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_can_remove_optional_fields() {
    let app = app().await;
    let mut verksemd = create(&app).await;
    verksemd.forvaltningsnivaa = Some("Statleg".to_owned());
    verksemd.tenesteromraade = Some("Digitalisering".to_owned());
    let (status, body) = put(&app, &verksemd).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["forvaltningsnivaa"], "Statleg");

    verksemd.forvaltningsnivaa = None;
    let (status, body) = put(&app, &verksemd).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["forvaltningsnivaa"], Value::Null);
    assert_eq!(body["tenesteromraade"], "Digitalisering");

    let (status, body) =
        send(&app, Method::GET, &format!("/v1/verksemd/{}", verksemd.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let stored: Verksemd = serde_json::from_value(body).unwrap();
    assert_eq!(stored, verksemd);
}

#[tokio::test]
async fn moving_an_orgnummer_onto_another_lineage_deactivates_it() {
    let app = app().await;
    let taken = create(&app).await;
    let mut moved = register(&app, "889640782").await;
    assert_ne!(taken.id, moved.id);

    moved.organisasjonsnummer = taken.organisasjonsnummer.clone();
    let (status, body) = put(&app, &moved).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["id"], moved.id);
    assert_eq!(body["organisasjonsnummer"], "938644500");

    let (status, _) = send(&app, Method::GET, &format!("/v1/verksemd/{}", taken.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/v1/verksemd", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .map(|all| all.iter().filter_map(|v| v["id"].as_i64()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec![moved.id]);

    let again = create(&app).await;
    assert_eq!(again.id, moved.id, "create finds the lineage now holding the number");
}

#[tokio::test]
async fn list_filters_by_ids_and_rejects_bad_input() {
    let app = app().await;
    let created = create(&app).await;

    let uri = format!("/v1/verksemd/list?ids={},404", created.id);
    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], created.id);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, Method::GET, "/v1/verksemd/list?ids=ein,to", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/v1/verksemd?atTime=i%20morgon", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn time_travel_before_creation_is_empty() {
    let app = app().await;
    let (status, _) =
        send(&app, Method::GET, "/v1/verksemd?atTime=2001-01-01T00:00:00Z", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let created = create(&app).await;
    let uri = format!("/v1/verksemd/{}?atTime=2001-01-01T00:00:00Z", created.id);
    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
