use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use octofhir_cds_core::{Decision, Hook, Service, ServiceError, ServiceRegistry, service_fn};
use octofhir_cds_server::{AppConfig, build_app, services};
use serde_json::{Value, json};
use tower::ServiceExt;

const HOOK_INSTANCE: &str = "d1577c69-dfbe-44ad-ba6d-3e05e953b2ea";

fn app_with(cfg: &AppConfig, extra: Vec<Service>) -> Router {
    let registry = services::build_registry(&cfg.cds, extra).unwrap();
    build_app(cfg, registry).unwrap()
}

fn app() -> Router {
    app_with(&AppConfig::default(), Vec::new())
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

async fn send_json(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// A valid context for every hook type.
fn valid_context(hook: Hook) -> Value {
    let mut context = json!({"userId": "Practitioner/123", "patientId": "Patient/123"});
    let extra = match hook {
        Hook::AppointmentBook => json!({"appointments": {"resourceType": "Bundle"}}),
        Hook::EncounterDischarge | Hook::EncounterStart => json!({"encounterId": "Encounter/1"}),
        Hook::MedicationPrescribe => json!({}),
        Hook::OrderReview => json!({"orders": {"resourceType": "Bundle"}}),
        Hook::OrderSelect => json!({
            "draftOrders": {"resourceType": "Bundle"},
            "selections": ["MedicationRequest/1"]
        }),
        Hook::OrderSign => json!({"draftOrders": {"resourceType": "Bundle"}}),
        Hook::PatientView => json!({}),
    };
    if let (Some(ctx), Some(extra)) = (context.as_object_mut(), extra.as_object()) {
        ctx.extend(extra.clone());
    }
    context
}

fn hook_request(hook: Hook, context: Value, prefetch: Option<Value>) -> Value {
    let mut body = json!({
        "hook": hook.as_str(),
        "hookInstance": HOOK_INSTANCE,
        "context": context,
    });
    if let Some(prefetch) = prefetch {
        body["prefetch"] = prefetch;
    }
    body
}

fn patient_prefetch() -> Option<Value> {
    Some(json!({"patient": {"resourceType": "Patient", "id": "123"}}))
}

#[tokio::test]
async fn patient_view_scenario_succeeds() {
    let body = hook_request(
        Hook::PatientView,
        valid_context(Hook::PatientView),
        Some(json!({"patient": {"id": "Patient/123"}})),
    );
    let (status, json) = send_json(app(), post("/cds-services/8", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cards"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn partial_fhir_authorization_is_accepted() {
    let mut body = hook_request(
        Hook::PatientView,
        valid_context(Hook::PatientView),
        patient_prefetch(),
    );
    body["fhirServer"] = json!("https://fhir.example.org");
    body["fhirAuthorization"] = json!({"access_token": "some-opaque-token", "token_type": "Bearer"});
    let (status, json) = send_json(app(), post("/cds-services/8", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cards"].as_array().unwrap().len(), 1);

    body.as_object_mut().unwrap().remove("fhirServer");
    let (status, json) = send_json(app(), post("/cds-services/8", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("fhirServer"));
}

#[tokio::test]
async fn every_example_hook_accepts_a_valid_request() {
    for (i, hook) in Hook::ALL.iter().enumerate() {
        let body = hook_request(*hook, valid_context(*hook), patient_prefetch());
        let uri = format!("/cds-services/{}", i + 1);
        let (status, json) = send_json(app(), post(&uri, &body)).await;
        assert_eq!(status, StatusCode::OK, "{hook}: {json}");
        assert_eq!(json["cards"][0]["source"]["label"], "CDS Services Inc");
    }
}

#[tokio::test]
async fn missing_required_context_field_is_named_for_every_hook() {
    for (i, hook) in Hook::ALL.iter().enumerate() {
        let schema = octofhir_cds_core::schema_for(*hook, Default::default());
        for field in &schema.required {
            let mut context = valid_context(*hook);
            context.as_object_mut().unwrap().remove(*field);
            let body = hook_request(*hook, context, patient_prefetch());
            let uri = format!("/cds-services/{}", i + 1);
            let (status, json) = send_json(app(), post(&uri, &body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{hook} without {field}");
            assert_eq!(json["validationContext"], "body.context");
            let message = json["message"].as_str().unwrap();
            assert!(message.contains(field), "{hook}: {message}");
        }
    }
}

#[tokio::test]
async fn missing_patient_id_is_a_context_error() {
    let body = hook_request(
        Hook::PatientView,
        json!({"userId": "Practitioner/123"}),
        patient_prefetch(),
    );
    let (status, json) = send_json(app(), post("/cds-services/8", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["statusCode"], 400);
    assert_eq!(json["error"], "Bad Request");
    assert_eq!(json["validationContext"], "body.context");
    assert!(json["message"].as_str().unwrap().contains("patientId"));
    assert!(json["validation"].as_array().is_some_and(|v| !v.is_empty()));
}

#[tokio::test]
async fn omitted_prefetch_is_required() {
    let body = hook_request(Hook::PatientView, valid_context(Hook::PatientView), None);
    let (status, json) = send_json(app(), post("/cds-services/8", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["validationContext"], "body");
    assert!(json["message"].as_str().unwrap().contains("prefetch"));
}

#[tokio::test]
async fn prefetch_missing_declared_key_is_named() {
    let body = hook_request(
        Hook::PatientView,
        valid_context(Hook::PatientView),
        Some(json!({"notPatient": {"resourceType": "Patient"}})),
    );
    let (status, json) = send_json(app(), post("/cds-services/8", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["validation"][0]["instancePath"], ".prefetch");
    assert!(json["message"].as_str().unwrap().contains("patient"));
}

#[tokio::test]
async fn prefetch_extra_keys_are_accepted() {
    let body = hook_request(
        Hook::PatientView,
        valid_context(Hook::PatientView),
        Some(json!({
            "patient": {"resourceType": "Patient", "id": "123"},
            "conditions": {"resourceType": "Bundle"},
            "medications": {"resourceType": "Bundle"}
        })),
    );
    let (status, _) = send_json(app(), post("/cds-services/8", &body)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn service_without_prefetch_accepts_anything() {
    for prefetch in [None, Some(json!({})), Some(json!({"x": {"y": 1}}))] {
        let body = hook_request(Hook::PatientView, valid_context(Hook::PatientView), prefetch);
        let (status, json) = send_json(app(), post("/cds-services/current-time", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cards"][0]["summary"], "What time is it?");
    }
}

#[tokio::test]
async fn unknown_hook_fails_static_check() {
    let body = json!({
        "hook": "fake-hook",
        "hookInstance": HOOK_INSTANCE,
        "context": {"userId": "Practitioner/123", "patientId": "Patient/123"}
    });
    let (status, json) = send_json(app(), post("/cds-services/8", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["validationContext"], "body");
    assert_eq!(json["validation"][0]["instancePath"], ".hook");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/cds-services/8")
        .header("content-type", "application/json")
        .body(Body::from("{\"hook\":"))
        .unwrap();
    let (status, json) = send_json(app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["validationContext"], "body");
}

#[tokio::test]
async fn unknown_service_is_404_without_body() {
    let body = hook_request(Hook::PatientView, valid_context(Hook::PatientView), None);
    let (status, headers, bytes) = send(app(), post("/cds-services/404", &body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(bytes.is_empty());
    assert_eq!(headers["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn discovery_is_stable() {
    let (status, first) = send_json(app(), get("/cds-services")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send_json(app(), get("/cds-services")).await;
    assert_eq!(first, second);

    let services = first["services"].as_array().unwrap();
    assert_eq!(services.len(), 11);
    assert_eq!(services[7]["id"], "8");
    assert_eq!(services[7]["prefetch"]["patient"], "Patient/{{context.patientId}}");
    assert!(services.iter().all(|s| s.get("handler").is_none()));
}

#[tokio::test]
async fn order_select_accepts_singular_selection() {
    let mut context = valid_context(Hook::OrderSelect);
    let ctx = context.as_object_mut().unwrap();
    ctx.remove("selections");
    ctx.insert("selection".into(), json!("MedicationRequest/1"));
    let body = hook_request(Hook::OrderSelect, context, None);

    let (status, json) = send_json(app(), post("/cds-services/order-select-suggestion", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cards"][0]["suggestions"][0]["actions"][0]["type"], "create");
    assert_eq!(
        json["cards"][0]["suggestions"][0]["actions"][0]["resource"]["basedOn"][0]["reference"],
        "MedicationRequest/1"
    );
}

#[tokio::test]
async fn strict_order_select_rejects_singular_selection() {
    let mut cfg = AppConfig::default();
    cfg.cds.tolerate_singular_selection = false;

    let mut context = valid_context(Hook::OrderSelect);
    let ctx = context.as_object_mut().unwrap();
    ctx.remove("selections");
    ctx.insert("selection".into(), json!("MedicationRequest/1"));
    let body = hook_request(Hook::OrderSelect, context, None);

    let (status, json) = send_json(
        app_with(&cfg, Vec::new()),
        post("/cds-services/order-select-suggestion", &body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("selections"));
}

#[tokio::test]
async fn handler_failure_is_500_without_details() {
    let failing = Service::builder(Hook::PatientView, "Fails")
        .id("failing")
        .handler(service_fn(|_request| async {
            Err(ServiceError::execution("secret connection string"))
        }));
    let app = app_with(&AppConfig::default(), vec![failing]);
    let body = hook_request(Hook::PatientView, valid_context(Hook::PatientView), None);
    let (status, json) = send_json(app, post("/cds-services/failing", &body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Internal Server Error");
    assert!(!json.to_string().contains("secret"));
}

#[tokio::test]
async fn no_decision_never_becomes_500() {
    let quiet = Service::builder(Hook::PatientView, "Quiet")
        .id("quiet")
        .handler(service_fn(|_request| async { Ok(Decision::NoDecision) }));
    let app = app_with(&AppConfig::default(), vec![quiet]);
    let body = hook_request(Hook::PatientView, valid_context(Hook::PatientView), None);
    let (status, json) = send_json(app, post("/cds-services/quiet", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"cards": []}));
}

#[tokio::test]
async fn feedback_returns_empty_200() {
    let body = json!({
        "card": "9368d37b-283f-44a0-93ea-547cebab93ed",
        "outcome": "accepted",
        "acceptedSuggestions": [{"id": "e56e1945-20b3-4393-8503-a1a20fd73152"}],
        "outcomeTimestamp": "2020-12-11T00:00:00Z"
    });
    let (status, _, bytes) = send(app(), post("/cds-services/8/feedback", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.is_empty());

    let (status, json) = send_json(
        app(),
        post("/cds-services/8/feedback", &json!({"outcome": "accepted"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("card"));
}

#[tokio::test]
async fn cors_headers_cover_every_cds_response() {
    let (status, headers, _) = send(app(), post("/cds-services/unknown", &json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type, Authorization");

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/cds-services/8")
        .header("origin", "https://ehr.example.org")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
}

#[tokio::test]
async fn cors_can_be_disabled() {
    let mut cfg = AppConfig::default();
    cfg.cds.cors = false;
    let (status, headers, _) = send(app_with(&cfg, Vec::new()), get("/cds-services")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get("access-control-allow-origin").is_none());

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/cds-services")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app_with(&cfg, Vec::new()), req).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn routes_follow_the_mount_path() {
    let mut cfg = AppConfig::default();
    cfg.cds.mount_path = "/cds".into();
    let (status, json) = send_json(app_with(&cfg, Vec::new()), get("/cds/cds-services")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["services"].is_array());

    let (status, _, _) = send(app_with(&cfg, Vec::new()), get("/cds-services")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(app_with(&cfg, Vec::new()), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn custom_registry_replaces_examples() {
    let mut cfg = AppConfig::default();
    cfg.cds.example_services = false;
    let registry = ServiceRegistry::builder()
        .register(
            Service::builder(Hook::OrderSign, "Only service")
                .id("only")
                .handler(service_fn(|_request| async { Ok(Decision::NoDecision) })),
        )
        .unwrap()
        .build();
    let app = build_app(&cfg, registry).unwrap();
    let (_, json) = send_json(app, get("/cds-services")).await;
    assert_eq!(json["services"].as_array().unwrap().len(), 1);
    assert_eq!(json["services"][0]["hook"], "order-sign");
}
