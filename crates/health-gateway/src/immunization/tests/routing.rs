use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::immunization::domain::VaccineProofRequestStatus;
use crate::immunization::immunization_router;

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

#[tokio::test]
async fn status_handler_wraps_result_in_envelope() {
    let service = Arc::new(build_orchestrator(
        Arc::new(FakeRegistry::with_status("AllDosesReceived")),
        Arc::new(FakeProofService::default()),
    ));

    let response = crate::immunization::router::vaccine_status_handler::<
        FakeRegistry,
        FakeProofService,
    >(State(service), Path(HDID.to_string()))
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["resultStatus"], "Success");
    assert_eq!(payload["resourcePayload"]["state"], "AllDosesReceived");
    assert_eq!(payload["resourcePayload"]["qrCode"]["data"], QR_DATA);
}

#[tokio::test]
async fn public_status_route_reports_validation_errors() {
    let router = router_with(
        FakeRegistry::with_status("AllDosesReceived"),
        FakeProofService::default(),
    );

    let response = router
        .oneshot(json_request(
            "/api/v1/public/vaccine-status",
            json!({ "personalHealthNumber": "123", "dateOfBirth": DOB }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["resultStatus"], "Error");
    assert_eq!(payload["resultError"]["resultMessage"], "Error parsing phn");
    assert_eq!(payload["resultError"]["errorCode"], "ImmunizationServer-IS");
}

#[tokio::test]
async fn proof_route_rejects_unknown_template() {
    let router = router_with(
        FakeRegistry::with_status("AllDosesReceived"),
        FakeProofService::default(),
    );

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/vaccine-proof/{HDID}?template=postcard"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("postcard"));
}

#[tokio::test(start_paused = true)]
async fn federal_proof_route_requests_federal_proof_from_registry() {
    let registry = Arc::new(FakeRegistry::with_status("AllDosesReceived"));
    let proofs = Arc::new(FakeProofService::job(
        "fed-7",
        &[VaccineProofRequestStatus::Completed],
    ));
    let router = immunization_router(Arc::new(build_orchestrator(
        registry.clone(),
        proofs.clone(),
    )));

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/vaccine-proof/{HDID}?template=Federal"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["resultStatus"], "Success");
    assert!(registry.queries()[0].include_federal_vaccine_proof());
    assert_eq!(proofs.calls().generate, 1);
}

#[tokio::test(start_paused = true)]
async fn public_proof_route_returns_document() {
    let router = router_with(
        FakeRegistry::with_status("PartialDosesReceived"),
        FakeProofService::job("abc123", &[VaccineProofRequestStatus::Completed]),
    );

    let response = router
        .oneshot(json_request(
            "/api/v1/public/vaccine-proof",
            json!({ "personalHealthNumber": PHN, "dateOfBirth": DOB }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["resultStatus"], "Success");
    assert_eq!(payload["resourcePayload"]["loaded"], true);
    assert_eq!(payload["resourcePayload"]["document"]["data"], PDF_DATA);
    assert_eq!(
        payload["resourcePayload"]["document"]["type"],
        "application/pdf"
    );
}

#[tokio::test(start_paused = true)]
async fn public_federal_proof_requests_federal_proof_from_registry() {
    let registry = Arc::new(FakeRegistry::with_status("AllDosesReceived"));
    let proofs = Arc::new(FakeProofService::job(
        "fed-8",
        &[VaccineProofRequestStatus::Completed],
    ));
    let router = immunization_router(Arc::new(build_orchestrator(
        registry.clone(),
        proofs.clone(),
    )));

    let response = router
        .oneshot(json_request(
            "/api/v1/public/vaccine-proof",
            json!({ "personalHealthNumber": PHN, "dateOfBirth": DOB, "template": "federal" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let queries = registry.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].include_federal_vaccine_proof());
    assert_eq!(queries[0].personal_health_number(), Some(PHN));
}

#[tokio::test]
async fn public_status_route_leaves_federal_proof_out() {
    let registry = Arc::new(FakeRegistry::with_status("AllDosesReceived"));
    let router = immunization_router(Arc::new(build_orchestrator(
        registry.clone(),
        Arc::new(FakeProofService::default()),
    )));

    let response = router
        .oneshot(json_request(
            "/api/v1/public/vaccine-status",
            json!({ "personalHealthNumber": PHN, "dateOfBirth": DOB }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!registry.queries()[0].include_federal_vaccine_proof());
}

#[tokio::test]
async fn mail_route_returns_boolean_payload() {
    let mut proofs = FakeProofService::default();
    proofs.mail = Script::new([Reply::Ok(job(
        "mail-9",
        VaccineProofRequestStatus::Started,
    ))]);
    let router = router_with(FakeRegistry::with_status("AllDosesReceived"), proofs);

    let response = router
        .oneshot(json_request(
            "/api/v1/vaccine-card/mail",
            json!({
                "personalHealthNumber": PHN,
                "dateOfBirth": DOB,
                "mailAddress": address(),
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["resultStatus"], "Success");
    assert_eq!(payload["resourcePayload"], true);
}
