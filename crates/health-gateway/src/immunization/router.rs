use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{Address, VaccineProofTemplate, VaccineStatusQuery};
use super::gateway::{VaccineProofGateway, VaccineStatusGateway};
use super::proof::VaccineProofOrchestrator;
use super::result::RequestResult;
use super::status::public_query;

/// Router builder exposing vaccine status, proof and card mailing endpoints.
pub fn immunization_router<S, P>(service: Arc<VaccineProofOrchestrator<S, P>>) -> Router
where
    S: VaccineStatusGateway + 'static,
    P: VaccineProofGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/vaccine-status/:hdid",
            get(vaccine_status_handler::<S, P>),
        )
        .route(
            "/api/v1/public/vaccine-status",
            post(public_vaccine_status_handler::<S, P>),
        )
        .route(
            "/api/v1/vaccine-proof/:hdid",
            get(vaccine_proof_handler::<S, P>),
        )
        .route(
            "/api/v1/public/vaccine-proof",
            post(public_vaccine_proof_handler::<S, P>),
        )
        .route(
            "/api/v1/vaccine-card/mail",
            post(mail_vaccine_card_handler::<S, P>),
        )
        .with_state(service)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicLookupRequest {
    pub personal_health_number: String,
    pub date_of_birth: String,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailVaccineCardRequest {
    pub personal_health_number: String,
    pub date_of_birth: String,
    pub mail_address: Address,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProofParams {
    template: Option<String>,
}

fn envelope<T: Serialize>(result: RequestResult<T>) -> Response {
    (StatusCode::OK, axum::Json(result)).into_response()
}

fn bad_request(message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn resolve_template(
    requested: Option<&str>,
    fallback: VaccineProofTemplate,
) -> Result<VaccineProofTemplate, String> {
    match requested {
        Some(raw) if !raw.trim().is_empty() => raw.parse(),
        _ => Ok(fallback),
    }
}

pub(crate) async fn vaccine_status_handler<S, P>(
    State(service): State<Arc<VaccineProofOrchestrator<S, P>>>,
    Path(hdid): Path<String>,
) -> Response
where
    S: VaccineStatusGateway + 'static,
    P: VaccineProofGateway + 'static,
{
    let query = VaccineStatusQuery::by_hdid(hdid, false);
    envelope(service.resolver().get_vaccine_status(&query).await)
}

pub(crate) async fn public_vaccine_status_handler<S, P>(
    State(service): State<Arc<VaccineProofOrchestrator<S, P>>>,
    axum::Json(request): axum::Json<PublicLookupRequest>,
) -> Response
where
    S: VaccineStatusGateway + 'static,
    P: VaccineProofGateway + 'static,
{
    envelope(
        service
            .resolver()
            .get_public_vaccine_status(&request.personal_health_number, &request.date_of_birth)
            .await,
    )
}

pub(crate) async fn vaccine_proof_handler<S, P>(
    State(service): State<Arc<VaccineProofOrchestrator<S, P>>>,
    Path(hdid): Path<String>,
    Query(params): Query<ProofParams>,
) -> Response
where
    S: VaccineStatusGateway + 'static,
    P: VaccineProofGateway + 'static,
{
    let template = match resolve_template(params.template.as_deref(), service.default_template())
    {
        Ok(template) => template,
        Err(message) => return bad_request(message),
    };

    let query = VaccineStatusQuery::by_hdid(hdid, template == VaccineProofTemplate::Federal);
    envelope(service.get_vaccine_proof(&query, template).await)
}

pub(crate) async fn public_vaccine_proof_handler<S, P>(
    State(service): State<Arc<VaccineProofOrchestrator<S, P>>>,
    axum::Json(request): axum::Json<PublicLookupRequest>,
) -> Response
where
    S: VaccineStatusGateway + 'static,
    P: VaccineProofGateway + 'static,
{
    let template = match resolve_template(request.template.as_deref(), service.default_template())
    {
        Ok(template) => template,
        Err(message) => return bad_request(message),
    };

    let include_federal = template == VaccineProofTemplate::Federal;
    match public_query(
        &request.personal_health_number,
        &request.date_of_birth,
        include_federal,
    ) {
        Ok(query) => envelope(service.get_vaccine_proof(&query, template).await),
        Err(error) => envelope(RequestResult::<()>::error(error)),
    }
}

pub(crate) async fn mail_vaccine_card_handler<S, P>(
    State(service): State<Arc<VaccineProofOrchestrator<S, P>>>,
    axum::Json(request): axum::Json<MailVaccineCardRequest>,
) -> Response
where
    S: VaccineStatusGateway + 'static,
    P: VaccineProofGateway + 'static,
{
    match public_query(
        &request.personal_health_number,
        &request.date_of_birth,
        false,
    ) {
        Ok(query) => envelope(
            service
                .mail_vaccine_card(&query, &request.mail_address)
                .await,
        ),
        Err(error) => envelope(RequestResult::<bool>::error(error)),
    }
}
