use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::config::PhsaConfig;

use super::domain::{PhsaResult, VaccineStatusQuery, VaccineStatusResult, VaccineStatusSubject};
use super::gateway::{GatewayError, VaccineStatusGateway};

const SERVICE: &str = "PHSA";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicStatusBody<'a> {
    personal_health_number: &'a str,
    date_of_birth: NaiveDate,
    include_federal_vaccine_proof: bool,
}

/// HTTP client for the PHSA vaccine status endpoints.
#[derive(Debug, Clone)]
pub struct PhsaVaccineStatusClient {
    http: reqwest::Client,
    config: PhsaConfig,
}

impl PhsaVaccineStatusClient {
    pub fn new(config: PhsaConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: PhsaConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }
}

impl VaccineStatusGateway for PhsaVaccineStatusClient {
    #[instrument(skip_all, fields(federal = query.include_federal_vaccine_proof()))]
    async fn get_vaccine_status(
        &self,
        query: &VaccineStatusQuery,
    ) -> Result<PhsaResult<VaccineStatusResult>, GatewayError> {
        let request = match query.subject() {
            VaccineStatusSubject::Hdid(hdid) => {
                let federal = if query.include_federal_vaccine_proof() {
                    "true"
                } else {
                    "false"
                };
                self.http
                    .post(self.url(&self.config.vaccine_status_endpoint))
                    .query(&[("subjectHdid", hdid.as_str()), ("federalPvc", federal)])
            }
            VaccineStatusSubject::Phn {
                personal_health_number,
                date_of_birth,
            } => self
                .http
                .post(self.url(&self.config.public_vaccine_status_endpoint))
                .json(&PublicStatusBody {
                    personal_health_number,
                    date_of_birth: *date_of_birth,
                    include_federal_vaccine_proof: query.include_federal_vaccine_proof(),
                }),
        };

        let request = match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .header(reqwest::header::ACCEPT, mime::APPLICATION_JSON.as_ref())
            .send()
            .await
            .map_err(|source| GatewayError::Transport {
                service: SERVICE,
                source,
            })?;

        match response.status() {
            StatusCode::OK => {
                let payload = response
                    .json::<PhsaResult<VaccineStatusResult>>()
                    .await
                    .map_err(|err| GatewayError::Payload {
                        service: SERVICE,
                        message: err.to_string(),
                    })?;
                if payload.result.is_none() {
                    return Err(GatewayError::Payload {
                        service: SERVICE,
                        message: "vaccine status result missing".to_string(),
                    });
                }
                debug!(
                    refresh_in_progress = payload.load_state.refresh_in_progress,
                    "vaccine status received"
                );
                Ok(payload)
            }
            StatusCode::FORBIDDEN => Err(GatewayError::Rejected {
                service: SERVICE,
                message: "DID claim is missing or cannot resolve PHN".to_string(),
            }),
            status => {
                error!(%status, "unable to reach vaccine status endpoint");
                Err(GatewayError::Status {
                    service: SERVICE,
                    status: status.as_u16(),
                })
            }
        }
    }
}
