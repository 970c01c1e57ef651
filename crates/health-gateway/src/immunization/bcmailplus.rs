use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::BcMailPlusConfig;

use super::domain::{
    Address, ReportModel, VaccinationStatus, VaccineProofRequest, VaccineProofRequestStatus,
    VaccineProofResponse, VaccineProofTemplate, VACCINE_PROOF_FILE_NAME,
};
use super::gateway::{GatewayError, VaccineProofGateway};

const SERVICE: &str = "BC Mail Plus";
const ERROR_PREFIX: &str = "ERROR: ";

#[derive(Debug, Clone, Copy, Serialize)]
enum BcmpOperation {
    Generate,
    Mail,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BcmpSmartHealthCard<'a> {
    qr_code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BcmpAddress {
    address_line1: String,
    address_line2: String,
    city: String,
    province: String,
    postal_code: String,
    country: String,
}

impl From<&Address> for BcmpAddress {
    fn from(address: &Address) -> Self {
        let mut lines = address.street_lines.iter();
        let first = lines.next().cloned().unwrap_or_default();
        let rest: Vec<&str> = lines.map(String::as_str).collect();
        Self {
            address_line1: first,
            address_line2: rest.join("\n"),
            city: address.city.clone(),
            province: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BcmpVaccineProofQuery<'a> {
    schema_version: &'a str,
    operation: BcmpOperation,
    templates: Vec<VaccineProofTemplate>,
    vaccine_status: VaccinationStatus,
    smart_health_card: BcmpSmartHealthCard<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<BcmpAddress>,
}

#[derive(Debug, Deserialize)]
enum BcmpJobStatus {
    Started,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BcmpJobProperties {
    #[serde(default)]
    asset_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BcmpJobStatusResult {
    job_id: String,
    job_status: BcmpJobStatus,
    #[serde(default)]
    job_properties: BcmpJobProperties,
    #[serde(default)]
    error_message: Option<String>,
}

impl From<BcmpJobStatusResult> for VaccineProofResponse {
    fn from(result: BcmpJobStatusResult) -> Self {
        let status = match result.job_status {
            BcmpJobStatus::Started => VaccineProofRequestStatus::Started,
            BcmpJobStatus::Completed => VaccineProofRequestStatus::Completed,
            BcmpJobStatus::Failed => VaccineProofRequestStatus::Failed,
            BcmpJobStatus::Unknown => VaccineProofRequestStatus::Unknown,
        };
        VaccineProofResponse {
            id: result.job_id,
            status,
            asset_uri: result.job_properties.asset_uri,
            error_message: result.error_message,
        }
    }
}

/// HTTP client for the BC Mail Plus job API.
#[derive(Debug, Clone)]
pub struct BcMailPlusClient {
    http: reqwest::Client,
    endpoint: String,
    job_class: String,
    schema_version: String,
}

impl BcMailPlusClient {
    pub fn new(config: &BcMailPlusConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: &BcMailPlusConfig) -> Self {
        Self {
            http,
            endpoint: config.resolved_endpoint(),
            job_class: config.job_class.clone(),
            schema_version: config.schema_version.clone(),
        }
    }

    fn create_url(&self) -> String {
        format!("{}create:{}", self.endpoint, self.job_class)
    }

    fn status_url(&self, job_id: &str) -> String {
        format!("{}status:{}", self.endpoint, job_id)
    }

    fn asset_url(&self, job: &VaccineProofResponse) -> String {
        job.asset_uri
            .clone()
            .unwrap_or_else(|| format!("{}asset:{}", self.endpoint, job.id))
    }

    async fn create_job(
        &self,
        operation: BcmpOperation,
        template: VaccineProofTemplate,
        request: &VaccineProofRequest,
        address: Option<&Address>,
    ) -> Result<VaccineProofResponse, GatewayError> {
        let query = BcmpVaccineProofQuery {
            schema_version: &self.schema_version,
            operation,
            templates: vec![template],
            vaccine_status: request.status,
            smart_health_card: BcmpSmartHealthCard {
                qr_code: &request.smart_health_card_qr,
            },
            address: address.map(BcmpAddress::from),
        };

        debug!(?operation, ?template, "submitting BC Mail Plus job");
        let response = self
            .http
            .post(self.create_url())
            .header(reqwest::header::ACCEPT, mime::APPLICATION_JSON.as_ref())
            .json(&query)
            .send()
            .await
            .map_err(transport)?;

        let job = read_job_status(response).await?;
        debug!(job_id = %job.id, status = ?job.status, "BC Mail Plus job accepted");
        Ok(job)
    }
}

fn transport(source: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        service: SERVICE,
        source,
    }
}

async fn read_job_status(
    response: reqwest::Response,
) -> Result<VaccineProofResponse, GatewayError> {
    let status = response.status();
    let payload = response.text().await.map_err(transport)?;

    if status != StatusCode::OK {
        error!(%status, "unable to reach BC Mail Plus endpoint");
        return Err(GatewayError::Status {
            service: SERVICE,
            status: status.as_u16(),
        });
    }

    if let Some(details) = payload.strip_prefix(ERROR_PREFIX) {
        warn!(details, "BC Mail Plus rejected the job");
        return Err(GatewayError::Rejected {
            service: SERVICE,
            message: details.trim().to_string(),
        });
    }

    serde_json::from_str::<BcmpJobStatusResult>(&payload)
        .map(VaccineProofResponse::from)
        .map_err(|err| GatewayError::Payload {
            service: SERVICE,
            message: err.to_string(),
        })
}

impl VaccineProofGateway for BcMailPlusClient {
    async fn generate(
        &self,
        template: VaccineProofTemplate,
        request: &VaccineProofRequest,
    ) -> Result<VaccineProofResponse, GatewayError> {
        self.create_job(BcmpOperation::Generate, template, request, None)
            .await
    }

    async fn mail(
        &self,
        template: VaccineProofTemplate,
        request: &VaccineProofRequest,
        address: &Address,
    ) -> Result<VaccineProofResponse, GatewayError> {
        self.create_job(BcmpOperation::Mail, template, request, Some(address))
            .await
    }

    async fn job_status(
        &self,
        job: &VaccineProofResponse,
    ) -> Result<VaccineProofResponse, GatewayError> {
        let response = self
            .http
            .get(self.status_url(&job.id))
            .header(reqwest::header::ACCEPT, mime::APPLICATION_JSON.as_ref())
            .send()
            .await
            .map_err(transport)?;

        let mut current = read_job_status(response).await?;
        // Status responses may omit the asset location reported at submission.
        if current.asset_uri.is_none() {
            current.asset_uri = job.asset_uri.clone();
        }
        Ok(current)
    }

    async fn fetch_asset(&self, job: &VaccineProofResponse) -> Result<ReportModel, GatewayError> {
        let response = self
            .http
            .get(self.asset_url(job))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::OK => {
                let bytes = response.bytes().await.map_err(transport)?;
                if bytes.is_empty() {
                    return Err(GatewayError::Payload {
                        service: SERVICE,
                        message: "empty file returned".to_string(),
                    });
                }
                Ok(ReportModel::pdf(VACCINE_PROOF_FILE_NAME, STANDARD.encode(&bytes)))
            }
            StatusCode::NOT_FOUND => Err(GatewayError::AssetUnavailable {
                service: SERVICE,
                job_id: job.id.clone(),
            }),
            status => Err(GatewayError::Status {
                service: SERVICE,
                status: status.as_u16(),
            }),
        }
    }
}
