use std::future::Future;

use super::domain::{
    Address, PhsaResult, ReportModel, VaccineProofRequest, VaccineProofResponse,
    VaccineProofTemplate, VaccineStatusQuery, VaccineStatusResult,
};
use super::result::{ErrorType, ResultError, ServiceType};

/// Failure talking to one of the upstream services.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },
    #[error("{service} rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },
    #[error("{service} returned a malformed payload: {message}")]
    Payload {
        service: &'static str,
        message: String,
    },
    /// The requested asset does not exist (yet).
    #[error("{service} has no asset for job {job_id}")]
    AssetUnavailable {
        service: &'static str,
        job_id: String,
    },
}

impl GatewayError {
    /// Translate into the error reported to callers, tagged with the originating service.
    pub fn to_result_error(&self, service: ServiceType) -> ResultError {
        let message = match self {
            GatewayError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ResultError::service(message, ErrorType::CommunicationExternal, service)
    }
}

/// Access to the PHSA vaccine status registry.
pub trait VaccineStatusGateway: Send + Sync {
    fn get_vaccine_status(
        &self,
        query: &VaccineStatusQuery,
    ) -> impl Future<Output = Result<PhsaResult<VaccineStatusResult>, GatewayError>> + Send;
}

/// Access to the external proof-of-vaccination document service.
pub trait VaccineProofGateway: Send + Sync {
    /// Start a job that renders a proof document.
    fn generate(
        &self,
        template: VaccineProofTemplate,
        request: &VaccineProofRequest,
    ) -> impl Future<Output = Result<VaccineProofResponse, GatewayError>> + Send;

    /// Start a job that prints and posts a vaccine card.
    fn mail(
        &self,
        template: VaccineProofTemplate,
        request: &VaccineProofRequest,
        address: &Address,
    ) -> impl Future<Output = Result<VaccineProofResponse, GatewayError>> + Send;

    /// Current state of a previously started job.
    fn job_status(
        &self,
        job: &VaccineProofResponse,
    ) -> impl Future<Output = Result<VaccineProofResponse, GatewayError>> + Send;

    /// Download the document of a completed job.
    fn fetch_asset(
        &self,
        job: &VaccineProofResponse,
    ) -> impl Future<Output = Result<ReportModel, GatewayError>> + Send;
}
