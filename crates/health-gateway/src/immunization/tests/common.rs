use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::{BcMailPlusConfig, PhsaConfig, VaccineCardConfig};
use crate::immunization::domain::{
    Address, EncodedMedia, LoadState, PhsaResult, ReportModel, VaccineProofRequest,
    VaccineProofRequestStatus, VaccineProofResponse, VaccineProofTemplate, VaccineStatusQuery,
    VaccineStatusResult,
};
use crate::immunization::gateway::{GatewayError, VaccineProofGateway, VaccineStatusGateway};
use crate::immunization::{immunization_router, VaccineProofOrchestrator, VaccineStatusResolver};

pub(super) const HDID: &str = "P6FFO433A5WPMVTGM7T4ZVWBKCSVNAYGTWTU3J2LWMGUMERKI72A";
pub(super) const PHN: &str = "9735353315";
pub(super) const DOB: &str = "1990-04-01";
pub(super) const QR_DATA: &str = "c2hjOi8vNTY3NjI5NTk1MzI2NTQ1OTMwNjcyMDI1";
pub(super) const PDF_DATA: &str = "JVBERi0xLjcKJeLjz9MKMSAwIG9iago=";

/// Canned upstream reply; failures are built fresh on each call.
#[derive(Debug, Clone)]
pub(super) enum Reply<T> {
    Ok(T),
    Status(u16),
    Rejected(&'static str),
}

impl<T> Reply<T> {
    fn into_result(self, service: &'static str) -> Result<T, GatewayError> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Status(status) => Err(GatewayError::Status { service, status }),
            Reply::Rejected(message) => Err(GatewayError::Rejected {
                service,
                message: message.to_string(),
            }),
        }
    }
}

/// Replies handed out in order; the last one repeats once the queue drains.
#[derive(Debug)]
pub(super) struct Script<T> {
    replies: Mutex<VecDeque<Reply<T>>>,
}

impl<T: Clone> Script<T> {
    pub(super) fn new(replies: impl IntoIterator<Item = Reply<T>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    pub(super) fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn next(&self, service: &'static str) -> Result<T, GatewayError> {
        let mut guard = self.replies.lock().expect("script mutex poisoned");
        let reply = if guard.len() > 1 {
            guard.pop_front()
        } else {
            guard.front().cloned()
        };
        reply
            .unwrap_or_else(|| panic!("no reply scripted for {service}"))
            .into_result(service)
    }
}

pub(super) struct FakeRegistry {
    script: Script<PhsaResult<VaccineStatusResult>>,
    queries: Mutex<Vec<VaccineStatusQuery>>,
}

impl FakeRegistry {
    pub(super) fn replying(
        replies: impl IntoIterator<Item = Reply<PhsaResult<VaccineStatusResult>>>,
    ) -> Self {
        Self {
            script: Script::new(replies),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn with_status(indicator: &str) -> Self {
        Self::replying([Reply::Ok(loaded(indicator))])
    }

    pub(super) fn queries(&self) -> Vec<VaccineStatusQuery> {
        self.queries.lock().expect("query mutex poisoned").clone()
    }
}

impl VaccineStatusGateway for FakeRegistry {
    async fn get_vaccine_status(
        &self,
        query: &VaccineStatusQuery,
    ) -> Result<PhsaResult<VaccineStatusResult>, GatewayError> {
        self.queries
            .lock()
            .expect("query mutex poisoned")
            .push(query.clone());
        self.script.next("PHSA")
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct ProofCalls {
    pub(super) generate: u32,
    pub(super) mail: u32,
    pub(super) job_status: u32,
    pub(super) fetch_asset: u32,
}

pub(super) struct FakeProofService {
    pub(super) generate: Script<VaccineProofResponse>,
    pub(super) mail: Script<VaccineProofResponse>,
    pub(super) statuses: Script<VaccineProofResponse>,
    pub(super) asset: Script<ReportModel>,
    calls: Mutex<ProofCalls>,
    requests: Mutex<Vec<(VaccineProofTemplate, VaccineProofRequest)>>,
    addresses: Mutex<Vec<Address>>,
}

impl Default for FakeProofService {
    fn default() -> Self {
        Self {
            generate: Script::empty(),
            mail: Script::empty(),
            statuses: Script::empty(),
            asset: Script::empty(),
            calls: Mutex::new(ProofCalls::default()),
            requests: Mutex::new(Vec::new()),
            addresses: Mutex::new(Vec::new()),
        }
    }
}

impl FakeProofService {
    /// Job `id` starts, reports `statuses` in turn, then serves [`PDF_DATA`].
    pub(super) fn job(id: &str, statuses: &[VaccineProofRequestStatus]) -> Self {
        Self {
            generate: Script::new([Reply::Ok(job(id, VaccineProofRequestStatus::Started))]),
            statuses: Script::new(statuses.iter().map(|status| Reply::Ok(job(id, *status)))),
            asset: Script::new([Reply::Ok(ReportModel::pdf("VaccineProof.pdf", PDF_DATA))]),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> ProofCalls {
        *self.calls.lock().expect("calls mutex poisoned")
    }

    pub(super) fn requests(&self) -> Vec<(VaccineProofTemplate, VaccineProofRequest)> {
        self.requests.lock().expect("request mutex poisoned").clone()
    }

    pub(super) fn addresses(&self) -> Vec<Address> {
        self.addresses.lock().expect("address mutex poisoned").clone()
    }

    fn record(&self, bump: impl FnOnce(&mut ProofCalls)) {
        bump(&mut self.calls.lock().expect("calls mutex poisoned"));
    }
}

impl VaccineProofGateway for FakeProofService {
    async fn generate(
        &self,
        template: VaccineProofTemplate,
        request: &VaccineProofRequest,
    ) -> Result<VaccineProofResponse, GatewayError> {
        self.record(|calls| calls.generate += 1);
        self.requests
            .lock()
            .expect("request mutex poisoned")
            .push((template, request.clone()));
        self.generate.next("BC Mail Plus")
    }

    async fn mail(
        &self,
        template: VaccineProofTemplate,
        request: &VaccineProofRequest,
        address: &Address,
    ) -> Result<VaccineProofResponse, GatewayError> {
        self.record(|calls| calls.mail += 1);
        self.requests
            .lock()
            .expect("request mutex poisoned")
            .push((template, request.clone()));
        self.addresses
            .lock()
            .expect("address mutex poisoned")
            .push(address.clone());
        self.mail.next("BC Mail Plus")
    }

    async fn job_status(
        &self,
        _job: &VaccineProofResponse,
    ) -> Result<VaccineProofResponse, GatewayError> {
        self.record(|calls| calls.job_status += 1);
        self.statuses.next("BC Mail Plus")
    }

    async fn fetch_asset(&self, _job: &VaccineProofResponse) -> Result<ReportModel, GatewayError> {
        self.record(|calls| calls.fetch_asset += 1);
        self.asset.next("BC Mail Plus")
    }
}

pub(super) fn qr_code() -> EncodedMedia {
    EncodedMedia {
        media_type: "image/png".to_string(),
        encoding: "base64".to_string(),
        data: QR_DATA.to_string(),
    }
}

pub(super) fn status_result(indicator: &str) -> VaccineStatusResult {
    VaccineStatusResult {
        status_indicator: indicator.to_string(),
        first_name: Some("Bonnie".to_string()),
        last_name: Some("Henry".to_string()),
        birthdate: chrono::NaiveDate::from_ymd_opt(1990, 4, 1),
        dose_count: 2,
        qr_code: Some(qr_code()),
        federal_vaccine_proof: None,
    }
}

pub(super) fn loaded(indicator: &str) -> PhsaResult<VaccineStatusResult> {
    PhsaResult {
        load_state: LoadState {
            refresh_in_progress: false,
            backoff_milliseconds: 0,
        },
        result: Some(status_result(indicator)),
    }
}

pub(super) fn refreshing(backoff_milliseconds: u64) -> PhsaResult<VaccineStatusResult> {
    PhsaResult {
        load_state: LoadState {
            refresh_in_progress: true,
            backoff_milliseconds,
        },
        result: Some(status_result("NotFound")),
    }
}

pub(super) fn job(id: &str, status: VaccineProofRequestStatus) -> VaccineProofResponse {
    VaccineProofResponse {
        id: id.to_string(),
        status,
        asset_uri: Some(format!("https://bcmp.test/JSON/asset:{id}")),
        error_message: None,
    }
}

pub(super) fn address() -> Address {
    Address {
        street_lines: vec!["1025 Sutlej St".to_string(), "Suite 200".to_string()],
        city: "Victoria".to_string(),
        state: "BC".to_string(),
        postal_code: "V8V 2V8".to_string(),
        country: "CA".to_string(),
    }
}

pub(super) fn phsa_config() -> PhsaConfig {
    PhsaConfig {
        base_url: "http://phsa.test".to_string(),
        vaccine_status_endpoint: "/api/v1/Immunizations/VaccineStatus".to_string(),
        public_vaccine_status_endpoint: "/api/v1/Public/Immunizations/VaccineStatus".to_string(),
        access_token: None,
        backoff_milliseconds: 500,
        max_retries: 3,
    }
}

pub(super) fn bcmp_config() -> BcMailPlusConfig {
    BcMailPlusConfig {
        endpoint: "https://${HOST}/${ENV}/auth=${TOKEN}/JSON/".to_string(),
        host: "bcmp.test".to_string(),
        job_environment: "test".to_string(),
        auth_token: "token".to_string(),
        job_class: "HLTH-SHC".to_string(),
        schema_version: "HG02".to_string(),
        backoff_milliseconds: 1000,
        max_retries: 3,
    }
}

pub(super) fn resolver(registry: Arc<FakeRegistry>) -> VaccineStatusResolver<FakeRegistry> {
    VaccineStatusResolver::new(registry, &phsa_config())
}

pub(super) fn build_orchestrator(
    registry: Arc<FakeRegistry>,
    proofs: Arc<FakeProofService>,
) -> VaccineProofOrchestrator<FakeRegistry, FakeProofService> {
    VaccineProofOrchestrator::new(
        Arc::new(resolver(registry)),
        proofs,
        &bcmp_config(),
        &VaccineCardConfig::default(),
    )
}

pub(super) fn router_with(registry: FakeRegistry, proofs: FakeProofService) -> axum::Router {
    immunization_router(Arc::new(build_orchestrator(
        Arc::new(registry),
        Arc::new(proofs),
    )))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
