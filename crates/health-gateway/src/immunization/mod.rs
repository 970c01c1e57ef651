//! Vaccine status resolution and proof of vaccination retrieval.
//!
//! [`VaccineStatusResolver`] reads the PHSA registry, [`VaccineProofOrchestrator`]
//! turns an eligible status into a document by submitting a BC Mail Plus job
//! and polling it under a [`BoundedRetry`] budget. Outcomes are reported as
//! [`RequestResult`] envelopes rather than Rust errors.

pub mod bcmailplus;
pub mod domain;
pub mod gateway;
pub mod phsa;
pub mod proof;
pub mod result;
pub mod retry;
pub mod router;
pub mod status;
pub mod validation;

#[cfg(test)]
mod tests;

pub use bcmailplus::BcMailPlusClient;
pub use domain::{
    Address, EncodedMedia, LoadState, PhsaResult, ReportModel, VaccinationStatus,
    VaccineProofDocument, VaccineProofRequest, VaccineProofRequestStatus, VaccineProofResponse,
    VaccineProofTemplate, VaccineState, VaccineStatus, VaccineStatusQuery, VaccineStatusResult,
    VaccineStatusSubject, VACCINE_PROOF_FILE_NAME,
};
pub use gateway::{GatewayError, VaccineProofGateway, VaccineStatusGateway};
pub use phsa::PhsaVaccineStatusClient;
pub use proof::{ProofStage, VaccineProofOrchestrator};
pub use result::{ActionType, ErrorType, RequestResult, ResultError, ResultType, ServiceType};
pub use retry::{BoundedRetry, FirstAttempt, PollOutcome, PollStep};
pub use router::{immunization_router, MailVaccineCardRequest, PublicLookupRequest};
pub use status::{public_query, VaccineStatusResolver};

use std::sync::Arc;

use crate::config::AppConfig;

/// Orchestrator wired to the live PHSA and BC Mail Plus clients.
pub type LiveOrchestrator = VaccineProofOrchestrator<PhsaVaccineStatusClient, BcMailPlusClient>;

/// Build the orchestrator and its clients from loaded configuration.
pub fn build_orchestrator(config: &AppConfig) -> LiveOrchestrator {
    let http = reqwest::Client::new();
    let registry = Arc::new(PhsaVaccineStatusClient::with_client(
        http.clone(),
        config.phsa.clone(),
    ));
    let resolver = Arc::new(VaccineStatusResolver::new(registry, &config.phsa));
    let proofs = Arc::new(BcMailPlusClient::with_client(http, &config.bc_mail_plus));
    VaccineProofOrchestrator::new(
        resolver,
        proofs,
        &config.bc_mail_plus,
        &config.vaccine_card,
    )
}
