use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{BcMailPlusConfig, VaccineCardConfig};

use super::domain::{
    Address, ReportModel, VaccineProofDocument, VaccineProofRequest, VaccineProofRequestStatus,
    VaccineProofResponse, VaccineProofTemplate, VaccineState, VaccineStatus, VaccineStatusQuery,
    VACCINE_PROOF_FILE_NAME,
};
use super::gateway::{VaccineProofGateway, VaccineStatusGateway};
use super::result::{ActionType, ErrorType, RequestResult, ResultError, ResultType, ServiceType};
use super::retry::{BoundedRetry, PollOutcome, PollStep};
use super::status::VaccineStatusResolver;

pub(crate) const INVALID_STATE: &str = "Vaccine state is invalid to obtain vaccine proof.";
pub(crate) const PROOF_UNAVAILABLE: &str = "Unable to obtain Vaccine Proof PDF";
pub(crate) const PROOF_CANCELLED: &str = "Vaccine proof request was cancelled";
pub(crate) const STATUS_NOT_FOUND: &str = "Vaccine status not found";
const JOB_FAILED: &str = "Vaccine proof generation failed";

/// Lifecycle of one proof request, used to tag log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStage {
    Eligible,
    Submitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl ProofStage {
    pub fn label(self) -> &'static str {
        match self {
            ProofStage::Eligible => "eligible",
            ProofStage::Submitted => "submitted",
            ProofStage::Polling => "polling",
            ProofStage::Completed => "completed",
            ProofStage::Failed => "failed",
            ProofStage::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for ProofStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Service composing the status resolver, the proof service client and the job poller.
pub struct VaccineProofOrchestrator<S, P> {
    resolver: Arc<VaccineStatusResolver<S>>,
    proofs: Arc<P>,
    job_retry: BoundedRetry,
    print_template: VaccineProofTemplate,
    mail_template: VaccineProofTemplate,
}

impl<S, P> VaccineProofOrchestrator<S, P>
where
    S: VaccineStatusGateway + 'static,
    P: VaccineProofGateway + 'static,
{
    pub fn new(
        resolver: Arc<VaccineStatusResolver<S>>,
        proofs: Arc<P>,
        bc_mail_plus: &BcMailPlusConfig,
        vaccine_card: &VaccineCardConfig,
    ) -> Self {
        Self {
            resolver,
            proofs,
            job_retry: BoundedRetry::new(bc_mail_plus.backoff(), bc_mail_plus.max_retries),
            print_template: vaccine_card.print_template,
            mail_template: vaccine_card.mail_template,
        }
    }

    pub fn resolver(&self) -> &VaccineStatusResolver<S> {
        &self.resolver
    }

    /// Template used when the caller does not ask for one.
    pub fn default_template(&self) -> VaccineProofTemplate {
        self.print_template
    }

    /// Resolve status and produce a proof of vaccination document.
    pub async fn get_vaccine_proof(
        &self,
        query: &VaccineStatusQuery,
        template: VaccineProofTemplate,
    ) -> RequestResult<VaccineProofDocument> {
        self.get_vaccine_proof_with_cancellation(query, template, &CancellationToken::new())
            .await
    }

    /// Like [`Self::get_vaccine_proof`], abandoning the job poll once `cancel` fires.
    pub async fn get_vaccine_proof_with_cancellation(
        &self,
        query: &VaccineStatusQuery,
        template: VaccineProofTemplate,
        cancel: &CancellationToken,
    ) -> RequestResult<VaccineProofDocument> {
        let status = match self.eligible_status(query).await {
            Ok(status) => status,
            Err(result) => return result,
        };
        debug!(
            stage = %ProofStage::Eligible,
            state = %status.state,
            ?template,
            "vaccine proof eligible"
        );

        if template == VaccineProofTemplate::Federal {
            if let Some(proof) = status
                .federal_vaccine_proof
                .as_ref()
                .filter(|proof| !proof.data.is_empty())
            {
                info!(stage = %ProofStage::Completed, "returning embedded federal proof");
                return RequestResult::success(VaccineProofDocument {
                    loaded: true,
                    retry_in: 0,
                    document: Some(ReportModel::pdf(VACCINE_PROOF_FILE_NAME, proof.data.clone())),
                    qr_code: status.qr_code,
                });
            }
        }

        let request = proof_request(&status);
        let job = match self.proofs.generate(template, &request).await {
            Ok(job) => job,
            Err(err) => {
                error!(error = %err, "vaccine proof submission failed");
                return RequestResult::error(err.to_result_error(ServiceType::Bcmp));
            }
        };
        info!(
            stage = %ProofStage::Submitted,
            job_id = %job.id,
            status = ?job.status,
            "vaccine proof job submitted"
        );

        let job = match job.status {
            VaccineProofRequestStatus::Completed => job,
            VaccineProofRequestStatus::Failed => return job_failed(&job),
            _ => match self.await_job(job, cancel).await {
                Ok(job) => job,
                Err(result) => return result,
            },
        };

        match self.proofs.fetch_asset(&job).await {
            Ok(document) => {
                info!(stage = %ProofStage::Completed, job_id = %job.id, "vaccine proof retrieved");
                RequestResult::success(VaccineProofDocument {
                    loaded: true,
                    retry_in: 0,
                    document: Some(document),
                    qr_code: status.qr_code,
                })
            }
            Err(err) => {
                error!(job_id = %job.id, error = %err, "vaccine proof asset fetch failed");
                RequestResult::error(err.to_result_error(ServiceType::Bcmp))
            }
        }
    }

    /// Resolve status (waiting out registry refreshes) and mail a printed card to `address`.
    pub async fn mail_vaccine_card(
        &self,
        query: &VaccineStatusQuery,
        address: &Address,
    ) -> RequestResult<bool> {
        let resolved = self.resolver.get_vaccine_status_with_retries(query).await;
        let status = match (resolved.result_status, resolved.resource_payload) {
            (ResultType::Success, Some(status)) if status.state != VaccineState::NotFound => {
                status
            }
            (ResultType::Error, _) => {
                return rejected_mail(resolved.result_error.unwrap_or_else(|| {
                    ResultError::internal(STATUS_NOT_FOUND, ErrorType::InvalidState)
                }))
            }
            _ => {
                info!("no mailable vaccine status for subject");
                return rejected_mail(ResultError::service(
                    STATUS_NOT_FOUND,
                    ErrorType::InvalidState,
                    ServiceType::Phsa,
                ));
            }
        };

        let request = proof_request(&status);
        debug!(vaccination_status = ?request.status, "mailing vaccine card");
        match self
            .proofs
            .mail(self.mail_template, &request, address)
            .await
        {
            Ok(job) if job.status == VaccineProofRequestStatus::Failed => {
                rejected_mail(failed_job_error(&job))
            }
            Ok(job) => {
                info!(job_id = %job.id, "vaccine card mail job submitted");
                RequestResult::success(true)
            }
            Err(err) => {
                error!(error = %err, "vaccine card mail job failed");
                rejected_mail(err.to_result_error(ServiceType::Bcmp))
            }
        }
    }

    async fn eligible_status(
        &self,
        query: &VaccineStatusQuery,
    ) -> Result<VaccineStatus, RequestResult<VaccineProofDocument>> {
        let RequestResult {
            result_status,
            resource_payload,
            result_error,
        } = self.resolver.get_vaccine_status(query).await;

        let status = match (result_status, resource_payload) {
            (ResultType::Success, Some(status)) => status,
            (ResultType::ActionRequired, Some(status)) if !status.loaded => {
                return Err(RequestResult {
                    result_status,
                    resource_payload: Some(VaccineProofDocument::pending(status.retry_in)),
                    result_error,
                })
            }
            (result_status, _) => {
                return Err(RequestResult {
                    result_status,
                    resource_payload: None,
                    result_error,
                })
            }
        };

        if !status.state.is_proof_eligible() {
            info!(state = %status.state, "vaccine state is not eligible for proof");
            return Err(RequestResult::action_required(
                ResultError::action_required(INVALID_STATE, ActionType::Invalid),
                None,
            ));
        }

        Ok(status)
    }

    async fn await_job(
        &self,
        job: VaccineProofResponse,
        cancel: &CancellationToken,
    ) -> Result<VaccineProofResponse, RequestResult<VaccineProofDocument>> {
        debug!(
            stage = %ProofStage::Polling,
            job_id = %job.id,
            max_attempts = self.job_retry.max_attempts(),
            "polling vaccine proof job"
        );

        let proofs = &*self.proofs;
        let submitted = &job;
        let outcome = self
            .job_retry
            .poll_until_cancelled(
                cancel,
                move || proofs.job_status(submitted),
                |response| match response {
                    Ok(current) if current.status == VaccineProofRequestStatus::Started => {
                        PollStep::Pending { backoff_hint: None }
                    }
                    _ => PollStep::Ready,
                },
            )
            .await;

        match outcome {
            PollOutcome::Ready {
                value: Ok(current),
                attempts,
            } => match current.status {
                VaccineProofRequestStatus::Completed => {
                    debug!(job_id = %current.id, attempts, "vaccine proof job completed");
                    Ok(current)
                }
                VaccineProofRequestStatus::Failed => Err(job_failed(&current)),
                _ => {
                    warn!(
                        job_id = %current.id,
                        status = ?current.status,
                        "vaccine proof job in unexpected state"
                    );
                    Err(RequestResult::error(ResultError::service(
                        PROOF_UNAVAILABLE,
                        ErrorType::InvalidState,
                        ServiceType::Bcmp,
                    )))
                }
            },
            PollOutcome::Ready { value: Err(err), .. } => {
                error!(job_id = %job.id, error = %err, "vaccine proof status check failed");
                Err(RequestResult::error(err.to_result_error(ServiceType::Bcmp)))
            }
            PollOutcome::Exhausted { attempts, .. } => {
                warn!(
                    stage = %ProofStage::TimedOut,
                    job_id = %job.id,
                    attempts,
                    "vaccine proof job did not complete"
                );
                Err(RequestResult::error(ResultError::service(
                    PROOF_UNAVAILABLE,
                    ErrorType::InvalidState,
                    ServiceType::Bcmp,
                )))
            }
            PollOutcome::Cancelled { attempts } => {
                info!(job_id = %job.id, attempts, "vaccine proof poll cancelled");
                Err(RequestResult::error(ResultError::internal(
                    PROOF_CANCELLED,
                    ErrorType::InvalidState,
                )))
            }
        }
    }
}

fn proof_request(status: &VaccineStatus) -> VaccineProofRequest {
    VaccineProofRequest {
        status: status.state.vaccination_status(),
        smart_health_card_qr: status
            .qr_code
            .as_ref()
            .map(|qr| qr.data.clone())
            .unwrap_or_default(),
    }
}

fn failed_job_error(job: &VaccineProofResponse) -> ResultError {
    let message = job
        .error_message
        .clone()
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| JOB_FAILED.to_string());
    warn!(stage = %ProofStage::Failed, job_id = %job.id, %message, "proof service job failed");
    ResultError::service(
        message,
        ErrorType::CommunicationExternal,
        ServiceType::Bcmp,
    )
}

fn job_failed(job: &VaccineProofResponse) -> RequestResult<VaccineProofDocument> {
    RequestResult::error(failed_job_error(job))
}

fn rejected_mail(error: ResultError) -> RequestResult<bool> {
    RequestResult {
        result_status: ResultType::Error,
        resource_payload: Some(false),
        result_error: Some(error),
    }
}
