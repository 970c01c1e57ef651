use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::PhsaConfig;

use super::domain::{
    PhsaResult, VaccineState, VaccineStatus, VaccineStatusQuery, VaccineStatusResult,
};
use super::gateway::{GatewayError, VaccineStatusGateway};
use super::result::{ActionType, ErrorType, RequestResult, ResultError, ServiceType};
use super::retry::{BoundedRetry, FirstAttempt, PollOutcome, PollStep};
use super::validation::{is_valid_phn, parse_date_of_birth};

pub(crate) const REFRESH_IN_PROGRESS: &str = "Refresh in progress";
pub(crate) const DATA_MISMATCH: &str =
    "The information you entered does not match our records. Please try again.";

/// Resolves a subject's vaccination state from the registry.
///
/// Stateless between calls: two identical queries against an unchanged
/// registry yield the same classification.
pub struct VaccineStatusResolver<G> {
    gateway: Arc<G>,
    minimum_backoff: Duration,
    refresh_retry: BoundedRetry,
}

impl<G> VaccineStatusResolver<G>
where
    G: VaccineStatusGateway + 'static,
{
    pub fn new(gateway: Arc<G>, config: &PhsaConfig) -> Self {
        // One initial query plus `max_retries` re-queries.
        let refresh_retry =
            BoundedRetry::new(config.backoff(), config.max_retries.saturating_add(1))
                .first_attempt(FirstAttempt::Immediate);
        Self {
            gateway,
            minimum_backoff: config.backoff(),
            refresh_retry,
        }
    }

    /// Look up a status once, reporting a pending registry refresh to the caller.
    pub async fn get_vaccine_status(
        &self,
        query: &VaccineStatusQuery,
    ) -> RequestResult<VaccineStatus> {
        match self.gateway.get_vaccine_status(query).await {
            Ok(phsa) => self.classify(query, phsa),
            Err(err) => self.gateway_failure(err),
        }
    }

    /// Public lookup by PHN and `yyyy-MM-dd` birth date.
    pub async fn get_public_vaccine_status(
        &self,
        phn: &str,
        date_of_birth: &str,
    ) -> RequestResult<VaccineStatus> {
        match public_query(phn, date_of_birth, false) {
            Ok(query) => self.get_vaccine_status(&query).await,
            Err(error) => RequestResult::error(error),
        }
    }

    /// Look up a status, waiting out a registry refresh for a bounded number of attempts.
    pub async fn get_vaccine_status_with_retries(
        &self,
        query: &VaccineStatusQuery,
    ) -> RequestResult<VaccineStatus> {
        let gateway = &*self.gateway;
        let outcome = self
            .refresh_retry
            .poll(
                move || gateway.get_vaccine_status(query),
                |response| match response {
                    Ok(phsa) if phsa.load_state.refresh_in_progress => PollStep::Pending {
                        backoff_hint: Some(Duration::from_millis(
                            phsa.load_state.backoff_milliseconds,
                        )),
                    },
                    _ => PollStep::Ready,
                },
            )
            .await;

        match outcome {
            PollOutcome::Ready {
                value: Ok(phsa),
                attempts,
            } => {
                debug!(attempts, "vaccine status loaded");
                self.classify(query, phsa)
            }
            PollOutcome::Ready { value: Err(err), .. } => self.gateway_failure(err),
            PollOutcome::Exhausted { attempts, .. } | PollOutcome::Cancelled { attempts } => {
                info!(attempts, "maximum vaccine status refresh attempts reached");
                RequestResult::error(ResultError::service(
                    REFRESH_IN_PROGRESS,
                    ErrorType::CommunicationExternal,
                    ServiceType::Phsa,
                ))
            }
        }
    }

    fn gateway_failure(&self, err: GatewayError) -> RequestResult<VaccineStatus> {
        warn!(error = %err, "vaccine status lookup failed");
        RequestResult::error(err.to_result_error(ServiceType::Phsa))
    }

    fn classify(
        &self,
        query: &VaccineStatusQuery,
        phsa: PhsaResult<VaccineStatusResult>,
    ) -> RequestResult<VaccineStatus> {
        let loaded = !phsa.load_state.refresh_in_progress;
        let retry_in = phsa
            .load_state
            .backoff_milliseconds
            .max(self.minimum_backoff.as_millis() as u64);

        let mut status = match phsa.result {
            Some(result) => status_from_result(query, result),
            None => VaccineStatus::not_found(),
        };
        status.loaded = loaded;
        status.retry_in = retry_in;

        if status.state == VaccineState::DataMismatch {
            status = VaccineStatus {
                loaded,
                retry_in,
                state: VaccineState::DataMismatch,
                ..VaccineStatus::not_found()
            };
        }

        if !loaded {
            debug!(retry_in, "vaccine status refresh in progress");
            return RequestResult::action_required(
                ResultError::action_required(REFRESH_IN_PROGRESS, ActionType::Refresh),
                Some(status),
            );
        }

        if status.state == VaccineState::DataMismatch {
            return RequestResult::action_required(
                ResultError::action_required(DATA_MISMATCH, ActionType::DataMismatch),
                Some(status),
            );
        }

        RequestResult::success(status)
    }
}

fn status_from_result(query: &VaccineStatusQuery, result: VaccineStatusResult) -> VaccineStatus {
    let state = match result.status_indicator.parse::<VaccineState>() {
        Ok(state) => state.normalized(),
        Err(err) => {
            warn!(error = %err, "treating unrecognized status indicator as not found");
            VaccineState::NotFound
        }
    };

    if state == VaccineState::NotFound {
        return VaccineStatus::not_found();
    }

    VaccineStatus {
        loaded: true,
        retry_in: 0,
        state,
        personal_health_number: query.personal_health_number().map(str::to_string),
        first_name: result.first_name,
        last_name: result.last_name,
        birthdate: result.birthdate,
        doses: result.dose_count,
        qr_code: result.qr_code,
        federal_vaccine_proof: result.federal_vaccine_proof,
    }
}

/// Validate public lookup input, building the PHN query it describes.
pub fn public_query(
    phn: &str,
    date_of_birth: &str,
    include_federal_vaccine_proof: bool,
) -> Result<VaccineStatusQuery, ResultError> {
    let Some(date_of_birth) = parse_date_of_birth(date_of_birth) else {
        return Err(ResultError::internal(
            "Error parsing date of birth",
            ErrorType::InvalidState,
        ));
    };

    if !is_valid_phn(phn) {
        return Err(ResultError::internal(
            "Error parsing phn",
            ErrorType::InvalidState,
        ));
    }

    Ok(VaccineStatusQuery::by_phn(phn.trim(), date_of_birth, include_federal_vaccine_proof))
}
