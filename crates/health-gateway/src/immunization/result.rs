//! Result envelope returned to callers of the immunization services.
//!
//! Failures are reported as data: a [`RequestResult`] carries a status, an
//! optional payload and an optional [`ResultError`] with a service error code
//! or an action the caller is expected to take.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix identifying errors raised by this service in error codes.
const SERVICE_NAME: &str = "Immunization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultType {
    Success,
    Error,
    ActionRequired,
}

/// Follow-up expected from the caller when a result is `ActionRequired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    /// Data is still loading upstream; retry after `retry_in`.
    Refresh,
    /// Identity details did not match the registry; re-enter them.
    DataMismatch,
    /// The record cannot be used for the requested operation.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    CommunicationExternal,
    InvalidState,
}

impl ErrorType {
    pub fn code(self) -> &'static str {
        match self {
            ErrorType::CommunicationExternal => "CE",
            ErrorType::InvalidState => "IS",
        }
    }
}

/// External system an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Phsa,
    Bcmp,
}

impl ServiceType {
    pub fn code(self) -> &'static str {
        match self {
            ServiceType::Phsa => "PHSA",
            ServiceType::Bcmp => "BCMP",
        }
    }
}

/// Error code for a failure involving another service, e.g. `ImmunizationServer-CE-BCMP`.
pub fn service_error_code(error: ErrorType, service: ServiceType) -> String {
    format!("{SERVICE_NAME}Server-{}-{}", error.code(), service.code())
}

/// Error code for a failure raised inside this service.
pub fn internal_error_code(error: ErrorType) -> String {
    format!("{SERVICE_NAME}Server-{}", error.code())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultError {
    pub result_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_code: Option<ActionType>,
}

impl ResultError {
    pub fn service(message: impl Into<String>, error: ErrorType, service: ServiceType) -> Self {
        Self {
            result_message: message.into(),
            error_code: Some(service_error_code(error, service)),
            action_code: None,
        }
    }

    pub fn internal(message: impl Into<String>, error: ErrorType) -> Self {
        Self {
            result_message: message.into(),
            error_code: Some(internal_error_code(error)),
            action_code: None,
        }
    }

    pub fn action_required(message: impl Into<String>, action: ActionType) -> Self {
        Self {
            result_message: message.into(),
            error_code: None,
            action_code: Some(action),
        }
    }
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_code {
            Some(code) => write!(f, "{} ({code})", self.result_message),
            None => write!(f, "{}", self.result_message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResult<T> {
    pub result_status: ResultType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_payload: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_error: Option<ResultError>,
}

impl<T> RequestResult<T> {
    pub fn success(payload: T) -> Self {
        Self {
            result_status: ResultType::Success,
            resource_payload: Some(payload),
            result_error: None,
        }
    }

    pub fn error(error: ResultError) -> Self {
        Self {
            result_status: ResultType::Error,
            resource_payload: None,
            result_error: Some(error),
        }
    }

    pub fn action_required(error: ResultError, payload: Option<T>) -> Self {
        Self {
            result_status: ResultType::ActionRequired,
            resource_payload: payload,
            result_error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_status == ResultType::Success
    }

    pub fn action_code(&self) -> Option<ActionType> {
        self.result_error.as_ref().and_then(|error| error.action_code)
    }
}
