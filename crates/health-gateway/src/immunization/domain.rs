use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Vaccination state as reported by the PHSA registry's status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaccineState {
    NotFound,
    PartialDosesReceived,
    AllDosesReceived,
    DataMismatch,
    Exempt,
    Threshold,
    Blocked,
}

impl VaccineState {
    /// Collapse states that must not be disclosed to the caller.
    ///
    /// `Threshold` and `Blocked` are reported as `NotFound`; `DataMismatch`
    /// stays distinct so the caller can ask for identity details again.
    pub fn normalized(self) -> Self {
        match self {
            VaccineState::Threshold | VaccineState::Blocked => VaccineState::NotFound,
            other => other,
        }
    }

    /// Classification sent to the proof service for this state.
    pub fn vaccination_status(self) -> VaccinationStatus {
        match self {
            VaccineState::AllDosesReceived => VaccinationStatus::Fully,
            VaccineState::PartialDosesReceived => VaccinationStatus::Partially,
            VaccineState::Exempt => VaccinationStatus::Exempt,
            _ => VaccinationStatus::Unknown,
        }
    }

    /// Whether a proof of vaccination may be generated for this state.
    pub fn is_proof_eligible(self) -> bool {
        matches!(
            self,
            VaccineState::AllDosesReceived | VaccineState::PartialDosesReceived
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            VaccineState::NotFound => "NotFound",
            VaccineState::PartialDosesReceived => "PartialDosesReceived",
            VaccineState::AllDosesReceived => "AllDosesReceived",
            VaccineState::DataMismatch => "DataMismatch",
            VaccineState::Exempt => "Exempt",
            VaccineState::Threshold => "Threshold",
            VaccineState::Blocked => "Blocked",
        }
    }
}

impl fmt::Display for VaccineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized vaccine status indicator '{0}'")]
pub struct UnknownStatusIndicator(pub String);

impl FromStr for VaccineState {
    type Err = UnknownStatusIndicator;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "NotFound" => Ok(VaccineState::NotFound),
            "PartialDosesReceived" => Ok(VaccineState::PartialDosesReceived),
            "AllDosesReceived" => Ok(VaccineState::AllDosesReceived),
            "DataMismatch" => Ok(VaccineState::DataMismatch),
            "Exempt" => Ok(VaccineState::Exempt),
            "Threshold" => Ok(VaccineState::Threshold),
            "Blocked" => Ok(VaccineState::Blocked),
            other => Err(UnknownStatusIndicator(other.to_string())),
        }
    }
}

/// Vaccination classification understood by BC Mail Plus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaccinationStatus {
    Unknown,
    Fully,
    Partially,
    Exempt,
}

/// Document layout requested from the proof service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaccineProofTemplate {
    Provincial,
    Federal,
}

impl FromStr for VaccineProofTemplate {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "provincial" => Ok(VaccineProofTemplate::Provincial),
            "federal" => Ok(VaccineProofTemplate::Federal),
            other => Err(format!("unknown vaccine proof template '{other}'")),
        }
    }
}

/// Who a vaccine status lookup is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaccineStatusSubject {
    /// Authenticated lookup by the portal's internal user identifier.
    Hdid(String),
    /// Public lookup by personal health number and birth date.
    Phn {
        personal_health_number: String,
        date_of_birth: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccineStatusQuery {
    subject: VaccineStatusSubject,
    include_federal_vaccine_proof: bool,
}

impl VaccineStatusQuery {
    pub fn by_hdid(hdid: impl Into<String>, include_federal_vaccine_proof: bool) -> Self {
        Self {
            subject: VaccineStatusSubject::Hdid(hdid.into()),
            include_federal_vaccine_proof,
        }
    }

    pub fn by_phn(
        personal_health_number: impl Into<String>,
        date_of_birth: NaiveDate,
        include_federal_vaccine_proof: bool,
    ) -> Self {
        Self {
            subject: VaccineStatusSubject::Phn {
                personal_health_number: personal_health_number.into(),
                date_of_birth,
            },
            include_federal_vaccine_proof,
        }
    }

    pub fn subject(&self) -> &VaccineStatusSubject {
        &self.subject
    }

    pub fn include_federal_vaccine_proof(&self) -> bool {
        self.include_federal_vaccine_proof
    }

    pub fn personal_health_number(&self) -> Option<&str> {
        match &self.subject {
            VaccineStatusSubject::Phn {
                personal_health_number,
                ..
            } => Some(personal_health_number),
            VaccineStatusSubject::Hdid(_) => None,
        }
    }
}

/// Base64 payload with its media type, e.g. a QR code image or a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedMedia {
    #[serde(default, rename = "type")]
    pub media_type: String,
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub data: String,
}

/// Registry refresh progress attached to every PHSA response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadState {
    #[serde(default)]
    pub refresh_in_progress: bool,
    #[serde(default, rename = "backOffMilliseconds")]
    pub backoff_milliseconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhsaResult<T> {
    #[serde(default)]
    pub load_state: LoadState,
    pub result: Option<T>,
}

/// Vaccine status payload returned by PHSA.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineStatusResult {
    pub status_indicator: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    #[serde(default)]
    pub dose_count: u32,
    #[serde(default, rename = "qrCode")]
    pub qr_code: Option<EncodedMedia>,
    #[serde(default)]
    pub federal_vaccine_proof: Option<EncodedMedia>,
}

/// Caller-facing vaccination status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineStatus {
    pub loaded: bool,
    /// Milliseconds the caller should wait before asking again while not loaded.
    pub retry_in: u64,
    pub state: VaccineState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_health_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<NaiveDate>,
    pub doses: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<EncodedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federal_vaccine_proof: Option<EncodedMedia>,
}

impl VaccineStatus {
    pub fn not_found() -> Self {
        Self {
            loaded: true,
            retry_in: 0,
            state: VaccineState::NotFound,
            personal_health_number: None,
            first_name: None,
            last_name: None,
            birthdate: None,
            doses: 0,
            qr_code: None,
            federal_vaccine_proof: None,
        }
    }
}

/// Body of a proof generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineProofRequest {
    pub status: VaccinationStatus,
    pub smart_health_card_qr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaccineProofRequestStatus {
    Unknown,
    Started,
    Completed,
    Failed,
}

/// State of one proof generation job.
///
/// `id` identifies the job for its whole lifetime and is never shared with
/// another generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineProofResponse {
    pub id: String,
    pub status: VaccineProofRequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// File name given to generated proof documents.
pub const VACCINE_PROOF_FILE_NAME: &str = "VaccineProof.pdf";

/// Finished document handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportModel {
    pub file_name: String,
    #[serde(rename = "type")]
    pub media_type: String,
    /// Base64 encoded document bytes.
    pub data: String,
}

impl ReportModel {
    pub fn pdf(file_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: mime::APPLICATION_PDF.to_string(),
            data: data.into(),
        }
    }
}

/// Proof of vaccination returned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineProofDocument {
    pub loaded: bool,
    pub retry_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<ReportModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<EncodedMedia>,
}

impl VaccineProofDocument {
    pub fn pending(retry_in: u64) -> Self {
        Self {
            loaded: false,
            retry_in,
            document: None,
            qr_code: None,
        }
    }
}

/// Postal address a vaccine card is mailed to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street_lines: Vec<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}
