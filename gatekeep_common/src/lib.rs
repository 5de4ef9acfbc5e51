//! Gatekeep Common - Shared types for the input trust pipeline
//!
//! This crate contains the request and outcome types exchanged between the
//! validation engine and the request-handling layer that calls it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Serialization errors
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Failed to serialize outcome: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to deserialize outcome: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("Unknown purpose: {0}")]
    UnknownPurpose(String),
}

/// Broad family a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    ContentQuality,
    Security,
    IdentityTrust,
    Rate,
    Format,
    Internal,
}

/// Stable machine-readable rejection code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    // Content quality
    ProfaneContent,
    SpamContent,
    SuspiciousPattern,
    TooManyUrls,
    HtmlNotAllowed,
    LowQualityContent,

    // Security
    XssSuspected,
    SqlInjectionSuspected,
    MaliciousCharacters,

    // Identity trust
    DisposableEmail,
    PossibleTypo,
    NoMailExchanger,
    InvalidDomainFormat,
    PersonalEmailDomain,
    NotInstitutionalDomain,
    MissingClientIdentity,
    AutomatedClientSuspected,
    NonBrowserClient,
    FakeClientIdentity,

    // Rate
    RateLimited,
    SuspiciousSubmissionPattern,

    // Format
    MalformedEmail,
    TooShort,
    TooLong,
    RepeatedDigit,
    TestOrFakeNumber,
    SequentialDigits,
    EmergencyNumber,
    UnrecognizedFormat,

    /// Something inside the pipeline broke; the input is rejected conservatively
    InternalError,
}

impl FailureCode {
    /// Get the wire representation (e.g. "disposable_email")
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::ProfaneContent => "profane_content",
            FailureCode::SpamContent => "spam_content",
            FailureCode::SuspiciousPattern => "suspicious_pattern",
            FailureCode::TooManyUrls => "too_many_urls",
            FailureCode::HtmlNotAllowed => "html_not_allowed",
            FailureCode::LowQualityContent => "low_quality_content",
            FailureCode::XssSuspected => "xss_suspected",
            FailureCode::SqlInjectionSuspected => "sql_injection_suspected",
            FailureCode::MaliciousCharacters => "malicious_characters",
            FailureCode::DisposableEmail => "disposable_email",
            FailureCode::PossibleTypo => "possible_typo",
            FailureCode::NoMailExchanger => "no_mail_exchanger",
            FailureCode::InvalidDomainFormat => "invalid_domain_format",
            FailureCode::PersonalEmailDomain => "personal_email_domain",
            FailureCode::NotInstitutionalDomain => "not_institutional_domain",
            FailureCode::MissingClientIdentity => "missing_client_identity",
            FailureCode::AutomatedClientSuspected => "automated_client_suspected",
            FailureCode::NonBrowserClient => "non_browser_client",
            FailureCode::FakeClientIdentity => "fake_client_identity",
            FailureCode::RateLimited => "rate_limited",
            FailureCode::SuspiciousSubmissionPattern => "suspicious_submission_pattern",
            FailureCode::MalformedEmail => "malformed_email",
            FailureCode::TooShort => "too_short",
            FailureCode::TooLong => "too_long",
            FailureCode::RepeatedDigit => "repeated_digit",
            FailureCode::TestOrFakeNumber => "test_or_fake_number",
            FailureCode::SequentialDigits => "sequential_digits",
            FailureCode::EmergencyNumber => "emergency_number",
            FailureCode::UnrecognizedFormat => "unrecognized_format",
            FailureCode::InternalError => "internal_error",
        }
    }

    /// Failure family, used by callers deciding between reject and moderation
    pub fn category(&self) -> FailureCategory {
        use FailureCode::*;
        match self {
            ProfaneContent | SpamContent | SuspiciousPattern | TooManyUrls | HtmlNotAllowed
            | LowQualityContent => FailureCategory::ContentQuality,
            XssSuspected | SqlInjectionSuspected | MaliciousCharacters => FailureCategory::Security,
            DisposableEmail | PossibleTypo | NoMailExchanger | InvalidDomainFormat
            | PersonalEmailDomain | NotInstitutionalDomain | MissingClientIdentity
            | AutomatedClientSuspected | NonBrowserClient | FakeClientIdentity => {
                FailureCategory::IdentityTrust
            }
            RateLimited | SuspiciousSubmissionPattern => FailureCategory::Rate,
            MalformedEmail | TooShort | TooLong | RepeatedDigit | TestOrFakeNumber
            | SequentialDigits | EmergencyNumber | UnrecognizedFormat => FailureCategory::Format,
            InternalError => FailureCategory::Internal,
        }
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running a value through one or more validators
///
/// Either `accepted` is true and `code` is `None`, or `accepted` is false and
/// `code` names the first check that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    accepted: bool,
    code: Option<FailureCode>,
    message: String,
    suggestion: Option<String>,
}

impl ValidationOutcome {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            code: None,
            message: String::new(),
            suggestion: None,
        }
    }

    pub fn reject(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            code: Some(code),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Reject with a corrected value the caller can offer back to the user
    pub fn reject_with_suggestion(
        code: FailureCode,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            accepted: false,
            code: Some(code),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Generic conservative rejection for failures inside the pipeline
    pub fn internal_error() -> Self {
        Self::reject(
            FailureCode::InternalError,
            "Unable to validate this value right now",
        )
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn code(&self) -> Option<FailureCode> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Serialize to JSON for the request layer
    pub fn to_json(&self) -> Result<String, CommonError> {
        serde_json::to_string(self).map_err(CommonError::Serialize)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, CommonError> {
        serde_json::from_str(json).map_err(CommonError::Deserialize)
    }
}

/// Kind of field being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Content,
    Email,
    Phone,
    InstitutionalEmail,
    UserAgent,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Content => "content",
            Purpose::Email => "email",
            Purpose::Phone => "phone",
            Purpose::InstitutionalEmail => "institutional_email",
            Purpose::UserAgent => "user_agent",
        }
    }
}

impl std::str::FromStr for Purpose {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(Purpose::Content),
            "email" => Ok(Purpose::Email),
            "phone" => Ok(Purpose::Phone),
            "institutional_email" | "institutional-email" => Ok(Purpose::InstitutionalEmail),
            "user_agent" | "user-agent" => Ok(Purpose::UserAgent),
            other => Err(CommonError::UnknownPurpose(other.to_string())),
        }
    }
}

/// A single value submitted for validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// Form field name the value came from
    pub field: String,

    /// Raw, untrusted value
    pub value: String,

    /// User id or client IP, used for rate limiting
    pub identity: String,

    /// What kind of value this is
    pub purpose: Purpose,

    /// When the submission was received
    pub timestamp: DateTime<Utc>,
}

impl ValidationRequest {
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        identity: impl Into<String>,
        purpose: Purpose,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            identity: identity.into(),
            purpose,
            timestamp: Utc::now(),
        }
    }

    /// Override the receive time (replays, tests)
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
