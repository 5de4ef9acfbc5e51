//! Abuse prevention validators
//!
//! Provides protection against:
//! - Spam, profanity and injection payloads in free text
//! - Disposable, misspelled and undeliverable email addresses
//! - Fabricated phone numbers
//! - Scripted clients posing as browsers
//! - Non-institutional sign-ups where institutional email is required
//! - Submission floods (rate limiting)

pub mod content;
pub mod email;
pub mod institutional;
pub mod phone;
pub mod rate_limit;
pub mod user_agent;

pub use content::{ContentOptions, ContentRiskAnalyzer, ModerationMode};
pub use email::{EmailOptions, EmailTrustValidator};
pub use institutional::InstitutionalIdentityClassifier;
pub use phone::PhoneNumberValidator;
pub use rate_limit::{limits, RateLimitConfig, RateLimiter};
pub use user_agent::UserAgentAuthenticityChecker;
