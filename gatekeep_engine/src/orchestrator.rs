//! Per-profile validation chains
//!
//! A profile (e.g. "social_post") names an ordered list of steps. Steps run in
//! order and the first rejection is returned; later steps are never evaluated.
//! Profiles are data: new ones come from YAML, not from code changes.

use crate::abuse::{
    limits, ContentOptions, ContentRiskAnalyzer, EmailOptions, EmailTrustValidator,
    InstitutionalIdentityClassifier, ModerationMode, PhoneNumberValidator, RateLimitConfig,
    RateLimiter, UserAgentAuthenticityChecker,
};
use crate::reputation::ReputationClient;
use gatekeep_common::{Purpose, ValidationOutcome, ValidationRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One check in a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Step {
    RateLimit(RateLimitConfig),
    Content(ContentOptions),
    Email(EmailOptions),
    Phone,
    UserAgent,
    Institutional,
}

impl Step {
    /// Kind of value this step inspects; `None` for value-agnostic steps
    fn purpose(&self) -> Option<Purpose> {
        match self {
            Step::RateLimit(_) => None,
            Step::Content(_) => Some(Purpose::Content),
            Step::Email(_) => Some(Purpose::Email),
            Step::Phone => Some(Purpose::Phone),
            Step::UserAgent => Some(Purpose::UserAgent),
            Step::Institutional => Some(Purpose::InstitutionalEmail),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Step::RateLimit(_) => "rate_limit",
            Step::Content(_) => "content",
            Step::Email(_) => "email",
            Step::Phone => "phone",
            Step::UserAgent => "user_agent",
            Step::Institutional => "institutional",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to read pipeline file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Profile '{0}' has no steps")]
    EmptyProfile(String),
}

/// Named, ordered validation chains
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub profiles: HashMap<String, Vec<Step>>,
}

impl PipelineConfig {
    /// Profiles shipped with the engine
    pub fn builtin() -> Self {
        let moderate = ContentOptions::default();
        let strict = ContentOptions {
            mode: ModerationMode::Strict,
            ..ContentOptions::default()
        };

        let profiles = [
            (
                "social_post",
                vec![Step::RateLimit(limits::content_posting()), Step::Content(moderate)],
            ),
            (
                "comment",
                vec![Step::RateLimit(limits::lenient()), Step::Content(strict)],
            ),
            (
                "registration_email",
                vec![
                    Step::RateLimit(limits::registration()),
                    Step::Email(EmailOptions::default()),
                ],
            ),
            (
                "institutional_registration",
                vec![Step::Email(EmailOptions::default()), Step::Institutional],
            ),
            ("contact_phone", vec![Step::Phone]),
            ("client_identity", vec![Step::UserAgent]),
        ]
        .into_iter()
        .map(|(name, steps)| (name.to_string(), steps))
        .collect();

        Self { profiles }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, PipelineError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        if let Some((name, _)) = config.profiles.iter().find(|(_, steps)| steps.is_empty()) {
            return Err(PipelineError::EmptyProfile(name.clone()));
        }
        Ok(config)
    }

    /// Built-in profiles, overridden and extended by a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::builtin();
        config.profiles.extend(Self::from_yaml(&yaml)?.profiles);
        Ok(config)
    }

    pub fn steps(&self, profile: &str) -> Option<&[Step]> {
        self.profiles.get(profile).map(Vec::as_slice)
    }

    /// Kind of value a profile validates (taken from its first value check).
    /// `None` for unknown profiles and for profiles without a value check.
    pub fn purpose_of(&self, profile: &str) -> Option<Purpose> {
        self.steps(profile)?.iter().find_map(Step::purpose)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("Invalid value '{value}' for option '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Per-request overrides of step options, parsed from the caller's option map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub mode: Option<ModerationMode>,
    pub max_urls: Option<usize>,
    pub allow_html: Option<bool>,
    pub allow_disposable: Option<bool>,
    pub check_mx: Option<bool>,
    pub suggest_typos: Option<bool>,
    pub max_attempts: Option<u32>,
    pub decay_seconds: Option<u64>,
}

impl RequestOptions {
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, OptionsError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, OptionsError> {
            value.trim().parse().map_err(|_| OptionsError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        }

        let mut options = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "mode" => options.mode = Some(parse(key, value)?),
                "max_urls" => options.max_urls = Some(parse(key, value)?),
                "allow_html" => options.allow_html = Some(parse(key, value)?),
                "allow_disposable" => options.allow_disposable = Some(parse(key, value)?),
                "check_mx" => options.check_mx = Some(parse(key, value)?),
                "suggest_typos" => options.suggest_typos = Some(parse(key, value)?),
                "max_attempts" => options.max_attempts = Some(parse(key, value)?),
                "decay_seconds" => options.decay_seconds = Some(parse(key, value)?),
                other => tracing::debug!("Ignoring unknown validation option '{}'", other),
            }
        }
        Ok(options)
    }

    fn content(&self, base: &ContentOptions) -> ContentOptions {
        ContentOptions {
            mode: self.mode.unwrap_or(base.mode),
            max_urls: self.max_urls.unwrap_or(base.max_urls),
            allow_html: self.allow_html.unwrap_or(base.allow_html),
        }
    }

    fn email(&self, base: &EmailOptions) -> EmailOptions {
        EmailOptions {
            allow_disposable: self.allow_disposable.unwrap_or(base.allow_disposable),
            check_mx: self.check_mx.unwrap_or(base.check_mx),
            suggest_typos: self.suggest_typos.unwrap_or(base.suggest_typos),
        }
    }

    fn rate_limit(&self, base: &RateLimitConfig) -> RateLimitConfig {
        RateLimitConfig {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            decay_seconds: self.decay_seconds.unwrap_or(base.decay_seconds),
        }
    }
}

/// Entry point: runs a profile's chain over one submitted value
pub struct ValidationOrchestrator {
    content: ContentRiskAnalyzer,
    email: EmailTrustValidator,
    phone: PhoneNumberValidator,
    user_agent: UserAgentAuthenticityChecker,
    institutional: InstitutionalIdentityClassifier,
    rate_limiter: RateLimiter,
    pipelines: PipelineConfig,
}

impl ValidationOrchestrator {
    pub fn new(
        reputation: Arc<ReputationClient>,
        rate_limiter: RateLimiter,
        pipelines: PipelineConfig,
    ) -> Self {
        Self {
            content: ContentRiskAnalyzer::new(),
            email: EmailTrustValidator::new(reputation),
            phone: PhoneNumberValidator::new(),
            user_agent: UserAgentAuthenticityChecker::new(),
            institutional: InstitutionalIdentityClassifier::new(),
            rate_limiter,
            pipelines,
        }
    }

    pub fn pipelines(&self) -> &PipelineConfig {
        &self.pipelines
    }

    /// Caller-facing contract: validate a raw value under a profile
    pub async fn validate(
        &self,
        profile: &str,
        value: &str,
        identity: &str,
        options: &HashMap<String, String>,
    ) -> ValidationOutcome {
        if self.pipelines.steps(profile).is_none() {
            tracing::warn!("Unknown validation profile '{}'", profile);
            return ValidationOutcome::internal_error();
        }
        // Rate-limit-only profiles never inspect the value
        let purpose = self
            .pipelines
            .purpose_of(profile)
            .unwrap_or(Purpose::Content);

        let options = match RequestOptions::from_map(options) {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!("Rejecting {} submission: {}", profile, e);
                return ValidationOutcome::internal_error();
            }
        };

        let request = ValidationRequest::new(profile, value, identity, purpose);
        self.run_with_options(profile, &request, &options).await
    }

    /// Run a profile with the steps' configured options
    pub async fn run(&self, profile: &str, request: &ValidationRequest) -> ValidationOutcome {
        self.run_with_options(profile, request, &RequestOptions::default())
            .await
    }

    pub async fn run_with_options(
        &self,
        profile: &str,
        request: &ValidationRequest,
        options: &RequestOptions,
    ) -> ValidationOutcome {
        let Some(steps) = self.pipelines.steps(profile) else {
            tracing::warn!("Unknown validation profile '{}'", profile);
            return ValidationOutcome::internal_error();
        };

        for step in steps {
            let outcome = self.run_step(profile, step, request, options).await;
            if !outcome.is_accepted() {
                tracing::debug!(
                    "{} rejected field '{}' at {}: {}",
                    profile,
                    request.field,
                    step.name(),
                    outcome.code().map(|c| c.as_str()).unwrap_or("unknown")
                );
                return outcome;
            }
        }

        ValidationOutcome::accept()
    }

    async fn run_step(
        &self,
        profile: &str,
        step: &Step,
        request: &ValidationRequest,
        options: &RequestOptions,
    ) -> ValidationOutcome {
        let value = request.value.as_str();
        match step {
            Step::RateLimit(config) => {
                self.rate_limiter
                    .check_and_record(&request.identity, profile, &options.rate_limit(config))
                    .await
            }
            Step::Content(base) => self.content.analyze(value, &options.content(base)),
            Step::Email(base) => self.email.validate(value, &options.email(base)).await,
            Step::Phone => self.phone.validate(value),
            Step::UserAgent => self.user_agent.validate(value),
            Step::Institutional => self.institutional.classify(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, TtlCache};
    use crate::clock::ManualClock;
    use crate::reputation::fakes::FakeLookup;
    use crate::reputation::ReputationConfig;
    use chrono::Utc;
    use gatekeep_common::FailureCode;

    fn orchestrator_with(pipelines: PipelineConfig) -> (ValidationOrchestrator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache: Arc<dyn TtlCache> = Arc::new(MemoryCache::with_clock(clock.clone()));
        let reputation = ReputationClient::new(
            cache.clone(),
            Arc::new(FakeLookup::new(&["burner.io"])),
            Arc::new(FakeLookup::new(&["gmail.com", "mit.edu", "burner.io", "example.com"])),
            ReputationConfig::default(),
        );
        let limiter = RateLimiter::with_clock(cache, clock.clone());
        (
            ValidationOrchestrator::new(Arc::new(reputation), limiter, pipelines),
            clock,
        )
    }

    fn orchestrator() -> (ValidationOrchestrator, Arc<ManualClock>) {
        orchestrator_with(PipelineConfig::builtin())
    }

    fn no_options() -> HashMap<String, String> {
        HashMap::new()
    }

    #[tokio::test]
    async fn test_social_post_accepts_clean_content() {
        let (orch, _) = orchestrator();
        let outcome = orch
            .validate("social_post", "Great lecture today, thanks everyone.", "u1", &no_options())
            .await;
        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_rate_limit_runs_before_content() {
        let (orch, _) = orchestrator();
        assert!(orch
            .validate("social_post", "First post of the day here.", "u1", &no_options())
            .await
            .is_accepted());

        // Immediate resubmission of bad content reports the rate failure, not the content one
        let outcome = orch
            .validate("social_post", "<script>alert(1)</script>", "u1", &no_options())
            .await;
        assert_eq!(outcome.code(), Some(FailureCode::SuspiciousSubmissionPattern));
    }

    #[tokio::test]
    async fn test_comment_profile_is_strict() {
        let (orch, _) = orchestrator();
        let outcome = orch
            .validate(
                "comment",
                "FREE MONEY!!! GUARANTEED WINNER!!! CLICK HERE NOW",
                "u2",
                &no_options(),
            )
            .await;
        assert_eq!(outcome.code(), Some(FailureCode::SpamContent));
    }

    #[tokio::test]
    async fn test_institutional_registration_chain() {
        let (orch, _) = orchestrator();

        let personal = orch
            .validate("institutional_registration", "jo@gmail.com", "u3", &no_options())
            .await;
        assert_eq!(personal.code(), Some(FailureCode::PersonalEmailDomain));

        let typo = orch
            .validate("institutional_registration", "jo@gmial.com", "u3", &no_options())
            .await;
        assert_eq!(typo.code(), Some(FailureCode::PossibleTypo));
        assert_eq!(typo.suggestion(), Some("gmail.com"));

        let campus = orch
            .validate("institutional_registration", "jo@mit.edu", "u3", &no_options())
            .await;
        assert!(campus.is_accepted());
    }

    #[tokio::test]
    async fn test_registration_email_disposable_and_limits() {
        let (orch, clock) = orchestrator();

        let outcome = orch
            .validate("registration_email", "x@burner.io", "10.1.1.1", &no_options())
            .await;
        assert_eq!(outcome.code(), Some(FailureCode::DisposableEmail));

        let mut allow = HashMap::new();
        allow.insert("allow_disposable".to_string(), "true".to_string());
        clock.advance_secs(200);
        let outcome = orch
            .validate("registration_email", "x@burner.io", "10.1.1.1", &allow)
            .await;
        assert!(outcome.is_accepted());

        clock.advance_secs(200);
        assert!(orch
            .validate("registration_email", "y@example.com", "10.1.1.1", &no_options())
            .await
            .is_accepted());

        // Registration allows three attempts per hour
        clock.advance_secs(200);
        let outcome = orch
            .validate("registration_email", "z@example.com", "10.1.1.1", &no_options())
            .await;
        assert_eq!(outcome.code(), Some(FailureCode::RateLimited));
    }

    #[tokio::test]
    async fn test_option_overrides() {
        let (orch, clock) = orchestrator();
        let text = "Meeting notes are in <b>bold</b> below";

        assert_eq!(
            orch.validate("social_post", text, "u4", &no_options()).await.code(),
            Some(FailureCode::HtmlNotAllowed)
        );

        clock.advance_secs(120);
        let mut options = HashMap::new();
        options.insert("allow_html".to_string(), "true".to_string());
        options.insert("utm_source".to_string(), "ignored".to_string());
        assert!(orch.validate("social_post", text, "u4", &options).await.is_accepted());
    }

    #[tokio::test]
    async fn test_invalid_option_fails_closed() {
        let (orch, _) = orchestrator();
        let mut options = HashMap::new();
        options.insert("max_urls".to_string(), "lots".to_string());
        let outcome = orch.validate("social_post", "hello there", "u5", &options).await;
        assert_eq!(outcome.code(), Some(FailureCode::InternalError));
    }

    #[tokio::test]
    async fn test_unknown_profile() {
        let (orch, _) = orchestrator();
        let outcome = orch.validate("fax_number", "555", "u6", &no_options()).await;
        assert_eq!(outcome.code(), Some(FailureCode::InternalError));

        let request = ValidationRequest::new("fax", "555", "u6", Purpose::Phone);
        assert_eq!(
            orch.run("fax_number", &request).await.code(),
            Some(FailureCode::InternalError)
        );
    }

    #[tokio::test]
    async fn test_single_step_profiles() {
        let (orch, _) = orchestrator();
        assert_eq!(
            orch.validate("contact_phone", "5555555555", "u7", &no_options()).await.code(),
            Some(FailureCode::RepeatedDigit)
        );
        assert_eq!(
            orch.validate("client_identity", "curl/7.68.0", "u7", &no_options()).await.code(),
            Some(FailureCode::AutomatedClientSuspected)
        );
    }

    #[tokio::test]
    async fn test_yaml_profiles() {
        let yaml = r#"
profiles:
  bio:
    - check: content
      mode: none
      max_urls: 0
  signup_phone:
    - check: rate_limit
      max_attempts: 1
      decay_seconds: 600
    - check: phone
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.purpose_of("signup_phone"), Some(Purpose::Phone));
        assert_eq!(
            config.steps("bio"),
            Some(
                &[Step::Content(ContentOptions {
                    mode: ModerationMode::None,
                    max_urls: 0,
                    allow_html: false,
                })][..]
            )
        );

        let (orch, clock) = orchestrator_with(config);
        assert_eq!(
            orch.validate("bio", "see https://example.com", "u8", &no_options()).await.code(),
            Some(FailureCode::TooManyUrls)
        );

        assert!(orch
            .validate("signup_phone", "+44 7911 123456", "u8", &no_options())
            .await
            .is_accepted());
        clock.advance_secs(60);
        assert_eq!(
            orch.validate("signup_phone", "+44 7911 123456", "u8", &no_options()).await.code(),
            Some(FailureCode::RateLimited)
        );
    }

    #[tokio::test]
    async fn test_rate_limit_only_profile() {
        let yaml = r#"
profiles:
  login:
    - check: rate_limit
      max_attempts: 5
      decay_seconds: 600
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.purpose_of("login"), None);

        let (orch, clock) = orchestrator_with(config);
        assert!(orch
            .validate("login", "ignored", "10.2.2.2", &no_options())
            .await
            .is_accepted());

        clock.advance_secs(5);
        assert_eq!(
            orch.validate("login", "ignored", "10.2.2.2", &no_options()).await.code(),
            Some(FailureCode::SuspiciousSubmissionPattern)
        );
    }

    #[test]
    fn test_empty_profile_rejected() {
        let err = PipelineConfig::from_yaml("profiles:\n  nothing: []\n").unwrap_err();
        assert!(matches!(err, PipelineError::EmptyProfile(name) if name == "nothing"));
    }

    #[test]
    fn test_request_options_parsing() {
        let mut map = HashMap::new();
        map.insert("mode".to_string(), "strict".to_string());
        map.insert("check_mx".to_string(), "false".to_string());
        map.insert("decay_seconds".to_string(), "90".to_string());
        let options = RequestOptions::from_map(&map).unwrap();

        assert_eq!(options.mode, Some(ModerationMode::Strict));
        assert_eq!(options.check_mx, Some(false));
        assert_eq!(
            options.rate_limit(&limits::lenient()),
            RateLimitConfig::new(10, 90)
        );

        map.insert("allow_html".to_string(), "maybe".to_string());
        assert!(RequestOptions::from_map(&map).is_err());
    }
}
