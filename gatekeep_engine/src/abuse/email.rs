//! Email trust checks: disposable providers, typos, mail exchangers, domain format

use crate::reputation::ReputationClient;
use gatekeep_common::{FailureCode, ValidationOutcome};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Per-call email options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailOptions {
    #[serde(default)]
    pub allow_disposable: bool,
    #[serde(default = "default_true")]
    pub check_mx: bool,
    #[serde(default = "default_true")]
    pub suggest_typos: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EmailOptions {
    fn default() -> Self {
        Self {
            allow_disposable: false,
            check_mx: true,
            suggest_typos: true,
        }
    }
}

/// Known throwaway-mailbox providers, checked before the reputation service
const DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com", "10minutemail.net", "20minutemail.com", "33mail.com",
    "anonbox.net", "anonymbox.com", "burnermail.io", "discard.email",
    "discardmail.com", "dispostable.com", "dropmail.me", "emailondeck.com",
    "fakeinbox.com", "fakemail.net", "getairmail.com", "getnada.com",
    "guerrillamail.biz", "guerrillamail.com", "guerrillamail.de", "guerrillamail.info",
    "guerrillamail.net", "guerrillamail.org", "guerrillamailblock.com", "harakirimail.com",
    "incognitomail.org", "jetable.org", "mailcatch.com", "maildrop.cc",
    "mailinator.com", "mailinator.net", "mailinator2.com", "mailnesia.com",
    "mailsac.com", "mintemail.com", "moakt.com", "mohmal.com",
    "mytemp.email", "mytrashmail.com", "nada.email", "sharklasers.com",
    "spam4.me", "spambox.us", "spamgourmet.com", "spamherelots.com",
    "tempail.com", "temp-mail.io", "temp-mail.org", "tempinbox.com",
    "tempmail.com", "tempmail.net", "tempmailo.com", "tempr.email",
    "throwawaymail.com", "trash-mail.com", "trashmail.com", "trashmail.de",
    "trashmail.net", "wegwerfmail.de", "yopmail.com", "yopmail.fr",
    "yopmail.net", "mail-temp.com", "emailfake.com", "inboxkitten.com",
];

/// Misspelled provider domain -> intended domain
const COMMON_TYPOS: &[(&str, &str)] = &[
    ("gmial.com", "gmail.com"),
    ("gmai.com", "gmail.com"),
    ("gmal.com", "gmail.com"),
    ("gamil.com", "gmail.com"),
    ("gnail.com", "gmail.com"),
    ("gmaill.com", "gmail.com"),
    ("gmail.co", "gmail.com"),
    ("gmail.cm", "gmail.com"),
    ("gmail.con", "gmail.com"),
    ("gmail.om", "gmail.com"),
    ("gmailcom", "gmail.com"),
    ("yahooo.com", "yahoo.com"),
    ("yaho.com", "yahoo.com"),
    ("yhoo.com", "yahoo.com"),
    ("yahoo.co", "yahoo.com"),
    ("yahoo.con", "yahoo.com"),
    ("yahho.com", "yahoo.com"),
    ("hotmial.com", "hotmail.com"),
    ("hotmal.com", "hotmail.com"),
    ("hotmai.com", "hotmail.com"),
    ("hotmil.com", "hotmail.com"),
    ("hotamil.com", "hotmail.com"),
    ("hotmail.co", "hotmail.com"),
    ("hotmail.con", "hotmail.com"),
    ("outlok.com", "outlook.com"),
    ("outloo.com", "outlook.com"),
    ("outlook.co", "outlook.com"),
    ("outlook.con", "outlook.com"),
    ("otlook.com", "outlook.com"),
    ("iclod.com", "icloud.com"),
    ("icloud.co", "icloud.com"),
    ("icoud.com", "icloud.com"),
    ("aol.co", "aol.com"),
    ("aoll.com", "aol.com"),
    ("protonmial.com", "protonmail.com"),
    ("protonmail.co", "protonmail.com"),
    ("live.co", "live.com"),
    ("msn.co", "msn.com"),
];

/// Email reputation and formatting checks
pub struct EmailTrustValidator {
    reputation: Arc<ReputationClient>,
    disposable: HashSet<&'static str>,
    typos: HashMap<&'static str, &'static str>,
}

impl EmailTrustValidator {
    pub fn new(reputation: Arc<ReputationClient>) -> Self {
        Self {
            reputation,
            disposable: DISPOSABLE_DOMAINS.iter().copied().collect(),
            typos: COMMON_TYPOS.iter().copied().collect(),
        }
    }

    /// Run the checks in order; the first failure is the reported reason
    pub async fn validate(&self, email: &str, options: &EmailOptions) -> ValidationOutcome {
        let Some(domain) = split_domain(email) else {
            return ValidationOutcome::reject(
                FailureCode::MalformedEmail,
                "Enter a valid email address",
            );
        };

        // Malformed domains never leave the process; the format step reports them
        let lookup_safe = has_hostname_chars(&domain);

        if !options.allow_disposable {
            if self.disposable.contains(domain.as_str())
                || (lookup_safe && self.reputation.is_disposable(&domain).await)
            {
                return ValidationOutcome::reject(
                    FailureCode::DisposableEmail,
                    "Disposable email addresses are not allowed",
                );
            }
        }

        if options.suggest_typos {
            if let Some(correct) = self.typos.get(domain.as_str()) {
                return ValidationOutcome::reject_with_suggestion(
                    FailureCode::PossibleTypo,
                    format!("Did you mean @{}?", correct),
                    *correct,
                );
            }
        }

        if options.check_mx
            && lookup_safe
            && !self.reputation.has_mail_exchanger(&domain).await
        {
            return ValidationOutcome::reject(
                FailureCode::NoMailExchanger,
                format!("{} does not accept email", domain),
            );
        }

        if !is_valid_domain_format(&domain) {
            return ValidationOutcome::reject(
                FailureCode::InvalidDomainFormat,
                "Email domain is not valid",
            );
        }

        ValidationOutcome::accept()
    }

    /// Suggested correction for a misspelled provider domain
    pub fn suggest(&self, domain: &str) -> Option<&'static str> {
        self.typos.get(domain.trim().to_lowercase().as_str()).copied()
    }
}

/// Lower-cased domain of an address with exactly one `@` and a non-empty local part
pub(crate) fn split_domain(email: &str) -> Option<String> {
    let mut parts = email.trim().split('@');
    let local = parts.next()?;
    let domain = parts.next()?;
    if parts.next().is_some() || local.is_empty() {
        return None;
    }
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        return None;
    }
    Some(domain)
}

fn has_hostname_chars(domain: &str) -> bool {
    domain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
}

/// Hostname shape: 4-253 chars, dotted, `[a-z0-9-.]`, TLD of 2-6 letters
fn is_valid_domain_format(domain: &str) -> bool {
    if domain.len() < 4 || domain.len() > 253 || !domain.contains('.') {
        return false;
    }

    if !has_hostname_chars(domain) {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty() && label.len() <= 63 && !label.starts_with('-') && !label.ends_with('-')
    });
    if !labels_ok {
        return false;
    }

    let tld = labels[labels.len() - 1];
    (2..=6).contains(&tld.len()) && tld.chars().all(|c| c.is_ascii_lowercase())
}
