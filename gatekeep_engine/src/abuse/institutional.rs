//! Institutional (academic) email domain classification

use super::email::split_domain;
use gatekeep_common::{FailureCode, ValidationOutcome};
use std::collections::HashSet;

/// Consumer mail providers, never institutional
const CONSUMER_DOMAINS: &[&str] = &[
    "gmail.com", "googlemail.com", "yahoo.com", "yahoo.co.uk", "yahoo.co.in",
    "yahoo.fr", "yahoo.de", "yahoo.co.jp", "ymail.com", "rocketmail.com",
    "outlook.com", "hotmail.com", "hotmail.co.uk", "hotmail.fr", "live.com",
    "live.co.uk", "msn.com", "aol.com", "icloud.com", "me.com", "mac.com",
    "protonmail.com", "proton.me", "pm.me", "zoho.com", "zohomail.com",
    "gmx.com", "gmx.de", "gmx.net", "web.de", "t-online.de", "mail.com",
    "yandex.com", "yandex.ru", "mail.ru", "rambler.ru", "qq.com", "163.com",
    "126.com", "sina.com", "naver.com", "daum.net", "hanmail.net",
    "rediffmail.com", "orange.fr", "free.fr", "laposte.net", "sfr.fr",
    "libero.it", "virgilio.it", "tiscali.it", "btinternet.com", "sky.com",
    "virginmedia.com", "ntlworld.com", "comcast.net", "verizon.net",
    "att.net", "sbcglobal.net", "cox.net", "charter.net", "earthlink.net",
    "bigpond.com", "optusnet.com.au", "shaw.ca", "rogers.com", "sympatico.ca",
    "uol.com.br", "bol.com.br", "terra.com.br", "fastmail.com", "hey.com",
    "tutanota.com", "seznam.cz", "wp.pl", "o2.pl", "interia.pl",
];

/// Academic domain suffixes (`.edu`, its country variants, `.ac.*`)
const ACADEMIC_SUFFIXES: &[&str] = &[
    ".edu", ".edu.au", ".edu.ar", ".edu.bd", ".edu.bn", ".edu.bo", ".edu.br",
    ".edu.by", ".edu.bz", ".edu.cn", ".edu.co", ".edu.cu", ".edu.do", ".edu.dz",
    ".edu.ec", ".edu.eg", ".edu.es", ".edu.et", ".edu.ge", ".edu.gh", ".edu.gr",
    ".edu.gt", ".edu.hk", ".edu.hn", ".edu.in", ".edu.iq", ".edu.it", ".edu.jm",
    ".edu.jo", ".edu.kh", ".edu.kw", ".edu.kz", ".edu.lb", ".edu.lk", ".edu.ly",
    ".edu.mk", ".edu.mm", ".edu.mn", ".edu.mo", ".edu.mt", ".edu.mx", ".edu.my",
    ".edu.ng", ".edu.ni", ".edu.np", ".edu.om", ".edu.pa", ".edu.pe", ".edu.ph",
    ".edu.pk", ".edu.pl", ".edu.pr", ".edu.ps", ".edu.pt", ".edu.py", ".edu.qa",
    ".edu.rs", ".edu.ru", ".edu.sa", ".edu.sg", ".edu.sv", ".edu.sy", ".edu.tr",
    ".edu.tw", ".edu.ua", ".edu.uy", ".edu.vn", ".edu.ye", ".edu.za",
    ".ac.uk", ".ac.jp", ".ac.kr", ".ac.in", ".ac.nz", ".ac.za", ".ac.il",
    ".ac.at", ".ac.be", ".ac.cn", ".ac.id", ".ac.ir", ".ac.th", ".ac.ke",
];

const PRIMARY_KEYWORDS: &[&str] = &["university", "college", "school", "institute", "academy"];

const SECONDARY_KEYWORDS: &[&str] = &[
    "univ", "campus", "education", "student", "faculty", "academic", "research",
    "library", "alumni", "grad", "undergrad",
];

const LABEL_HINTS: &[&str] = &["edu", "ac", "univ", "college", "school"];

/// Heuristic classifier for school and university domains
pub struct InstitutionalIdentityClassifier {
    consumer: HashSet<&'static str>,
}

impl InstitutionalIdentityClassifier {
    pub fn new() -> Self {
        Self {
            consumer: CONSUMER_DOMAINS.iter().copied().collect(),
        }
    }

    /// Accepts institutional addresses; rejects everything else
    pub fn classify(&self, email: &str) -> ValidationOutcome {
        let Some(domain) = split_domain(email) else {
            return ValidationOutcome::reject(
                FailureCode::MalformedEmail,
                "Enter a valid email address",
            );
        };

        if self.consumer.contains(domain.as_str()) {
            return ValidationOutcome::reject(
                FailureCode::PersonalEmailDomain,
                "Use your institutional email address, not a personal one",
            );
        }

        if ACADEMIC_SUFFIXES.iter().any(|s| domain.ends_with(s))
            || PRIMARY_KEYWORDS.iter().any(|k| domain.contains(k))
        {
            return ValidationOutcome::accept();
        }

        if SECONDARY_KEYWORDS.iter().any(|k| domain.contains(k)) {
            return ValidationOutcome::accept();
        }

        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() >= 3
            && labels
                .iter()
                .any(|label| LABEL_HINTS.iter().any(|hint| label.contains(hint)))
        {
            return ValidationOutcome::accept();
        }

        ValidationOutcome::reject(
            FailureCode::NotInstitutionalDomain,
            "This does not look like an institutional email address",
        )
    }
}

impl Default for InstitutionalIdentityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(email: &str) -> Option<FailureCode> {
        InstitutionalIdentityClassifier::new().classify(email).code()
    }

    #[test]
    fn test_academic_suffixes() {
        for email in [
            "a.student@mit.edu",
            "x@cs.ox.ac.uk",
            "y@unimelb.edu.au",
            "z@u-tokyo.ac.jp",
        ] {
            assert_eq!(code(email), None, "{}", email);
        }
    }

    #[test]
    fn test_keywords() {
        assert_eq!(code("dean@stateuniversity.org"), None);
        assert_eq!(code("info@artinstitute.com"), None);
        assert_eq!(code("desk@citylibrary.org"), None);
        assert_eq!(code("team@alumni-network.org"), None);
        assert_eq!(code("prof@cs.univ-lyon1.fr"), None);
    }

    #[test]
    fn test_label_hints() {
        assert_eq!(code("it@mail.tacoma.example"), None);
        // Two labels are not enough for the label heuristic
        assert_eq!(code("it@tacoma.example"), Some(FailureCode::NotInstitutionalDomain));
    }

    #[test]
    fn test_consumer_domains_rejected() {
        for email in ["someone@gmail.com", "Someone@Outlook.com", "x@yahoo.co.uk", "y@web.de"] {
            assert_eq!(code(email), Some(FailureCode::PersonalEmailDomain), "{}", email);
        }
    }

    #[test]
    fn test_not_institutional() {
        assert_eq!(code("sales@acme.io"), Some(FailureCode::NotInstitutionalDomain));
        assert_eq!(code("bob@example.com"), Some(FailureCode::NotInstitutionalDomain));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(code("not-an-email"), Some(FailureCode::MalformedEmail));
        assert_eq!(code("a@b@c.edu"), Some(FailureCode::MalformedEmail));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let classifier = InstitutionalIdentityClassifier::new();
        for email in ["a.student@mit.edu", "someone@gmail.com", "sales@acme.io", "broken"] {
            assert_eq!(classifier.classify(email), classifier.classify(email), "{}", email);
        }
    }
}
