//! Heuristic risk checks for free-text content (posts, comments, bios)

use gatekeep_common::{FailureCode, ValidationOutcome};
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How aggressively to screen wording
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationMode {
    /// Structural and security checks only
    None,
    /// Adds the profanity filter
    #[default]
    Moderate,
    /// Adds spam keyword density
    Strict,
}

impl std::str::FromStr for ModerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ModerationMode::None),
            "moderate" => Ok(ModerationMode::Moderate),
            "strict" => Ok(ModerationMode::Strict),
            other => Err(format!("unknown moderation mode '{}'", other)),
        }
    }
}

/// Per-call content options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentOptions {
    #[serde(default)]
    pub mode: ModerationMode,
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,
    #[serde(default)]
    pub allow_html: bool,
}

fn default_max_urls() -> usize {
    2
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            mode: ModerationMode::default(),
            max_urls: default_max_urls(),
            allow_html: false,
        }
    }
}

const PROFANITY: &[&str] = &[
    "fuck", "shit", "bitch", "bastard", "asshole", "dickhead", "motherfucker",
    "cunt", "wanker", "bollocks", "bullshit", "douchebag", "jackass", "dumbass",
    "piss off", "slut", "whore", "twat", "prick", "crap",
];

const SPAM_KEYWORDS: &[&str] = &[
    "free money", "make money fast", "earn money", "work from home", "get rich",
    "guaranteed", "winner", "you have won", "congratulations you", "click here",
    "click below", "buy now", "order now", "act now", "limited time",
    "limited offer", "exclusive deal", "special promotion", "100% free",
    "risk-free", "no credit check", "cash bonus", "double your", "lowest price",
    "cheap meds", "viagra", "cialis", "casino", "lottery", "crypto giveaway",
    "bitcoin giveaway", "miracle cure", "weight loss", "lose weight fast",
    "dear friend", "wire transfer", "nigerian prince", "claim your prize",
];

/// Structural red flags; any match rejects
const SUSPICIOUS_PATTERNS: &[&str] = &[
    r"[!?]{3,}",
    r"[A-Z]{10,}",
    r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
    r"\b\d{3}[\s-]?\d{2}[\s-]?\d{4}\b",
];

const XSS_PATTERNS: &[&str] = &[
    r"(?i)<\s*script\b",
    r"(?i)<\s*/\s*script\s*>",
    r"(?i)javascript\s*:",
    r"(?i)vbscript\s*:",
    r"(?i)\bon(?:load|error|click|mouseover)\s*=",
    r"(?i)<\s*(?:iframe|object|embed|form)\b",
    r"(?i)expression\s*\(",
    r"(?i)url\s*\(",
    r"(?i)@import",
];

const SQL_PATTERNS: &[&str] = &[
    r"(?i)\b(?:select|union|insert|update|delete|drop|create|alter)\b",
    r"(?i)\b(?:or|and)\s+\d+\s*=\s*\d+",
    r"\b\d+\s*=\s*\d+\b",
    r#"(?i)['"]\s*(?:or|and)\s+['"]?\w+['"]?\s*=\s*['"]?\w+"#,
    r"(?i)\b(?:exec|execute)\b",
    r"(?i)\b(?:sp|xp)_\w+",
    r"--",
    r"#",
    r"/\*[\s\S]*?\*/",
];

/// Sequential content risk checks with fail-fast semantics
pub struct ContentRiskAnalyzer {
    profanity: Vec<String>,
    spam_keywords: Vec<String>,
    suspicious: Vec<Regex>,
    url: Regex,
    bare_www: Regex,
    html_tag: Regex,
    xss: RegexSet,
    sql: RegexSet,
}

impl ContentRiskAnalyzer {
    pub fn new() -> Self {
        Self::with_lexicons(PROFANITY, SPAM_KEYWORDS)
    }

    /// Build with caller-supplied word lists (e.g. a localized lexicon)
    pub fn with_lexicons(profanity: &[&str], spam_keywords: &[&str]) -> Self {
        let dedup = |words: &[&str]| -> Vec<String> {
            let mut seen = HashSet::new();
            words
                .iter()
                .map(|w| w.to_lowercase())
                .filter(|w| !w.is_empty() && seen.insert(w.clone()))
                .collect()
        };

        Self {
            profanity: dedup(profanity),
            spam_keywords: dedup(spam_keywords),
            suspicious: SUSPICIOUS_PATTERNS
                .iter()
                .map(|p| Regex::new(p).expect("static pattern"))
                .collect(),
            url: Regex::new(r"(?i)https?://").expect("static pattern"),
            bare_www: Regex::new(r"(?i)\bwww\.[a-z0-9-]+\.[a-z]{2,}").expect("static pattern"),
            html_tag: Regex::new(r"<[^>]*>").expect("static pattern"),
            xss: RegexSet::new(XSS_PATTERNS).expect("static pattern"),
            sql: RegexSet::new(SQL_PATTERNS).expect("static pattern"),
        }
    }

    /// Run every check in order; the first failure is the reported reason
    pub fn analyze(&self, text: &str, options: &ContentOptions) -> ValidationOutcome {
        if text.trim().is_empty() {
            return ValidationOutcome::accept();
        }

        let lower = text.to_lowercase();

        if options.mode != ModerationMode::None {
            if let Some(word) = self.profanity.iter().find(|w| lower.contains(w.as_str())) {
                tracing::debug!("Profanity hit: {}", word);
                return ValidationOutcome::reject(
                    FailureCode::ProfaneContent,
                    "Content contains inappropriate language",
                );
            }
        }

        if options.mode == ModerationMode::Strict {
            let hits = self
                .spam_keywords
                .iter()
                .filter(|k| lower.contains(k.as_str()))
                .count();
            if hits >= 2 {
                return ValidationOutcome::reject(
                    FailureCode::SpamContent,
                    "Content looks like spam",
                );
            }
        }

        if self.has_suspicious_structure(text) {
            return ValidationOutcome::reject(
                FailureCode::SuspiciousPattern,
                "Content contains suspicious patterns",
            );
        }

        let urls = self.url.find_iter(text).count();
        if urls > options.max_urls {
            return ValidationOutcome::reject(
                FailureCode::TooManyUrls,
                format!("Content may contain at most {} links", options.max_urls),
            );
        }

        if !options.allow_html && self.html_tag.replace_all(text, "") != text {
            return ValidationOutcome::reject(
                FailureCode::HtmlNotAllowed,
                "HTML is not allowed here",
            );
        }

        if self.xss.is_match(text) {
            return ValidationOutcome::reject(
                FailureCode::XssSuspected,
                "Content contains potentially malicious code",
            );
        }

        if self.sql.is_match(text) {
            return ValidationOutcome::reject(
                FailureCode::SqlInjectionSuspected,
                "Content contains potentially malicious code",
            );
        }

        if is_low_quality(text) {
            return ValidationOutcome::reject(
                FailureCode::LowQualityContent,
                "Content appears to be low quality",
            );
        }

        ValidationOutcome::accept()
    }

    fn has_suspicious_structure(&self, text: &str) -> bool {
        self.suspicious.iter().any(|re| re.is_match(text))
            || longest_char_run(text) >= 6
            || self.has_bare_url(text)
    }

    /// A `www.` host that is not preceded by a scheme
    fn has_bare_url(&self, text: &str) -> bool {
        self.bare_www
            .find_iter(text)
            .any(|m| !text[..m.start()].ends_with("://"))
    }
}

impl Default for ContentRiskAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of the longest run of one repeated character
fn longest_char_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut prev = None;
    for c in text.chars() {
        if Some(c) == prev {
            current += 1;
        } else {
            current = 1;
            prev = Some(c);
        }
        longest = longest.max(current);
    }
    longest
}

fn is_low_quality(text: &str) -> bool {
    let trimmed = text.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    let total = chars.len();
    if total == 0 {
        return false;
    }

    if total > 1 && chars.iter().all(|c| *c == chars[0]) {
        return true;
    }

    let digits = chars.iter().filter(|c| c.is_ascii_digit()).count();
    if digits * 100 > total * 80 {
        return true;
    }

    let symbols = chars
        .iter()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    if symbols * 100 > total * 50 {
        return true;
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() > 5 {
        let short = words.iter().filter(|w| w.chars().count() < 3).count();
        if short * 100 > words.len() * 70 {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(text: &str, options: &ContentOptions) -> Option<FailureCode> {
        ContentRiskAnalyzer::new().analyze(text, options).code()
    }

    fn strict() -> ContentOptions {
        ContentOptions {
            mode: ModerationMode::Strict,
            ..ContentOptions::default()
        }
    }

    #[test]
    fn test_clean_content_accepted() {
        let analyzer = ContentRiskAnalyzer::new();
        let opts = strict();
        for text in [
            "Looking forward to the study group on Thursday evening.",
            "Our library opens at nine, see you there",
            "",
            "   ",
        ] {
            assert!(analyzer.analyze(text, &opts).is_accepted(), "{:?}", text);
        }
    }

    #[test]
    fn test_profanity_respects_mode() {
        let text = "well that was a load of bullshit honestly";
        assert_eq!(code(text, &ContentOptions::default()), Some(FailureCode::ProfaneContent));

        let none = ContentOptions {
            mode: ModerationMode::None,
            ..ContentOptions::default()
        };
        assert_eq!(code(text, &none), None);
    }

    #[test]
    fn test_spam_only_in_strict_mode() {
        let text = "FREE MONEY!!! GUARANTEED WINNER!!! CLICK HERE NOW";
        assert_eq!(code(text, &strict()), Some(FailureCode::SpamContent));

        // Moderate skips keyword density and falls through to structure
        assert_eq!(
            code(text, &ContentOptions::default()),
            Some(FailureCode::SuspiciousPattern)
        );

        // A single keyword is not enough
        assert_eq!(code("you are a winner in my book", &strict()), None);
    }

    #[test]
    fn test_suspicious_structures() {
        let opts = ContentOptions::default();
        for text in [
            "really???",
            "this is SOMETHINGLOUD ok",
            "nooooooo way",
            "visit www.example.com today",
            "card 4111 1111 1111 1111 thanks",
            "my ssn is 123-45-6789",
        ] {
            assert_eq!(code(text, &opts), Some(FailureCode::SuspiciousPattern), "{}", text);
        }
    }

    #[test]
    fn test_url_with_scheme_is_not_bare() {
        let opts = ContentOptions::default();
        assert_eq!(code("notes at https://www.example.com/syllabus", &opts), None);
    }

    #[test]
    fn test_url_count_limit() {
        let text = "see https://a.example and https://b.example and http://c.example";
        assert_eq!(code(text, &ContentOptions::default()), Some(FailureCode::TooManyUrls));

        let relaxed = ContentOptions {
            max_urls: 3,
            ..ContentOptions::default()
        };
        assert_eq!(code(text, &relaxed), None);
    }

    #[test]
    fn test_html_rejected_unless_allowed() {
        let text = "hello <b>there</b> friend";
        assert_eq!(code(text, &ContentOptions::default()), Some(FailureCode::HtmlNotAllowed));

        let html = ContentOptions {
            allow_html: true,
            ..ContentOptions::default()
        };
        assert_eq!(code(text, &html), None);
    }

    #[test]
    fn test_script_tag_is_xss_when_html_allowed() {
        let html = ContentOptions {
            allow_html: true,
            ..ContentOptions::default()
        };
        assert_eq!(code("<script>alert(1)</script>", &html), Some(FailureCode::XssSuspected));
        assert_eq!(code("click javascript:void(0) now", &html), Some(FailureCode::XssSuspected));
        assert_eq!(code("<img src=x onerror=alert(1)>", &html), Some(FailureCode::XssSuspected));

        // HTML check comes first under defaults
        assert_eq!(
            code("<script>alert(1)</script>", &ContentOptions::default()),
            Some(FailureCode::HtmlNotAllowed)
        );
    }

    #[test]
    fn test_sql_injection_signatures() {
        let opts = ContentOptions::default();
        for text in [
            "' or 'a'='a",
            "name union select password from users",
            "admin' or 1=1",
            "exec master",
            "call xp_cmdshell please",
            "drop me a line -- thanks",
        ] {
            assert_eq!(code(text, &opts), Some(FailureCode::SqlInjectionSuspected), "{}", text);
        }
    }

    #[test]
    fn test_low_quality() {
        let opts = ContentOptions::default();
        assert_eq!(code("aaaa", &opts), Some(FailureCode::LowQualityContent));
        assert_eq!(code("zzzzz", &opts), Some(FailureCode::LowQualityContent));
        assert_eq!(code("1234 5678 9", &opts), Some(FailureCode::LowQualityContent));
        assert_eq!(code("~~ ** ^^ :) ok", &opts), Some(FailureCode::LowQualityContent));
        assert_eq!(code("a b c d ef gh is it", &opts), Some(FailureCode::LowQualityContent));
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let analyzer = ContentRiskAnalyzer::new();
        let opts = strict();
        for text in ["aaaa", "<b>x</b>", "Normal sentence about biology class."] {
            assert_eq!(analyzer.analyze(text, &opts), analyzer.analyze(text, &opts));
        }
    }

    #[test]
    fn test_longest_char_run() {
        assert_eq!(longest_char_run(""), 0);
        assert_eq!(longest_char_run("abc"), 1);
        assert_eq!(longest_char_run("abbbbc"), 4);
    }
}
