//! Declared client identity (User-Agent) authenticity checks

use gatekeep_common::{FailureCode, ValidationOutcome};
use regex::RegexSet;

/// Automation tools, HTTP libraries, scripting runtimes
const SUSPICIOUS_TOKENS: &[&str] = &[
    "bot", "crawler", "spider", "scraper", "crawl", "slurp", "curl", "wget",
    "httpie", "python", "requests", "urllib", "aiohttp", "httpx", "java/",
    "okhttp", "apache-httpclient", "httpclient", "go-http-client", "libwww",
    "lwp::", "perl", "ruby", "php", "guzzle", "axios", "node-fetch", "undici",
    "got (", "postman", "insomnia", "scrapy", "selenium", "webdriver",
    "headless", "phantomjs", "puppeteer", "playwright", "mechanize", "nutch",
    "heritrix", "masscan", "nmap", "sqlmap", "nikto", "zgrab", "automation",
    "automated", "script", "harvest", "extract", "download", "fetch", "check",
    "monitor", "scan",
];

/// Mainstream browsers; their presence excuses a suspicious token
const BROWSER_TOKENS: &[&str] = &["mozilla", "chrome", "safari", "firefox", "edge", "opera"];

/// Browsers, platforms and rendering engines a real client declares
const LEGITIMATE_TOKENS: &[&str] = &[
    "mozilla", "chrome", "chromium", "safari", "firefox", "edge", "edg/", "opera",
    "opr/", "webkit", "applewebkit", "gecko", "trident", "presto", "blink",
    "windows", "win64", "macintosh", "mac os", "linux", "x11", "android",
    "iphone", "ipad", "ios", "cros", "mobile",
];

const FAKE_PATTERNS: &[&str] = &[
    r"^\d+(?:\.\d+)*$",
    r"(?i)\b(?:test|fake|dummy|unknown|null|undefined|none)\b",
    r"^\d+$",
    r"^[A-Za-z]{1,10}$",
];

const MALICIOUS_PATTERNS: &[&str] = &[
    r"(?i)\b(?:select|union|insert|update|delete|drop)\b\s",
    r#"['"]"#,
    r"(?i)<\s*script|javascript:|on\w+\s*=|<|>",
    r"\.\./|\.\.\\",
    r"[;&|]\s*(?:rm|cat|ls|wget|curl|bash|sh|nc|chmod|python|perl)\b",
    r"`|\$\(|\$\{",
];

/// Pattern matching over the declared client identity
pub struct UserAgentAuthenticityChecker {
    fake: RegexSet,
    malicious: RegexSet,
}

impl UserAgentAuthenticityChecker {
    pub fn new() -> Self {
        Self {
            fake: RegexSet::new(FAKE_PATTERNS).expect("static pattern"),
            malicious: RegexSet::new(MALICIOUS_PATTERNS).expect("static pattern"),
        }
    }

    pub fn validate(&self, user_agent: &str) -> ValidationOutcome {
        let user_agent = user_agent.trim();
        if user_agent.is_empty() {
            return ValidationOutcome::reject(
                FailureCode::MissingClientIdentity,
                "Client identification is required",
            );
        }

        let lower = user_agent.to_lowercase();
        let has_browser = BROWSER_TOKENS.iter().any(|t| lower.contains(t));
        if let Some(token) = SUSPICIOUS_TOKENS.iter().find(|t| lower.contains(*t)) {
            if !has_browser {
                tracing::debug!("Automated client token: {}", token);
                return ValidationOutcome::reject(
                    FailureCode::AutomatedClientSuspected,
                    "Automated clients are not allowed",
                );
            }
        }

        let len = user_agent.chars().count();
        if len < 20 {
            return ValidationOutcome::reject(
                FailureCode::TooShort,
                "Client identification is too short",
            );
        }
        if len > 1000 {
            return ValidationOutcome::reject(
                FailureCode::TooLong,
                "Client identification is too long",
            );
        }

        if !LEGITIMATE_TOKENS.iter().any(|t| lower.contains(t)) {
            return ValidationOutcome::reject(
                FailureCode::NonBrowserClient,
                "Requests must come from a web browser",
            );
        }

        if self.fake.is_match(user_agent) || has_long_run(user_agent, 10) {
            return ValidationOutcome::reject(
                FailureCode::FakeClientIdentity,
                "Client identification looks fabricated",
            );
        }

        if self.malicious.is_match(user_agent) {
            return ValidationOutcome::reject(
                FailureCode::MaliciousCharacters,
                "Client identification contains invalid characters",
            );
        }

        ValidationOutcome::accept()
    }
}

impl Default for UserAgentAuthenticityChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn has_long_run(s: &str, len: usize) -> bool {
    let mut run = 0;
    let mut prev = None;
    for c in s.chars() {
        run = if Some(c) == prev { run + 1 } else { 1 };
        prev = Some(c);
        if run >= len {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";

    fn code(ua: &str) -> Option<FailureCode> {
        UserAgentAuthenticityChecker::new().validate(ua).code()
    }

    #[test]
    fn test_real_browsers_accepted() {
        assert_eq!(code(CHROME), None);
        assert_eq!(code(IPHONE), None);
        assert_eq!(
            code("Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0"),
            None
        );
    }

    #[test]
    fn test_missing() {
        assert_eq!(code(""), Some(FailureCode::MissingClientIdentity));
        assert_eq!(code("   "), Some(FailureCode::MissingClientIdentity));
    }

    #[test]
    fn test_automation_tools() {
        for ua in [
            "curl/7.68.0",
            "python-requests/2.31.0",
            "Wget/1.21.2",
            "Go-http-client/1.1",
            "PostmanRuntime/7.36.0",
            "Scrapy/2.11 (+https://scrapy.org)",
        ] {
            assert_eq!(code(ua), Some(FailureCode::AutomatedClientSuspected), "{}", ua);
        }
    }

    #[test]
    fn test_browser_context_excuses_tool_token() {
        // Headless Chrome still declares itself a browser
        let ua = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
            (KHTML, like Gecko) HeadlessChrome/120.0.0.0 Safari/537.36";
        assert_eq!(code(ua), None);
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(code("Mozilla/5.0"), Some(FailureCode::TooShort));
        let long = format!("{} {}", CHROME, "x".repeat(1000));
        assert_eq!(code(&long), Some(FailureCode::TooLong));
    }

    #[test]
    fn test_non_browser() {
        assert_eq!(
            code("AcmeCorpInternalAgent v4.2 build 118"),
            Some(FailureCode::NonBrowserClient)
        );
    }

    #[test]
    fn test_fake_identity() {
        assert_eq!(
            code("Mozilla/5.0 (Windows NT 10.0) test agent"),
            Some(FailureCode::FakeClientIdentity)
        );
        assert_eq!(
            code("Mozilla/5.0 (Linux) AAAAAAAAAAAAAAAA"),
            Some(FailureCode::FakeClientIdentity)
        );
    }

    #[test]
    fn test_malicious_characters() {
        for ua in [
            "Mozilla/5.0 (Windows NT 10.0) ' OR 'x'='x",
            "Mozilla/5.0 (Windows NT 10.0) <script>",
            "Mozilla/5.0 (Linux) ../../etc/passwd",
            "Mozilla/5.0 (Linux x86_64); rm -rf /",
            "Mozilla/5.0 (Linux x86_64) $(reboot)",
        ] {
            assert_eq!(code(ua), Some(FailureCode::MaliciousCharacters), "{}", ua);
        }
    }

    #[test]
    fn test_validation_is_idempotent() {
        let checker = UserAgentAuthenticityChecker::new();
        assert_eq!(checker.validate(CHROME), checker.validate(CHROME));
        assert_eq!(checker.validate("curl/7.68.0"), checker.validate("curl/7.68.0"));
    }
}
