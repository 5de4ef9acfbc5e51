//! Phone number plausibility checks

use gatekeep_common::{FailureCode, ValidationOutcome};
use regex::{Regex, RegexSet};

/// National number shapes, with optional country code or trunk prefix.
/// Numbers carrying a valid `+` prefix are accepted before these run.
const COUNTRY_PATTERNS: &[(&str, &str)] = &[
    ("GB", r"^\+?(?:44|0)7\d{9}$"),
    ("GB", r"^\+?(?:44|0)[12]\d{8,9}$"),
    ("DE", r"^\+?(?:49|0)1[5-7]\d{8,9}$"),
    ("FR", r"^\+?(?:33|0)[1-9]\d{8}$"),
    ("ES", r"^\+?(?:34)?[6-9]\d{8}$"),
    ("IT", r"^\+?(?:39)?3\d{8,9}$"),
    ("NL", r"^\+?(?:31|0)6\d{8}$"),
    ("BE", r"^\+?(?:32|0)4\d{8}$"),
    ("CH", r"^\+?(?:41|0)7[5-9]\d{7}$"),
    ("AT", r"^\+?(?:43|0)6\d{8,11}$"),
    ("SE", r"^\+?(?:46|0)7[02369]\d{7}$"),
    ("NO", r"^\+?(?:47)?[49]\d{7}$"),
    ("DK", r"^\+?(?:45)?[2-9]\d{7}$"),
    ("FI", r"^\+?(?:358|0)4\d{7,9}$"),
    ("PL", r"^\+?(?:48)?[4-8]\d{8}$"),
    ("PT", r"^\+?(?:351)?9[1-36]\d{7}$"),
    ("IE", r"^\+?(?:353|0)8[3-9]\d{7}$"),
    ("GR", r"^\+?(?:30)?69\d{8}$"),
    ("CZ", r"^\+?(?:420)?[67]\d{8}$"),
    ("HU", r"^\+?(?:36|06)[237]0\d{7}$"),
    ("RO", r"^\+?(?:40|0)7\d{8}$"),
    ("RU", r"^\+?[78]9\d{9}$"),
    ("UA", r"^\+?(?:380|0)[3-9]\d{8}$"),
    ("TR", r"^\+?(?:90|0)5\d{9}$"),
    ("IL", r"^\+?(?:972|0)5\d{8}$"),
    ("AE", r"^\+?(?:971|0)5[024568]\d{7}$"),
    ("SA", r"^\+?(?:966|0)5\d{8}$"),
    ("EG", r"^\+?(?:20|0)1[0125]\d{8}$"),
    ("ZA", r"^\+?(?:27|0)[6-8]\d{8}$"),
    ("NG", r"^\+?(?:234|0)[789][01]\d{8}$"),
    ("KE", r"^\+?(?:254|0)[17]\d{8}$"),
    ("IN", r"^\+?(?:91|0)?[6-9]\d{9}$"),
    ("PK", r"^\+?(?:92|0)3\d{9}$"),
    ("BD", r"^\+?(?:880|0)1[3-9]\d{8}$"),
    ("CN", r"^\+?(?:86)?1[3-9]\d{9}$"),
    ("JP", r"^\+?(?:81|0)[789]0\d{8}$"),
    ("KR", r"^\+?(?:82|0)1[016789]\d{7,8}$"),
    ("SG", r"^\+?(?:65)?[89]\d{7}$"),
    ("MY", r"^\+?(?:60|0)1\d{8,9}$"),
    ("ID", r"^\+?(?:62|0)8\d{8,11}$"),
    ("PH", r"^\+?(?:63|0)9\d{9}$"),
    ("TH", r"^\+?(?:66|0)[689]\d{8}$"),
    ("VN", r"^\+?(?:84|0)[35789]\d{8}$"),
    ("AU", r"^\+?(?:61|0)4\d{8}$"),
    ("NZ", r"^\+?(?:64|0)2\d{7,9}$"),
    ("BR", r"^\+?(?:55)?[1-9]{2}9\d{8}$"),
    ("MX", r"^\+?521?[2-9]\d{9}$"),
    ("AR", r"^\+?549\d{10}$"),
    ("CO", r"^\+?(?:57)?3\d{9}$"),
    ("CL", r"^\+?(?:56)?9\d{8}$"),
    ("PE", r"^\+?(?:51)?9\d{8}$"),
];

/// Prefixes used for test data and fabricated numbers
const FAKE_PREFIXES: &[&str] = &[
    "123456", "987654", "012345", "55501", "000000", "111111", "222222", "333333",
    "444444", "555555", "666666", "777777", "888888", "999999",
];

const EMERGENCY_NUMBERS: &[&str] = &["911", "999", "112", "000", "110", "119"];

/// Phone normalization and country-aware plausibility checks
pub struct PhoneNumberValidator {
    e164: Regex,
    north_american: Regex,
    countries: RegexSet,
    country_codes: Vec<&'static str>,
}

impl PhoneNumberValidator {
    pub fn new() -> Self {
        Self {
            e164: Regex::new(r"^\+\d{2,15}$").expect("static pattern"),
            north_american: Regex::new(r"^1?[2-9]\d{2}[2-9]\d{6}$").expect("static pattern"),
            countries: RegexSet::new(COUNTRY_PATTERNS.iter().map(|(_, p)| *p))
                .expect("static pattern"),
            country_codes: COUNTRY_PATTERNS.iter().map(|(c, _)| *c).collect(),
        }
    }

    pub fn validate(&self, raw: &str) -> ValidationOutcome {
        let normalized = normalize(raw);
        let digits = normalized.trim_start_matches('+');

        // A single repeated digit fits the generic E.164 and NANP shapes
        if (7..=15).contains(&digits.len()) && is_single_digit_repeated(digits) {
            return repeated_digit();
        }

        if self.e164.is_match(&normalized) || self.north_american.is_match(&normalized) {
            return ValidationOutcome::accept();
        }

        if let Some(index) = self.countries.matches(&normalized).iter().next() {
            tracing::trace!("Phone matched {} pattern", self.country_codes[index]);
            return ValidationOutcome::accept();
        }

        if digits.len() < 7 {
            return ValidationOutcome::reject(FailureCode::TooShort, "Phone number is too short");
        }
        if digits.len() > 15 {
            return ValidationOutcome::reject(FailureCode::TooLong, "Phone number is too long");
        }

        if is_single_digit_repeated(digits) {
            return repeated_digit();
        }

        if FAKE_PREFIXES.iter().any(|p| digits.starts_with(p)) {
            return ValidationOutcome::reject(
                FailureCode::TestOrFakeNumber,
                "This looks like a test or placeholder number",
            );
        }

        if starts_with_sequential_run(digits, 6) {
            return ValidationOutcome::reject(
                FailureCode::SequentialDigits,
                "Phone number cannot be a run of sequential digits",
            );
        }

        if EMERGENCY_NUMBERS.iter().any(|e| digits.contains(e)) {
            return ValidationOutcome::reject(
                FailureCode::EmergencyNumber,
                "Emergency numbers cannot be used",
            );
        }

        ValidationOutcome::reject(
            FailureCode::UnrecognizedFormat,
            "Enter a valid phone number including the country code",
        )
    }

    /// Normalized form the checks operate on
    pub fn normalize(&self, raw: &str) -> String {
        normalize(raw)
    }
}

impl Default for PhoneNumberValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn repeated_digit() -> ValidationOutcome {
    ValidationOutcome::reject(
        FailureCode::RepeatedDigit,
        "Phone number cannot be one digit repeated",
    )
}

/// Digits only, keeping a leading `+`
fn normalize(raw: &str) -> String {
    let trimmed = raw.trim_start();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter(|c| c.is_ascii_digit()));
    out
}

fn is_single_digit_repeated(digits: &str) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    }
}

/// First `len` digits climb or fall by exactly one each step
fn starts_with_sequential_run(digits: &str, len: usize) -> bool {
    let values: Vec<i8> = digits
        .bytes()
        .take(len)
        .map(|b| (b - b'0') as i8)
        .collect();
    if values.len() < len {
        return false;
    }
    let ascending = values.windows(2).all(|w| w[1] - w[0] == 1);
    let descending = values.windows(2).all(|w| w[0] - w[1] == 1);
    ascending || descending
}
