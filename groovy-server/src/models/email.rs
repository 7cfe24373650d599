//! Email address validation and normalisation
//!
//! Email is the login identifier, so two spellings that differ only in the
//! domain's case must map to the same account.

use once_cell::sync::Lazy;
use regex::Regex;

use super::validation::{check_len, ValidationError};

/// Maximum length for stored email addresses
const MAX_EMAIL_LEN: usize = 64;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex")
});

/// Validated, normalised email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Create an email, trimming whitespace and lower-casing the domain.
    ///
    /// The local part keeps its case.
    ///
    /// # Example
    /// ```
    /// use groovy_server::models::Email;
    ///
    /// let email = Email::new(" Kim@Yonsei.AC.KR ").unwrap();
    /// assert_eq!(email.as_str(), "Kim@yonsei.ac.kr");
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        check_len("email", s, MAX_EMAIL_LEN)?;

        if !EMAIL_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "must look like name@domain.tld",
            });
        }

        let normalized = match s.rsplit_once('@') {
            Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
            None => s.to_owned(),
        };
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_domain_only() {
        let email = Email::new("MinSu.Kim@YONSEI.ac.kr").unwrap();
        assert_eq!(email.as_str(), "MinSu.Kim@yonsei.ac.kr");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(
            Email::new("   ").unwrap_err(),
            ValidationError::Empty { field: "email" }
        );
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["no-at-sign", "two@@yonsei.ac.kr", "a@localhost", "sp ace@x.com"] {
            let err = Email::new(bad).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidFormat { .. }), "{bad}");
        }
    }

    #[test]
    fn max_length() {
        let ok = format!("{}@yonsei.ac.kr", "a".repeat(64 - 13));
        assert!(Email::new(&ok).is_ok());

        let too_long = format!("{}@yonsei.ac.kr", "a".repeat(64 - 12));
        let err = Email::new(&too_long).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 64, .. }));
    }
}
