//! User profile fields

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::validation::{check_len, ValidationError};

const MAX_NICKNAME_LEN: usize = 20;
const MAX_IMAGE_URL_LEN: usize = 256;
const MAX_PUSH_ID_LEN: usize = 64;
const MAX_APP_VERSION_LEN: usize = 16;

/// Earliest admission year offered
const FIRST_ADMISSION_YEAR: i16 = 2000;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("invalid url regex"));

/// Display name used across the service. May be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Nickname(String);

impl Nickname {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        check_len("nickname", s, MAX_NICKNAME_LEN)?;
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            other => Err(ValidationError::InvalidVariant {
                field: "gender",
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
        }
    }
}

/// School year, 1 (freshmen) through 4 (senior)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grade(i16);

impl Grade {
    pub const FRESHMEN: Grade = Grade(1);
    pub const SOPHOMORE: Grade = Grade(2);
    pub const JUNIOR: Grade = Grade(3);
    pub const SENIOR: Grade = Grade(4);

    pub fn new(value: i16) -> Result<Self, ValidationError> {
        if !(1..=4).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: "grade",
                min: 1,
                max: 4,
            });
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> i16 {
        self.0
    }
}

/// Admission year, from 2000 up to next year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionClass(i16);

impl AdmissionClass {
    pub fn new(year: i16) -> Result<Self, ValidationError> {
        let last = Self::last_year();
        if !(FIRST_ADMISSION_YEAR..=last).contains(&year) {
            return Err(ValidationError::OutOfRange {
                field: "admission_class",
                min: FIRST_ADMISSION_YEAR as i64,
                max: last as i64,
            });
        }
        Ok(Self(year))
    }

    /// The current calendar year.
    pub fn current() -> Self {
        Self(Utc::now().year() as i16)
    }

    fn last_year() -> i16 {
        Utc::now().year() as i16 + 1
    }

    pub fn get(&self) -> i16 {
        self.0
    }
}

impl Default for AdmissionClass {
    fn default() -> Self {
        Self::current()
    }
}

/// Profile or thumbnail image location. Empty means "no image".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageUrl(String);

impl ImageUrl {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        check_len("image url", s, MAX_IMAGE_URL_LEN)?;
        if !s.is_empty() && !URL_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "image url",
                reason: "must be an http(s) URL",
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reason recorded when an account is soft-deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteReason {
    #[serde(rename = "기타")]
    Other,
}

impl DeleteReason {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "기타" => Ok(Self::Other),
            other => Err(ValidationError::InvalidVariant {
                field: "deleted_reason",
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Other => "기타",
        }
    }
}

/// Device push registration id
pub fn push_id(s: &str) -> Result<String, ValidationError> {
    check_len("push_id", s, MAX_PUSH_ID_LEN)?;
    Ok(s.to_owned())
}

/// Client app version string
pub fn app_version(s: &str) -> Result<String, ValidationError> {
    check_len("app_version", s, MAX_APP_VERSION_LEN)?;
    Ok(s.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_limits() {
        assert_eq!(Nickname::new("  groovy ").unwrap().as_str(), "groovy");
        assert!(Nickname::new("").is_ok());
        assert!(matches!(
            Nickname::new(&"x".repeat(21)).unwrap_err(),
            ValidationError::TooLong { max: 20, .. }
        ));
    }

    #[test]
    fn gender_variants() {
        assert_eq!(Gender::parse("MALE").unwrap(), Gender::Male);
        assert_eq!(Gender::parse("FEMALE").unwrap().as_str(), "FEMALE");
        assert!(Gender::parse("male").is_err());
    }

    #[test]
    fn grade_range() {
        assert_eq!(Grade::new(1).unwrap(), Grade::FRESHMEN);
        assert_eq!(Grade::new(4).unwrap(), Grade::SENIOR);
        assert!(Grade::new(0).is_err());
        assert!(Grade::new(5).is_err());
    }

    #[test]
    fn admission_class_range() {
        let this_year = Utc::now().year() as i16;
        assert!(AdmissionClass::new(2000).is_ok());
        assert!(AdmissionClass::new(this_year + 1).is_ok());
        assert!(AdmissionClass::new(this_year + 2).is_err());
        assert!(AdmissionClass::new(1999).is_err());
        assert_eq!(AdmissionClass::default().get(), this_year);
    }

    #[test]
    fn image_url() {
        assert!(ImageUrl::new("").is_ok());
        assert!(ImageUrl::new("https://cdn.example.com/a.png").is_ok());
        assert!(ImageUrl::new("ftp://cdn.example.com/a.png").is_err());
        let long = format!("https://cdn.example.com/{}", "a".repeat(256));
        assert!(matches!(
            ImageUrl::new(&long).unwrap_err(),
            ValidationError::TooLong { .. }
        ));
    }

    #[test]
    fn delete_reason() {
        assert_eq!(DeleteReason::parse("기타").unwrap(), DeleteReason::Other);
        assert!(DeleteReason::parse("other").is_err());
    }

    #[test]
    fn short_strings() {
        assert!(push_id(&"p".repeat(64)).is_ok());
        assert!(push_id(&"p".repeat(65)).is_err());
        assert!(app_version("1.4.2").is_ok());
        assert!(app_version(&"1".repeat(17)).is_err());
    }
}
