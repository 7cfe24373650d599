//! University choices and manual verification methods

use serde::{Deserialize, Serialize};

use super::validation::{check_len, ValidationError};

const MAX_VERIFICATION_IMG_URL_LEN: usize = 256;

/// Universities the platform serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UniversityName {
    Yonsei,
}

impl UniversityName {
    pub const ALL: [UniversityName; 1] = [UniversityName::Yonsei];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yonsei => "YONSEI",
        }
    }
}

/// Evidence a student submits to prove enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationMethod {
    #[serde(rename = "STUDENT ID")]
    StudentId,
    #[serde(rename = "PROOF OF ENROLLMENT")]
    ProofOfEnrollment,
    #[serde(rename = "PROOF OF ACCEPTANCE")]
    ProofOfAcceptance,
}

impl VerificationMethod {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "STUDENT ID" => Ok(Self::StudentId),
            "PROOF OF ENROLLMENT" => Ok(Self::ProofOfEnrollment),
            "PROOF OF ACCEPTANCE" => Ok(Self::ProofOfAcceptance),
            other => Err(ValidationError::InvalidVariant {
                field: "verification_method",
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StudentId => "STUDENT ID",
            Self::ProofOfEnrollment => "PROOF OF ENROLLMENT",
            Self::ProofOfAcceptance => "PROOF OF ACCEPTANCE",
        }
    }
}

/// Uploaded evidence image location
pub fn verification_img_url(s: &str) -> Result<String, ValidationError> {
    check_len("verification_img_url", s, MAX_VERIFICATION_IMG_URL_LEN)?;
    Ok(s.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn university_names() {
        assert_eq!(UniversityName::Yonsei.as_str(), "YONSEI");
        assert_eq!(
            serde_json::to_string(&UniversityName::ALL).unwrap(),
            "[\"YONSEI\"]"
        );
    }

    #[test]
    fn verification_methods_keep_spaces() {
        let m = VerificationMethod::parse("PROOF OF ENROLLMENT").unwrap();
        assert_eq!(m, VerificationMethod::ProofOfEnrollment);
        assert_eq!(
            serde_json::to_string(&VerificationMethod::StudentId).unwrap(),
            "\"STUDENT ID\""
        );
        assert!(VerificationMethod::parse("STUDENT_ID").is_err());
    }
}
