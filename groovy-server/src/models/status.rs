//! Review status shared by friend requests, join requests and
//! university verifications.

use serde::{Deserialize, Serialize};

use super::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Refused,
}

/// Outcome a reviewer can pick for a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Refuse,
}

impl RequestStatus {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "REFUSED" => Ok(Self::Refused),
            other => Err(ValidationError::InvalidVariant {
                field: "status",
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Refused => "REFUSED",
        }
    }

    /// Status after applying `decision`, or `None` if already resolved.
    pub fn resolve(self, decision: Decision) -> Option<Self> {
        match self {
            Self::Pending => Some(decision.target()),
            Self::Accepted | Self::Refused => None,
        }
    }
}

impl Decision {
    /// Parse the lowercase action used in review URLs.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "accept" => Ok(Self::Accept),
            "refuse" => Ok(Self::Refuse),
            other => Err(ValidationError::InvalidVariant {
                field: "decision",
                value: other.to_owned(),
            }),
        }
    }

    pub fn target(&self) -> RequestStatus {
        match self {
            Self::Accept => RequestStatus::Accepted,
            Self::Refuse => RequestStatus::Refused,
        }
    }
}
