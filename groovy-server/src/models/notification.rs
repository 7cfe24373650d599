//! Notification kinds and content limits

use serde::{Deserialize, Serialize};

use super::validation::{check_len, ValidationError};

const MAX_CONTENT_LEN: usize = 300;
const MAX_REDIRECT_URL_LEN: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "FRIEND REQUEST RECEIVED")]
    FriendRequestReceived,
    #[serde(rename = "FRIEND REQUEST ACCEPTED")]
    FriendRequestAccepted,
    #[serde(rename = "JOIN REQUEST RECEIVED")]
    JoinRequestReceived,
    #[serde(rename = "JOIN REQUEST ACCEPTED")]
    JoinRequestAccepted,
    #[serde(rename = "JOIN REQUEST REFUSED")]
    JoinRequestRefused,
    #[serde(rename = "GENERAL")]
    General,
    #[serde(rename = "PROMOTION")]
    Promotion,
    #[serde(rename = "OTHER")]
    Other,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FriendRequestReceived => "FRIEND REQUEST RECEIVED",
            Self::FriendRequestAccepted => "FRIEND REQUEST ACCEPTED",
            Self::JoinRequestReceived => "JOIN REQUEST RECEIVED",
            Self::JoinRequestAccepted => "JOIN REQUEST ACCEPTED",
            Self::JoinRequestRefused => "JOIN REQUEST REFUSED",
            Self::General => "GENERAL",
            Self::Promotion => "PROMOTION",
            Self::Other => "OTHER",
        }
    }
}

/// A notification ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub content: String,
    pub redirect_url: Option<String>,
}

impl NotificationDraft {
    pub fn new(
        user_id: i64,
        notification_type: NotificationType,
        content: String,
        redirect_url: Option<String>,
    ) -> Result<Self, ValidationError> {
        if content.is_empty() {
            return Err(ValidationError::Empty { field: "content" });
        }
        check_len("content", &content, MAX_CONTENT_LEN)?;
        if let Some(url) = &redirect_url {
            check_len("redirect_url", url, MAX_REDIRECT_URL_LEN)?;
        }

        Ok(Self {
            user_id,
            notification_type,
            content,
            redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_strings_have_spaces() {
        assert_eq!(NotificationType::JoinRequestRefused.as_str(), "JOIN REQUEST REFUSED");
        assert_eq!(
            serde_json::to_string(&NotificationType::FriendRequestAccepted).unwrap(),
            "\"FRIEND REQUEST ACCEPTED\""
        );
    }

    #[test]
    fn draft_limits() {
        assert!(NotificationDraft::new(1, NotificationType::General, "hi".into(), None).is_ok());
        assert!(matches!(
            NotificationDraft::new(1, NotificationType::General, String::new(), None),
            Err(ValidationError::Empty { .. })
        ));
        assert!(matches!(
            NotificationDraft::new(1, NotificationType::General, "x".repeat(301), None),
            Err(ValidationError::TooLong { max: 300, .. })
        ));
        assert!(matches!(
            NotificationDraft::new(
                1,
                NotificationType::General,
                "x".into(),
                Some("r".repeat(31))
            ),
            Err(ValidationError::TooLong { max: 30, .. })
        ));
    }
}
