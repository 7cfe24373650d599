//! Notification templating
//!
//! Pure functions from social events to [`NotificationDraft`]s. Repositories
//! store the drafts in the same transaction as the event that caused them.

use crate::models::{Decision, NotificationDraft, NotificationType, ValidationError};

const CHAT_REDIRECT: &str = "chat/";
const FRIEND_REDIRECT: &str = "friend/";

/// Minimal view of a user for notification text
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub id: i64,
    pub nickname: &'a str,
}

impl Actor<'_> {
    /// Nickname, or `#id` for accounts that never set one.
    pub fn label(&self) -> String {
        if self.nickname.is_empty() {
            format!("#{}", self.id)
        } else {
            self.nickname.to_owned()
        }
    }
}

/// Minimal view of a group for notification text
#[derive(Debug, Clone, Copy)]
pub struct GroupRef<'a> {
    pub id: i64,
    pub title: &'a str,
    pub manager_id: i64,
}

pub struct NotificationService;

impl NotificationService {
    /// Tell the manager someone wants to join their group.
    pub fn join_request(
        requestor: Actor<'_>,
        group: GroupRef<'_>,
    ) -> Result<NotificationDraft, ValidationError> {
        NotificationDraft::new(
            group.manager_id,
            NotificationType::JoinRequestReceived,
            format!(
                "{}님이 '{}' 그룹에 쪼인 요청을 보냈어요!",
                requestor.label(),
                group.title
            ),
            Some(CHAT_REDIRECT.to_owned()),
        )
    }

    /// Tell the requestor how the manager decided.
    pub fn join_request_result(
        requestor_id: i64,
        group: GroupRef<'_>,
        decision: Decision,
    ) -> Result<NotificationDraft, ValidationError> {
        match decision {
            Decision::Accept => NotificationDraft::new(
                requestor_id,
                NotificationType::JoinRequestAccepted,
                format!("신청했던 '{}' 그룹에 쪼인되었어요!", group.title),
                Some(CHAT_REDIRECT.to_owned()),
            ),
            Decision::Refuse => NotificationDraft::new(
                requestor_id,
                NotificationType::JoinRequestRefused,
                format!("요청했던 '{}' 그룹에 쪼인이 거절되었어요. T_T", group.title),
                Some(format!("group/{}/", group.id)),
            ),
        }
    }

    /// Tell the recipient of a friend request.
    pub fn friend_request(
        requestor: Actor<'_>,
        recipient_id: i64,
    ) -> Result<NotificationDraft, ValidationError> {
        NotificationDraft::new(
            recipient_id,
            NotificationType::FriendRequestReceived,
            format!("{}님이 친구 요청을 보냈어요!", requestor.label()),
            Some(FRIEND_REDIRECT.to_owned()),
        )
    }

    /// Tell the sender their friend request went through.
    pub fn friend_request_accepted(
        accepter: Actor<'_>,
        requestor_id: i64,
    ) -> Result<NotificationDraft, ValidationError> {
        NotificationDraft::new(
            requestor_id,
            NotificationType::FriendRequestAccepted,
            format!("{}님과 친구가 되었어요!", accepter.label()),
            Some(FRIEND_REDIRECT.to_owned()),
        )
    }

    /// Outcome of a manual university verification.
    pub fn verification_result(
        user_id: i64,
        university: &str,
        decision: Decision,
    ) -> Result<NotificationDraft, ValidationError> {
        let content = match decision {
            Decision::Accept => format!("{} 학교 인증이 완료되었어요!", university),
            Decision::Refuse => {
                format!("{} 학교 인증이 거절되었어요. 다시 신청해 주세요.", university)
            }
        };
        NotificationDraft::new(user_id, NotificationType::General, content, None)
    }

    /// Body of the personal chat dropped in the manager's inbox on a join request.
    pub fn join_request_chat(group: GroupRef<'_>) -> String {
        format!("'{}' 그룹에 쪼인하고 싶어요!", group.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band() -> GroupRef<'static> {
        GroupRef {
            id: 7,
            title: "밴드부",
            manager_id: 3,
        }
    }

    #[test]
    fn join_request_goes_to_manager() {
        let requestor = Actor {
            id: 11,
            nickname: "민수",
        };
        let draft = NotificationService::join_request(requestor, band()).unwrap();

        assert_eq!(draft.user_id, 3);
        assert_eq!(draft.notification_type, NotificationType::JoinRequestReceived);
        assert_eq!(draft.content, "민수님이 '밴드부' 그룹에 쪼인 요청을 보냈어요!");
        assert_eq!(draft.redirect_url.as_deref(), Some("chat/"));
    }

    #[test]
    fn accepted_join_redirects_to_chat() {
        let draft =
            NotificationService::join_request_result(11, band(), Decision::Accept).unwrap();
        assert_eq!(draft.user_id, 11);
        assert_eq!(draft.notification_type, NotificationType::JoinRequestAccepted);
        assert_eq!(draft.content, "신청했던 '밴드부' 그룹에 쪼인되었어요!");
        assert_eq!(draft.redirect_url.as_deref(), Some("chat/"));
    }

    #[test]
    fn refused_join_uses_refused_type_and_group_redirect() {
        let draft =
            NotificationService::join_request_result(11, band(), Decision::Refuse).unwrap();
        assert_eq!(draft.notification_type, NotificationType::JoinRequestRefused);
        assert_eq!(draft.content, "요청했던 '밴드부' 그룹에 쪼인이 거절되었어요. T_T");
        assert_eq!(draft.redirect_url.as_deref(), Some("group/7/"));
    }

    #[test]
    fn actor_without_nickname_uses_id() {
        let actor = Actor {
            id: 42,
            nickname: "",
        };
        let draft = NotificationService::friend_request(actor, 5).unwrap();
        assert_eq!(draft.content, "#42님이 친구 요청을 보냈어요!");
        assert_eq!(draft.user_id, 5);
    }

    #[test]
    fn friend_accept_notifies_requestor() {
        let accepter = Actor {
            id: 5,
            nickname: "지은",
        };
        let draft = NotificationService::friend_request_accepted(accepter, 42).unwrap();
        assert_eq!(draft.user_id, 42);
        assert_eq!(draft.notification_type, NotificationType::FriendRequestAccepted);
    }

    #[test]
    fn verification_result_is_general() {
        let draft =
            NotificationService::verification_result(9, "YONSEI", Decision::Accept).unwrap();
        assert_eq!(draft.notification_type, NotificationType::General);
        assert!(draft.redirect_url.is_none());
    }
}
