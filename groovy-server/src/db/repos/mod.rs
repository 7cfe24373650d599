//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Soft-deleted rows (`deleted_at IS NOT NULL`) are invisible to reads
//! - Uniqueness is left to DB constraints; violations surface as `Conflict`
//! - Multi-step operations (request + notification, accept + membership)
//!   run in one transaction

pub mod users;
pub mod universities;
pub mod verifications;
pub mod suggestions;
pub mod notifications;
pub mod friends;
pub mod groups;
pub mod group_chat;
pub mod personal_chat;

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use crate::models::ValidationError;

pub use users::{NewUser, User, UserPatch, UserRepo};
pub use universities::{University, UniversityRepo};
pub use verifications::{Verification, VerificationRepo};
pub use suggestions::{SuggestionRecord, SuggestionRepo};
pub use notifications::{Notification, NotificationRepo};
pub use friends::{FriendRepo, FriendRequest, RequestBox};
pub use groups::{GroupDetail, GroupRepo, JoinRequest};
pub use group_chat::{GroupChat, GroupChatRepo, GroupChatroomView, GroupNotice, GroupSummary};
pub use personal_chat::{PersonalChat, PersonalChatRepo, PersonalChatroomView};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl DbError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub(crate) fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return Self::Conflict {
                    reason: format!(
                        "duplicate value violates {}",
                        db.constraint().unwrap_or("a unique constraint")
                    ),
                };
            }
            if db.is_foreign_key_violation() {
                return Self::NotFound {
                    resource: "referenced record",
                    id: db.constraint().unwrap_or("unknown").to_owned(),
                };
            }
        }
        Self::Sqlx(e)
    }
}

/// Public face of a user inside chats, friend lists and requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SimplifiedUser {
    pub id: i64,
    pub nickname: String,
    pub profile_image_url: String,
    pub thumbnail_image_url: String,
}

impl SimplifiedUser {
    /// Read a user joined under `{prefix}_id`, `{prefix}_nickname`, ...
    pub(crate) fn from_prefixed(row: &PgRow, prefix: &str) -> Self {
        Self {
            id: row.get(format!("{prefix}_id").as_str()),
            nickname: row.get(format!("{prefix}_nickname").as_str()),
            profile_image_url: row.get(format!("{prefix}_profile_image_url").as_str()),
            thumbnail_image_url: row.get(format!("{prefix}_thumbnail_image_url").as_str()),
        }
    }
}

/// Select list for a `users` alias joined as a [`SimplifiedUser`].
pub(crate) fn simplified_columns(alias: &str, prefix: &str) -> String {
    format!(
        "{a}.id AS {p}_id, {a}.nickname AS {p}_nickname, \
         {a}.profile_image_url AS {p}_profile_image_url, \
         {a}.thumbnail_image_url AS {p}_thumbnail_image_url",
        a = alias,
        p = prefix
    )
}

/// Window-function total from the first row of a page.
pub(crate) fn total_of(rows: &[PgRow]) -> i64 {
    rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplified_columns_alias_everything() {
        let cols = simplified_columns("su", "sender");
        assert!(cols.contains("su.id AS sender_id"));
        assert!(cols.contains("su.thumbnail_image_url AS sender_thumbnail_image_url"));
    }

    #[test]
    fn row_not_found_is_sqlx_error() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Sqlx(_)));
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            DbError::not_found("user", 7).to_string(),
            "not found: user '7'"
        );
        assert_eq!(
            DbError::conflict("already friends").to_string(),
            "conflict: already friends"
        );
    }
}
