//! Notification repository
//!
//! Drafts come from [`NotificationService`](crate::services::NotificationService);
//! writers that trigger a notification insert it through [`NotificationRepo::insert_in`]
//! inside their own transaction.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use super::{total_of, DbError};
use crate::models::{NotificationDraft, Paginated, Pagination};

#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: String,
    pub content: String,
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NotificationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a draft on an existing connection or transaction.
    pub(crate) async fn insert_in(
        conn: &mut PgConnection,
        draft: &NotificationDraft,
    ) -> Result<Notification, DbError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO user_notification (user_id, notification_type, content, redirect_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, notification_type, content, redirect_url, created_at, updated_at
            "#,
        )
        .bind(draft.user_id)
        .bind(draft.notification_type.as_str())
        .bind(&draft.content)
        .bind(draft.redirect_url.as_deref())
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(
            user_id = draft.user_id,
            kind = draft.notification_type.as_str(),
            "notification stored"
        );
        Ok(notification)
    }

    /// Notifications for a user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<Notification>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, notification_type, content, redirect_url,
                   created_at, updated_at, COUNT(*) OVER() AS total
            FROM user_notification
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = total_of(&rows);
        let items = rows
            .iter()
            .map(Notification::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }

    /// Delete one of the user's own notifications.
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM user_notification WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("notification", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::{test_support, FriendRepo};

    #[tokio::test]
    #[ignore = "requires database"]
    async fn only_the_owner_deletes() {
        let pool = test_support::pool().await;
        let sender = test_support::user(&pool, "nsend").await;
        let owner = test_support::user(&pool, "nowner").await;
        FriendRepo::new(&pool)
            .send_request(sender.id, owner.id)
            .await
            .unwrap();
        let repo = NotificationRepo::new(&pool);

        let inbox = repo
            .list_for_user(owner.id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(inbox.total, 1);
        let notification = &inbox.items[0];
        assert_eq!(notification.notification_type, "FRIEND REQUEST RECEIVED");

        let err = repo.delete(notification.id, sender.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        repo.delete(notification.id, owner.id).await.unwrap();
        let inbox = repo
            .list_for_user(owner.id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(inbox.total, 0);

        let err = repo.delete(notification.id, owner.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
