//! Personal (one-to-one) chat repository
//!
//! A pair of users shares at most one room regardless of who opened it.
//! Leaving a room soft-deletes it; opening it again brings it back with its
//! history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use super::{simplified_columns, total_of, DbError, SimplifiedUser, UserRepo};
use crate::models::{ChatContent, Paginated, Pagination, ValidationError};

#[derive(Debug, Clone, Serialize)]
pub struct PersonalChat {
    pub id: i64,
    pub chatroom: i64,
    pub sender: SimplifiedUser,
    pub receiver: SimplifiedUser,
    pub content: String,
    pub is_join_request: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersonalChat {
    /// Columns are read as `{p}id`, `{p}content`, ... and users as
    /// `{p}sender_*` / `{p}receiver_*`.
    fn from_row(row: &PgRow, p: &str) -> Self {
        Self {
            id: row.get(format!("{p}id").as_str()),
            chatroom: row.get(format!("{p}chatroom_id").as_str()),
            sender: SimplifiedUser::from_prefixed(row, &format!("{p}sender")),
            receiver: SimplifiedUser::from_prefixed(row, &format!("{p}receiver")),
            content: row.get(format!("{p}content").as_str()),
            is_join_request: row.get(format!("{p}is_join_request_message").as_str()),
            created_at: row.get(format!("{p}created_at").as_str()),
            updated_at: row.get(format!("{p}updated_at").as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonalChatroomView {
    pub id: i64,
    pub sender: i64,
    pub receiver: i64,
    pub latest_chat: Option<PersonalChat>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersonalChatroomView {
    fn from_row(row: &PgRow) -> Self {
        let latest: Option<i64> = row.get("lc_id");
        Self {
            id: row.get("id"),
            sender: row.get("sender_id"),
            receiver: row.get("receiver_id"),
            latest_chat: latest.map(|_| PersonalChat::from_row(row, "lc_")),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// `with_total` adds the `COUNT(*) OVER()` column used by paged lists.
fn chat_select(with_total: bool) -> String {
    format!(
        "SELECT {}c.id, c.chatroom_id, c.content, c.is_join_request_message, \
                c.created_at, c.updated_at, {}, {} \
         FROM personal_chat c \
         JOIN users su ON su.id = c.sender_id \
         JOIN users ru ON ru.id = c.receiver_id",
        if with_total { "COUNT(*) OVER() AS total, " } else { "" },
        simplified_columns("su", "sender"),
        simplified_columns("ru", "receiver"),
    )
}

/// `with_total` adds the `COUNT(*) OVER()` column used by paged lists.
fn room_select(with_total: bool) -> String {
    format!(
        "SELECT {}r.id, r.sender_id, r.receiver_id, r.created_at, r.updated_at, \
                lc.id AS lc_id, lc.chatroom_id AS lc_chatroom_id, lc.content AS lc_content, \
                lc.is_join_request_message AS lc_is_join_request_message, \
                lc.created_at AS lc_created_at, lc.updated_at AS lc_updated_at, {}, {} \
         FROM personal_chatroom r \
         LEFT JOIN LATERAL ( \
             SELECT * FROM personal_chat c \
             WHERE c.chatroom_id = r.id AND c.deleted_at IS NULL \
             ORDER BY c.created_at DESC, c.id DESC LIMIT 1 \
         ) lc ON TRUE \
         LEFT JOIN users lsu ON lsu.id = lc.sender_id \
         LEFT JOIN users lru ON lru.id = lc.receiver_id",
        if with_total { "COUNT(*) OVER() AS total, " } else { "" },
        simplified_columns("lsu", "lc_sender"),
        simplified_columns("lru", "lc_receiver"),
    )
}

pub struct PersonalChatRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PersonalChatRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get or create the room shared by `a` and `b`.
    ///
    /// Returns the room id and whether it was newly created. Concurrent opens
    /// of the same pair settle on one room through the pair unique index.
    pub(crate) async fn open_room_in(
        conn: &mut PgConnection,
        a: i64,
        b: i64,
    ) -> Result<(i64, bool), DbError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO personal_chatroom (sender_id, receiver_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            RETURNING id
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.get("id"), true));
        }

        let row = sqlx::query(
            r#"
            SELECT id, deleted_at FROM personal_chatroom
            WHERE LEAST(sender_id, receiver_id) = LEAST($1::BIGINT, $2::BIGINT)
              AND GREATEST(sender_id, receiver_id) = GREATEST($1::BIGINT, $2::BIGINT)
            FOR UPDATE
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&mut *conn)
        .await?;

        let id: i64 = row.get("id");
        let deleted_at: Option<DateTime<Utc>> = row.get("deleted_at");
        if deleted_at.is_some() {
            sqlx::query(
                "UPDATE personal_chatroom SET deleted_at = NULL, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .execute(&mut *conn)
            .await?;
        }
        Ok((id, false))
    }

    /// Append a chat to a room and bump the room's `updated_at`.
    pub(crate) async fn insert_chat_in(
        conn: &mut PgConnection,
        room_id: i64,
        sender: i64,
        receiver: i64,
        content: &ChatContent,
        is_join_request: bool,
    ) -> Result<PersonalChat, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO personal_chat
                (chatroom_id, sender_id, receiver_id, content, is_join_request_message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(room_id)
        .bind(sender)
        .bind(receiver)
        .bind(content.as_str())
        .bind(is_join_request)
        .fetch_one(&mut *conn)
        .await?;
        let id: i64 = row.get("id");

        sqlx::query("UPDATE personal_chatroom SET updated_at = NOW() WHERE id = $1")
            .bind(room_id)
            .execute(&mut *conn)
            .await?;

        let row = sqlx::query(&format!("{} WHERE c.id = $1", chat_select(false)))
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(PersonalChat::from_row(&row, ""))
    }

    /// The two participants of an open room.
    async fn participants(conn: &mut PgConnection, room_id: i64) -> Result<(i64, i64), DbError> {
        let row = sqlx::query(
            "SELECT sender_id, receiver_id FROM personal_chatroom WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("personal chatroom", room_id))?;
        Ok((row.get("sender_id"), row.get("receiver_id")))
    }

    /// The other participant, or `Forbidden` if `actor` is not in the room.
    async fn counterpart(
        conn: &mut PgConnection,
        room_id: i64,
        actor: i64,
    ) -> Result<i64, DbError> {
        let (sender, receiver) = Self::participants(conn, room_id).await?;
        match actor {
            a if a == sender => Ok(receiver),
            a if a == receiver => Ok(sender),
            _ => Err(DbError::forbidden("not a participant of this chatroom")),
        }
    }

    async fn view_in(conn: &mut PgConnection, room_id: i64) -> Result<PersonalChatroomView, DbError> {
        let row = sqlx::query(&format!("{} WHERE r.id = $1", room_select(false)))
            .bind(room_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("personal chatroom", room_id))?;
        Ok(PersonalChatroomView::from_row(&row))
    }

    /// Open (or reopen) a room with `receiver`.
    pub async fn open(
        &self,
        actor: i64,
        receiver: i64,
    ) -> Result<(PersonalChatroomView, bool), DbError> {
        if actor == receiver {
            return Err(ValidationError::InvalidFormat {
                field: "receiver",
                reason: "cannot open a chatroom with yourself",
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        UserRepo::nickname_in(&mut *tx, receiver).await?;

        let (room_id, created) = Self::open_room_in(&mut *tx, actor, receiver).await?;
        let view = Self::view_in(&mut *tx, room_id).await?;

        tx.commit().await?;
        if created {
            tracing::info!(room_id, sender = actor, receiver, "personal chatroom opened");
        }
        Ok((view, created))
    }

    /// Rooms the user takes part in, most recently active first.
    pub async fn rooms_for_user(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<PersonalChatroomView>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            {select}
            WHERE r.deleted_at IS NULL AND (r.sender_id = $1 OR r.receiver_id = $1)
            ORDER BY r.updated_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "#,
            select = room_select(true),
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = total_of(&rows);
        let items = rows.iter().map(PersonalChatroomView::from_row).collect();
        Ok(page.wrap(items, total))
    }

    pub async fn get(&self, room_id: i64, actor: i64) -> Result<PersonalChatroomView, DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::counterpart(&mut conn, room_id, actor).await?;
        Self::view_in(&mut conn, room_id).await
    }

    /// Chat history, oldest first.
    pub async fn list_chats(
        &self,
        room_id: i64,
        actor: i64,
        page: Pagination,
    ) -> Result<Paginated<PersonalChat>, DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::counterpart(&mut conn, room_id, actor).await?;

        let rows = sqlx::query(&format!(
            r#"
            {select}
            WHERE c.chatroom_id = $1 AND c.deleted_at IS NULL
            ORDER BY c.created_at, c.id
            LIMIT $2 OFFSET $3
            "#,
            select = chat_select(true),
        ))
        .bind(room_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

        let total = total_of(&rows);
        let items = rows.iter().map(|r| PersonalChat::from_row(r, "")).collect();
        Ok(page.wrap(items, total))
    }

    /// Post a chat; the receiver is the other participant.
    pub async fn post(
        &self,
        room_id: i64,
        actor: i64,
        content: ChatContent,
    ) -> Result<PersonalChat, DbError> {
        let mut tx = self.pool.begin().await?;
        let receiver = Self::counterpart(&mut *tx, room_id, actor).await?;
        let chat = Self::insert_chat_in(&mut *tx, room_id, actor, receiver, &content, false).await?;
        tx.commit().await?;
        Ok(chat)
    }

    /// Soft-delete one of the actor's own chats.
    pub async fn delete_chat(&self, chat_id: i64, actor: i64) -> Result<(), DbError> {
        let row = sqlx::query(
            "SELECT sender_id FROM personal_chat WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(chat_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("personal chat", chat_id))?;

        if row.get::<i64, _>("sender_id") != actor {
            return Err(DbError::forbidden("only the sender can delete a chat"));
        }

        sqlx::query("UPDATE personal_chat SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(chat_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Leave a room (soft delete). Reopening it restores the history.
    pub async fn leave(&self, room_id: i64, actor: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        Self::counterpart(&mut *tx, room_id, actor).await?;
        sqlx::query(
            "UPDATE personal_chatroom SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(room_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::info!(room_id, user_id = actor, "personal chatroom left");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn one_room_per_pair_with_latest_chat() {
        let pool = test_support::pool().await;
        let a = test_support::user(&pool, "pa").await;
        let b = test_support::user(&pool, "pb").await;
        let outsider = test_support::user(&pool, "pc").await;
        let repo = PersonalChatRepo::new(&pool);

        let (room, created) = repo.open(a.id, b.id).await.unwrap();
        assert!(created);
        assert!(room.latest_chat.is_none());

        let (again, created) = repo.open(b.id, a.id).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, room.id);

        repo.post(room.id, a.id, ChatContent::new("first").unwrap())
            .await
            .unwrap();
        let reply = repo
            .post(room.id, b.id, ChatContent::new("second").unwrap())
            .await
            .unwrap();
        assert_eq!(reply.receiver.id, a.id);

        let view = repo.get(room.id, a.id).await.unwrap();
        assert_eq!(view.latest_chat.map(|c| c.content), Some("second".to_owned()));

        let err = repo.get(room.id, outsider.id).await.unwrap_err();
        assert!(matches!(err, DbError::Forbidden { .. }));

        let err = repo.delete_chat(reply.id, a.id).await.unwrap_err();
        assert!(matches!(err, DbError::Forbidden { .. }));
        repo.delete_chat(reply.id, b.id).await.unwrap();

        let chats = repo
            .list_chats(room.id, b.id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(chats.total, 1);
        assert_eq!(chats.items[0].content, "first");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn leaving_and_reopening_keeps_history() {
        let pool = test_support::pool().await;
        let a = test_support::user(&pool, "la").await;
        let b = test_support::user(&pool, "lb").await;
        let repo = PersonalChatRepo::new(&pool);

        let (room, _) = repo.open(a.id, b.id).await.unwrap();
        repo.post(room.id, a.id, ChatContent::new("hello").unwrap())
            .await
            .unwrap();
        repo.leave(room.id, b.id).await.unwrap();
        assert!(matches!(
            repo.get(room.id, a.id).await,
            Err(DbError::NotFound { .. })
        ));

        let (reopened, created) = repo.open(b.id, a.id).await.unwrap();
        assert!(!created);
        assert_eq!(reopened.id, room.id);
        assert!(reopened.latest_chat.is_some());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn concurrent_opens_share_one_room() {
        let pool = test_support::pool().await;
        let repo = PersonalChatRepo::new(&pool);

        for _ in 0..10 {
            let a = test_support::user(&pool, "ra").await;
            let b = test_support::user(&pool, "rb").await;

            let (first, second) = tokio::join!(repo.open(a.id, b.id), repo.open(b.id, a.id));
            let (first, first_created) = first.unwrap();
            let (second, second_created) = second.unwrap();
            assert_eq!(first.id, second.id);
            assert!(first_created ^ second_created);
        }
    }
}
