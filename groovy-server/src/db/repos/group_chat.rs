//! Group chatroom repository
//!
//! Only members of the owning group can read or post. A chatroom has at most
//! one notice, which pins one of the room's chats.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use super::{simplified_columns, total_of, DbError, GroupRepo, SimplifiedUser};
use crate::models::{ChatContent, Paginated, Pagination};

#[derive(Debug, Clone, Serialize)]
pub struct GroupChat {
    pub id: i64,
    pub chatroom: i64,
    pub user: SimplifiedUser,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupChat {
    /// Columns are read as `{p}id`, `{p}content`, ... and the author as `{p}user_*`.
    fn from_row(row: &PgRow, p: &str) -> Self {
        Self {
            id: row.get(format!("{p}id").as_str()),
            chatroom: row.get(format!("{p}chatroom_id").as_str()),
            user: SimplifiedUser::from_prefixed(row, &format!("{p}user")),
            content: row.get(format!("{p}content").as_str()),
            created_at: row.get(format!("{p}created_at").as_str()),
            updated_at: row.get(format!("{p}updated_at").as_str()),
        }
    }

    fn from_row_opt(row: &PgRow, p: &str) -> Option<Self> {
        let id: Option<i64> = row.get(format!("{p}id").as_str());
        id.map(|_| Self::from_row(row, p))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupNotice {
    pub id: i64,
    pub chatroom: i64,
    pub pinned_chat: Option<GroupChat>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupChatroomView {
    pub id: i64,
    pub group: GroupSummary,
    pub latest_chat: Option<GroupChat>,
    pub notice: Option<GroupNotice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupChatroomView {
    fn from_row(row: &PgRow) -> Self {
        let id: i64 = row.get("id");
        let notice_id: Option<i64> = row.get("notice_id");
        let notice = notice_id.map(|notice_id| GroupNotice {
            id: notice_id,
            chatroom: id,
            pinned_chat: GroupChat::from_row_opt(row, "pc_"),
            created_at: row.get("notice_created_at"),
            updated_at: row.get("notice_updated_at"),
        });

        Self {
            id,
            group: GroupSummary {
                id: row.get("group_id"),
                title: row.get("group_title"),
            },
            latest_chat: GroupChat::from_row_opt(row, "lc_"),
            notice,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

fn chat_select(with_total: bool) -> String {
    format!(
        "SELECT {}c.id, c.chatroom_id, c.content, c.created_at, c.updated_at, {} \
         FROM group_chat c \
         JOIN users cu ON cu.id = c.user_id",
        if with_total { "COUNT(*) OVER() AS total, " } else { "" },
        simplified_columns("cu", "user"),
    )
}

fn room_select(with_total: bool) -> String {
    format!(
        "SELECT {}r.id, r.group_id, g.title AS group_title, r.created_at, r.updated_at, \
                lc.id AS lc_id, lc.chatroom_id AS lc_chatroom_id, lc.content AS lc_content, \
                lc.created_at AS lc_created_at, lc.updated_at AS lc_updated_at, {}, \
                n.id AS notice_id, n.created_at AS notice_created_at, \
                n.updated_at AS notice_updated_at, \
                pc.id AS pc_id, pc.chatroom_id AS pc_chatroom_id, pc.content AS pc_content, \
                pc.created_at AS pc_created_at, pc.updated_at AS pc_updated_at, {} \
         FROM group_chatroom r \
         JOIN study_group g ON g.id = r.group_id \
         LEFT JOIN LATERAL ( \
             SELECT * FROM group_chat c \
             WHERE c.chatroom_id = r.id AND c.deleted_at IS NULL \
             ORDER BY c.created_at DESC, c.id DESC LIMIT 1 \
         ) lc ON TRUE \
         LEFT JOIN users lu ON lu.id = lc.user_id \
         LEFT JOIN group_chatroom_notice n ON n.chatroom_id = r.id AND n.deleted_at IS NULL \
         LEFT JOIN group_chat pc ON pc.id = n.pinned_chat_id AND pc.deleted_at IS NULL \
         LEFT JOIN users pu ON pu.id = pc.user_id",
        if with_total { "COUNT(*) OVER() AS total, " } else { "" },
        simplified_columns("lu", "lc_user"),
        simplified_columns("pu", "pc_user"),
    )
}

/// Owning group of a room, resolved for permission checks
struct RoomAccess {
    group_id: i64,
    manager_id: i64,
}

pub struct GroupChatRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> GroupChatRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve an open room and check that `actor` belongs to its group.
    async fn access_in(
        conn: &mut PgConnection,
        room_id: i64,
        actor: i64,
    ) -> Result<RoomAccess, DbError> {
        let row = sqlx::query(
            r#"
            SELECT r.group_id, g.manager_id
            FROM group_chatroom r
            JOIN study_group g ON g.id = r.group_id AND g.deleted_at IS NULL
            WHERE r.id = $1 AND r.deleted_at IS NULL
            "#,
        )
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("group chatroom", room_id))?;

        let access = RoomAccess {
            group_id: row.get("group_id"),
            manager_id: row.get("manager_id"),
        };
        if !GroupRepo::is_member_in(conn, access.group_id, actor).await? {
            return Err(DbError::forbidden("not a member of this group"));
        }
        Ok(access)
    }

    async fn view_in(conn: &mut PgConnection, room_id: i64) -> Result<GroupChatroomView, DbError> {
        let row = sqlx::query(&format!("{} WHERE r.id = $1", room_select(false)))
            .bind(room_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("group chatroom", room_id))?;
        Ok(GroupChatroomView::from_row(&row))
    }

    /// Chatrooms of every group the user belongs to, most recently active first.
    pub async fn rooms_for_user(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<GroupChatroomView>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            {select}
            WHERE r.deleted_at IS NULL AND g.deleted_at IS NULL
              AND EXISTS (
                  SELECT 1 FROM group_member gm
                  WHERE gm.group_id = r.group_id AND gm.user_id = $1
              )
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
        let items = rows.iter().map(GroupChatroomView::from_row).collect();
        Ok(page.wrap(items, total))
    }

    pub async fn get(&self, room_id: i64, actor: i64) -> Result<GroupChatroomView, DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::access_in(&mut conn, room_id, actor).await?;
        Self::view_in(&mut conn, room_id).await
    }

    /// Chat history, oldest first.
    pub async fn list_chats(
        &self,
        room_id: i64,
        actor: i64,
        page: Pagination,
    ) -> Result<Paginated<GroupChat>, DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::access_in(&mut conn, room_id, actor).await?;

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
        let items = rows.iter().map(|r| GroupChat::from_row(r, "")).collect();
        Ok(page.wrap(items, total))
    }

    pub async fn post(
        &self,
        room_id: i64,
        actor: i64,
        content: ChatContent,
    ) -> Result<GroupChat, DbError> {
        let mut tx = self.pool.begin().await?;
        Self::access_in(&mut *tx, room_id, actor).await?;

        let row = sqlx::query(
            "INSERT INTO group_chat (chatroom_id, user_id, content) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(room_id)
        .bind(actor)
        .bind(content.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.get("id");

        sqlx::query("UPDATE group_chatroom SET updated_at = NOW() WHERE id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!("{} WHERE c.id = $1", chat_select(false)))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(GroupChat::from_row(&row, ""))
    }

    /// Soft-delete one of the actor's own chats. A notice pinning it is cleared.
    pub async fn delete_chat(&self, chat_id: i64, actor: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT user_id FROM group_chat WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(chat_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("group chat", chat_id))?;

        if row.get::<i64, _>("user_id") != actor {
            return Err(DbError::forbidden("only the author can delete a chat"));
        }

        sqlx::query("UPDATE group_chat SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            UPDATE group_chatroom_notice
            SET pinned_chat_id = NULL, updated_at = NOW()
            WHERE pinned_chat_id = $1
            "#,
        )
        .bind(chat_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Pin a chat as the room notice, or clear the pin with `None`. Manager only.
    pub async fn set_notice(
        &self,
        room_id: i64,
        actor: i64,
        pinned_chat: Option<i64>,
    ) -> Result<GroupChatroomView, DbError> {
        let mut tx = self.pool.begin().await?;
        let access = Self::access_in(&mut *tx, room_id, actor).await?;
        if access.manager_id != actor {
            return Err(DbError::forbidden("only the group manager can set the notice"));
        }

        if let Some(chat_id) = pinned_chat {
            let (exists,): (bool,) = sqlx::query_as(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM group_chat
                    WHERE id = $1 AND chatroom_id = $2 AND deleted_at IS NULL
                )
                "#,
            )
            .bind(chat_id)
            .bind(room_id)
            .fetch_one(&mut *tx)
            .await?;
            if !exists {
                return Err(DbError::not_found("group chat", chat_id));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO group_chatroom_notice (chatroom_id, pinned_chat_id)
            VALUES ($1, $2)
            ON CONFLICT (chatroom_id) DO UPDATE
            SET pinned_chat_id = EXCLUDED.pinned_chat_id, deleted_at = NULL, updated_at = NOW()
            "#,
        )
        .bind(room_id)
        .bind(pinned_chat)
        .execute(&mut *tx)
        .await?;

        let view = Self::view_in(&mut *tx, room_id).await?;
        tx.commit().await?;

        tracing::info!(
            room_id,
            group_id = access.group_id,
            pinned_chat,
            "group notice updated"
        );
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support;
    use crate::models::GroupTitle;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn members_only_and_notice_cleared_on_delete() {
        let pool = test_support::pool().await;
        let manager = test_support::user(&pool, "host").await;
        let outsider = test_support::user(&pool, "stranger").await;

        let group = GroupRepo::new(&pool)
            .create(manager.id, GroupTitle::new("Notice").unwrap(), String::new(), None)
            .await
            .unwrap();
        let repo = GroupChatRepo::new(&pool);
        let room = group.chatroom_id;

        let err = repo
            .post(room, outsider.id, ChatContent::new("hi").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Forbidden { .. }));

        let chat = repo
            .post(room, manager.id, ChatContent::new("read the rules").unwrap())
            .await
            .unwrap();
        let view = repo.set_notice(room, manager.id, Some(chat.id)).await.unwrap();
        let pinned = view.notice.and_then(|n| n.pinned_chat).unwrap();
        assert_eq!(pinned.id, chat.id);
        assert_eq!(view.latest_chat.unwrap().id, chat.id);

        repo.delete_chat(chat.id, manager.id).await.unwrap();
        let view = repo.get(room, manager.id).await.unwrap();
        assert!(view.latest_chat.is_none());
        assert!(view.notice.unwrap().pinned_chat.is_none());
    }
}
