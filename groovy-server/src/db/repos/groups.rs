//! Group, membership and join request repository
//!
//! Every group owns exactly one group chatroom, created with it. The manager
//! is always a member and is the only one who can answer join requests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use super::{
    simplified_columns, total_of, DbError, NotificationRepo, PersonalChatRepo, SimplifiedUser,
    UserRepo,
};
use crate::models::{ChatContent, Decision, GroupTitle, Paginated, Pagination, RequestStatus};
use crate::services::{Actor, GroupRef, NotificationService};

#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub manager: SimplifiedUser,
    pub university_id: Option<i64>,
    pub chatroom_id: i64,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupDetail {
    fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            manager: SimplifiedUser::from_prefixed(row, "manager"),
            university_id: row.get("university_id"),
            chatroom_id: row.get("chatroom_id"),
            member_count: row.get("member_count"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinRequest {
    pub id: i64,
    pub group: i64,
    pub user: SimplifiedUser,
    pub status: String,
    pub status_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JoinRequest {
    fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            group: row.get("group_id"),
            user: SimplifiedUser::from_prefixed(row, "requestor"),
            status: row.get("status"),
            status_changed_at: row.get("status_changed_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Bare group columns needed for permission checks and templating
struct GroupRow {
    id: i64,
    title: String,
    manager_id: i64,
}

impl GroupRow {
    fn as_ref(&self) -> GroupRef<'_> {
        GroupRef {
            id: self.id,
            title: &self.title,
            manager_id: self.manager_id,
        }
    }
}

fn group_select(with_total: bool) -> String {
    format!(
        "SELECT {}g.id, g.title, g.description, g.university_id, g.created_at, g.updated_at, \
                r.id AS chatroom_id, \
                (SELECT COUNT(*) FROM group_member gm \
                 JOIN users u ON u.id = gm.user_id AND u.deleted_at IS NULL \
                 WHERE gm.group_id = g.id) AS member_count, \
                {} \
         FROM study_group g \
         JOIN users mu ON mu.id = g.manager_id \
         JOIN group_chatroom r ON r.group_id = g.id",
        if with_total { "COUNT(*) OVER() AS total, " } else { "" },
        simplified_columns("mu", "manager"),
    )
}

fn join_request_select(with_total: bool) -> String {
    format!(
        "SELECT {}jr.id, jr.group_id, jr.status, jr.status_changed_at, jr.created_at, \
                jr.updated_at, {} \
         FROM group_join_request jr \
         JOIN users ju ON ju.id = jr.user_id",
        if with_total { "COUNT(*) OVER() AS total, " } else { "" },
        simplified_columns("ju", "requestor"),
    )
}

pub struct GroupRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> GroupRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn group_row_in(conn: &mut PgConnection, group_id: i64) -> Result<GroupRow, DbError> {
        let row = sqlx::query(
            "SELECT id, title, manager_id FROM study_group WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(group_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("group", group_id))?;

        Ok(GroupRow {
            id: row.get("id"),
            title: row.get("title"),
            manager_id: row.get("manager_id"),
        })
    }

    pub(crate) async fn is_member_in(
        conn: &mut PgConnection,
        group_id: i64,
        user_id: i64,
    ) -> Result<bool, DbError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM group_member WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    async fn detail_in(conn: &mut PgConnection, group_id: i64) -> Result<GroupDetail, DbError> {
        let row = sqlx::query(&format!(
            "{} WHERE g.id = $1 AND g.deleted_at IS NULL",
            group_select(false)
        ))
        .bind(group_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("group", group_id))?;
        Ok(GroupDetail::from_row(&row))
    }

    /// Create a group with its manager as first member and its chatroom.
    pub async fn create(
        &self,
        manager_id: i64,
        title: GroupTitle,
        description: String,
        university_id: Option<i64>,
    ) -> Result<GroupDetail, DbError> {
        let mut tx = self.pool.begin().await?;
        UserRepo::nickname_in(&mut *tx, manager_id).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO study_group (title, description, manager_id, university_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(title.as_str())
        .bind(&description)
        .bind(manager_id)
        .bind(university_id)
        .fetch_one(&mut *tx)
        .await?;
        let group_id: i64 = row.get("id");

        sqlx::query("INSERT INTO group_member (group_id, user_id) VALUES ($1, $2)")
            .bind(group_id)
            .bind(manager_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO group_chatroom (group_id) VALUES ($1)")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        let detail = Self::detail_in(&mut *tx, group_id).await?;
        tx.commit().await?;

        tracing::info!(group_id, manager_id, "group created");
        Ok(detail)
    }

    pub async fn get(&self, group_id: i64) -> Result<GroupDetail, DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::detail_in(&mut conn, group_id).await
    }

    /// Active groups, newest first.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<GroupDetail>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            {select}
            WHERE g.deleted_at IS NULL
            ORDER BY g.created_at DESC, g.id DESC
            LIMIT $1 OFFSET $2
            "#,
            select = group_select(true),
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = total_of(&rows);
        let items = rows.iter().map(GroupDetail::from_row).collect();
        Ok(page.wrap(items, total))
    }

    /// Soft-delete a group together with its chatroom. Manager only.
    pub async fn delete(&self, group_id: i64, actor: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        let group = Self::group_row_in(&mut *tx, group_id).await?;
        if group.manager_id != actor {
            return Err(DbError::forbidden("only the group manager can delete the group"));
        }

        sqlx::query("UPDATE study_group SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE group_chatroom SET deleted_at = NOW(), updated_at = NOW() WHERE group_id = $1",
        )
        .bind(group_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(group_id, "group soft-deleted");
        Ok(())
    }

    /// Members of a group, in joining order.
    pub async fn members(
        &self,
        group_id: i64,
        page: Pagination,
    ) -> Result<Paginated<SimplifiedUser>, DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::group_row_in(&mut conn, group_id).await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT COUNT(*) OVER() AS total, {columns}
            FROM group_member gm
            JOIN users u ON u.id = gm.user_id AND u.deleted_at IS NULL
            WHERE gm.group_id = $1
            ORDER BY gm.joined_at, u.id
            LIMIT $2 OFFSET $3
            "#,
            columns = simplified_columns("u", "member"),
        ))
        .bind(group_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

        let total = total_of(&rows);
        let items = rows
            .iter()
            .map(|r| SimplifiedUser::from_prefixed(r, "member"))
            .collect();
        Ok(page.wrap(items, total))
    }

    /// Leave a group. The manager cannot leave their own group.
    pub async fn leave(&self, group_id: i64, actor: i64) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let group = Self::group_row_in(&mut conn, group_id).await?;
        if group.manager_id == actor {
            return Err(DbError::InvalidState {
                reason: "the manager cannot leave their own group".into(),
            });
        }

        let result = sqlx::query("DELETE FROM group_member WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(actor)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("group member", actor));
        }
        tracing::info!(group_id, user_id = actor, "member left group");
        Ok(())
    }

    /// Ask to join a group.
    ///
    /// Notifies the manager and drops a join-request chat into the personal
    /// room between requestor and manager.
    pub async fn request_join(
        &self,
        group_id: i64,
        requestor: i64,
        message: Option<ChatContent>,
    ) -> Result<JoinRequest, DbError> {
        let mut tx = self.pool.begin().await?;

        let nickname = UserRepo::nickname_in(&mut *tx, requestor).await?;
        let group = Self::group_row_in(&mut *tx, group_id).await?;
        if Self::is_member_in(&mut *tx, group_id, requestor).await? {
            return Err(DbError::conflict("already a member of this group"));
        }

        let inserted = sqlx::query(
            "INSERT INTO group_join_request (group_id, user_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(group_id)
        .bind(requestor)
        .fetch_one(&mut *tx)
        .await;
        let id: i64 = match inserted.map_err(DbError::from) {
            Ok(row) => row.get("id"),
            Err(DbError::Conflict { .. }) => {
                return Err(DbError::conflict("a join request is already pending"))
            }
            Err(e) => return Err(e),
        };

        let actor = Actor {
            id: requestor,
            nickname: &nickname,
        };
        let draft = NotificationService::join_request(actor, group.as_ref())?;
        NotificationRepo::insert_in(&mut *tx, &draft).await?;

        let content = match message {
            Some(content) => content,
            None => ChatContent::new(&NotificationService::join_request_chat(group.as_ref()))?,
        };
        let (room_id, _) =
            PersonalChatRepo::open_room_in(&mut *tx, requestor, group.manager_id).await?;
        PersonalChatRepo::insert_chat_in(
            &mut *tx,
            room_id,
            requestor,
            group.manager_id,
            &content,
            true,
        )
        .await?;

        let row = sqlx::query(&format!("{} WHERE jr.id = $1", join_request_select(false)))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let request = JoinRequest::from_row(&row);

        tx.commit().await?;
        tracing::info!(request_id = id, group_id, requestor, "join request sent");
        Ok(request)
    }

    /// Join requests of a group, oldest first. Manager only.
    pub async fn list_join_requests(
        &self,
        group_id: i64,
        actor: i64,
        status: Option<RequestStatus>,
        page: Pagination,
    ) -> Result<Paginated<JoinRequest>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let group = Self::group_row_in(&mut conn, group_id).await?;
        if group.manager_id != actor {
            return Err(DbError::forbidden("only the group manager can see join requests"));
        }

        let rows = sqlx::query(&format!(
            r#"
            {select}
            WHERE jr.group_id = $1 AND ($2::TEXT IS NULL OR jr.status = $2)
            ORDER BY jr.created_at, jr.id
            LIMIT $3 OFFSET $4
            "#,
            select = join_request_select(true),
        ))
        .bind(group_id)
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

        let total = total_of(&rows);
        let items = rows.iter().map(JoinRequest::from_row).collect();
        Ok(page.wrap(items, total))
    }

    /// Accept or refuse a pending join request and notify the requestor.
    pub async fn decide_join(
        &self,
        request_id: i64,
        actor: i64,
        decision: Decision,
    ) -> Result<JoinRequest, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT group_id, user_id, status FROM group_join_request WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("join request", request_id))?;
        let group_id: i64 = row.get("group_id");
        let requestor: i64 = row.get("user_id");

        let group = Self::group_row_in(&mut *tx, group_id).await?;
        if group.manager_id != actor {
            return Err(DbError::forbidden("only the group manager can answer join requests"));
        }

        let status = RequestStatus::parse(row.get::<&str, _>("status"))?;
        let next = status.resolve(decision).ok_or_else(|| DbError::InvalidState {
            reason: format!("join request is already {}", status.as_str()),
        })?;

        sqlx::query(
            r#"
            UPDATE group_join_request
            SET status = $2, status_changed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(request_id)
        .bind(next.as_str())
        .execute(&mut *tx)
        .await?;

        if decision == Decision::Accept {
            sqlx::query(
                "INSERT INTO group_member (group_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(group_id)
            .bind(requestor)
            .execute(&mut *tx)
            .await?;
        }

        let draft = NotificationService::join_request_result(requestor, group.as_ref(), decision)?;
        NotificationRepo::insert_in(&mut *tx, &draft).await?;

        let row = sqlx::query(&format!("{} WHERE jr.id = $1", join_request_select(false)))
            .bind(request_id)
            .fetch_one(&mut *tx)
            .await?;
        let request = JoinRequest::from_row(&row);

        tx.commit().await?;
        tracing::info!(
            request_id,
            group_id,
            requestor,
            status = next.as_str(),
            "join request resolved"
        );
        Ok(request)
    }
}
