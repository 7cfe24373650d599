//! Friend and friend request repository
//!
//! A friendship is stored as two directed rows so "friends of X" is a single
//! index scan. At most one PENDING request may exist per pair of users,
//! whichever side sent it (`uq_friend_request_pending`).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use super::{simplified_columns, total_of, DbError, NotificationRepo, SimplifiedUser, UserRepo};
use crate::models::{Decision, Paginated, Pagination, RequestStatus, ValidationError};
use crate::services::{Actor, NotificationService};

/// Which side of a friend request to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestBox {
    #[default]
    Received,
    Sent,
}

/// Friend request with both parties
#[derive(Debug, Clone)]
pub struct FriendRequest {
    pub id: i64,
    pub request_from: SimplifiedUser,
    pub request_to: SimplifiedUser,
    pub status: String,
    pub status_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FriendRequest {
    fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            request_from: SimplifiedUser::from_prefixed(row, "from"),
            request_to: SimplifiedUser::from_prefixed(row, "to"),
            status: row.get("status"),
            status_changed_at: row.get("status_changed_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// `with_total` adds the `COUNT(*) OVER()` column used by paged lists.
fn request_select(with_total: bool) -> String {
    format!(
        "SELECT {}fr.id, fr.status, fr.status_changed_at, fr.created_at, fr.updated_at, {}, {} \
         FROM friend_request fr \
         JOIN users fu ON fu.id = fr.request_from \
         JOIN users tu ON tu.id = fr.request_to",
        if with_total { "COUNT(*) OVER() AS total, " } else { "" },
        simplified_columns("fu", "from"),
        simplified_columns("tu", "to"),
    )
}

pub struct FriendRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> FriendRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active friends of `user_id`, most recent friendship first.
    pub async fn list_friends(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<SimplifiedUser>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.nickname, u.profile_image_url, u.thumbnail_image_url,
                   COUNT(*) OVER() AS total
            FROM friend f
            JOIN users u ON u.id = f.friend_id AND u.deleted_at IS NULL
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC, u.id
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
            .map(|r| SimplifiedUser {
                id: r.get("id"),
                nickname: r.get("nickname"),
                profile_image_url: r.get("profile_image_url"),
                thumbnail_image_url: r.get("thumbnail_image_url"),
            })
            .collect();
        Ok(page.wrap(items, total))
    }

    async fn are_friends_in(conn: &mut PgConnection, a: i64, b: i64) -> Result<bool, DbError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM friend WHERE user_id = $1 AND friend_id = $2)",
        )
        .bind(a)
        .bind(b)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    /// End a friendship in both directions.
    pub async fn remove(&self, user_id: i64, friend_id: i64) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            DELETE FROM friend
            WHERE (user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1)
            "#,
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("friend", friend_id));
        }
        tracing::info!(user_id, friend_id, "friendship removed");
        Ok(())
    }

    /// Send a friend request and notify the recipient.
    pub async fn send_request(&self, from: i64, to: i64) -> Result<FriendRequest, DbError> {
        if from == to {
            return Err(ValidationError::InvalidFormat {
                field: "request_to",
                reason: "cannot send a friend request to yourself",
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let nickname = UserRepo::nickname_in(&mut *tx, from).await?;
        UserRepo::nickname_in(&mut *tx, to).await?;

        if Self::are_friends_in(&mut *tx, from, to).await? {
            return Err(DbError::conflict("already friends"));
        }

        let inserted = sqlx::query(
            "INSERT INTO friend_request (request_from, request_to) VALUES ($1, $2) RETURNING id",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await;
        let id: i64 = match inserted.map_err(DbError::from) {
            Ok(row) => row.get("id"),
            Err(DbError::Conflict { .. }) => {
                return Err(DbError::conflict(
                    "a pending friend request already exists between these users",
                ))
            }
            Err(e) => return Err(e),
        };

        let actor = Actor {
            id: from,
            nickname: &nickname,
        };
        let draft = NotificationService::friend_request(actor, to)?;
        NotificationRepo::insert_in(&mut *tx, &draft).await?;

        let request = sqlx::query(&format!("{} WHERE fr.id = $1", request_select(false)))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let request = FriendRequest::from_row(&request);

        tx.commit().await?;
        tracing::info!(request_id = id, from, to, "friend request sent");
        Ok(request)
    }

    /// Requests the user received or sent, newest first.
    pub async fn list_requests(
        &self,
        user_id: i64,
        which: RequestBox,
        status: Option<RequestStatus>,
        page: Pagination,
    ) -> Result<Paginated<FriendRequest>, DbError> {
        let side = match which {
            RequestBox::Received => "fr.request_to",
            RequestBox::Sent => "fr.request_from",
        };
        let rows = sqlx::query(&format!(
            r#"
            {select}
            WHERE {side} = $1 AND ($2::TEXT IS NULL OR fr.status = $2)
            ORDER BY fr.created_at DESC, fr.id DESC
            LIMIT $3 OFFSET $4
            "#,
            select = request_select(true),
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = total_of(&rows);
        let items = rows.iter().map(FriendRequest::from_row).collect();
        Ok(page.wrap(items, total))
    }

    /// Accept or refuse a request. Only its recipient may decide, and only once.
    pub async fn decide(
        &self,
        request_id: i64,
        actor_id: i64,
        decision: Decision,
    ) -> Result<FriendRequest, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT request_from, request_to, status FROM friend_request WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("friend request", request_id))?;

        let from: i64 = row.get("request_from");
        let to: i64 = row.get("request_to");
        if to != actor_id {
            return Err(DbError::forbidden("only the recipient can answer a friend request"));
        }

        let status = RequestStatus::parse(row.get::<&str, _>("status"))?;
        let next = status.resolve(decision).ok_or_else(|| DbError::InvalidState {
            reason: format!("friend request is already {}", status.as_str()),
        })?;

        sqlx::query(
            r#"
            UPDATE friend_request
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
                r#"
                INSERT INTO friend (user_id, friend_id)
                VALUES ($1, $2), ($2, $1)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?;

            let nickname = UserRepo::nickname_in(&mut *tx, to).await?;
            let accepter = Actor {
                id: to,
                nickname: &nickname,
            };
            let draft = NotificationService::friend_request_accepted(accepter, from)?;
            NotificationRepo::insert_in(&mut *tx, &draft).await?;
        }

        let request = sqlx::query(&format!("{} WHERE fr.id = $1", request_select(false)))
            .bind(request_id)
            .fetch_one(&mut *tx)
            .await?;
        let request = FriendRequest::from_row(&request);

        tx.commit().await?;
        tracing::info!(request_id, from, to, status = next.as_str(), "friend request resolved");
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support;

    #[tokio::test]
    async fn self_request_rejected_without_database() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/groovy_test")
            .unwrap();
        let err = FriendRepo::new(&pool).send_request(4, 4).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn request_accept_makes_symmetric_friendship() {
        let pool = test_support::pool().await;
        let alice = test_support::user(&pool, "alice").await;
        let bob = test_support::user(&pool, "bob").await;
        let repo = FriendRepo::new(&pool);

        let request = repo.send_request(alice.id, bob.id).await.unwrap();
        assert_eq!(request.status, "PENDING");

        // Same pair, other direction
        let err = repo.send_request(bob.id, alice.id).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let err = repo
            .decide(request.id, alice.id, Decision::Accept)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Forbidden { .. }));

        let accepted = repo.decide(request.id, bob.id, Decision::Accept).await.unwrap();
        assert_eq!(accepted.status, "ACCEPTED");
        let mut conn = pool.acquire().await.unwrap();
        assert!(FriendRepo::are_friends_in(&mut conn, alice.id, bob.id).await.unwrap());
        assert!(FriendRepo::are_friends_in(&mut conn, bob.id, alice.id).await.unwrap());

        let err = repo
            .decide(request.id, bob.id, Decision::Refuse)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidState { .. }));

        let notices = NotificationRepo::new(&pool)
            .list_for_user(alice.id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(notices.items[0].notification_type, "FRIEND REQUEST ACCEPTED");
        assert_eq!(notices.items[0].content, "bob님과 친구가 되었어요!");

        repo.remove(bob.id, alice.id).await.unwrap();
        assert!(!FriendRepo::are_friends_in(&mut conn, alice.id, bob.id).await.unwrap());
        assert!(!FriendRepo::are_friends_in(&mut conn, bob.id, alice.id).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn refused_request_leaves_no_friendship() {
        let pool = test_support::pool().await;
        let carol = test_support::user(&pool, "carol").await;
        let dave = test_support::user(&pool, "dave").await;
        let repo = FriendRepo::new(&pool);

        let request = repo.send_request(carol.id, dave.id).await.unwrap();
        let refused = repo.decide(request.id, dave.id, Decision::Refuse).await.unwrap();
        assert_eq!(refused.status, "REFUSED");

        let mut conn = pool.acquire().await.unwrap();
        assert!(!FriendRepo::are_friends_in(&mut conn, carol.id, dave.id).await.unwrap());
        let friends = repo.list_friends(dave.id, Pagination::default()).await.unwrap();
        assert_eq!(friends.total, 0);

        // Refusal sends nothing back to the requester
        let notices = NotificationRepo::new(&pool)
            .list_for_user(carol.id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(notices.total, 0);

        // Only a pending request blocks a new one
        repo.send_request(carol.id, dave.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn request_boxes_and_status_filter() {
        let pool = test_support::pool().await;
        let erin = test_support::user(&pool, "erin").await;
        let frank = test_support::user(&pool, "frank").await;
        let grace = test_support::user(&pool, "grace").await;
        let repo = FriendRepo::new(&pool);

        let to_frank = repo.send_request(erin.id, frank.id).await.unwrap();
        let to_grace = repo.send_request(erin.id, grace.id).await.unwrap();
        repo.decide(to_grace.id, grace.id, Decision::Accept).await.unwrap();

        let sent = repo
            .list_requests(erin.id, RequestBox::Sent, None, Pagination::default())
            .await
            .unwrap();
        assert_eq!(sent.total, 2);
        // newest first
        assert_eq!(sent.items[0].id, to_grace.id);

        let received = repo
            .list_requests(erin.id, RequestBox::Received, None, Pagination::default())
            .await
            .unwrap();
        assert_eq!(received.total, 0);

        let pending = repo
            .list_requests(
                erin.id,
                RequestBox::Sent,
                Some(RequestStatus::Pending),
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.items[0].id, to_frank.id);
        assert_eq!(pending.items[0].request_to.id, frank.id);

        let frank_inbox = repo
            .list_requests(frank.id, RequestBox::Received, None, Pagination::default())
            .await
            .unwrap();
        assert_eq!(frank_inbox.items[0].request_from.id, erin.id);
    }
}
