//! University manual verification repository
//!
//! Students upload evidence; staff accept or refuse it. Acceptance moves the
//! student to the verified university in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use super::{total_of, DbError, NotificationRepo};
use crate::models::{Decision, Paginated, Pagination, RequestStatus, VerificationMethod};
use crate::services::NotificationService;

const VERIFICATION_COLUMNS: &str = "id, user_id, university_id, verification_method, \
    verification_img_url, verification_status, status_changed_at, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct Verification {
    pub id: i64,
    pub user_id: i64,
    pub university_id: i64,
    pub verification_method: String,
    pub verification_img_url: String,
    pub verification_status: String,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct VerificationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> VerificationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Submit evidence for review. Starts out PENDING.
    pub async fn submit(
        &self,
        user_id: i64,
        university_id: i64,
        method: VerificationMethod,
        img_url: String,
    ) -> Result<Verification, DbError> {
        let verification = sqlx::query_as::<_, Verification>(&format!(
            r#"
            INSERT INTO university_manual_verification
                (user_id, university_id, verification_method, verification_img_url)
            VALUES ($1, $2, $3, $4)
            RETURNING {VERIFICATION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(university_id)
        .bind(method.as_str())
        .bind(img_url)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(
            verification_id = verification.id,
            user_id,
            university_id,
            "university verification submitted"
        );
        Ok(verification)
    }

    /// List verifications, optionally by status, oldest first.
    pub async fn list(
        &self,
        status: Option<RequestStatus>,
        page: Pagination,
    ) -> Result<Paginated<Verification>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {VERIFICATION_COLUMNS}, COUNT(*) OVER() AS total
            FROM university_manual_verification
            WHERE $1::TEXT IS NULL OR verification_status = $1
            ORDER BY created_at, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = total_of(&rows);
        let items = rows
            .iter()
            .map(Verification::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }

    /// Resolve a pending verification and notify the student.
    pub async fn decide(&self, id: i64, decision: Decision) -> Result<Verification, DbError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Verification>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM university_manual_verification \
             WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("verification", id))?;

        let status = RequestStatus::parse(&current.verification_status)?;
        let next = status.resolve(decision).ok_or_else(|| DbError::InvalidState {
            reason: format!("verification is already {}", status.as_str()),
        })?;

        let updated = sqlx::query_as::<_, Verification>(&format!(
            r#"
            UPDATE university_manual_verification
            SET verification_status = $2, status_changed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {VERIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if decision == Decision::Accept {
            sqlx::query(
                r#"
                UPDATE users
                SET university_id = $2,
                    is_university_confirmed = TRUE,
                    university_confirmed_at = NOW(),
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(updated.user_id)
            .bind(updated.university_id)
            .execute(&mut *tx)
            .await?;
        }

        let university: String = sqlx::query("SELECT name FROM university WHERE id = $1")
            .bind(updated.university_id)
            .fetch_one(&mut *tx)
            .await?
            .get("name");
        let draft = NotificationService::verification_result(updated.user_id, &university, decision)?;
        NotificationRepo::insert_in(&mut *tx, &draft).await?;

        tx.commit().await?;
        tracing::info!(
            verification_id = id,
            user_id = updated.user_id,
            status = next.as_str(),
            "university verification resolved"
        );
        Ok(updated)
    }
}
