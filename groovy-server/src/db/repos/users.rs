//! User repository
//!
//! Email is the login identifier. Deleting a user is a soft delete: the row
//! stays (and keeps its email reserved) but disappears from every read.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Row};

use super::{total_of, DbError};
use crate::models::{
    AdmissionClass, DeleteReason, Email, Gender, Grade, ImageUrl, Nickname, Paginated,
    Pagination, PasswordHash,
};

const USER_COLUMNS: &str = "id, email, password, is_university_email, nickname, gender, \
    birth_date, university_id, is_university_confirmed, university_confirmed_at, \
    admission_class, grade, profile_image_url, thumbnail_image_url, \
    is_service_terms_agreed, is_push_allowed, push_id, login_attempt_at, last_login_at, \
    app_version, is_staff, is_superuser, deleted_at, deleted_reason, created_at, updated_at";

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub password: String,
    pub is_university_email: bool,
    pub nickname: String,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub university_id: Option<i64>,
    pub is_university_confirmed: bool,
    pub university_confirmed_at: Option<DateTime<Utc>>,
    pub admission_class: i16,
    pub grade: i16,
    pub profile_image_url: String,
    pub thumbnail_image_url: String,
    pub is_service_terms_agreed: bool,
    pub is_push_allowed: bool,
    pub push_id: Option<String>,
    pub login_attempt_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub app_version: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn password_hash(&self) -> PasswordHash {
        PasswordHash::from_stored(self.password.clone())
    }

    /// `[id] email`, the form used in logs.
    pub fn display(&self) -> String {
        format!("[{}] {}", self.id, self.email.as_deref().unwrap_or(""))
    }
}

/// Validated input for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password: PasswordHash,
    pub nickname: Nickname,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub university_id: Option<i64>,
    pub is_university_email: bool,
    pub admission_class: AdmissionClass,
    pub grade: Grade,
    pub profile_image_url: ImageUrl,
    pub thumbnail_image_url: ImageUrl,
    pub is_service_terms_agreed: bool,
    pub is_push_allowed: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUser {
    /// Regular account with defaults for everything optional.
    pub fn new(email: Email, password: Option<&str>, grade: Grade) -> Result<Self, DbError> {
        let password = match password {
            Some(raw) => PasswordHash::new(raw)?,
            None => PasswordHash::unusable(),
        };

        Ok(Self {
            email,
            password,
            nickname: Nickname::default(),
            gender: None,
            birth_date: None,
            university_id: None,
            is_university_email: true,
            admission_class: AdmissionClass::default(),
            grade,
            profile_image_url: ImageUrl::default(),
            thumbnail_image_url: ImageUrl::default(),
            is_service_terms_agreed: false,
            is_push_allowed: false,
            is_staff: false,
            is_superuser: false,
        })
    }

    /// Administrator account: staff + superuser, class of 2018, freshmen.
    pub fn superuser(email: Email, password: &str, university_id: i64) -> Result<Self, DbError> {
        let mut user = Self::new(email, Some(password), Grade::FRESHMEN)?;
        user.is_staff = true;
        user.is_superuser = true;
        user.university_id = Some(university_id);
        user.admission_class = AdmissionClass::new(2018)?;
        Ok(user)
    }
}

/// Partial profile update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub nickname: Option<Nickname>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub university_id: Option<i64>,
    pub admission_class: Option<AdmissionClass>,
    pub grade: Option<Grade>,
    pub profile_image_url: Option<ImageUrl>,
    pub thumbnail_image_url: Option<ImageUrl>,
    pub is_service_terms_agreed: Option<bool>,
    pub is_push_allowed: Option<bool>,
    pub push_id: Option<String>,
    pub app_version: Option<String>,
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account. A taken email is a conflict.
    pub async fn create(&self, new: NewUser) -> Result<User, DbError> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (
                email, password, nickname, gender, birth_date, university_id,
                is_university_email, admission_class, grade, profile_image_url,
                thumbnail_image_url, is_service_terms_agreed, is_push_allowed,
                is_staff, is_superuser
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.email.as_str())
        .bind(new.password.as_str())
        .bind(new.nickname.as_str())
        .bind(new.gender.map(|g| g.as_str()))
        .bind(new.birth_date)
        .bind(new.university_id)
        .bind(new.is_university_email)
        .bind(new.admission_class.get())
        .bind(new.grade.get())
        .bind(new.profile_image_url.as_str())
        .bind(new.thumbnail_image_url.as_str())
        .bind(new.is_service_terms_agreed)
        .bind(new.is_push_allowed)
        .bind(new.is_staff)
        .bind(new.is_superuser)
        .fetch_one(self.pool)
        .await;

        let user = match result.map_err(DbError::from) {
            Err(DbError::Conflict { .. }) => {
                return Err(DbError::conflict(format!(
                    "email '{}' is already registered",
                    new.email.as_str()
                )))
            }
            other => other?,
        };

        tracing::info!(user_id = user.id, superuser = user.is_superuser, "user signed up");
        Ok(user)
    }

    /// Get an active user by id.
    pub async fn get(&self, id: i64) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    /// Get an active user by normalised email.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get the user and require staff status.
    pub async fn require_staff(&self, id: i64) -> Result<User, DbError> {
        let user = self.get(id).await?;
        if !user.is_staff {
            return Err(DbError::forbidden("staff only"));
        }
        Ok(user)
    }

    /// List active users, oldest first.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<User>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}, COUNT(*) OVER() AS total
            FROM users
            WHERE deleted_at IS NULL
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = total_of(&rows);
        let items = rows
            .iter()
            .map(User::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }

    /// Apply a partial update.
    ///
    /// Moving to another university drops the previous confirmation.
    pub async fn update(&self, id: i64, patch: UserPatch) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                nickname = COALESCE($2, nickname),
                gender = COALESCE($3, gender),
                birth_date = COALESCE($4, birth_date),
                is_university_confirmed = CASE
                    WHEN $5::BIGINT IS NOT NULL AND $5 IS DISTINCT FROM university_id THEN FALSE
                    ELSE is_university_confirmed END,
                university_confirmed_at = CASE
                    WHEN $5::BIGINT IS NOT NULL AND $5 IS DISTINCT FROM university_id THEN NULL
                    ELSE university_confirmed_at END,
                university_id = COALESCE($5, university_id),
                admission_class = COALESCE($6, admission_class),
                grade = COALESCE($7, grade),
                profile_image_url = COALESCE($8, profile_image_url),
                thumbnail_image_url = COALESCE($9, thumbnail_image_url),
                is_service_terms_agreed = COALESCE($10, is_service_terms_agreed),
                is_push_allowed = COALESCE($11, is_push_allowed),
                push_id = COALESCE($12, push_id),
                app_version = COALESCE($13, app_version),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.nickname.as_ref().map(|n| n.as_str()))
        .bind(patch.gender.map(|g| g.as_str()))
        .bind(patch.birth_date)
        .bind(patch.university_id)
        .bind(patch.admission_class.map(|a| a.get()))
        .bind(patch.grade.map(|g| g.get()))
        .bind(patch.profile_image_url.as_ref().map(|u| u.as_str()))
        .bind(patch.thumbnail_image_url.as_ref().map(|u| u.as_str()))
        .bind(patch.is_service_terms_agreed)
        .bind(patch.is_push_allowed)
        .bind(patch.push_id.as_deref())
        .bind(patch.app_version.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    /// Soft-delete an account.
    pub async fn soft_delete(&self, id: i64, reason: Option<DeleteReason>) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = NOW(), deleted_reason = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(reason.map(|r| r.as_str()))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", id));
        }
        tracing::info!(user_id = id, "user soft-deleted");
        Ok(())
    }

    /// Stamp a login attempt; successful ones also move `last_login_at`.
    pub async fn record_login(&self, id: i64, success: bool) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET login_attempt_at = NOW(),
                last_login_at = CASE WHEN $2 THEN NOW() ELSE last_login_at END
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(success)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    /// Nickname of an active user, for notification text.
    pub(crate) async fn nickname_in(
        conn: &mut sqlx::PgConnection,
        id: i64,
    ) -> Result<String, DbError> {
        let row = sqlx::query("SELECT nickname FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))?;
        Ok(row.get("nickname"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support;

    fn email() -> Email {
        Email::new("admin@yonsei.ac.kr").unwrap()
    }

    #[test]
    fn superuser_defaults() {
        let user = NewUser::superuser(email(), "s3cret", 1).unwrap();
        assert!(user.is_staff);
        assert!(user.is_superuser);
        assert_eq!(user.university_id, Some(1));
        assert_eq!(user.admission_class.get(), 2018);
        assert_eq!(user.grade, Grade::FRESHMEN);
        assert!(user.password.verify("s3cret"));
    }

    #[test]
    fn missing_password_is_unusable() {
        let user = NewUser::new(email(), None, Grade::JUNIOR).unwrap();
        assert!(!user.password.is_usable());
        assert!(!user.is_superuser);
        assert!(user.is_university_email);
    }

    #[test]
    fn empty_password_rejected() {
        let err = NewUser::new(email(), Some(""), Grade::JUNIOR).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_email_conflicts() {
        let pool = test_support::pool().await;
        let existing = test_support::user(&pool, "dup").await;

        let email = Email::new(existing.email.as_deref().unwrap()).unwrap();
        let err = UserRepo::new(&pool)
            .create(NewUser::new(email, Some("pw"), Grade::FRESHMEN).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn changing_university_drops_confirmation() {
        let pool = test_support::pool().await;
        let user = test_support::user(&pool, "movr").await;
        let repo = UserRepo::new(&pool);

        sqlx::query("UPDATE users SET is_university_confirmed = TRUE WHERE id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();
        let university: (i64,) = sqlx::query_as("SELECT id FROM university LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();

        let updated = repo
            .update(
                user.id,
                UserPatch {
                    university_id: Some(university.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_university_confirmed);
        assert_eq!(updated.university_id, Some(university.0));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn soft_deleted_user_disappears() {
        let pool = test_support::pool().await;
        let user = test_support::user(&pool, "gone").await;
        let repo = UserRepo::new(&pool);

        repo.soft_delete(user.id, Some(DeleteReason::Other)).await.unwrap();
        assert!(matches!(repo.get(user.id).await, Err(DbError::NotFound { .. })));
    }
}
