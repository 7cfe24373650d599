//! User endpoints
//!
//! Sign-up is open; every other call needs an acting user. Profiles can be
//! changed or deleted by their owner or by staff.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::repos::{NewUser, User, UserPatch, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{ActingUser, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::profile::{app_version, push_id};
use crate::models::{
    AdmissionClass, DeleteReason, Email, Gender, Grade, ImageUrl, Nickname, Paginated,
    Pagination, PaginationParams,
};

/// Sign-up request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: Option<String>,
    pub grade: i16,
    pub nickname: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub university: Option<i64>,
    pub admission_class: Option<i16>,
    pub profile_image_url: Option<String>,
    pub thumbnail_image_url: Option<String>,
    #[serde(default)]
    pub is_service_terms_agreed: bool,
    #[serde(default)]
    pub is_push_allowed: bool,
}

impl CreateUserRequest {
    fn validate(self) -> Result<NewUser, ApiError> {
        let email = Email::new(&self.email)?;
        let grade = Grade::new(self.grade)?;
        let mut user = NewUser::new(email, self.password.as_deref(), grade)?;

        if let Some(nickname) = self.nickname {
            user.nickname = Nickname::new(&nickname)?;
        }
        user.gender = self.gender.as_deref().map(Gender::parse).transpose()?;
        user.birth_date = self.birth_date;
        user.university_id = self.university;
        if let Some(year) = self.admission_class {
            user.admission_class = AdmissionClass::new(year)?;
        }
        if let Some(url) = self.profile_image_url {
            user.profile_image_url = ImageUrl::new(&url)?;
        }
        if let Some(url) = self.thumbnail_image_url {
            user.thumbnail_image_url = ImageUrl::new(&url)?;
        }
        user.is_service_terms_agreed = self.is_service_terms_agreed;
        user.is_push_allowed = self.is_push_allowed;
        Ok(user)
    }
}

/// Partial profile update
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub nickname: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub university: Option<i64>,
    pub admission_class: Option<i16>,
    pub grade: Option<i16>,
    pub profile_image_url: Option<String>,
    pub thumbnail_image_url: Option<String>,
    pub is_service_terms_agreed: Option<bool>,
    pub is_push_allowed: Option<bool>,
    pub push_id: Option<String>,
    pub app_version: Option<String>,
}

impl UpdateUserRequest {
    fn validate(self) -> Result<UserPatch, ApiError> {
        Ok(UserPatch {
            nickname: self.nickname.as_deref().map(Nickname::new).transpose()?,
            gender: self.gender.as_deref().map(Gender::parse).transpose()?,
            birth_date: self.birth_date,
            university_id: self.university,
            admission_class: self.admission_class.map(AdmissionClass::new).transpose()?,
            grade: self.grade.map(Grade::new).transpose()?,
            profile_image_url: self
                .profile_image_url
                .as_deref()
                .map(ImageUrl::new)
                .transpose()?,
            thumbnail_image_url: self
                .thumbnail_image_url
                .as_deref()
                .map(ImageUrl::new)
                .transpose()?,
            is_service_terms_agreed: self.is_service_terms_agreed,
            is_push_allowed: self.is_push_allowed,
            push_id: self.push_id.as_deref().map(push_id).transpose()?,
            app_version: self.app_version.as_deref().map(app_version).transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteUserParams {
    pub reason: Option<String>,
}

/// User as returned by the API; the password hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: Option<String>,
    pub is_university_email: bool,
    pub nickname: String,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub university: Option<i64>,
    pub is_university_confirmed: bool,
    pub university_confirmed_at: Option<String>,
    pub admission_class: i16,
    pub grade: i16,
    pub profile_image_url: String,
    pub thumbnail_image_url: String,
    pub is_service_terms_agreed: bool,
    pub is_push_allowed: bool,
    pub push_id: Option<String>,
    pub login_attempt_at: Option<String>,
    pub last_login_at: Option<String>,
    pub app_version: Option<String>,
    pub is_staff: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            is_university_email: u.is_university_email,
            nickname: u.nickname,
            gender: u.gender,
            birth_date: u.birth_date,
            university: u.university_id,
            is_university_confirmed: u.is_university_confirmed,
            university_confirmed_at: u.university_confirmed_at.map(|t| t.to_rfc3339()),
            admission_class: u.admission_class,
            grade: u.grade,
            profile_image_url: u.profile_image_url,
            thumbnail_image_url: u.thumbnail_image_url,
            is_service_terms_agreed: u.is_service_terms_agreed,
            is_push_allowed: u.is_push_allowed,
            push_id: u.push_id,
            login_attempt_at: u.login_attempt_at.map(|t| t.to_rfc3339()),
            last_login_at: u.last_login_at.map(|t| t.to_rfc3339()),
            app_version: u.app_version,
            is_staff: u.is_staff,
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
        }
    }
}

/// The acting user must be `target` or a staff member.
async fn require_self_or_staff(repo: &UserRepo<'_>, actor: i64, target: i64) -> Result<(), ApiError> {
    if actor != target {
        repo.require_staff(actor).await?;
    }
    Ok(())
}

/// POST /users - sign up
async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let new = req.validate()?;
    let user = UserRepo::new(&state.pool).create(new).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /users - list active users
async fn list_users(
    State(state): State<Arc<AppState>>,
    ActingUser(_): ActingUser,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<UserResponse>>, ApiError> {
    let page = Pagination::from(params);
    let users = UserRepo::new(&state.pool).list(page).await?;
    Ok(Json(users.map(UserResponse::from)))
}

/// GET /users/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    ActingUser(_): ActingUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepo::new(&state.pool).get(id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// PATCH /users/{id}
async fn update_user(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let patch = req.validate()?;
    let repo = UserRepo::new(&state.pool);
    require_self_or_staff(&repo, actor, id).await?;
    let user = repo.update(id, patch).await?;
    Ok(Json(UserResponse::from(user)))
}

/// DELETE /users/{id}?reason= - soft delete
async fn delete_user(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ValidPath(id): ValidPath<i64>,
    ValidQuery(params): ValidQuery<DeleteUserParams>,
) -> Result<StatusCode, ApiError> {
    let reason = params.reason.as_deref().map(DeleteReason::parse).transpose()?;
    let repo = UserRepo::new(&state.pool);
    require_self_or_staff(&repo, actor, id).await?;
    repo.soft_delete(id, reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::DbError;
    use crate::models::ValidationError;

    fn sign_up(json: &str) -> Result<NewUser, ApiError> {
        serde_json::from_str::<CreateUserRequest>(json)
            .unwrap()
            .validate()
    }

    #[test]
    fn sign_up_defaults() {
        let user = sign_up(r#"{"email": "Kim@Yonsei.AC.KR", "password": "pw", "grade": 2}"#)
            .unwrap();
        assert_eq!(user.email.as_str(), "Kim@yonsei.ac.kr");
        assert_eq!(user.grade, Grade::SOPHOMORE);
        assert_eq!(user.admission_class, AdmissionClass::current());
        assert!(user.is_university_email);
        assert!(user.password.verify("pw"));
        assert!(!user.is_staff);
    }

    #[test]
    fn sign_up_without_password_is_unusable() {
        let user = sign_up(r#"{"email": "a@b.com", "grade": 1}"#).unwrap();
        assert!(!user.password.is_usable());
    }

    #[test]
    fn sign_up_rejects_bad_fields() {
        for json in [
            r#"{"email": "a@b.com", "grade": 5}"#,
            r#"{"email": "a@b.com", "grade": 1, "gender": "OTHER"}"#,
            r#"{"email": "a@b.com", "grade": 1, "admission_class": 1999}"#,
            r#"{"email": "a@b.com", "grade": 1, "profile_image_url": "ftp://x"}"#,
            r#"{"email": "a@b.com", "grade": 1, "nickname": "abcdefghijklmnopqrstu"}"#,
        ] {
            assert!(
                matches!(sign_up(json), Err(ApiError::Validation(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn patch_leaves_absent_fields() {
        let patch = UpdateUserRequest {
            nickname: Some("  groovy ".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.nickname.unwrap().as_str(), "groovy");
        assert!(patch.grade.is_none());
        assert!(patch.university_id.is_none());
    }

    #[test]
    fn patch_limits_device_fields() {
        let err = UpdateUserRequest {
            app_version: Some("1.0.0-beta.1234567".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::TooLong { field: "app_version", .. })
        ));
    }

    #[test]
    fn password_error_surfaces_as_validation() {
        let err = ApiError::from(DbError::Validation(ValidationError::Empty { field: "password" }));
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
