//! University repository (read-only; rows are seeded by migrations)

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::DbError;
use crate::models::UniversityName;

#[derive(Debug, Clone, FromRow)]
pub struct University {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct UniversityRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UniversityRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<University>, DbError> {
        let items = sqlx::query_as::<_, University>(
            "SELECT id, name, created_at, updated_at FROM university ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    pub async fn get(&self, id: i64) -> Result<University, DbError> {
        sqlx::query_as::<_, University>(
            "SELECT id, name, created_at, updated_at FROM university WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("university", id))
    }

    pub async fn get_by_name(&self, name: UniversityName) -> Result<University, DbError> {
        sqlx::query_as::<_, University>(
            "SELECT id, name, created_at, updated_at FROM university WHERE name = $1",
        )
        .bind(name.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("university", name.as_str()))
    }
}
