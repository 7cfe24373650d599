//! User suggestion repository

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{total_of, DbError};
use crate::models::{Paginated, Pagination, Suggestion};

#[derive(Debug, Clone, FromRow)]
pub struct SuggestionRecord {
    pub id: i64,
    pub user_id: Option<i64>,
    pub suggestion_type: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct SuggestionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SuggestionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        suggestion: Suggestion,
    ) -> Result<SuggestionRecord, DbError> {
        let record = sqlx::query_as::<_, SuggestionRecord>(
            r#"
            INSERT INTO user_suggestion (user_id, suggestion_type, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, suggestion_type, content, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(suggestion.suggestion_type())
        .bind(suggestion.content())
        .fetch_one(self.pool)
        .await?;
        Ok(record)
    }

    /// Newest first.
    pub async fn list(&self, page: Pagination) -> Result<Paginated<SuggestionRecord>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, suggestion_type, content, created_at, updated_at,
                   COUNT(*) OVER() AS total
            FROM user_suggestion
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = total_of(&rows);
        let items = rows
            .iter()
            .map(SuggestionRecord::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn submitted_suggestion_is_listed_first() {
        let pool = test_support::pool().await;
        let user = test_support::user(&pool, "idea").await;
        let repo = SuggestionRepo::new(&pool);

        let record = repo
            .create(user.id, Suggestion::new("FEATURE", "다크 모드 주세요").unwrap())
            .await
            .unwrap();
        assert_eq!(record.user_id, Some(user.id));
        assert_eq!(record.suggestion_type, "FEATURE");

        let listed = repo.list(Pagination::default()).await.unwrap();
        assert_eq!(listed.items[0].id, record.id);
        assert_eq!(listed.items[0].content, "다크 모드 주세요");
    }
}
