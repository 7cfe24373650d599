//! Idempotent schema setup
//!
//! Every statement is `IF NOT EXISTS` / `ON CONFLICT DO NOTHING`, so running
//! on every start is safe.

use sqlx::PgPool;

use crate::models::UniversityName;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS university (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(50) NOT NULL UNIQUE DEFAULT 'YONSEI',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email VARCHAR(64) UNIQUE,
        password VARCHAR(128) NOT NULL,
        is_university_email BOOLEAN NOT NULL DEFAULT TRUE,
        nickname VARCHAR(20) NOT NULL DEFAULT '',
        gender VARCHAR(8),
        birth_date DATE,
        university_id BIGINT REFERENCES university(id),
        is_university_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
        university_confirmed_at TIMESTAMPTZ,
        admission_class SMALLINT NOT NULL,
        grade SMALLINT NOT NULL CHECK (grade BETWEEN 1 AND 4),
        profile_image_url VARCHAR(256) NOT NULL DEFAULT '',
        thumbnail_image_url VARCHAR(256) NOT NULL DEFAULT '',
        is_service_terms_agreed BOOLEAN NOT NULL DEFAULT FALSE,
        is_push_allowed BOOLEAN NOT NULL DEFAULT FALSE,
        push_id VARCHAR(64),
        login_attempt_at TIMESTAMPTZ,
        last_login_at TIMESTAMPTZ,
        app_version VARCHAR(16),
        is_staff BOOLEAN NOT NULL DEFAULT FALSE,
        is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
        deleted_at TIMESTAMPTZ,
        deleted_reason VARCHAR(255),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_suggestion (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
        suggestion_type VARCHAR(16) NOT NULL,
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_notification (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        notification_type VARCHAR(30) NOT NULL,
        content VARCHAR(300) NOT NULL,
        redirect_url VARCHAR(30),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS university_manual_verification (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        university_id BIGINT NOT NULL REFERENCES university(id),
        verification_method VARCHAR(20) NOT NULL,
        verification_img_url VARCHAR(256) NOT NULL DEFAULT '',
        verification_status VARCHAR(15) NOT NULL DEFAULT 'PENDING',
        status_changed_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS friend (
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        friend_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (user_id, friend_id),
        CHECK (user_id <> friend_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS friend_request (
        id BIGSERIAL PRIMARY KEY,
        request_from BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        request_to BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        status VARCHAR(15) NOT NULL DEFAULT 'PENDING',
        status_changed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK (request_from <> request_to)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS study_group (
        id BIGSERIAL PRIMARY KEY,
        title VARCHAR(50) NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        manager_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        university_id BIGINT REFERENCES university(id),
        deleted_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_member (
        group_id BIGINT NOT NULL REFERENCES study_group(id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (group_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_join_request (
        id BIGSERIAL PRIMARY KEY,
        group_id BIGINT NOT NULL REFERENCES study_group(id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        status VARCHAR(15) NOT NULL DEFAULT 'PENDING',
        status_changed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_chatroom (
        id BIGSERIAL PRIMARY KEY,
        group_id BIGINT NOT NULL UNIQUE REFERENCES study_group(id) ON DELETE CASCADE,
        deleted_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_chat (
        id BIGSERIAL PRIMARY KEY,
        chatroom_id BIGINT NOT NULL REFERENCES group_chatroom(id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content VARCHAR(1000) NOT NULL,
        deleted_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_chatroom_notice (
        id BIGSERIAL PRIMARY KEY,
        chatroom_id BIGINT NOT NULL UNIQUE REFERENCES group_chatroom(id) ON DELETE CASCADE,
        pinned_chat_id BIGINT REFERENCES group_chat(id) ON DELETE SET NULL,
        deleted_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS personal_chatroom (
        id BIGSERIAL PRIMARY KEY,
        sender_id BIGINT NOT NULL REFERENCES users(id),
        receiver_id BIGINT NOT NULL REFERENCES users(id),
        deleted_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT unique_chatroom UNIQUE (sender_id, receiver_id),
        CHECK (sender_id <> receiver_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS personal_chat (
        id BIGSERIAL PRIMARY KEY,
        chatroom_id BIGINT NOT NULL REFERENCES personal_chatroom(id),
        sender_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        receiver_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content VARCHAR(1000) NOT NULL,
        is_join_request_message BOOLEAN NOT NULL DEFAULT FALSE,
        deleted_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

const INDEXES: &[&str] = &[
    // One open request per pair, whichever side sent it
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_friend_request_pending \
     ON friend_request (LEAST(request_from, request_to), GREATEST(request_from, request_to)) \
     WHERE status = 'PENDING'",
    "CREATE INDEX IF NOT EXISTS idx_friend_request_to ON friend_request(request_to, status)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_group_join_request_pending \
     ON group_join_request (group_id, user_id) WHERE status = 'PENDING'",
    "CREATE INDEX IF NOT EXISTS idx_group_member_user ON group_member(user_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_personal_chatroom_pair \
     ON personal_chatroom (LEAST(sender_id, receiver_id), GREATEST(sender_id, receiver_id))",
    "CREATE INDEX IF NOT EXISTS idx_group_chat_room ON group_chat(chatroom_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_personal_chat_room ON personal_chat(chatroom_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_user_notification_user ON user_notification(user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_verification_status ON university_manual_verification(verification_status)",
];

/// Create all tables and indexes, then seed the university list.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running migrations...");

    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }

    for name in UniversityName::ALL {
        sqlx::query("INSERT INTO university (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name.as_str())
            .execute(pool)
            .await?;
    }

    tracing::info!(
        tables = TABLES.len(),
        indexes = INDEXES.len(),
        "Migrations complete"
    );
    Ok(())
}
