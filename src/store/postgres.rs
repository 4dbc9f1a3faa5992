//! Postgres adapter. Queries are built with the runtime `query_as` API rather than the
//! `query_as!` macros, which need a live `DATABASE_URL` (or cached query data) at build time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, FromRow};
use uuid::Uuid;

use super::{NoteRepository, StoreError, UserRepository};
use crate::model::{NewNote, NewUser, Note, NoteChanges, NoteFilter, User, UserCredentials};

const USER_COLUMNS: &str = "id, name, email, created_at, updated_at";
const NOTE_COLUMNS: &str =
    "id, user_id, title, category, content, tags, is_pinned, reminder, created_at, updated_at";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct CredentialsRow {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CredentialsRow> for UserCredentials {
    fn from(row: CredentialsRow) -> Self {
        UserCredentials {
            user: User {
                id: row.id,
                name: row.name,
                email: row.email,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            password: row.password,
        }
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::EmailTaken
        }
        _ => StoreError::Database(err),
    }
}

/// Escapes `LIKE` wildcards so the search text only ever matches literally.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, StoreError> {
        let row = sqlx::query_as::<_, CredentialsRow>(&format!(
            "SELECT {USER_COLUMNS}, password FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserCredentials::from))
    }
}

#[async_trait]
impl NoteRepository for PgStore {
    async fn list_notes(&self, owner: Uuid, filter: &NoteFilter) -> Result<Vec<Note>, StoreError> {
        let notes = sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE user_id = $1 \
             AND ($2::text IS NULL OR category = $2) \
             AND ($3::text IS NULL OR title ILIKE $3 OR content ILIKE $3) \
             ORDER BY is_pinned DESC, updated_at DESC, created_at DESC"
        ))
        .bind(owner)
        .bind(filter.category.as_deref())
        .bind(filter.search.as_deref().map(like_pattern))
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    async fn find_note(&self, owner: Uuid, id: Uuid) -> Result<Option<Note>, StoreError> {
        let note = sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn insert_note(&self, owner: Uuid, note: NewNote) -> Result<Note, StoreError> {
        let note = sqlx::query_as::<_, Note>(&format!(
            "INSERT INTO notes (id, user_id, title, category, content, tags, is_pinned, reminder) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {NOTE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(&note.title)
        .bind(&note.category)
        .bind(&note.content)
        .bind(&note.tags)
        .bind(note.is_pinned)
        .bind(note.reminder)
        .fetch_one(&self.pool)
        .await?;
        Ok(note)
    }

    async fn update_note(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: NoteChanges,
    ) -> Result<Option<Note>, StoreError> {
        let note = sqlx::query_as::<_, Note>(&format!(
            "UPDATE notes SET \
             title = COALESCE($3, title), \
             category = COALESCE($4, category), \
             content = COALESCE($5, content), \
             tags = COALESCE($6, tags), \
             is_pinned = COALESCE($7, is_pinned), \
             reminder = CASE WHEN $8 THEN $9 ELSE reminder END, \
             updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.category)
        .bind(changes.content)
        .bind(changes.tags)
        .bind(changes.is_pinned)
        .bind(changes.reminder.is_some())
        .bind(changes.reminder.flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn delete_note(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_pin(&self, owner: Uuid, id: Uuid) -> Result<Option<Note>, StoreError> {
        let note = sqlx::query_as::<_, Note>(&format!(
            "UPDATE notes SET is_pinned = NOT is_pinned, updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn list_categories(&self, owner: Uuid) -> Result<Vec<String>, StoreError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM notes WHERE user_id = $1 ORDER BY category",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("react"), "%react%");
        assert_eq!(like_pattern("100%_done\\"), "%100\\%\\_done\\\\%");
    }
}
