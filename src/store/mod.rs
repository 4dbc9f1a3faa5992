//! Persistence ports. Every note operation takes the owner explicitly and folds it
//! into the lookup, so a note of another user is indistinguishable from a missing one.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{NewNote, NewUser, Note, NoteChanges, NoteFilter, User, UserCredentials};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email is already registered")]
    EmailTaken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`StoreError::EmailTaken`] when the email is already in use,
    /// compared case-insensitively.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, StoreError>;
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Pinned notes first, then most recently modified first.
    async fn list_notes(&self, owner: Uuid, filter: &NoteFilter) -> Result<Vec<Note>, StoreError>;

    async fn find_note(&self, owner: Uuid, id: Uuid) -> Result<Option<Note>, StoreError>;

    async fn insert_note(&self, owner: Uuid, note: NewNote) -> Result<Note, StoreError>;

    /// Applies the changes and refreshes `updated_at`; `None` when no such note is owned.
    async fn update_note(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: NoteChanges,
    ) -> Result<Option<Note>, StoreError>;

    async fn delete_note(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError>;

    async fn toggle_pin(&self, owner: Uuid, id: Uuid) -> Result<Option<Note>, StoreError>;

    async fn list_categories(&self, owner: Uuid) -> Result<Vec<String>, StoreError>;
}
