use std::{cmp::Reverse, collections::HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NoteRepository, StoreError, UserRepository};
use crate::model::{NewNote, NewUser, Note, NoteChanges, NoteFilter, User, UserCredentials};

/// In-process store with the same semantics as [`super::PgStore`], backing the test suite.
///
/// Each mutation bumps a revision counter which breaks ties between notes that
/// share an `updated_at` value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, UserCredentials>,
    notes: HashMap<Uuid, StoredNote>,
    revision: u64,
}

#[derive(Debug)]
struct StoredNote {
    note: Note,
    revision: u64,
}

impl Inner {
    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn owned_mut(&mut self, owner: Uuid, id: Uuid) -> Option<&mut StoredNote> {
        self.notes
            .get_mut(&id)
            .filter(|stored| stored.note.user_id == owner)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let email = user.email.to_lowercase();
        if inner
            .users
            .values()
            .any(|existing| existing.user.email.to_lowercase() == email)
        {
            return Err(StoreError::EmailTaken);
        }

        let now = Utc::now();
        let stored = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(
            stored.id,
            UserCredentials {
                user: stored.clone(),
                password: user.password,
            },
        );
        Ok(stored)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).map(|credentials| credentials.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .find_credentials(email)
            .await?
            .map(|credentials| credentials.user))
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, StoreError> {
        let email = email.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|credentials| credentials.user.email.to_lowercase() == email)
            .cloned())
    }
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn list_notes(&self, owner: Uuid, filter: &NoteFilter) -> Result<Vec<Note>, StoreError> {
        let needle = filter.search.as_ref().map(|search| search.to_lowercase());
        let inner = self.inner.read().await;

        let mut matching: Vec<&StoredNote> = inner
            .notes
            .values()
            .filter(|stored| stored.note.user_id == owner)
            .filter(|stored| match &filter.category {
                Some(category) => &stored.note.category == category,
                None => true,
            })
            .filter(|stored| match &needle {
                Some(needle) => {
                    stored.note.title.to_lowercase().contains(needle)
                        || stored.note.content.to_lowercase().contains(needle)
                }
                None => true,
            })
            .collect();

        matching.sort_by_key(|stored| {
            (
                Reverse(stored.note.is_pinned),
                Reverse(stored.note.updated_at),
                Reverse(stored.revision),
            )
        });
        Ok(matching.into_iter().map(|stored| stored.note.clone()).collect())
    }

    async fn find_note(&self, owner: Uuid, id: Uuid) -> Result<Option<Note>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .notes
            .get(&id)
            .filter(|stored| stored.note.user_id == owner)
            .map(|stored| stored.note.clone()))
    }

    async fn insert_note(&self, owner: Uuid, note: NewNote) -> Result<Note, StoreError> {
        let mut inner = self.inner.write().await;
        let revision = inner.next_revision();
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            user_id: owner,
            title: note.title,
            category: note.category,
            content: note.content,
            tags: note.tags,
            is_pinned: note.is_pinned,
            reminder: note.reminder,
            created_at: now,
            updated_at: now,
        };
        inner.notes.insert(
            note.id,
            StoredNote {
                note: note.clone(),
                revision,
            },
        );
        Ok(note)
    }

    async fn update_note(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: NoteChanges,
    ) -> Result<Option<Note>, StoreError> {
        let mut inner = self.inner.write().await;
        let revision = inner.next_revision();
        let Some(stored) = inner.owned_mut(owner, id) else {
            return Ok(None);
        };

        let note = &mut stored.note;
        if let Some(title) = changes.title {
            note.title = title;
        }
        if let Some(category) = changes.category {
            note.category = category;
        }
        if let Some(content) = changes.content {
            note.content = content;
        }
        if let Some(tags) = changes.tags {
            note.tags = tags;
        }
        if let Some(is_pinned) = changes.is_pinned {
            note.is_pinned = is_pinned;
        }
        if let Some(reminder) = changes.reminder {
            note.reminder = reminder;
        }
        note.updated_at = Utc::now();
        stored.revision = revision;
        Ok(Some(stored.note.clone()))
    }

    async fn delete_note(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.owned_mut(owner, id).is_none() {
            return Ok(false);
        }
        Ok(inner.notes.remove(&id).is_some())
    }

    async fn toggle_pin(&self, owner: Uuid, id: Uuid) -> Result<Option<Note>, StoreError> {
        let mut inner = self.inner.write().await;
        let revision = inner.next_revision();
        Ok(inner.owned_mut(owner, id).map(|stored| {
            stored.note.is_pinned = !stored.note.is_pinned;
            stored.note.updated_at = Utc::now();
            stored.revision = revision;
            stored.note.clone()
        }))
    }

    async fn list_categories(&self, owner: Uuid) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        let mut categories: Vec<String> = inner
            .notes
            .values()
            .filter(|stored| stored.note.user_id == owner)
            .map(|stored| stored.note.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}
