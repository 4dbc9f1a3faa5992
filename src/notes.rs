//! Owner scoped note operations and their input validation.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    identity::Identity,
    model::{NewNote, Note, NoteChanges, NoteFilter},
    request::{GetNotes, PostNote, PutNote},
    store::NoteRepository,
};

pub const DEFAULT_CATEGORY: &str = "Perso";
pub const ALL_CATEGORIES: &str = "all";
pub const TITLE_MAX_CHARS: usize = 200;

pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
}

impl NoteService {
    pub fn new(notes: Arc<dyn NoteRepository>) -> Self {
        NoteService { notes }
    }

    pub async fn list(&self, identity: &Identity, query: GetNotes) -> Result<Vec<Note>, AppError> {
        let filter = note_filter(query);
        Ok(self.notes.list_notes(identity.id(), &filter).await?)
    }

    pub async fn get(&self, identity: &Identity, id: Uuid) -> Result<Note, AppError> {
        self.notes
            .find_note(identity.id(), id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn create(&self, identity: &Identity, payload: PostNote) -> Result<Note, AppError> {
        let note = validate_new_note(payload)?;
        let note = self.notes.insert_note(identity.id(), note).await?;
        tracing::debug!(note_id = %note.id, user_id = %identity.id(), "note created");
        Ok(note)
    }

    /// Checks ownership before validating, so a foreign id is reported as missing
    /// even when the payload is invalid too.
    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        payload: PutNote,
    ) -> Result<Note, AppError> {
        self.get(identity, id).await?;
        let changes = validate_changes(payload)?;
        // A concurrent delete between the check and the write still yields NotFound.
        self.notes
            .update_note(identity.id(), id, changes)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<(), AppError> {
        if !self.notes.delete_note(identity.id(), id).await? {
            return Err(AppError::NotFound);
        }
        tracing::debug!(note_id = %id, user_id = %identity.id(), "note deleted");
        Ok(())
    }

    pub async fn toggle_pin(&self, identity: &Identity, id: Uuid) -> Result<Note, AppError> {
        self.notes
            .toggle_pin(identity.id(), id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn categories(&self, identity: &Identity) -> Result<Vec<String>, AppError> {
        Ok(self.notes.list_categories(identity.id()).await?)
    }
}

fn note_filter(query: GetNotes) -> NoteFilter {
    let category = query
        .category
        .map(|category| category.trim().to_string())
        .filter(|category| !category.is_empty() && category != ALL_CATEGORIES);
    let search = query.search.filter(|search| !search.is_empty());
    NoteFilter { category, search }
}

fn check_title(title: Option<String>, errors: &mut Vec<String>) -> Option<String> {
    let title = title.map(|title| title.trim().to_string()).unwrap_or_default();
    if title.is_empty() {
        errors.push("Title is required".to_string());
        return None;
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        errors.push(format!("Title cannot exceed {TITLE_MAX_CHARS} characters"));
        return None;
    }
    Some(title)
}

fn clean_category(category: String) -> String {
    let category = category.trim();
    if category.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        category.to_string()
    }
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn validate_new_note(payload: PostNote) -> Result<NewNote, AppError> {
    let mut errors = Vec::new();
    let title = check_title(payload.title, &mut errors);
    let Some(title) = title.filter(|_| errors.is_empty()) else {
        return Err(AppError::Validation(errors));
    };

    Ok(NewNote {
        title,
        category: clean_category(payload.category.unwrap_or_default()),
        content: payload.content.unwrap_or_default(),
        tags: clean_tags(payload.tags.unwrap_or_default()),
        is_pinned: payload.is_pinned.unwrap_or(false),
        reminder: payload.reminder,
    })
}

fn validate_changes(payload: PutNote) -> Result<NoteChanges, AppError> {
    let mut errors = Vec::new();
    let title = match payload.title {
        Some(title) => check_title(Some(title), &mut errors),
        None => None,
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(NoteChanges {
        title,
        category: payload.category.map(clean_category),
        content: payload.content,
        tags: payload.tags.map(clean_tags),
        is_pinned: payload.is_pinned,
        reminder: payload.reminder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::User, store::MemoryStore};

    fn identity() -> Identity {
        Identity {
            user: User {
                id: Uuid::new_v4(),
                name: "Ada".into(),
                email: "ada@example.com".into(),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
        }
    }

    fn titled(title: &str) -> PostNote {
        PostNote {
            title: Some(title.to_string()),
            ..PostNote::default()
        }
    }

    fn validation_messages(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(messages) => messages,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn title_length_is_bounded_at_two_hundred_characters() {
        assert!(validate_new_note(titled(&"a".repeat(200))).is_ok());
        assert!(validate_new_note(titled(&"é".repeat(200))).is_ok());

        let messages = validation_messages(validate_new_note(titled(&"a".repeat(201))).unwrap_err());
        assert_eq!(messages, ["Title cannot exceed 200 characters"]);
    }

    #[test]
    fn blank_or_missing_title_is_required() {
        for payload in [titled("   "), PostNote::default()] {
            let messages = validation_messages(validate_new_note(payload).unwrap_err());
            assert_eq!(messages, ["Title is required"]);
        }
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let note = validate_new_note(PostNote {
            title: Some("  Groceries ".into()),
            tags: Some(vec![" milk ".into(), "".into(), "eggs".into()]),
            ..PostNote::default()
        })
        .unwrap();

        assert_eq!(note.title, "Groceries");
        assert_eq!(note.category, DEFAULT_CATEGORY);
        assert_eq!(note.content, "");
        assert_eq!(note.tags, ["milk", "eggs"]);
        assert!(!note.is_pinned);
        assert_eq!(note.reminder, None);
    }

    #[test]
    fn update_only_validates_supplied_title() {
        let untouched = validate_changes(PutNote {
            content: Some("body".into()),
            ..PutNote::default()
        })
        .unwrap();
        assert_eq!(untouched.title, None);

        let err = validate_changes(PutNote {
            title: Some(String::new()),
            ..PutNote::default()
        })
        .unwrap_err();
        assert_eq!(validation_messages(err), ["Title is required"]);
    }

    #[test]
    fn all_category_and_empty_search_do_not_filter() {
        let filter = note_filter(GetNotes {
            category: Some(ALL_CATEGORIES.into()),
            search: Some(String::new()),
        });
        assert_eq!(filter, NoteFilter::default());

        let filter = note_filter(GetNotes {
            category: Some("Projet".into()),
            search: Some("meeting".into()),
        });
        assert_eq!(filter.category.as_deref(), Some("Projet"));
        assert_eq!(filter.search.as_deref(), Some("meeting"));
    }

    #[tokio::test]
    async fn toggling_twice_restores_the_pin() {
        let service = NoteService::new(Arc::new(MemoryStore::new()));
        let owner = identity();
        let note = service.create(&owner, titled("pin me")).await.unwrap();

        let once = service.toggle_pin(&owner, note.id).await.unwrap();
        let twice = service.toggle_pin(&owner, note.id).await.unwrap();

        assert!(once.is_pinned);
        assert_eq!(twice.is_pinned, note.is_pinned);
    }

    #[tokio::test]
    async fn foreign_note_update_is_not_found_even_with_invalid_payload() {
        let service = NoteService::new(Arc::new(MemoryStore::new()));
        let owner = identity();
        let intruder = identity();
        let note = service.create(&owner, titled("private")).await.unwrap();

        let err = service
            .update(
                &intruder,
                note.id,
                PutNote {
                    title: Some(String::new()),
                    ..PutNote::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        let unchanged = service.get(&owner, note.id).await.unwrap();
        assert_eq!(unchanged, note);
    }

    #[tokio::test]
    async fn update_keeps_owner_and_refreshes_modification_time() {
        let service = NoteService::new(Arc::new(MemoryStore::new()));
        let owner = identity();
        let note = service.create(&owner, titled("draft")).await.unwrap();

        let updated = service
            .update(
                &owner,
                note.id,
                PutNote {
                    title: Some("final".into()),
                    ..PutNote::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.user_id, owner.id());
        assert_eq!(updated.title, "final");
        assert_eq!(updated.category, note.category);
        assert!(updated.updated_at >= note.updated_at);
        assert_eq!(updated.created_at, note.created_at);
    }
}
