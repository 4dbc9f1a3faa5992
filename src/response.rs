use chrono::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::model::{Note, User};

/// Success side of the uniform response envelope. Failures are rendered by
/// [`crate::error::AppError`].
#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Envelope {
            success: true,
            token: None,
            count: None,
            data,
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

impl<T> Envelope<Vec<T>> {
    pub fn counted(data: Vec<T>) -> Self {
        let count = data.len();
        Envelope {
            count: Some(count),
            ..Envelope::new(data)
        }
    }
}

#[derive(Serialize, Debug)]
pub struct FilteredUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub initials: String,
}

impl From<&User> for FilteredUser {
    fn from(user: &User) -> Self {
        FilteredUser {
            id: user.id,
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            initials: user.initials(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FilteredNote {
    pub id: Uuid,
    pub user: Uuid,
    pub title: String,
    pub category: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub reminder: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Note> for FilteredNote {
    fn from(note: &Note) -> Self {
        FilteredNote {
            id: note.id,
            user: note.user_id,
            title: note.title.to_owned(),
            category: note.category.to_owned(),
            content: note.content.to_owned(),
            tags: note.tags.to_owned(),
            is_pinned: note.is_pinned,
            reminder: note.reminder,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_omits_absent_token_and_count() {
        let body = serde_json::to_value(Envelope::new(json!({}))).unwrap();
        assert_eq!(body, json!({"success": true, "data": {}}));

        let body = serde_json::to_value(Envelope::counted(vec!["Perso"])).unwrap();
        assert_eq!(body, json!({"success": true, "count": 1, "data": ["Perso"]}));
    }
}
