use chrono::prelude::*;
use uuid::Uuid;

/// Public part of a user record. The password hash is never loaded into this type.
#[derive(Debug, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First letter of every whitespace separated word of the name, uppercased.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// A user together with the stored password hash, only fetched for login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub category: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub reminder: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated note fields for an insert. The owner is passed separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub category: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub reminder: Option<DateTime<Utc>>,
}

/// Validated fields of an update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
    pub reminder: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_named(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: "someone@example.com".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn initials_take_first_letter_of_each_word() {
        assert_eq!(user_named("ada lovelace").initials(), "AL");
        assert_eq!(user_named("  jean   paul  sartre ").initials(), "JPS");
        assert_eq!(user_named("émile").initials(), "É");
    }
}
