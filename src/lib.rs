pub mod config;
pub mod error;
pub mod handler;
pub mod identity;
pub mod jwt_auth;
pub mod model;
pub mod notes;
pub mod request;
pub mod response;
pub mod route;
pub mod store;

use std::sync::Arc;

use crate::{
    config::Config,
    identity::{Hasher, IdentityService},
    notes::NoteService,
    store::{NoteRepository, UserRepository},
};

pub struct AppState {
    pub identity: IdentityService,
    pub notes: NoteService,
}

impl AppState {
    pub fn new(
        config: &Config,
        users: Arc<dyn UserRepository>,
        notes: Arc<dyn NoteRepository>,
        hasher: Hasher,
    ) -> Self {
        AppState {
            identity: IdentityService::new(
                users,
                hasher,
                &config.jwt_secret,
                chrono::Duration::days(config.jwt_expires_in_days),
            ),
            notes: NoteService::new(notes),
        }
    }
}
