use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{
    handler::{
        delete_note_handler, get_categories_handler, get_note_handler, get_notes_handler,
        health_handler, login_user_handler, logout_handler, me_handler, post_note_handler,
        put_note_handler, register_user_handler, toggle_pin_handler,
    },
    jwt_auth::auth,
    AppState,
};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/register", post(register_user_handler))
        .route("/auth/login", post(login_user_handler))
        .route("/auth/logout", post(logout_handler));

    let protected = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/notes", get(get_notes_handler).post(post_note_handler))
        .route(
            "/notes/:id",
            get(get_note_handler)
                .put(put_note_handler)
                .delete(delete_note_handler),
        )
        .route("/notes/:id/pin", patch(toggle_pin_handler))
        .route("/categories", get(get_categories_handler))
        .route_layer(middleware::from_fn_with_state(app_state.clone(), auth));

    Router::new()
        .nest("/api", public.merge(protected))
        .with_state(app_state)
}
