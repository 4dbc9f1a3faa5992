use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    identity::{Identity, Session},
    jwt_auth::TOKEN_COOKIE,
    request::*,
    response::*,
    AppState,
};

/// Ids that do not parse are answered like any other unknown note.
fn note_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

fn token_cookie(token: String, max_age: time::Duration) -> String {
    Cookie::build(TOKEN_COOKIE, token)
        .path("/")
        .max_age(max_age)
        .same_site(SameSite::Lax)
        .http_only(true)
        .finish()
        .to_string()
}

fn session_response(status: StatusCode, data: &AppState, session: Session) -> impl IntoResponse {
    let max_age = time::Duration::seconds(data.identity.token_ttl().num_seconds());
    let cookie = token_cookie(session.token.to_owned(), max_age);
    let body = Envelope::new(FilteredUser::from(&session.user)).with_token(session.token);
    (status, [(header::SET_COOKIE, cookie)], Json(body))
}

pub async fn health_handler() -> impl IntoResponse {
    Json(Envelope::new(json!({ "status": "ok" })))
}

pub async fn register_user_handler(
    State(data): State<Arc<AppState>>,
    body: Result<Json<RegisterUser>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let session = data
        .identity
        .register(&body.name, &body.email, body.password)
        .await?;
    Ok(session_response(StatusCode::CREATED, &data, session))
}

pub async fn login_user_handler(
    State(data): State<Arc<AppState>>,
    body: Result<Json<LoginUser>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let session = data.identity.authenticate(&body.email, body.password).await?;
    Ok(session_response(StatusCode::OK, &data, session))
}

pub async fn logout_handler() -> impl IntoResponse {
    let cookie = token_cookie(String::new(), time::Duration::hours(-1));
    (
        [(header::SET_COOKIE, cookie)],
        Json(Envelope::new(json!({}))),
    )
}

pub async fn me_handler(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(Envelope::new(FilteredUser::from(&identity.user)))
}

pub async fn get_notes_handler(
    State(data): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<GetNotes>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let notes = data.notes.list(&identity, query).await?;
    Ok(Json(Envelope::counted(
        notes.iter().map(FilteredNote::from).collect(),
    )))
}

pub async fn get_note_handler(
    State(data): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let note = data.notes.get(&identity, note_id(&id)?).await?;
    Ok(Json(Envelope::new(FilteredNote::from(&note))))
}

pub async fn post_note_handler(
    State(data): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<PostNote>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let note = data.notes.create(&identity, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new(FilteredNote::from(&note))),
    ))
}

pub async fn put_note_handler(
    State(data): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    body: Result<Json<PutNote>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = note_id(&id)?;
    let Json(body) = body?;
    let note = data.notes.update(&identity, id, body).await?;
    Ok(Json(Envelope::new(FilteredNote::from(&note))))
}

pub async fn delete_note_handler(
    State(data): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    data.notes.delete(&identity, note_id(&id)?).await?;
    Ok(Json(Envelope::new(json!({}))))
}

pub async fn toggle_pin_handler(
    State(data): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let note = data.notes.toggle_pin(&identity, note_id(&id)?).await?;
    Ok(Json(Envelope::new(FilteredNote::from(&note))))
}

pub async fn get_categories_handler(
    State(data): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let categories = data.notes.categories(&identity).await?;
    Ok(Json(Envelope::new(categories)))
}
