use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{error::AppError, AppState};

pub const TOKEN_COOKIE: &str = "token";

/// Resolves the caller and stores the [`crate::identity::Identity`] in the request
/// extensions. The `Authorization: Bearer` header wins; the login cookie is only
/// consulted when the header is absent.
pub async fn auth<B>(
    cookie_jar: CookieJar,
    State(data): State<Arc<AppState>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Result<impl IntoResponse, AppError> {
    let token = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_owned()),
        None => cookie_jar
            .get(TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_owned()),
    };

    let token = token
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)?;
    let identity = data.identity.resolve_identity(&token).await?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
