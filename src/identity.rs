//! Registration, login and token resolution.
//!
//! Tokens are stateless HS256 JWTs carrying only the user id. There is no revocation:
//! a token stays valid until it expires.

use std::sync::Arc;

use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _,
    PasswordVerifier as _, Version,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    error::AppError,
    model::{NewUser, User},
    store::UserRepository,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// The caller of a request, resolved from its bearer token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
}

impl Identity {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// A freshly issued token together with the user it was issued for.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Argon2id password hashing. Hashing runs on the blocking pool since it is
/// deliberately slow.
#[derive(Debug, Clone)]
pub struct Hasher {
    params: Params,
}

impl Default for Hasher {
    fn default() -> Self {
        Hasher::new(Params::default())
    }
}

impl Hasher {
    pub fn new(params: Params) -> Self {
        Hasher { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let argon2 = self.argon2();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|e| AppError::Server(format!("hashing task failed: {e}")))?
        .map_err(|e| AppError::Server(format!("Error while hashing password: {e}")))
    }

    pub async fn verify(&self, password: String, hash: String) -> Result<bool, AppError> {
        let argon2 = self.argon2();
        tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
            Ok(parsed_hash) => argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
            Err(_) => false,
        })
        .await
        .map_err(|e| AppError::Server(format!("hashing task failed: {e}")))
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    hasher: Hasher,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: chrono::Duration,
    // Verified against on unknown emails so both login failures cost one hash.
    dummy_hash: OnceCell<String>,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Hasher,
        secret: &str,
        token_ttl: chrono::Duration,
    ) -> Self {
        IdentityService {
            users,
            hasher,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        self.token_ttl
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: String,
    ) -> Result<Session, AppError> {
        let name = name.trim();
        let email = normalize_email(email);

        let mut errors = Vec::new();
        if name.is_empty() {
            errors.push("Name is required".to_string());
        }
        if email.is_empty() {
            errors.push("Email is required".to_string());
        }
        if password.is_empty() {
            errors.push("Password is required".to_string());
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        if self.users.find_user_by_email(&email).await?.is_some() {
            tracing::debug!("registration rejected, email already in use");
            return Err(AppError::DuplicateEmail);
        }

        let password = self.hasher.hash(password).await?;
        // The unique index still wins if two registrations race past the check above.
        let user = self
            .users
            .insert_user(NewUser {
                name: name.to_string(),
                email,
                password,
            })
            .await?;
        tracing::info!(user_id = %user.id, "user registered");

        let token = self.issue_token(user.id)?;
        Ok(Session { user, token })
    }

    pub async fn authenticate(&self, email: &str, password: String) -> Result<Session, AppError> {
        let credentials = self
            .users
            .find_credentials(&normalize_email(email))
            .await?;

        let Some(credentials) = credentials else {
            let dummy_hash = self
                .dummy_hash
                .get_or_try_init(|| self.hasher.hash(Uuid::new_v4().to_string()))
                .await?;
            self.hasher.verify(password, dummy_hash.clone()).await?;
            tracing::debug!("login failed");
            return Err(AppError::InvalidCredentials);
        };
        if !self.hasher.verify(password, credentials.password).await? {
            tracing::debug!(user_id = %credentials.user.id, "login failed");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.issue_token(credentials.user.id)?;
        Ok(Session {
            user: credentials.user,
            token,
        })
    }

    pub fn issue_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = chrono::Utc::now();
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| AppError::Server("token lifetime overflows the clock".to_string()))?;
        let claims = TokenClaims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Server(format!("Error while signing token: {e}")))
    }

    /// Every failure collapses into [`AppError::Unauthorized`] except storage errors.
    pub async fn resolve_identity(&self, token: &str) -> Result<Identity, AppError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected token");
                AppError::Unauthorized
            })?
            .claims;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
        let user = self.users.find_user(user_id).await?.ok_or_else(|| {
            tracing::debug!(%user_id, "token refers to an unknown user");
            AppError::Unauthorized
        })?;

        Ok(Identity { user })
    }
}
