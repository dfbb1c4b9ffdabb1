//! Authentication collaborator: argon2 password hashes, JWT bearer
//! tokens, login/register handlers, and the middleware that turns a
//! token into a `User` request extension. The task endpoints never see
//! a request that did not pass through here.

use crate::api::ApiError;
use crate::forms::ValidationErrors;
use crate::model::User;
use crate::settings::Settings;
use crate::store::Store;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const TOKEN_EXPIRY_HOURS: i64 = 24;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 150;
const PASSWORD_MIN: usize = 8;

// ── Request/response types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

// ── JWT ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,        // user id
    pub username: String,
    pub exp: usize,       // expiry timestamp
    pub iat: usize,       // issued at
}

pub fn create_token(settings: &Settings, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiry = now + Duration::hours(TOKEN_EXPIRY_HOURS);

    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        exp: expiry.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret_key.as_bytes()),
    )
}

pub fn verify_token(settings: &Settings, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret_key.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

// ── Passwords ──────────────────────────────────────────────────

pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// ── Shared state ───────────────────────────────────────────────

pub struct AppState {
    pub store: Store,
    pub settings: Settings,
}

pub type SharedState = Arc<AppState>;

// ── Handlers ───────────────────────────────────────────────────

pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .store
        .get_user_by_username(payload.username.trim())?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let token = create_token(&state.settings, &user)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user = %user.username, "logged in");
    Ok(Json(AuthResponse {
        user: UserResponse::from(&user),
        token,
    }))
}

pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let mut errors = ValidationErrors::default();

    let username = payload.username.split_whitespace().collect::<String>();
    if username.is_empty() {
        errors.add("username", "Username cannot be empty or contain only spaces.");
    } else if username.chars().count() < USERNAME_MIN {
        errors.add("username", "Username must be at least 3 characters long.");
    } else if username.chars().count() > USERNAME_MAX {
        errors.add("username", "Username cannot exceed 150 characters.");
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        errors.add(
            "username",
            "Username can only contain letters, numbers, and _/./- characters.",
        );
    }

    if payload.password1.chars().count() < PASSWORD_MIN {
        errors.add("password1", "Password must be at least 8 characters long.");
    }
    if payload.password1 != payload.password2 {
        errors.add("password2", "Passwords do not match.");
    }

    if errors.is_empty() && state.store.get_user_by_username(&username)?.is_some() {
        errors.add("username", "A user with that username already exists.");
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = User {
        id: Uuid::new_v4(),
        username,
        password_hash: hash_password(&payload.password1),
        created_at: Utc::now(),
    };
    state.store.create_user(&user)?;

    // Sign the new account in right away, like the registration page did.
    let token = create_token(&state.settings, &user)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user = %user.username, "registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from(&user),
            token,
        }),
    ))
}

pub async fn logout() -> impl IntoResponse {
    // Stateless tokens: the client just drops its copy.
    StatusCode::OK
}

// ── Middleware ─────────────────────────────────────────────────

pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(ApiError::Unauthorized("Missing or invalid token")),
    };

    let claims = verify_token(&state.settings, token)
        .map_err(|_| ApiError::Unauthorized("Invalid token"))?;

    let user = state
        .store
        .get_user(claims.sub)?
        .ok_or(ApiError::Unauthorized("User not found"))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// ── Tests ──────────────────────────────────────────────────────
