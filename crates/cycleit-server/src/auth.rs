//! Accounts, password hashing and bearer sessions.
//!
//! Tokens are 32 random bytes, hex encoded, handed to the client once. The
//! database only ever sees their BLAKE3 hash.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tracing::{debug, info};
use uuid::Uuid;

use cycleit_shared::constants::SESSION_TOKEN_BYTES;
use cycleit_shared::protocol::{SessionInfo, SignInRequest, SignUpRequest};
use cycleit_store::{Account, Profile, SessionRecord, StoreError};

use crate::api::AppState;
use crate::error::ServerError;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_USERNAME_LEN: usize = 32;

// ─── Primitives ───

pub fn hash_password(password: &str) -> Result<String, ServerError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ServerError::Internal(format!("salt encoding failed: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn token_hash(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// ─── Session gate ───

/// The authenticated caller. Handlers that take this extractor reject
/// requests without a live session with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ServerError::Unauthorized("missing bearer token".into()))?;
        let hash = token_hash(token);

        let db = state.db()?;
        let session = match db.get_session(&hash) {
            Ok(session) => session,
            Err(StoreError::NotFound) => {
                return Err(ServerError::Unauthorized("invalid session".into()))
            }
            Err(e) => return Err(e.into()),
        };

        if session.is_expired(Utc::now()) {
            db.delete_session(&hash)?;
            debug!(user = %session.user_id, "expired session rejected");
            return Err(ServerError::Unauthorized("session expired".into()));
        }

        Ok(CurrentUser {
            user_id: session.user_id,
            token_hash: hash,
            expires_at: session.expires_at,
        })
    }
}

fn issue_session(state: &AppState, user_id: Uuid) -> Result<(String, SessionRecord), ServerError> {
    let token = generate_token();
    let now = Utc::now();
    let record = SessionRecord {
        token_hash: token_hash(&token),
        user_id,
        created_at: now,
        expires_at: now + Duration::hours(state.config.session_ttl_hours),
    };
    state.db()?.insert_session(&record)?;
    Ok((token, record))
}

// ─── Handlers ───

pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SessionInfo>), ServerError> {
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();

    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ServerError::BadRequest("invalid email address".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServerError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(ServerError::BadRequest(format!(
            "username must be 1 to {MAX_USERNAME_LEN} characters"
        )));
    }

    let password_hash = hash_password(&req.password)?;
    let now = Utc::now();
    let id = Uuid::new_v4();
    let account = Account {
        id,
        email,
        password_hash,
        created_at: now,
    };
    let profile = Profile {
        id,
        username: username.clone(),
        full_name: req
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        bio: None,
        location: None,
        avatar_url: None,
        created_at: now,
    };

    state.db()?.create_account(&account, &profile)?;
    info!(user = %id, username = %username, "account created");

    let (token, record) = issue_session(&state, id)?;
    Ok((
        StatusCode::CREATED,
        Json(SessionInfo {
            user_id: id,
            username,
            access_token: Some(token),
            expires_at: record.expires_at,
        }),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SessionInfo>, ServerError> {
    let invalid = || ServerError::Unauthorized("invalid email or password".into());

    let (account, username) = {
        let db = state.db()?;
        let account = match db.find_account_by_email(&req.email) {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(invalid()),
            Err(e) => return Err(e.into()),
        };
        let username = db.get_profile(account.id)?.username;
        (account, username)
    };

    if !verify_password(&req.password, &account.password_hash) {
        debug!(user = %account.id, "password mismatch");
        return Err(invalid());
    }

    let (token, record) = issue_session(&state, account.id)?;
    info!(user = %account.id, "signed in");

    Ok(Json(SessionInfo {
        user_id: account.id,
        username,
        access_token: Some(token),
        expires_at: record.expires_at,
    }))
}

pub async fn sign_out(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, ServerError> {
    state.db()?.delete_session(&user.token_hash)?;
    info!(user = %user.user_id, "signed out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current_session(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<SessionInfo>, ServerError> {
    let username = state.db()?.get_profile(user.user_id)?.username;
    Ok(Json(SessionInfo {
        user_id: user.user_id,
        username,
        access_token: None,
        expires_at: user.expires_at,
    }))
}
