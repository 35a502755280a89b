use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        ChangePasswordRequest, FileDescriptor, ForgotPasswordRequest, LoginRequest,
        MessageResponse, RegisterRequest, ResetPasswordRequest, UpdateUserRequest, UserProfile,
    },
    repo_types::{NewUser, ProfileChanges, ResetToken},
    upload,
    validation::{check_bio, check_password, is_valid_email, non_blank, normalize_email},
};
use crate::{
    auth::{cookie, password, AuthUser},
    error::{ApiError, ApiJson, ApiResult},
    mail::EmailMessage,
    state::AppState,
};

/// Mints a token for `user_id` and the cookie that carries it.
fn start_session(state: &AppState, user_id: Uuid) -> ApiResult<(String, HeaderValue)> {
    let now = OffsetDateTime::now_utc();
    let token = state.jwt.sign(user_id, now)?;
    let cookie = cookie::session_cookie(&state.config.cookie, &token, now + state.jwt.ttl)?;
    Ok((token, cookie))
}

fn reset_token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Minimal HTML escaping for values interpolated into email bodies.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn new_reset_token(user_id: Uuid) -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let random: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", random, user_id.simple())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = payload.name.trim().to_string();
    let email = normalize_email(&payload.email);

    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Please enter all the required fields"));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::validation("Please enter a valid email"));
    }
    let policy = &state.config.accounts;
    check_password(policy, &payload.password)?;

    // Early answer for the common case; the unique index on email still
    // decides concurrent registrations.
    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::EmailTaken);
    }

    let password_hash = password::hash(payload.password).await?;
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            photo: policy.default_photo.clone(),
            bio: policy.default_bio.clone(),
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "create user failed");
            ApiError::from(e)
        })?;

    let (token, cookie) = start_session(&state, user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(UserProfile::from(user).with_token(token)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Please enter both email and password"));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify(payload.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let (token, cookie) = start_session(&state, user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(UserProfile::from(user).with_token(token)),
    ))
}

/// Stateless: the browser drops the cookie, the token itself lives until `exp`.
#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let cookie = cookie::cleared_cookie(&state.config.cookie)?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::new("Successfully Logged Out")),
    ))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let user = state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("User Not Found".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, headers))]
pub async fn login_status(State(state): State<AppState>, headers: HeaderMap) -> Json<bool> {
    let valid = cookie::token_from_headers(&headers, &state.config.cookie.name)
        .map(|token| state.jwt.verify(token).is_ok())
        .unwrap_or(false);
    Json(valid)
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserProfile>> {
    let changes = ProfileChanges {
        name: non_blank(payload.name),
        phone: non_blank(payload.phone),
        bio: non_blank(payload.bio),
        photo: non_blank(payload.photo),
    };
    if let Some(bio) = &changes.bio {
        check_bio(&state.config.accounts, bio)?;
    }

    let updated = state
        .users
        .update_profile(user.id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    info!(user_id = %updated.id, "profile updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if payload.old_password.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Please add old and new password"));
    }
    check_password(&state.config.accounts, &payload.password)?;

    let stored = state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !password::verify(payload.old_password, stored.password_hash).await? {
        warn!(user_id = %user.id, "password change with wrong old password");
        return Err(ApiError::BadRequest("Old password is incorrect".into()));
    }

    let password_hash = password::hash(payload.password).await?;
    if !state.users.set_password_hash(user.id, &password_hash).await? {
        return Err(ApiError::NotFound("User not found".into()));
    }
    // A reset link issued for the old password must not outlive it.
    state.users.delete_reset_token(user.id).await?;
    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse::new("Password change successful")))
}

/// Same answer whether or not the address is registered.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() {
        return Err(ApiError::validation("Please enter an email"));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        info!("password reset requested for unknown email");
        return Ok(Json(MessageResponse::new("Reset email sent")));
    };

    let token = new_reset_token(user.id);
    let ttl = state.config.accounts.reset_ttl_minutes;
    state
        .users
        .replace_reset_token(ResetToken {
            user_id: user.id,
            token_hash: reset_token_digest(&token),
            expires_at: OffsetDateTime::now_utc() + TimeDuration::minutes(ttl),
        })
        .await?;

    let reset_url = format!(
        "{}/resetpassword/{}",
        state.config.frontend_url.trim_end_matches('/'),
        token
    );
    let html = format!(
        "<h2>Hello {name}</h2>\
         <p>Please use the link below to reset your password.</p>\
         <p>This link is valid for {ttl} minutes.</p>\
         <a href=\"{url}\" clicktracking=off>{url}</a>\
         <p>Regards,</p><p>ShelfWave Team</p>",
        name = escape_html(&user.name),
        ttl = ttl,
        url = reset_url,
    );
    let sender = state.config.mail.sender.clone();
    state
        .mailer
        .send(EmailMessage {
            subject: "Password Reset Request".into(),
            html,
            to: user.email.clone(),
            from: sender.clone(),
            reply_to: sender,
        })
        .await?;

    info!(user_id = %user.id, "password reset email sent");
    Ok(Json(MessageResponse::new("Reset email sent")))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if payload.password.is_empty() {
        return Err(ApiError::validation("Please enter a new password"));
    }
    check_password(&state.config.accounts, &payload.password)?;

    let invalid = || ApiError::NotFound("Invalid or expired token".into());
    let stored = state
        .users
        .find_reset_token(&reset_token_digest(&token), OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| {
            warn!("reset with unknown or expired token");
            invalid()
        })?;

    let password_hash = password::hash(payload.password).await?;
    if !state
        .users
        .set_password_hash(stored.user_id, &password_hash)
        .await?
    {
        return Err(invalid());
    }
    state.users.delete_reset_token(stored.user_id).await?;

    info!(user_id = %stored.user_id, "password reset");
    Ok(Json(MessageResponse::new(
        "Password reset successful, please login",
    )))
}

#[instrument(skip(state, mp))]
pub async fn upload_photo(
    State(state): State<AppState>,
    user: AuthUser,
    mp: Multipart,
) -> ApiResult<Json<FileDescriptor>> {
    let storage = state
        .storage
        .clone()
        .ok_or_else(|| ApiError::BadRequest("File upload not configured".into()))?;

    let item = upload::read_photo(mp).await?;
    let descriptor = upload::store_photo(storage.as_ref(), user.id, item).await?;

    state
        .users
        .update_profile(
            user.id,
            ProfileChanges {
                photo: Some(descriptor.file_path.clone()),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(descriptor))
}
