use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, HealthResponse, LoginRequest, LoginUser,
            MessageResponse, ProfileResponse, SignupRequest, UpdateProfileRequest, UserSummary,
        },
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo_types::{Profile, ProfilePatch, Session, User, UserProfileView},
        validation::{is_valid_email, is_valid_url, FieldErrors},
    },
    error::ApiError,
    state::AppState,
};

/// Routes open to unauthenticated clients. The stricter auth rate-limit
/// tier is layered on in `app::build_app`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

/// Routes requiring a bearer token.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/change-password", post(change_password))
        .route("/auth/logout", post(logout))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "DAIO Auth Server is running",
    })
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse<UserSummary>>), ApiError> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    let mut errors = FieldErrors::new();
    if name.chars().count() < 2 {
        errors.add("name", "Name must be at least 2 characters");
    }
    if !is_valid_email(&email) {
        errors.add("email", "Valid email is required");
    }
    if payload.password.chars().count() < 6 {
        errors.add("password", "Password must be at least 6 characters");
    }
    if payload.confirm_password != payload.password {
        errors.add(
            "confirmPassword",
            "Password confirmation does not match password",
        );
    }
    errors.finish()?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!("signup with already-registered email");
        return Err(ApiError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &name, &email, &hash).await?;
    Profile::create_empty(&state.db, user.id).await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".into(),
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse<LoginUser>>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let mut errors = FieldErrors::new();
    if !is_valid_email(&email) {
        errors.add("email", "Valid email is required");
    }
    if payload.password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.finish()?;

    // One generic message for absent user, wrong password and deactivated
    // account; responses must not reveal which check failed.
    let invalid = || ApiError::Unauthorized("Invalid email or password".into());

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!("login with unknown email");
            return Err(invalid());
        }
    };

    if !verify_password(&payload.password, &user.password_hash) {
        warn!(user_id = user.id, "login with invalid password");
        return Err(invalid());
    }

    if !user.is_active {
        warn!(user_id = user.id, "login on deactivated account");
        return Err(invalid());
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    User::touch_last_login(&state.db, user.id).await?;

    if payload.remember_me {
        Session::create(&state.db, user.id, &generate_session_token()).await?;
    }

    info!(user_id = user.id, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse<UserProfileView>>, ApiError> {
    match User::profile_view(&state.db, user_id).await? {
        Some(user) => Ok(Json(ProfileResponse { user })),
        None => {
            // Valid token pointing at a missing row: inconsistent store.
            warn!(user_id, "profile requested for missing user");
            Err(ApiError::NotFound("User not found".into()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let name = payload.name.as_ref().map(|n| n.trim().to_string());

    let mut errors = FieldErrors::new();
    if let Some(name) = &name {
        if name.chars().count() < 2 {
            errors.add("name", "Name must be at least 2 characters");
        }
    }
    for (field, value) in [
        ("website", &payload.website),
        ("linkedin_url", &payload.linkedin_url),
        ("avatar_url", &payload.avatar_url),
    ] {
        if let Some(url) = value {
            if !is_valid_url(url) {
                errors.add(field, "Valid URL is required");
            }
        }
    }
    errors.finish()?;

    if let Some(name) = &name {
        User::update_name(&state.db, user_id, name).await?;
    }

    let patch = ProfilePatch {
        avatar_url: payload.avatar_url,
        bio: payload.bio,
        location: payload.location,
        website: payload.website,
        twitter_handle: payload.twitter_handle,
        linkedin_url: payload.linkedin_url,
        investment_preferences: payload.investment_preferences,
    };
    Profile::upsert(&state.db, user_id, &patch).await?;

    info!(user_id, "profile updated");
    Ok(Json(MessageResponse::new("Profile updated successfully")))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    if payload.current_password.is_empty() {
        errors.add("currentPassword", "Current password is required");
    }
    if payload.new_password.chars().count() < 6 {
        errors.add("newPassword", "New password must be at least 6 characters");
    }
    errors.finish()?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash) {
        warn!(user_id, "change-password with wrong current password");
        return Err(ApiError::BadRequest("Current password is incorrect".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user_id, &hash).await?;

    info!(user_id, "password changed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// Tokens are stateless, so there is nothing to revoke server-side; the
/// endpoint exists so clients have a hook for discarding their token.
#[instrument]
pub async fn logout(AuthUser(user_id): AuthUser) -> Json<MessageResponse> {
    info!(user_id, "user logged out");
    Json(MessageResponse::new("Logged out successfully"))
}

/// Opaque remember-me token: 32 random bytes, hex-encoded.
fn generate_session_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_tokens_are_opaque_and_distinct() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn health_body_matches_contract() {
        let body = serde_json::to_value(HealthResponse {
            status: "OK",
            message: "DAIO Auth Server is running",
        })
        .unwrap();
        assert_eq!(body["status"], "OK");
    }
}
