use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User row. Soft-deactivation only via `is_active`; rows are never
/// hard-deleted. The verification/reset token columns are placeholders
/// with no endpoint behind them.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    pub is_active: bool,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing)]
    pub reset_token_expires: Option<OffsetDateTime>,
}

/// Remember-me session row. Written at login when requested; nothing reads
/// it back yet, so the expiry is advisory only.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Namespace for user_profiles operations; rows are only ever read through
/// [`UserProfileView`].
pub struct Profile;

/// Combined user + profile projection returned by GET /api/auth/profile.
/// The password hash never appears here.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfileView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub twitter_handle: Option<String>,
    pub linkedin_url: Option<String>,
    pub investment_preferences: Option<String>,
}

/// Partial profile update: absent fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub twitter_handle: Option<String>,
    pub linkedin_url: Option<String>,
    pub investment_preferences: Option<String>,
}
