use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};

use crate::auth::repo_types::{Profile, ProfilePatch, Session, User, UserProfileView};

/// Remember-me sessions live this long from creation.
const SESSION_TTL_DAYS: i64 = 30;

impl User {
    /// Look up a user by email. Callers normalize (trim + lowercase) first.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create(
        db: &SqlitePool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
    }

    pub async fn touch_last_login(db: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn update_name(db: &SqlitePool, id: i64, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn update_password(
        db: &SqlitePool,
        id: i64,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Combined user + profile view for GET profile.
    pub async fn profile_view(
        db: &SqlitePool,
        id: i64,
    ) -> Result<Option<UserProfileView>, sqlx::Error> {
        sqlx::query_as::<_, UserProfileView>(
            r#"
            SELECT u.id, u.name, u.email, u.email_verified, u.created_at, u.last_login,
                   p.avatar_url, p.bio, p.location, p.website,
                   p.twitter_handle, p.linkedin_url, p.investment_preferences
            FROM users u
            LEFT JOIN user_profiles p ON p.user_id = u.id
            WHERE u.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}

impl Profile {
    /// Empty profile row created alongside the user at signup.
    pub async fn create_empty(db: &SqlitePool, user_id: i64) -> Result<(), sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        sqlx::query("INSERT INTO user_profiles (user_id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(now)
            .bind(now)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Partial upsert: absent patch fields keep their stored values.
    pub async fn upsert(
        db: &SqlitePool,
        user_id: i64,
        patch: &ProfilePatch,
    ) -> Result<(), sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        sqlx::query(
            r#"
            INSERT INTO user_profiles
                (user_id, avatar_url, bio, location, website,
                 twitter_handle, linkedin_url, investment_preferences,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                avatar_url = COALESCE(excluded.avatar_url, user_profiles.avatar_url),
                bio = COALESCE(excluded.bio, user_profiles.bio),
                location = COALESCE(excluded.location, user_profiles.location),
                website = COALESCE(excluded.website, user_profiles.website),
                twitter_handle =
                    COALESCE(excluded.twitter_handle, user_profiles.twitter_handle),
                linkedin_url = COALESCE(excluded.linkedin_url, user_profiles.linkedin_url),
                investment_preferences =
                    COALESCE(excluded.investment_preferences, user_profiles.investment_preferences),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&patch.avatar_url)
        .bind(&patch.bio)
        .bind(&patch.location)
        .bind(&patch.website)
        .bind(&patch.twitter_handle)
        .bind(&patch.linkedin_url)
        .bind(&patch.investment_preferences)
        .bind(now)
        .bind(now)
        .execute(db)
        .await?;
        Ok(())
    }
}

impl Session {
    /// Store a remember-me token. Expiry is 30 days out; nothing prunes or
    /// reads these rows yet.
    pub async fn create(db: &SqlitePool, user_id: i64, token: &str) -> Result<(), sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        sqlx::query(
            "INSERT INTO user_sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(token)
        .bind(now)
        .bind(now + Duration::days(SESSION_TTL_DAYS))
        .execute(db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn create_and_find_user() {
        let db = memory_pool().await;
        let user = User::create(&db, "Test User", "test@daio.com", "$argon2$fake")
            .await
            .unwrap();
        assert!(user.id > 0);
        assert!(user.is_active);
        assert!(!user.email_verified);
        assert!(user.last_login.is_none());

        let found = User::find_by_email(&db, "test@daio.com").await.unwrap();
        assert_eq!(found.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_violates_unique_index() {
        let db = memory_pool().await;
        User::create(&db, "A", "dup@daio.com", "h").await.unwrap();
        let err = User::create(&db, "B", "dup@daio.com", "h").await.unwrap_err();
        match err {
            sqlx::Error::Database(e) => {
                assert!(e.message().contains("UNIQUE constraint failed"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn profile_upsert_is_partial() {
        let db = memory_pool().await;
        let user = User::create(&db, "Test User", "p@daio.com", "h").await.unwrap();
        Profile::create_empty(&db, user.id).await.unwrap();

        let patch = ProfilePatch {
            bio: Some("investor".into()),
            location: Some("Lisbon".into()),
            ..Default::default()
        };
        Profile::upsert(&db, user.id, &patch).await.unwrap();

        // A later patch touching only the website must keep bio/location.
        let patch = ProfilePatch {
            website: Some("https://daio.com".into()),
            ..Default::default()
        };
        Profile::upsert(&db, user.id, &patch).await.unwrap();

        let view = User::profile_view(&db, user.id).await.unwrap().unwrap();
        assert_eq!(view.bio.as_deref(), Some("investor"));
        assert_eq!(view.location.as_deref(), Some("Lisbon"));
        assert_eq!(view.website.as_deref(), Some("https://daio.com"));
    }

    #[tokio::test]
    async fn profile_view_exists_without_profile_row() {
        let db = memory_pool().await;
        let user = User::create(&db, "No Profile", "np@daio.com", "h").await.unwrap();
        let view = User::profile_view(&db, user.id).await.unwrap().unwrap();
        assert_eq!(view.email, "np@daio.com");
        assert!(view.bio.is_none());
    }

    #[tokio::test]
    async fn session_tokens_are_unique() {
        let db = memory_pool().await;
        let user = User::create(&db, "S", "s@daio.com", "h").await.unwrap();
        Session::create(&db, user.id, "token-a").await.unwrap();
        assert!(Session::create(&db, user.id, "token-a").await.is_err());
        Session::create(&db, user.id, "token-b").await.unwrap();
    }
}
