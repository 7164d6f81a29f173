//! API error taxonomy.
//!
//! Every failure leaves the server as `{"error": "..."}` with an appropriate
//! status code; validation failures additionally carry an itemized
//! `details` array. Store and hash failures are logged server-side and
//! surfaced as an opaque 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// One itemized validation failure, named after the offending request field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    /// Duplicate email. Returned as 400, matching the public surface.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(details) => ErrorBody {
                error: "Validation failed".into(),
                details: Some(details),
            },
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                ErrorBody {
                    error: "Internal server error".into(),
                    details: None,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // Backstop for the pre-insert existence check: a racing signup can
        // still trip the unique index on users.email. Other unique indexes
        // (session tokens, profile user_id) are not client conflicts.
        if let sqlx::Error::Database(db_err) = &err {
            if db_err
                .message()
                .contains("UNIQUE constraint failed: users.email")
            {
                return ApiError::Conflict("User with this email already exists".into());
            }
        }
        tracing::error!(error = %err, "database error");
        ApiError::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::Validation(vec![]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("no".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("no".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn validation_body_is_itemized() {
        let err = ApiError::Validation(vec![FieldError {
            field: "website".into(),
            message: "Valid URL is required".into(),
        }]);
        let body = match err {
            ApiError::Validation(details) => serde_json::to_value(ErrorBody {
                error: "Validation failed".into(),
                details: Some(details),
            })
            .unwrap(),
            _ => unreachable!(),
        };
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"][0]["field"], "website");
    }

    #[tokio::test]
    async fn only_email_unique_violations_map_to_conflict() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

        sqlx::query("INSERT INTO users (name, email, password_hash) VALUES ('A', 'a@daio.com', 'h')")
            .execute(&pool)
            .await
            .unwrap();
        let email_dup =
            sqlx::query("INSERT INTO users (name, email, password_hash) VALUES ('B', 'a@daio.com', 'h')")
                .execute(&pool)
                .await
                .unwrap_err();
        assert!(matches!(ApiError::from(email_dup), ApiError::Conflict(_)));

        // A duplicate session token is a server-side bug, not an email
        // conflict the client can act on.
        sqlx::query(
            "INSERT INTO user_sessions (user_id, token, expires_at) VALUES (1, 't', '2099-01-01')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let token_dup = sqlx::query(
            "INSERT INTO user_sessions (user_id, token, expires_at) VALUES (1, 't', '2099-01-01')",
        )
        .execute(&pool)
        .await
        .unwrap_err();
        assert!(matches!(ApiError::from(token_dup), ApiError::Internal(_)));
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = ApiError::Internal(anyhow::anyhow!("secret db path"));
        let body = match err {
            ApiError::Internal(_) => ErrorBody {
                error: "Internal server error".into(),
                details: None,
            },
            _ => unreachable!(),
        };
        assert!(!body.error.contains("secret"));
    }
}
