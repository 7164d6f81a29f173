use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, FieldError};

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn is_valid_url(url: &str) -> bool {
    lazy_static! {
        static ref URL_RE: Regex =
            Regex::new(r"^https?://[A-Za-z0-9.-]+\.[A-Za-z]{2,}(:\d+)?(/\S*)?$").unwrap();
    }
    URL_RE.is_match(url)
}

/// Collects per-field failures so a response can itemize all of them at once.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
        self
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_emails() {
        assert!(is_valid_email("test@daio.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@signs.com"));
        assert!(!is_valid_email("spaces in@mail.com"));
        assert!(!is_valid_email("nodomain@"));
    }

    #[test]
    fn accepts_http_urls() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://example.com:8080/path?q=1"));
        assert!(is_valid_url("https://www.linkedin.com/in/someone"));
    }

    #[test]
    fn rejects_non_urls() {
        assert!(!is_valid_url("not-a-url"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("https://nodot"));
        assert!(!is_valid_url("example.com"));
    }

    #[test]
    fn field_errors_accumulate() {
        let mut errors = FieldErrors::new();
        errors.add("name", "Name must be at least 2 characters");
        errors.add("email", "Valid email is required");
        let err = errors.finish().unwrap_err();
        match err {
            ApiError::Validation(details) => {
                assert_eq!(details.len(), 2);
                assert_eq!(details[0].field, "name");
            }
            _ => panic!("expected validation error"),
        }
    }

    #[test]
    fn empty_field_errors_pass() {
        assert!(FieldErrors::new().finish().is_ok());
    }
}
