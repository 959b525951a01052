use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Anon key rejected - check SUPABASE_ANON_KEY")]
    Unauthorized,

    #[error("Blocked by row-level security: {0}")]
    AccessDenied(String),

    #[error("Table or row not found: {0}")]
    NotFound(String),

    #[error("Request rejected by the backend: {0}")]
    Rejected(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Backend error: {0}")]
    ServerError(String),

    #[error("Could not reach the backend: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl ApiError {
    /// Describe an error body: the PostgREST message when the body is one,
    /// otherwise the raw body cut to a loggable length.
    fn describe_body(body: &str) -> String {
        if let Ok(error) = serde_json::from_str::<PostgrestError>(body) {
            let mut message = error.message;
            if let Some(code) = error.code {
                message = format!("{} ({})", message, code);
            }
            if let Some(hint) = error.hint.filter(|h| !h.is_empty()) {
                message = format!("{}; hint: {}", message, hint);
            }
            return message;
        }

        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::describe_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            400 | 409 | 422 => ApiError::Rejected(detail),
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "no table"),
            ApiError::NotFound(ref body) if body == "no table"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::CONFLICT, "dup"),
            ApiError::Rejected(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, "odd"),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_postgrest_body_is_summarized() {
        let body = r#"{"code":"42501","details":null,"hint":"Enable a policy for anon","message":"permission denied for table leads"}"#;
        let err = ApiError::from_status(StatusCode::FORBIDDEN, body);
        assert_eq!(
            err.to_string(),
            "Blocked by row-level security: permission denied for table leads (42501); hint: Enable a policy for anon"
        );

        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"code":"PGRST204","message":"Could not find the 'foo' column","hint":null}"#,
        );
        assert_eq!(
            err.to_string(),
            "Request rejected by the backend: Could not find the 'foo' column (PGRST204)"
        );
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "é".repeat(400);
        let err = ApiError::from_status(StatusCode::FORBIDDEN, &body);
        let ApiError::AccessDenied(message) = err else {
            panic!("expected AccessDenied");
        };
        assert!(message.ends_with("(truncated, 800 total bytes)"));
        assert!(message.len() < body.len());
    }
}
