use serde::Deserialize;
use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server explicitly rejected the request and supplied a message.
    #[error("{0}")]
    Rejected(String),

    /// 401-class response: the session token was rejected or has expired.
    #[error("{}", .message.as_deref().unwrap_or("unauthorized - token may be expired"))]
    Unauthorized { message: Option<String> },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            // Back off to a char boundary; the cut may land mid-character
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..cut],
                body.len()
            )
        }
    }

    /// Pull the `message` field out of a JSON error body, if there is one.
    fn extract_message(body: &str) -> Option<String> {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: Option<String>,
        }

        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized { message },
            _ => match message {
                Some(m) => ApiError::Rejected(m),
                None => ApiError::InvalidResponse(format!(
                    "status {}: {}",
                    status,
                    Self::truncate_body(body)
                )),
            },
        }
    }

    /// True for the 401-class failures that invalidate the stored session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Message suitable for display, falling back when the server gave none.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Rejected(m) => m.clone(),
            ApiError::Unauthorized {
                message: Some(m), ..
            } => m.clone(),
            _ => fallback.to_string(),
        }
    }
}
