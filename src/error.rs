//! Error taxonomy for the data access layer.
//!
//! Backend responses carry their own `message`/`error` fields inconsistently,
//! so every HTTP failure is funneled through [`ApiError::from_status`] which
//! prefers the server-supplied message and falls back to a static
//! status-to-message table.

use serde_json::Value;
use thiserror::Error;

/// Authentication failures with a distinct contract per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
  /// Login was rejected by the auth backend.
  #[error("Invalid email or password.")]
  InvalidCredentials,
  /// A refresh was requested but no refresh token is stored.
  #[error("No refresh token available.")]
  NoRefreshToken,
  /// The session could not be recovered after a 401.
  #[error("Please log in to continue.")]
  Unauthorized,
}

/// Errors surfaced by the gateway and the entity stores.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The request never produced a response.
  #[error("Network error. Please check your connection: {0}")]
  Http(#[from] reqwest::Error),

  /// The transport gave up waiting for a response.
  #[error("Network error. Please check your connection.")]
  Timeout,

  /// A non-2xx response was received.
  #[error("{message}")]
  Status {
    code: u16,
    message: String,
    body: Option<Value>,
  },

  /// A 400 response, with field-level detail when the server supplied it.
  #[error("{message}")]
  Validation {
    message: String,
    fields: Option<Value>,
  },

  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  /// A 2xx response whose body is missing a field the contract requires.
  #[error("unexpected response shape: {0}")]
  UnexpectedResponse(String),

  #[error("storage error: {0}")]
  Storage(String),

  #[error("config error: {0}")]
  Config(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
  /// Translate a non-2xx response into a typed error.
  ///
  /// A `message` or `error` string in the body always wins over the static
  /// table. 400 responses become [`ApiError::Validation`], carrying the
  /// `errors` object when present.
  pub fn from_status(code: u16, body: &Value) -> Self {
    let message = body
      .get("message")
      .or_else(|| body.get("error"))
      .and_then(Value::as_str)
      .map(str::to_string)
      .unwrap_or_else(|| status_message(code).to_string());

    if code == 400 {
      ApiError::Validation {
        message,
        fields: body.get("errors").cloned(),
      }
    } else {
      ApiError::Status {
        code,
        message,
        body: if body.is_null() {
          None
        } else {
          Some(body.clone())
        },
      }
    }
  }

  /// HTTP status associated with this error, if any.
  pub fn status_code(&self) -> Option<u16> {
    match self {
      ApiError::Status { code, .. } => Some(*code),
      ApiError::Validation { .. } => Some(400),
      ApiError::Auth(AuthError::Unauthorized) => Some(401),
      _ => None,
    }
  }

  /// Whether this error means the caller's session is no longer valid.
  pub fn is_unauthorized(&self) -> bool {
    self.status_code() == Some(401)
  }
}

/// Static status-to-message table used when the server body has no message.
pub fn status_message(code: u16) -> &'static str {
  match code {
    400 => "Please check your input and try again.",
    401 => "Please log in to continue.",
    403 => "You do not have permission to perform this action.",
    404 => "The requested resource was not found.",
    409 => "This time slot is no longer available.",
    500 | 502 | 503 | 504 => "Server error. Please try again later.",
    _ => "An unexpected error occurred.",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn server_message_wins_over_table() {
    let err = ApiError::from_status(404, &json!({"message": "booking gone"}));
    assert_eq!(err.to_string(), "booking gone");

    let err = ApiError::from_status(503, &json!({"error": "maintenance"}));
    assert_eq!(err.to_string(), "maintenance");
  }

  #[test]
  fn table_fallback_per_status() {
    for (code, expect) in [
      (400, "Please check your input and try again."),
      (401, "Please log in to continue."),
      (403, "You do not have permission to perform this action."),
      (404, "The requested resource was not found."),
      (409, "This time slot is no longer available."),
      (502, "Server error. Please try again later."),
      (418, "An unexpected error occurred."),
    ] {
      let err = ApiError::from_status(code, &Value::Null);
      assert_eq!(err.to_string(), expect, "status {}", code);
    }
  }

  #[test]
  fn validation_carries_field_detail() {
    let err = ApiError::from_status(
      400,
      &json!({"message": "bad input", "errors": {"email": "required"}}),
    );
    match err {
      ApiError::Validation { message, fields } => {
        assert_eq!(message, "bad input");
        assert_eq!(fields, Some(json!({"email": "required"})));
      }
      other => panic!("expected validation error, got {:?}", other),
    }
  }

  #[test]
  fn unauthorized_detection() {
    assert!(ApiError::from_status(401, &Value::Null).is_unauthorized());
    assert!(ApiError::Auth(AuthError::Unauthorized).is_unauthorized());
    assert!(!ApiError::from_status(500, &Value::Null).is_unauthorized());
  }
}
