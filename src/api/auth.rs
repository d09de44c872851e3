//! Authentication facade.
//!
//! These endpoints run outside the 401-recovery protocol: a 401 here means
//! the credentials themselves were rejected, and triggering a refresh from
//! inside the refresh path would loop.

use crate::config::{ApiConfig, Service};
use crate::error::{ApiError, AuthError, Result};
use crate::gateway;
use crate::models::Principal;
use crate::transport::{Transport, TransportRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Payload returned by login, register and refresh.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
  #[serde(default)]
  pub token: Option<String>,
  #[serde(default)]
  pub refresh_token: Option<String>,
  #[serde(default)]
  pub user: Option<Principal>,
}

#[derive(Clone)]
pub struct AuthApi {
  transport: Arc<dyn Transport>,
  config: Arc<ApiConfig>,
}

impl AuthApi {
  pub fn new(transport: Arc<dyn Transport>, config: Arc<ApiConfig>) -> Self {
    Self { transport, config }
  }

  fn url(&self, service: Service, path: &str) -> String {
    self.config.endpoint(service, path)
  }

  async fn send(&self, request: TransportRequest) -> Result<Value> {
    let response = self.transport.send(request).await?;
    gateway::translate(response)
  }

  pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
    let request = TransportRequest::post(self.url(Service::User, "login"))
      .with_json(json!({"email": email, "password": password}));

    let body = match self.send(request).await {
      Ok(body) => body,
      Err(e) if e.status_code() == Some(401) => {
        return Err(ApiError::Auth(AuthError::InvalidCredentials));
      }
      Err(e) => return Err(e),
    };
    Ok(serde_json::from_value(body)?)
  }

  pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
    let request = TransportRequest::post(self.url(Service::User, "register")).with_json(json!({
      "name": name,
      "email": email,
      "password": password,
      "role": "user",
    }));
    let body = self.send(request).await?;
    Ok(serde_json::from_value(body)?)
  }

  pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse> {
    let request = TransportRequest::post(self.url(Service::User, "refresh"))
      .with_json(json!({"refresh_token": refresh_token}));
    let body = self.send(request).await?;
    Ok(serde_json::from_value(body)?)
  }

  /// Remote session invalidation. The booking service owns this endpoint.
  pub async fn logout(&self, token: Option<String>) -> Result<()> {
    let request =
      TransportRequest::post(self.url(Service::Booking, "auth/logout")).with_bearer(token);
    self.send(request).await?;
    Ok(())
  }

  /// Trigger a reset email. The response is deliberately generic so it
  /// cannot reveal whether the address exists.
  pub async fn forgot_password(&self, email: &str) -> Result<Value> {
    let request = TransportRequest::post(self.url(Service::User, "forgot-password"))
      .with_json(json!({"email": email}));
    self.send(request).await
  }

  pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<Value> {
    let request = TransportRequest::post(self.url(Service::User, "reset-password"))
      .with_json(json!({"token": token, "new_password": new_password}));
    self.send(request).await
  }

  /// Pre-validate a reset token before showing the reset form.
  pub async fn verify_reset_token(&self, token: &str) -> Result<Value> {
    let request = TransportRequest::get(self.url(Service::User, "verify-reset-token"))
      .with_query(&[("token".to_string(), token.to_string())]);
    self.send(request).await
  }
}
