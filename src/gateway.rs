//! Authenticated request path with single-shot 401 recovery.
//!
//! Every facade request flows through [`send_with_recovery`]: the current
//! access token is injected, and a 401 on an authenticated request triggers
//! exactly one refresh followed by exactly one replay. A second 401 on the
//! replay surfaces as a plain status error; an unauthenticated request is
//! never recovered.

use crate::config::{ApiConfig, Service};
use crate::error::{ApiError, AuthError, Result};
use crate::session::SessionManager;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Map a received response to its body, or to the error its status encodes.
pub fn translate(response: TransportResponse) -> Result<Value> {
  if (200..300).contains(&response.status) {
    Ok(response.body)
  } else {
    Err(ApiError::from_status(response.status, &response.body))
  }
}

/// Send with the session's bearer token, recovering from one 401 by
/// refreshing and replaying once.
pub async fn send_with_recovery(
  transport: &Arc<dyn Transport>,
  session: &SessionManager,
  request: TransportRequest,
) -> Result<Value> {
  let token = session.access_token();
  let had_token = token.is_some();
  let first = transport.send(request.clone().with_bearer(token)).await?;

  if first.status != 401 || !had_token {
    return translate(first);
  }

  debug!("request rejected with 401, attempting token refresh");
  let refreshed = match session.refresh().await {
    Ok(refreshed) => refreshed,
    // The session is already cleared; the caller sees a session-expired
    // error rather than the refresh endpoint's own failure.
    Err(_) => return Err(ApiError::Auth(AuthError::Unauthorized)),
  };

  let second = transport
    .send(request.with_bearer(refreshed.access_token))
    .await?;
  translate(second)
}

/// Facade-facing handle bundling the transport, config, and session.
#[derive(Clone)]
pub struct RequestGateway {
  transport: Arc<dyn Transport>,
  config: Arc<ApiConfig>,
  session: SessionManager,
}

impl RequestGateway {
  pub fn new(
    transport: Arc<dyn Transport>,
    config: Arc<ApiConfig>,
    session: SessionManager,
  ) -> Self {
    Self {
      transport,
      config,
      session,
    }
  }

  pub fn config(&self) -> &ApiConfig {
    &self.config
  }

  fn url(&self, service: Service, path: &str) -> String {
    self.config.endpoint(service, path)
  }

  pub async fn get(&self, service: Service, path: &str, query: &[(String, String)]) -> Result<Value> {
    let request = TransportRequest::get(self.url(service, path)).with_query(query);
    send_with_recovery(&self.transport, &self.session, request).await
  }

  pub async fn post(&self, service: Service, path: &str, body: Value) -> Result<Value> {
    let mut request = TransportRequest::post(self.url(service, path));
    if !body.is_null() {
      request = request.with_json(body);
    }
    send_with_recovery(&self.transport, &self.session, request).await
  }

  pub async fn put(&self, service: Service, path: &str, body: Value) -> Result<Value> {
    let mut request = TransportRequest::put(self.url(service, path));
    if !body.is_null() {
      request = request.with_json(body);
    }
    send_with_recovery(&self.transport, &self.session, request).await
  }

  pub async fn delete(&self, service: Service, path: &str) -> Result<Value> {
    let request = TransportRequest::delete(self.url(service, path));
    send_with_recovery(&self.transport, &self.session, request).await
  }

  /// Multipart upload of one file under the `file` form field.
  pub async fn upload(
    &self,
    service: Service,
    path: &str,
    filename: &str,
    bytes: Vec<u8>,
  ) -> Result<Value> {
    let request = TransportRequest::post(self.url(service, path)).with_file("file", filename, bytes);
    send_with_recovery(&self.transport, &self.session, request).await
  }
}
