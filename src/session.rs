//! Session lifecycle: login, refresh-and-retry, and profile reconciliation.
//!
//! The session is exclusively owned by [`SessionManager`]; everything else
//! sees read-only snapshots. A token without a principal (or vice versa) is
//! treated as unauthenticated.

use crate::api::{AuthApi, AuthResponse};
use crate::collection::Envelope;
use crate::config::{ApiConfig, Service};
use crate::error::{status_message, ApiError, AuthError, Result};
use crate::gateway;
use crate::models::Principal;
use crate::storage::TokenStore;
use crate::transport::{Transport, TransportRequest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Server-issued session material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub access_token: Option<String>,
  pub refresh_token: Option<String>,
  pub principal: Option<Principal>,
}

impl Session {
  /// Authenticated means both a token and a principal are present.
  pub fn authenticated(&self) -> bool {
    self.access_token.is_some() && self.principal.is_some()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Anonymous,
  Authenticated,
  Refreshing,
}

/// Profile fields a user may change.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
  pub name: String,
  pub email: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub profile_image: Option<String>,
}

struct Inner {
  session: RwLock<Session>,
  state: RwLock<SessionState>,
  tokens: TokenStore,
  transport: Arc<dyn Transport>,
  config: Arc<ApiConfig>,
  auth: AuthApi,
  /// Coalesces concurrent refresh attempts into one network call.
  refresh_lock: tokio::sync::Mutex<()>,
  loading: AtomicBool,
}

/// Owner of the session state machine {Anonymous, Authenticated, Refreshing}.
#[derive(Clone)]
pub struct SessionManager {
  inner: Arc<Inner>,
}

impl SessionManager {
  /// Create a manager, rehydrating any persisted session.
  pub fn new(config: Arc<ApiConfig>, transport: Arc<dyn Transport>, tokens: TokenStore) -> Self {
    let session = tokens.load_session();
    let state = if session.authenticated() {
      SessionState::Authenticated
    } else {
      SessionState::Anonymous
    };

    Self {
      inner: Arc::new(Inner {
        session: RwLock::new(session),
        state: RwLock::new(state),
        tokens,
        auth: AuthApi::new(transport.clone(), config.clone()),
        transport,
        config,
        refresh_lock: tokio::sync::Mutex::new(()),
        loading: AtomicBool::new(false),
      }),
    }
  }

  /// Read-only snapshot of the current session.
  pub fn snapshot(&self) -> Session {
    self
      .inner
      .session
      .read()
      .map(|s| s.clone())
      .unwrap_or_default()
  }

  pub fn state(&self) -> SessionState {
    self
      .inner
      .state
      .read()
      .map(|s| *s)
      .unwrap_or(SessionState::Anonymous)
  }

  pub fn authenticated(&self) -> bool {
    self.snapshot().authenticated()
  }

  pub fn access_token(&self) -> Option<String> {
    self.snapshot().access_token
  }

  pub fn principal(&self) -> Option<Principal> {
    self.snapshot().principal
  }

  pub fn is_loading(&self) -> bool {
    self.inner.loading.load(Ordering::SeqCst)
  }

  fn set_state(&self, state: SessionState) {
    if let Ok(mut current) = self.inner.state.write() {
      *current = state;
    }
  }

  fn store_auth(&self, token: String, refresh: Option<String>, principal: Option<Principal>) {
    if let Ok(mut session) = self.inner.session.write() {
      session.access_token = Some(token);
      if refresh.is_some() {
        session.refresh_token = refresh;
      }
      if principal.is_some() {
        session.principal = principal;
      }
      self.inner.tokens.save_session(&session);
    }
    self.set_state(SessionState::Authenticated);
  }

  fn store_principal(&self, principal: Principal) {
    if let Ok(mut session) = self.inner.session.write() {
      // Replaced wholesale, never field-patched.
      session.principal = Some(principal);
      self.inner.tokens.save_session(&session);
    }
  }

  /// Drop all session material, locally and from the token store.
  pub fn clear(&self) {
    if let Ok(mut session) = self.inner.session.write() {
      *session = Session::default();
    }
    self.set_state(SessionState::Anonymous);
    self.inner.tokens.clear();
    debug!("session cleared");
  }

  async fn with_loading<T>(
    &self,
    fut: impl std::future::Future<Output = Result<T>>,
  ) -> Result<T> {
    self.inner.loading.store(true, Ordering::SeqCst);
    let result = fut.await;
    self.inner.loading.store(false, Ordering::SeqCst);
    result
  }

  /// Authenticate against the auth backend.
  ///
  /// Invalid credentials surface unmodified as
  /// [`AuthError::InvalidCredentials`]; all errors re-throw to the caller.
  pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
    self
      .with_loading(async {
        let response = self.inner.auth.login(email, password).await?;
        self.apply_auth_response(response, true)?;
        debug!("login succeeded");
        Ok(self.snapshot())
      })
      .await
  }

  /// Create an account, auto-authenticating when the server returns a
  /// token alongside it.
  pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Session> {
    self
      .with_loading(async {
        let response = self.inner.auth.register(name, email, password).await?;
        if response.token.is_some() && response.user.is_some() {
          self.apply_auth_response(response, true)?;
        }
        Ok(self.snapshot())
      })
      .await
  }

  fn apply_auth_response(&self, response: AuthResponse, require_principal: bool) -> Result<()> {
    let token = response
      .token
      .ok_or_else(|| ApiError::UnexpectedResponse("auth response without token".to_string()))?;
    if require_principal && response.user.is_none() {
      return Err(ApiError::UnexpectedResponse(
        "auth response without user".to_string(),
      ));
    }
    self.store_auth(token, response.refresh_token, response.user);
    Ok(())
  }

  /// Exchange the refresh token for a new token pair.
  ///
  /// The principal is preserved; any failure clears the session. Concurrent
  /// callers are coalesced: whoever loses the race to the lock and finds a
  /// token newer than the one it failed with skips the network call.
  pub async fn refresh(&self) -> Result<Session> {
    let stale = self.access_token();
    let _guard = self.inner.refresh_lock.lock().await;

    let snapshot = self.snapshot();
    if snapshot.authenticated() && snapshot.access_token != stale {
      debug!("refresh already performed by a concurrent caller");
      return Ok(snapshot);
    }

    let Some(refresh_token) = snapshot.refresh_token else {
      self.clear();
      return Err(ApiError::Auth(AuthError::NoRefreshToken));
    };

    self.set_state(SessionState::Refreshing);
    match self.inner.auth.refresh(&refresh_token).await {
      Ok(response) => {
        self.apply_auth_response(response, false).map_err(|e| {
          self.clear();
          e
        })?;
        debug!("token refreshed");
        Ok(self.snapshot())
      }
      Err(e) => {
        warn!("token refresh failed: {}", e);
        self.clear();
        Err(e)
      }
    }
  }

  /// Invalidate the session remotely (best effort) and locally
  /// (unconditionally). Always succeeds locally.
  pub async fn logout(&self) {
    let token = self.access_token();
    if let Err(e) = self.inner.auth.logout(token).await {
      warn!("remote logout failed, clearing locally anyway: {}", e);
    }
    self.clear();
  }

  /// Re-fetch the principal from the server and replace it.
  ///
  /// A 401 clears the session; any other failure is reported without
  /// clearing, distinguishing "not authenticated" from a transient error.
  pub async fn reconcile_profile(&self) -> Envelope<Principal> {
    if !self.authenticated() {
      return Envelope::fail(status_message(401));
    }

    let request = TransportRequest::get(self.inner.config.endpoint(Service::User, "me"));
    match gateway::send_with_recovery(&self.inner.transport, self, request).await {
      Ok(body) => match crate::normalize::parse_record::<Principal>(&body, "user") {
        Ok(principal) => {
          self.store_principal(principal.clone());
          Envelope::ok(principal)
        }
        Err(e) => Envelope::fail(e.to_string()),
      },
      Err(e) => {
        if e.is_unauthorized() {
          self.clear();
        }
        Envelope::fail(e.to_string())
      }
    }
  }

  /// Replace the profile server-side, then the local principal wholesale.
  pub async fn update_profile(&self, update: &ProfileUpdate) -> Envelope<Principal> {
    if !self.authenticated() {
      return Envelope::fail(status_message(401));
    }

    self.inner.loading.store(true, Ordering::SeqCst);
    let request = TransportRequest::put(self.inner.config.endpoint(Service::User, "profile"))
      .with_json(json!(update));
    let result = gateway::send_with_recovery(&self.inner.transport, self, request).await;
    self.inner.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(body) => match crate::normalize::parse_record::<Principal>(&body, "user") {
        Ok(principal) => {
          self.store_principal(principal.clone());
          Envelope::ok_with(principal, "Profile updated successfully.")
        }
        Err(e) => Envelope::fail(e.to_string()),
      },
      Err(e) => {
        if e.is_unauthorized() {
          self.clear();
        }
        Envelope::fail(e.to_string())
      }
    }
  }

  pub async fn change_password(&self, current: &str, new: &str) -> Envelope<()> {
    if !self.authenticated() {
      return Envelope::fail(status_message(401));
    }

    self.inner.loading.store(true, Ordering::SeqCst);
    let request =
      TransportRequest::post(self.inner.config.endpoint(Service::User, "change-password"))
        .with_json(json!({"current_password": current, "new_password": new}));
    let result = gateway::send_with_recovery(&self.inner.transport, self, request).await;
    self.inner.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(_) => Envelope::done("Password changed successfully."),
      Err(e) => {
        if e.is_unauthorized() {
          self.clear();
        }
        Envelope::fail(e.to_string())
      }
    }
  }

  /// Complete a password reset with an emailed token. Errors re-throw.
  pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
    self
      .with_loading(async {
        self.inner.auth.reset_password(token, new_password).await?;
        Ok(())
      })
      .await
  }

  pub async fn forgot_password(&self, email: &str) -> Result<()> {
    self.inner.auth.forgot_password(email).await?;
    Ok(())
  }

  pub async fn verify_reset_token(&self, token: &str) -> Result<()> {
    self.inner.auth.verify_reset_token(token).await?;
    Ok(())
  }

  /// Verify a rehydrated session against the server at startup.
  pub async fn initialize(&self) {
    if self.authenticated() {
      let result = self.reconcile_profile().await;
      if !result.success {
        self.clear();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::{KeyValueStore, MemoryStorage};
  use crate::transport::mock::{MockReply, MockTransport};
  use reqwest::Method;
  use serde_json::json;

  fn principal_json() -> serde_json::Value {
    json!({"id": 1, "name": "Mika", "email": "mika@example.com", "role": "user"})
  }

  fn manager(transport: Arc<MockTransport>) -> SessionManager {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
    let config = Arc::new(ApiConfig::default());
    let tokens = TokenStore::new(store, config.storage.keys.clone());
    SessionManager::new(config, transport, tokens)
  }

  fn authenticated_manager(transport: Arc<MockTransport>) -> SessionManager {
    let manager = manager(transport);
    manager.store_auth(
      "tok-1".to_string(),
      Some("ref-1".to_string()),
      Some(serde_json::from_value(principal_json()).unwrap()),
    );
    manager
  }

  #[tokio::test]
  async fn login_persists_session() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::POST,
      "/login",
      MockReply::Status(
        200,
        json!({"token": "tok-1", "refresh_token": "ref-1", "user": principal_json()}),
      ),
    );

    let manager = manager(transport);
    let session = manager.login("mika@example.com", "secret").await.unwrap();

    assert!(session.authenticated());
    assert_eq!(session.access_token.as_deref(), Some("tok-1"));
    assert_eq!(manager.state(), SessionState::Authenticated);
    // Persisted: a fresh snapshot from the token store sees the same data.
    assert_eq!(manager.inner.tokens.access_token().as_deref(), Some("tok-1"));
    assert_eq!(manager.inner.tokens.principal().unwrap().name, "Mika");
  }

  #[tokio::test]
  async fn login_rejection_surfaces_invalid_credentials() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::POST,
      "/login",
      MockReply::Status(401, json!({"message": "wrong password"})),
    );

    let manager = manager(transport);
    let err = manager.login("mika@example.com", "nope").await.unwrap_err();
    assert!(matches!(
      err,
      ApiError::Auth(AuthError::InvalidCredentials)
    ));
    assert!(!manager.authenticated());
  }

  #[tokio::test]
  async fn register_without_token_stays_anonymous() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::POST,
      "/register",
      MockReply::Status(201, json!({"user": principal_json()})),
    );

    let manager = manager(transport);
    let session = manager.register("Mika", "mika@example.com", "secret").await.unwrap();
    assert!(!session.authenticated());
    assert_eq!(manager.state(), SessionState::Anonymous);
  }

  #[tokio::test]
  async fn refresh_without_token_clears_and_fails() {
    let transport = Arc::new(MockTransport::new());
    let manager = manager(transport.clone());
    manager.store_auth("tok-1".to_string(), None, Some(serde_json::from_value(principal_json()).unwrap()));

    let err = manager.refresh().await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(AuthError::NoRefreshToken)));
    assert!(!manager.authenticated());
    assert_eq!(transport.hits("/refresh"), 0);
  }

  #[tokio::test]
  async fn refresh_replaces_token_and_preserves_principal() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::POST,
      "/refresh",
      MockReply::Status(200, json!({"token": "tok-2", "refresh_token": "ref-2"})),
    );

    let manager = authenticated_manager(transport);
    let session = manager.refresh().await.unwrap();

    assert_eq!(session.access_token.as_deref(), Some("tok-2"));
    assert_eq!(session.refresh_token.as_deref(), Some("ref-2"));
    assert_eq!(session.principal.unwrap().name, "Mika");
    assert_eq!(manager.state(), SessionState::Authenticated);
  }

  #[tokio::test]
  async fn refresh_failure_clears_session() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::POST,
      "/refresh",
      MockReply::Status(401, json!({"message": "refresh expired"})),
    );

    let manager = authenticated_manager(transport);
    assert!(manager.refresh().await.is_err());
    assert!(!manager.authenticated());
    assert_eq!(manager.state(), SessionState::Anonymous);
    assert!(manager.inner.tokens.access_token().is_none());
  }

  #[tokio::test]
  async fn concurrent_refreshes_are_coalesced() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::POST,
      "/refresh",
      MockReply::Status(200, json!({"token": "tok-2"})),
    );

    let manager = authenticated_manager(transport.clone());
    let (a, b) = tokio::join!(manager.refresh(), manager.refresh());

    assert_eq!(a.unwrap().access_token.as_deref(), Some("tok-2"));
    assert_eq!(b.unwrap().access_token.as_deref(), Some("tok-2"));
    assert_eq!(transport.hits("/refresh"), 1);
  }

  #[tokio::test]
  async fn logout_clears_even_when_network_is_down() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::POST, "/auth/logout", MockReply::NetworkDown);

    let manager = authenticated_manager(transport);
    manager.logout().await;

    assert!(!manager.authenticated());
    assert_eq!(manager.state(), SessionState::Anonymous);
  }

  #[tokio::test]
  async fn reconcile_replaces_principal() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/me",
      MockReply::Status(
        200,
        json!({"user": {"id": 1, "name": "Mika Renamed", "email": "mika@example.com", "role": "user"}}),
      ),
    );

    let manager = authenticated_manager(transport);
    let result = manager.reconcile_profile().await;
    assert!(result.success);
    assert_eq!(manager.principal().unwrap().name, "Mika Renamed");
  }

  #[tokio::test]
  async fn reconcile_transient_failure_keeps_session() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::GET, "/me", MockReply::Status(500, json!({})));

    let manager = authenticated_manager(transport);
    let result = manager.reconcile_profile().await;

    assert!(!result.success);
    assert!(manager.authenticated(), "500 must not clear the session");
  }

  #[tokio::test]
  async fn reconcile_unauthorized_clears_session() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::GET, "/me", MockReply::Status(401, json!({})));
    // No refresh route: recovery fails and the session must be cleared.

    let manager = authenticated_manager(transport);
    let result = manager.reconcile_profile().await;

    assert!(!result.success);
    assert!(!manager.authenticated());
  }
}
