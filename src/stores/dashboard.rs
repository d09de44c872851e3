//! Teacher-dashboard store.
//!
//! Unlike the other stores this one keeps the last failure as state: the
//! dashboard renders an error banner rather than branching on a result.

use crate::api::TeacherApi;
use crate::models::DashboardData;
use crate::normalize::parse_record;
use crate::session::SessionManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::warn;

pub struct DashboardStore {
  api: TeacherApi,
  session: SessionManager,
  data: RwLock<Option<DashboardData>>,
  error: RwLock<Option<String>>,
  loading: AtomicBool,
}

impl DashboardStore {
  pub fn new(api: TeacherApi, session: SessionManager) -> Self {
    Self {
      api,
      session,
      data: RwLock::new(None),
      error: RwLock::new(None),
      loading: AtomicBool::new(false),
    }
  }

  pub fn data(&self) -> Option<DashboardData> {
    self.data.read().map(|d| d.clone()).unwrap_or_default()
  }

  pub fn error(&self) -> Option<String> {
    self.error.read().map(|e| e.clone()).unwrap_or_default()
  }

  pub fn is_loading(&self) -> bool {
    self.loading.load(Ordering::SeqCst)
  }

  /// Load the dashboard aggregate for one teacher. Success clears any
  /// previous error; failure keeps the previous data and records the error.
  pub async fn fetch(&self, teacher_id: u64) {
    self.loading.store(true, Ordering::SeqCst);
    if let Ok(mut error) = self.error.write() {
      *error = None;
    }

    match self.api.dashboard(teacher_id).await {
      Ok(body) => match parse_record::<DashboardData>(&body, "dashboard") {
        Ok(dashboard) => {
          if let Ok(mut data) = self.data.write() {
            *data = Some(dashboard);
          }
        }
        Err(e) => {
          warn!("dashboard payload failed to parse: {}", e);
          if let Ok(mut error) = self.error.write() {
            *error = Some(e.to_string());
          }
        }
      },
      Err(e) => {
        warn!("dashboard fetch failed: {}", e);
        if let Ok(mut error) = self.error.write() {
          *error = Some(e.to_string());
        }
      }
    }
    self.loading.store(false, Ordering::SeqCst);
  }

  /// Re-load for the signed-in principal; a no-op when anonymous.
  pub async fn refresh(&self) {
    if let Some(principal) = self.session.principal() {
      self.fetch(principal.id).await;
    }
  }

  pub fn clear(&self) {
    if let Ok(mut data) = self.data.write() {
      *data = None;
    }
    if let Ok(mut error) = self.error.write() {
      *error = None;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ApiConfig;
  use crate::gateway::RequestGateway;
  use crate::storage::{KeyValueStore, MemoryStorage, TokenStore};
  use crate::transport::mock::{MockReply, MockTransport};
  use crate::transport::Transport;
  use reqwest::Method;
  use serde_json::json;
  use std::sync::Arc;

  fn store(transport: Arc<MockTransport>) -> DashboardStore {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
    let config = Arc::new(ApiConfig::default());
    let tokens = TokenStore::new(kv, config.storage.keys.clone());
    tokens.save_session(&crate::session::Session {
      access_token: Some("tok-1".to_string()),
      refresh_token: Some("ref-1".to_string()),
      principal: Some(
        serde_json::from_value(
          json!({"id": 9, "name": "Mika", "email": "mika@example.com", "role": "teacher"}),
        )
        .unwrap(),
      ),
    });
    let session = SessionManager::new(config.clone(), transport.clone() as Arc<dyn Transport>, tokens);
    let gateway =
      RequestGateway::new(transport as Arc<dyn Transport>, config, session.clone());
    DashboardStore::new(TeacherApi::new(gateway), session)
  }

  #[tokio::test]
  async fn fetch_stores_data_and_clears_error() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/teachers/dashboard/9",
      MockReply::Status(
        200,
        json!({"data": {
          "stats": {"totalStudents": 4, "upcomingBookings": 2, "completedLessons": 11, "totalEarnings": 320.0}
        }}),
      ),
    );

    let store = store(transport);
    store.refresh().await;

    assert!(store.error().is_none());
    let data = store.data().unwrap();
    assert_eq!(data.stats.total_students, 4);
    assert_eq!(data.stats.completed_lessons, 11);
  }

  #[tokio::test]
  async fn fetch_failure_records_error_and_keeps_data() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/teachers/dashboard/9",
      MockReply::Status(200, json!({"data": {"stats": {"totalStudents": 4}}})),
    );
    transport.on(Method::GET, "/teachers/dashboard/9", MockReply::NetworkDown);

    let store = store(transport);
    store.fetch(9).await;
    store.fetch(9).await;

    assert!(store.error().is_some());
    assert!(store.data().is_some(), "previous dashboard stays visible");
  }
}
