//! Teacher store: the browsable teacher catalogue plus the schedule slots
//! of whichever teacher is being viewed.

use crate::api::TeacherApi;
use crate::collection::{Entity, EntityCollection};
use crate::error::Result;
use crate::models::{Schedule, ScheduleStatus, Teacher};
use crate::normalize::{parse_list, parse_record};
use crate::pagination::{self, PageState};
use crate::stores::page_query;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Client-side catalogue filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeacherFilters {
  pub search: Option<String>,
  pub level: Option<String>,
  pub min_price: Option<f64>,
  pub max_price: Option<f64>,
}

pub struct TeacherStore {
  api: TeacherApi,
  collection: RwLock<EntityCollection<Teacher>>,
  schedules: RwLock<Vec<Schedule>>,
  filters: RwLock<TeacherFilters>,
  loading: AtomicBool,
}

impl TeacherStore {
  pub fn new(api: TeacherApi, limit: u64) -> Self {
    Self {
      api,
      collection: RwLock::new(EntityCollection::new(limit)),
      schedules: RwLock::new(Vec::new()),
      filters: RwLock::new(TeacherFilters::default()),
      loading: AtomicBool::new(false),
    }
  }

  pub fn teachers(&self) -> Vec<Teacher> {
    self
      .collection
      .read()
      .map(|c| c.items().to_vec())
      .unwrap_or_default()
  }

  pub fn current(&self) -> Option<Teacher> {
    self
      .collection
      .read()
      .ok()
      .and_then(|c| c.current().cloned())
  }

  pub fn schedules(&self) -> Vec<Schedule> {
    self
      .schedules
      .read()
      .map(|s| s.clone())
      .unwrap_or_default()
  }

  pub fn page(&self) -> PageState {
    self
      .collection
      .read()
      .map(|c| c.page())
      .unwrap_or_default()
  }

  pub fn is_loading(&self) -> bool {
    self.loading.load(Ordering::SeqCst)
  }

  pub fn find(&self, id: u64) -> Option<Teacher> {
    self.collection.read().ok().and_then(|c| c.find(id).cloned())
  }

  // Filters.

  pub fn filters(&self) -> TeacherFilters {
    self
      .filters
      .read()
      .map(|f| f.clone())
      .unwrap_or_default()
  }

  pub fn set_search_filter(&self, search: Option<String>) {
    if let Ok(mut filters) = self.filters.write() {
      filters.search = search;
    }
  }

  pub fn set_level_filter(&self, level: Option<String>) {
    if let Ok(mut filters) = self.filters.write() {
      filters.level = level;
    }
  }

  pub fn set_price_filter(&self, min: Option<f64>, max: Option<f64>) {
    if let Ok(mut filters) = self.filters.write() {
      filters.min_price = min;
      filters.max_price = max;
    }
  }

  pub fn clear_filters(&self) {
    if let Ok(mut filters) = self.filters.write() {
      *filters = TeacherFilters::default();
    }
  }

  /// Catalogue narrowed by the active filters. Search matches name or bio,
  /// case-insensitively.
  pub fn filtered(&self) -> Vec<Teacher> {
    let filters = self.filters();
    let search = filters.search.as_deref().map(str::to_lowercase);
    self
      .teachers()
      .into_iter()
      .filter(|t| {
        search.as_deref().is_none_or(|term| {
          t.name.to_lowercase().contains(term) || t.bio.to_lowercase().contains(term)
        })
      })
      .filter(|t| {
        filters
          .level
          .as_deref()
          .is_none_or(|level| t.language_level == level)
      })
      .filter(|t| filters.min_price.is_none_or(|min| t.price_per_hour >= min))
      .filter(|t| filters.max_price.is_none_or(|max| t.price_per_hour <= max))
      .collect()
  }

  /// Min and max hourly rate across the cached catalogue, ignoring
  /// zero-priced rows. Defaults to (0, 100) with no usable prices.
  pub fn price_range(&self) -> (f64, f64) {
    let prices: Vec<f64> = self
      .teachers()
      .iter()
      .map(|t| t.price_per_hour)
      .filter(|p| *p > 0.0)
      .collect();
    if prices.is_empty() {
      return (0.0, 100.0);
    }
    let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
  }

  // Fetches. Errors re-throw; unlike bookings, a failed catalogue fetch
  // keeps the previous page visible.

  pub async fn fetch(&self, query: &[(String, String)]) -> Result<Vec<Teacher>> {
    self.loading.store(true, Ordering::SeqCst);
    let (seq, page) = match self.collection.write() {
      Ok(mut c) => (c.begin_fetch(), c.page()),
      Err(_) => (0, PageState::default()),
    };

    let mut full_query = page_query(page.page, page.limit);
    full_query.extend(query.iter().cloned());

    let result = self.api.list(&full_query).await;
    self.loading.store(false, Ordering::SeqCst);

    let body = result?;
    let teachers: Vec<Teacher> = parse_list(&body, Teacher::domain_key())?;
    let resolved = pagination::resolve(page.page, page.limit, teachers.len() as u64, &body);
    if let Ok(mut c) = self.collection.write() {
      c.apply_fetch(seq, teachers.clone(), resolved);
    }
    Ok(teachers)
  }

  pub async fn fetch_one(&self, id: u64) -> Result<Teacher> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.get(id).await;
    self.loading.store(false, Ordering::SeqCst);

    let teacher: Teacher = parse_record(&result?, "teacher")?;
    if let Ok(mut c) = self.collection.write() {
      c.set_current(Some(teacher.clone()));
    }
    Ok(teacher)
  }

  /// The teacher record belonging to the authenticated user.
  pub async fn fetch_me(&self) -> Result<Teacher> {
    let body = self.api.me().await?;
    parse_record(&body, "teacher")
  }

  pub async fn fetch_schedules(&self, teacher_id: u64, query: &[(String, String)]) -> Result<Vec<Schedule>> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.teacher_schedules(teacher_id, query).await;
    self.loading.store(false, Ordering::SeqCst);

    let schedules: Vec<Schedule> = parse_list(&result?, Schedule::domain_key())?;
    if let Ok(mut cached) = self.schedules.write() {
      *cached = schedules.clone();
    }
    Ok(schedules)
  }

  // Mutations.

  /// Create a teacher; new rows append at the back of the catalogue.
  pub async fn create(&self, teacher: Value) -> Result<Teacher> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.create(teacher).await;
    self.loading.store(false, Ordering::SeqCst);

    let created: Teacher = parse_record(&result?, "teacher")?;
    if let Ok(mut c) = self.collection.write() {
      c.push_back(created.clone());
    }
    Ok(created)
  }

  pub async fn update(&self, id: u64, teacher: Value) -> Result<Teacher> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.update(id, teacher).await;
    self.loading.store(false, Ordering::SeqCst);

    let updated: Teacher = parse_record(&result?, "teacher")?;
    if let Ok(mut c) = self.collection.write() {
      c.replace_by_id(id, updated.clone());
    }
    Ok(updated)
  }

  pub async fn delete(&self, id: u64) -> Result<()> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.delete(id).await;
    self.loading.store(false, Ordering::SeqCst);

    result?;
    if let Ok(mut c) = self.collection.write() {
      c.remove(id);
    }
    Ok(())
  }

  // Schedule mutations operate on the side list, not the catalogue.

  pub async fn create_schedule(&self, schedule: Value) -> Result<Schedule> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.create_schedule(schedule).await;
    self.loading.store(false, Ordering::SeqCst);

    let created: Schedule = parse_record(&result?, "schedule")?;
    if let Ok(mut cached) = self.schedules.write() {
      cached.push(created.clone());
    }
    Ok(created)
  }

  pub async fn update_schedule(&self, id: u64, schedule: Value) -> Result<Schedule> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.update_schedule(id, schedule).await;
    self.loading.store(false, Ordering::SeqCst);

    let updated: Schedule = parse_record(&result?, "schedule")?;
    if let Ok(mut cached) = self.schedules.write() {
      if let Some(existing) = cached.iter_mut().find(|s| s.id == id) {
        *existing = updated.clone();
      }
    }
    Ok(updated)
  }

  pub async fn cancel_schedule(&self, id: u64) -> Result<()> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.cancel_schedule(id).await;
    self.loading.store(false, Ordering::SeqCst);

    result?;
    if let Ok(mut cached) = self.schedules.write() {
      if let Some(existing) = cached.iter_mut().find(|s| s.id == id) {
        existing.status = ScheduleStatus::Cancelled;
      }
    }
    Ok(())
  }

  pub async fn delete_schedule(&self, id: u64) -> Result<()> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.delete_schedule(id).await;
    self.loading.store(false, Ordering::SeqCst);

    result?;
    if let Ok(mut cached) = self.schedules.write() {
      cached.retain(|s| s.id != id);
    }
    Ok(())
  }

  pub async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> Result<Value> {
    self.api.upload_image(filename, bytes).await
  }

  // Pagination.

  pub fn set_page(&self, page: u64) {
    if let Ok(mut c) = self.collection.write() {
      c.set_page(page);
    }
  }

  pub fn set_limit(&self, limit: u64) {
    if let Ok(mut c) = self.collection.write() {
      c.set_limit(limit);
    }
  }

  pub fn reset_page(&self) {
    if let Ok(mut c) = self.collection.write() {
      c.reset_page();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ApiConfig;
  use crate::gateway::RequestGateway;
  use crate::session::SessionManager;
  use crate::storage::{KeyValueStore, MemoryStorage, TokenStore};
  use crate::transport::mock::{MockReply, MockTransport};
  use crate::transport::Transport;
  use reqwest::Method;
  use serde_json::json;
  use std::sync::Arc;

  fn store(transport: Arc<MockTransport>) -> TeacherStore {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
    let config = Arc::new(ApiConfig::default());
    let tokens = TokenStore::new(kv, config.storage.keys.clone());
    tokens.save_session(&crate::session::Session {
      access_token: Some("tok-1".to_string()),
      refresh_token: Some("ref-1".to_string()),
      principal: Some(
        serde_json::from_value(
          json!({"id": 1, "name": "Mika", "email": "mika@example.com", "role": "admin"}),
        )
        .unwrap(),
      ),
    });
    let session = SessionManager::new(config.clone(), transport.clone() as Arc<dyn Transport>, tokens);
    let gateway = RequestGateway::new(transport as Arc<dyn Transport>, config, session);
    TeacherStore::new(TeacherApi::new(gateway), 10)
  }

  fn teacher(id: u64, name: &str, level: &str, price: f64) -> serde_json::Value {
    json!({"id": id, "name": name, "bio": "", "language_level": level, "price_per_hour": price})
  }

  #[tokio::test]
  async fn fetch_failure_keeps_previous_catalogue() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/teachers",
      MockReply::Status(200, json!({"teachers": [teacher(1, "Aiko", "advanced", 25.0)]})),
    );
    transport.on(Method::GET, "/teachers", MockReply::Status(500, json!({})));

    let store = store(transport);
    store.fetch(&[]).await.unwrap();
    assert!(store.fetch(&[]).await.is_err());
    assert_eq!(store.teachers().len(), 1, "catalogue survives a failed refresh");
  }

  #[tokio::test]
  async fn create_appends_at_back() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/teachers",
      MockReply::Status(200, json!({"teachers": [teacher(1, "Aiko", "advanced", 25.0)]})),
    );
    transport.on(
      Method::POST,
      "/teachers",
      MockReply::Status(201, json!({"teacher": teacher(2, "Ben", "beginner", 15.0)})),
    );

    let store = store(transport);
    store.fetch(&[]).await.unwrap();
    store.create(json!({"name": "Ben"})).await.unwrap();

    let ids: Vec<u64> = store.teachers().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2]);
  }

  #[tokio::test]
  async fn filters_and_price_range() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/teachers",
      MockReply::Status(
        200,
        json!({"teachers": [
          teacher(1, "Aiko Tanaka", "advanced", 25.0),
          teacher(2, "Ben Sato", "beginner", 15.0),
          teacher(3, "Chie Mori", "advanced", 40.0)
        ]}),
      ),
    );

    let store = store(transport);
    store.fetch(&[]).await.unwrap();

    store.set_search_filter(Some("aiko".to_string()));
    assert_eq!(store.filtered().len(), 1);
    store.clear_filters();

    store.set_level_filter(Some("advanced".to_string()));
    store.set_price_filter(None, Some(30.0));
    let ids: Vec<u64> = store.filtered().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1]);

    assert_eq!(store.price_range(), (15.0, 40.0));
  }

  #[tokio::test]
  async fn cancel_schedule_patches_status_locally() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/schedule/teacher/7",
      MockReply::Status(
        200,
        json!({"schedules": [
          {"id": 11, "teacher_id": 7, "date": "2026-09-01", "start_time": "10:00", "end_time": "11:00", "status": "available"}
        ]}),
      ),
    );
    transport.on(
      Method::PUT,
      "/cancel-schedule/11",
      MockReply::Status(200, json!({"message": "cancelled"})),
    );

    let store = store(transport);
    store.fetch_schedules(7, &[]).await.unwrap();
    store.cancel_schedule(11).await.unwrap();

    assert_eq!(store.schedules()[0].status, ScheduleStatus::Cancelled);
  }
}
