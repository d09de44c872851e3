//! Favorites store: the set of teacher ids the user starred, optionally
//! hydrated into full teacher records.
//!
//! Favorites are decoration, never critical path, so every failure here is
//! swallowed and logged instead of propagated.

use crate::api::{TeacherApi, UserApi};
use crate::models::Teacher;
use crate::normalize::parse_record;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::warn;

pub struct FavoritesStore {
  user_api: UserApi,
  teacher_api: TeacherApi,
  ids: RwLock<Vec<u64>>,
  teachers: RwLock<Vec<Teacher>>,
  loading: AtomicBool,
}

impl FavoritesStore {
  pub fn new(user_api: UserApi, teacher_api: TeacherApi) -> Self {
    Self {
      user_api,
      teacher_api,
      ids: RwLock::new(Vec::new()),
      teachers: RwLock::new(Vec::new()),
      loading: AtomicBool::new(false),
    }
  }

  pub fn ids(&self) -> Vec<u64> {
    self.ids.read().map(|ids| ids.clone()).unwrap_or_default()
  }

  pub fn teachers(&self) -> Vec<Teacher> {
    self
      .teachers
      .read()
      .map(|t| t.clone())
      .unwrap_or_default()
  }

  pub fn is_favorite(&self, teacher_id: u64) -> bool {
    self.ids().contains(&teacher_id)
  }

  pub fn is_loading(&self) -> bool {
    self.loading.load(Ordering::SeqCst)
  }

  /// Fetch the favorite ids; on failure both caches empty out.
  pub async fn fetch(&self, load_details: bool) {
    self.loading.store(true, Ordering::SeqCst);
    match self.user_api.favorite_teachers().await {
      Ok(body) => {
        let ids = extract_ids(&body);
        if let Ok(mut cached) = self.ids.write() {
          *cached = ids;
        }
        if load_details {
          self.hydrate().await;
        }
      }
      Err(e) => {
        warn!("failed to fetch favorites: {}", e);
        if let Ok(mut cached) = self.ids.write() {
          cached.clear();
        }
        if let Ok(mut cached) = self.teachers.write() {
          cached.clear();
        }
      }
    }
    self.loading.store(false, Ordering::SeqCst);
  }

  /// Resolve each favorite id into a teacher record, one request per id.
  /// An id that fails to resolve is skipped, not fatal.
  pub async fn hydrate(&self) {
    let ids = self.ids();
    let mut hydrated = Vec::with_capacity(ids.len());
    for id in ids {
      match self.teacher_api.get(id).await {
        Ok(body) => match parse_record::<Teacher>(&body, "teacher") {
          Ok(teacher) => hydrated.push(teacher),
          Err(e) => warn!("favorite teacher {} failed to parse: {}", id, e),
        },
        Err(e) => warn!("failed to fetch favorite teacher {}: {}", id, e),
      }
    }
    if let Ok(mut cached) = self.teachers.write() {
      *cached = hydrated;
    }
  }

  /// Flip a teacher's favorite state, then refetch the whole list so the
  /// cache reflects what the server actually stored.
  pub async fn toggle(&self, teacher_id: u64) {
    let target = !self.is_favorite(teacher_id);
    match self.user_api.toggle_favorite(teacher_id, Some(target)).await {
      Ok(_) => self.fetch(false).await,
      Err(e) => warn!("failed to toggle favorite for teacher {}: {}", teacher_id, e),
    }
  }
}

/// Favorite ids arrive as `{data: [1, 2]}` or a bare array.
fn extract_ids(body: &Value) -> Vec<u64> {
  let list = body
    .get("data")
    .and_then(Value::as_array)
    .or_else(|| body.as_array());
  list
    .map(|values| values.iter().filter_map(Value::as_u64).collect())
    .unwrap_or_default()
}
