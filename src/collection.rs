//! Generic entity-collection mechanics shared by every domain store.
//!
//! A collection only ever contains entities confirmed by the server: fetches
//! replace it wholesale, mutations patch single entries after the backing
//! call succeeded. Each fetch takes a sequence ticket so that a slow, stale
//! response can never overwrite the result of a newer one.

use crate::pagination::PageState;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An entity that can live in a collection.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Server-assigned identifier.
  fn id(&self) -> u64;

  /// Expected top-level field name in a heterogeneous response payload.
  fn domain_key() -> &'static str;
}

/// Ordered collection of server-confirmed entities plus pagination state
/// and an optionally tracked "current" detail entity.
#[derive(Debug, Clone)]
pub struct EntityCollection<T: Entity> {
  items: Vec<T>,
  current: Option<T>,
  page: PageState,
  issued_seq: u64,
  applied_seq: u64,
}

impl<T: Entity> EntityCollection<T> {
  pub fn new(limit: u64) -> Self {
    Self {
      items: Vec::new(),
      current: None,
      page: PageState::with_limit(limit),
      issued_seq: 0,
      applied_seq: 0,
    }
  }

  pub fn items(&self) -> &[T] {
    &self.items
  }

  pub fn current(&self) -> Option<&T> {
    self.current.as_ref()
  }

  pub fn page(&self) -> PageState {
    self.page
  }

  pub fn set_page(&mut self, page: u64) {
    self.page.page = page;
  }

  pub fn set_limit(&mut self, limit: u64) {
    self.page.limit = limit;
  }

  pub fn reset_page(&mut self) {
    self.page.page = 1;
  }

  /// Take a ticket for an about-to-start fetch.
  pub fn begin_fetch(&mut self) -> u64 {
    self.issued_seq += 1;
    self.issued_seq
  }

  /// Replace the collection with a confirmed fetch result.
  ///
  /// Returns false (and applies nothing) when a newer fetch already landed.
  pub fn apply_fetch(&mut self, seq: u64, items: Vec<T>, page: PageState) -> bool {
    if seq <= self.applied_seq {
      return false;
    }
    self.applied_seq = seq;
    self.items = items;
    self.page = page;
    true
  }

  /// Record a failed fetch by clearing the collection, unless a newer
  /// fetch already landed.
  pub fn fail_fetch(&mut self, seq: u64) -> bool {
    if seq <= self.applied_seq {
      return false;
    }
    self.applied_seq = seq;
    self.items.clear();
    true
  }

  pub fn set_current(&mut self, current: Option<T>) {
    self.current = current;
  }

  /// Insert a freshly created entity at the front (most recent first).
  pub fn insert_front(&mut self, item: T) {
    self.items.insert(0, item);
  }

  /// Append an entity at the back.
  pub fn push_back(&mut self, item: T) {
    self.items.push(item);
  }

  /// Replace the entity with a matching id, refreshing `current` as well.
  pub fn replace_by_id(&mut self, id: u64, item: T) -> bool {
    let mut replaced = false;
    if let Some(existing) = self.items.iter_mut().find(|e| e.id() == id) {
      *existing = item.clone();
      replaced = true;
    }
    if self.current.as_ref().is_some_and(|c| c.id() == id) {
      self.current = Some(item);
      replaced = true;
    }
    replaced
  }

  /// Patch the entity with a matching id in place, and `current` too.
  pub fn update_by_id(&mut self, id: u64, mut patch: impl FnMut(&mut T)) -> bool {
    let mut touched = false;
    if let Some(existing) = self.items.iter_mut().find(|e| e.id() == id) {
      patch(existing);
      touched = true;
    }
    if let Some(current) = self.current.as_mut().filter(|c| c.id() == id) {
      patch(current);
      touched = true;
    }
    touched
  }

  /// Remove the entity with a matching id, clearing `current` if it matches.
  pub fn remove(&mut self, id: u64) -> bool {
    let before = self.items.len();
    self.items.retain(|e| e.id() != id);
    if self.current.as_ref().is_some_and(|c| c.id() == id) {
      self.current = None;
    }
    before != self.items.len()
  }

  pub fn find(&self, id: u64) -> Option<&T> {
    self.items.iter().find(|e| e.id() == id)
  }
}

/// Uniform result wrapper for store operations that do not propagate errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
  pub success: bool,
  pub data: Option<T>,
  pub message: Option<String>,
}

impl<T> Envelope<T> {
  pub fn ok(data: T) -> Self {
    Self {
      success: true,
      data: Some(data),
      message: None,
    }
  }

  pub fn ok_with(data: T, message: impl Into<String>) -> Self {
    Self {
      success: true,
      data: Some(data),
      message: Some(message.into()),
    }
  }

  pub fn done(message: impl Into<String>) -> Self {
    Self {
      success: true,
      data: None,
      message: Some(message.into()),
    }
  }

  pub fn fail(message: impl Into<String>) -> Self {
    Self {
      success: false,
      data: None,
      message: Some(message.into()),
    }
  }
}
