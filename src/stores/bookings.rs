//! Booking store: the user's lessons, filters over them, and the
//! cancellation/reschedule window rules.

use crate::api::BookingApi;
use crate::collection::{Entity, EntityCollection};
use crate::error::Result;
use crate::models::{Booking, BookingStatus};
use crate::normalize::{parse_list, parse_record};
use crate::pagination::{self, PageState};
use crate::stores::page_query;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::warn;

/// Client-side filters applied on top of whatever the server returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilters {
  pub status: Option<BookingStatus>,
  pub date_from: Option<NaiveDate>,
  pub date_to: Option<NaiveDate>,
  pub teacher_id: Option<u64>,
}

pub struct BookingStore {
  api: BookingApi,
  collection: RwLock<EntityCollection<Booking>>,
  filters: RwLock<BookingFilters>,
  loading: AtomicBool,
}

impl BookingStore {
  pub fn new(api: BookingApi, limit: u64) -> Self {
    Self {
      api,
      collection: RwLock::new(EntityCollection::new(limit)),
      filters: RwLock::new(BookingFilters::default()),
      loading: AtomicBool::new(false),
    }
  }

  pub fn bookings(&self) -> Vec<Booking> {
    self
      .collection
      .read()
      .map(|c| c.items().to_vec())
      .unwrap_or_default()
  }

  pub fn current(&self) -> Option<Booking> {
    self
      .collection
      .read()
      .ok()
      .and_then(|c| c.current().cloned())
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

  pub fn find(&self, id: u64) -> Option<Booking> {
    self.collection.read().ok().and_then(|c| c.find(id).cloned())
  }

  // Filtered views.

  pub fn filters(&self) -> BookingFilters {
    self
      .filters
      .read()
      .map(|f| f.clone())
      .unwrap_or_default()
  }

  pub fn set_status_filter(&self, status: Option<BookingStatus>) {
    if let Ok(mut filters) = self.filters.write() {
      filters.status = status;
    }
  }

  pub fn set_date_range_filter(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
    if let Ok(mut filters) = self.filters.write() {
      filters.date_from = from;
      filters.date_to = to;
    }
  }

  pub fn set_teacher_filter(&self, teacher_id: Option<u64>) {
    if let Ok(mut filters) = self.filters.write() {
      filters.teacher_id = teacher_id;
    }
  }

  pub fn clear_filters(&self) {
    if let Ok(mut filters) = self.filters.write() {
      *filters = BookingFilters::default();
    }
  }

  /// Cached bookings narrowed by the active filters. A booking without a
  /// schedule fails any date or teacher filter.
  pub fn filtered(&self) -> Vec<Booking> {
    let filters = self.filters();
    self
      .bookings()
      .into_iter()
      .filter(|b| filters.status.is_none_or(|s| b.status == s))
      .filter(|b| {
        filters.date_from.is_none_or(|from| {
          b.schedule
            .as_ref()
            .and_then(|s| s.date_naive())
            .is_some_and(|d| d >= from)
        })
      })
      .filter(|b| {
        filters.date_to.is_none_or(|to| {
          b.schedule
            .as_ref()
            .and_then(|s| s.date_naive())
            .is_some_and(|d| d <= to)
        })
      })
      .filter(|b| {
        filters.teacher_id.is_none_or(|id| {
          b.schedule
            .as_ref()
            .and_then(|s| s.teacher.as_ref())
            .is_some_and(|t| t.id == id)
        })
      })
      .collect()
  }

  /// Paid bookings strictly after `now`, soonest first.
  pub fn upcoming(&self, now: NaiveDateTime) -> Vec<Booking> {
    let mut upcoming: Vec<Booking> = self
      .bookings()
      .into_iter()
      .filter(|b| b.status == BookingStatus::Paid)
      .filter(|b| {
        b.schedule
          .as_ref()
          .and_then(|s| s.starts_at())
          .is_some_and(|start| start > now)
      })
      .collect();
    upcoming.sort_by_key(|b| b.schedule.as_ref().and_then(|s| s.starts_at()));
    upcoming
  }

  /// Completed bookings, most recent first.
  pub fn past(&self) -> Vec<Booking> {
    let mut past: Vec<Booking> = self
      .bookings()
      .into_iter()
      .filter(|b| b.status == BookingStatus::Completed)
      .collect();
    past.sort_by_key(|b| std::cmp::Reverse(b.schedule.as_ref().and_then(|s| s.starts_at())));
    past
  }

  pub fn pending(&self) -> Vec<Booking> {
    self
      .bookings()
      .into_iter()
      .filter(|b| b.status == BookingStatus::Pending)
      .collect()
  }

  pub fn cancelled(&self) -> Vec<Booking> {
    self
      .bookings()
      .into_iter()
      .filter(|b| b.status == BookingStatus::Cancelled)
      .collect()
  }

  /// A paid booking can be cancelled until 24 hours before its slot starts.
  pub fn can_cancel(booking: &Booking, now: NaiveDateTime) -> bool {
    let Some(starts_at) = booking.schedule.as_ref().and_then(|s| s.starts_at()) else {
      return false;
    };
    booking.status == BookingStatus::Paid && starts_at - now >= chrono::Duration::hours(24)
  }

  /// Same window as cancellation.
  pub fn can_reschedule(booking: &Booking, now: NaiveDateTime) -> bool {
    Self::can_cancel(booking, now)
  }

  // Fetches. All re-throw; a failed list fetch clears the cache so stale
  // rows are never shown as current.

  async fn fetch_list(&self, query: Vec<(String, String)>, paged: bool) -> Result<Vec<Booking>> {
    self.loading.store(true, Ordering::SeqCst);
    let (seq, page) = match self.collection.write() {
      Ok(mut c) => (c.begin_fetch(), c.page()),
      Err(_) => (0, PageState::default()),
    };

    let mut full_query = if paged {
      page_query(page.page, page.limit)
    } else {
      Vec::new()
    };
    full_query.extend(query);

    let result = self.api.list(&full_query).await;
    self.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(body) => {
        let bookings: Vec<Booking> = parse_list(&body, Booking::domain_key())?;
        let resolved =
          pagination::resolve(page.page, page.limit, bookings.len() as u64, &body);
        if let Ok(mut c) = self.collection.write() {
          if !c.apply_fetch(seq, bookings.clone(), resolved) {
            warn!("discarding stale booking fetch result");
          }
        }
        Ok(bookings)
      }
      Err(e) => {
        if let Ok(mut c) = self.collection.write() {
          c.fail_fetch(seq);
        }
        Err(e)
      }
    }
  }

  pub async fn fetch(&self, query: &[(String, String)]) -> Result<Vec<Booking>> {
    self.fetch_list(query.to_vec(), true).await
  }

  pub async fn fetch_admin(&self, query: &[(String, String)]) -> Result<Vec<Booking>> {
    self.loading.store(true, Ordering::SeqCst);
    let (seq, page) = match self.collection.write() {
      Ok(mut c) => (c.begin_fetch(), c.page()),
      Err(_) => (0, PageState::default()),
    };

    let mut full_query = page_query(page.page, page.limit);
    full_query.extend(query.iter().cloned());

    let result = self.api.admin_list(&full_query).await;
    self.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(body) => {
        let bookings: Vec<Booking> = parse_list(&body, Booking::domain_key())?;
        let resolved =
          pagination::resolve(page.page, page.limit, bookings.len() as u64, &body);
        if let Ok(mut c) = self.collection.write() {
          c.apply_fetch(seq, bookings.clone(), resolved);
        }
        Ok(bookings)
      }
      Err(e) => {
        if let Ok(mut c) = self.collection.write() {
          c.fail_fetch(seq);
        }
        Err(e)
      }
    }
  }

  pub async fn fetch_for_user(&self, user_id: u64) -> Result<Vec<Booking>> {
    self.loading.store(true, Ordering::SeqCst);
    let (seq, page) = match self.collection.write() {
      Ok(mut c) => (c.begin_fetch(), c.page()),
      Err(_) => (0, PageState::default()),
    };

    let result = self.api.for_user(user_id).await;
    self.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(body) => {
        let bookings: Vec<Booking> = parse_list(&body, Booking::domain_key())?;
        let resolved =
          pagination::resolve(page.page, page.limit, bookings.len() as u64, &body);
        if let Ok(mut c) = self.collection.write() {
          c.apply_fetch(seq, bookings.clone(), resolved);
        }
        Ok(bookings)
      }
      Err(e) => {
        if let Ok(mut c) = self.collection.write() {
          c.fail_fetch(seq);
        }
        Err(e)
      }
    }
  }

  pub async fn fetch_one(&self, id: u64) -> Result<Booking> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.get(id).await;
    self.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(body) => {
        let booking: Booking = parse_record(&body, "booking")?;
        if let Ok(mut c) = self.collection.write() {
          c.set_current(Some(booking.clone()));
        }
        Ok(booking)
      }
      Err(e) => {
        if let Ok(mut c) = self.collection.write() {
          c.set_current(None);
        }
        Err(e)
      }
    }
  }

  /// Booking joined with its schedule and teacher.
  pub async fn fetch_detail(&self, id: u64) -> Result<Booking> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.detail(id).await;
    self.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(body) => {
        let booking: Booking = parse_record(&body, "booking")?;
        if let Ok(mut c) = self.collection.write() {
          c.set_current(Some(booking.clone()));
        }
        Ok(booking)
      }
      Err(e) => {
        if let Ok(mut c) = self.collection.write() {
          c.set_current(None);
        }
        Err(e)
      }
    }
  }

  pub async fn upcoming_lessons(&self, user_id: u64, query: &[(String, String)]) -> Result<Vec<Booking>> {
    let body = self.api.upcoming_lessons(user_id, query).await?;
    parse_list(&body, Booking::domain_key())
  }

  // Mutations. The cache is only touched after the server confirmed.

  /// Create a booking; the confirmed row lands at the front of the cache.
  pub async fn create(&self, booking: Value) -> Result<Booking> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.create(booking).await;
    self.loading.store(false, Ordering::SeqCst);

    let created: Booking = parse_record(&result?, "booking")?;
    if let Ok(mut c) = self.collection.write() {
      c.insert_front(created.clone());
    }
    Ok(created)
  }

  pub async fn reschedule(&self, id: u64, new_schedule_id: u64) -> Result<Booking> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.reschedule(id, new_schedule_id).await;
    self.loading.store(false, Ordering::SeqCst);

    let updated: Booking = parse_record(&result?, "booking")?;
    if let Ok(mut c) = self.collection.write() {
      c.replace_by_id(id, updated.clone());
    }
    Ok(updated)
  }

  /// Cancel a booking. Only the status is patched locally; the rest of the
  /// cached row is kept as-is.
  pub async fn cancel(&self, id: u64) -> Result<()> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.cancel(id).await;
    self.loading.store(false, Ordering::SeqCst);

    result?;
    if let Ok(mut c) = self.collection.write() {
      c.update_by_id(id, |b| b.status = BookingStatus::Cancelled);
    }
    Ok(())
  }

  pub async fn set_status(&self, id: u64, status: BookingStatus) -> Result<()> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.set_status(id, status_name(status)).await;
    self.loading.store(false, Ordering::SeqCst);

    result?;
    if let Ok(mut c) = self.collection.write() {
      c.update_by_id(id, |b| b.status = status);
    }
    Ok(())
  }

  /// Path-based status transition; the cache is not touched because the
  /// endpoint returns no booking body.
  pub async fn change_status(&self, id: u64, status: BookingStatus) -> Result<Value> {
    self.api.change_status(id, status_name(status)).await
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

fn status_name(status: BookingStatus) -> &'static str {
  match status {
    BookingStatus::Pending => "pending",
    BookingStatus::Paid => "paid",
    BookingStatus::Cancelled => "cancelled",
    BookingStatus::Rescheduled => "rescheduled",
    BookingStatus::Completed => "completed",
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

  fn store(transport: Arc<MockTransport>) -> BookingStore {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
    let config = Arc::new(ApiConfig::default());
    let tokens = TokenStore::new(kv, config.storage.keys.clone());
    tokens.save_session(&crate::session::Session {
      access_token: Some("tok-1".to_string()),
      refresh_token: Some("ref-1".to_string()),
      principal: Some(
        serde_json::from_value(
          json!({"id": 1, "name": "Mika", "email": "mika@example.com", "role": "user"}),
        )
        .unwrap(),
      ),
    });
    let session = SessionManager::new(config.clone(), transport.clone() as Arc<dyn Transport>, tokens);
    let gateway = RequestGateway::new(transport as Arc<dyn Transport>, config, session);
    BookingStore::new(BookingApi::new(gateway), 10)
  }

  fn booking(id: u64, status: &str, date: &str, start: &str) -> serde_json::Value {
    json!({
      "id": id,
      "user_id": 1,
      "schedule_id": id,
      "status": status,
      "schedule": {"id": id, "teacher_id": 7, "date": date, "start_time": start, "end_time": "11:00", "status": "booked"}
    })
  }

  #[tokio::test]
  async fn fetch_replaces_cache_and_resolves_pagination() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/bookings",
      MockReply::Status(
        200,
        json!({
          "bookings": [booking(1, "paid", "2026-09-01", "10:00")],
          "pagination": {"current_page": 2, "limit": 10, "total": 35}
        }),
      ),
    );

    let store = store(transport);
    let fetched = store.fetch(&[]).await.unwrap();

    assert_eq!(fetched.len(), 1);
    assert_eq!(store.bookings().len(), 1);
    let page = store.page();
    assert_eq!(page.page, 2);
    assert_eq!(page.total, 35);
    assert_eq!(page.total_pages, 4);
  }

  #[tokio::test]
  async fn fetch_failure_clears_cache_and_rethrows() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/bookings",
      MockReply::Status(200, json!({"bookings": [booking(1, "paid", "2026-09-01", "10:00")]})),
    );
    transport.on(Method::GET, "/bookings", MockReply::Status(500, json!({})));

    let store = store(transport);
    store.fetch(&[]).await.unwrap();
    assert_eq!(store.bookings().len(), 1);

    assert!(store.fetch(&[]).await.is_err());
    assert!(store.bookings().is_empty(), "failed fetch must clear the cache");
  }

  #[tokio::test]
  async fn create_inserts_at_front() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/bookings",
      MockReply::Status(200, json!({"bookings": [booking(1, "paid", "2026-09-01", "10:00")]})),
    );
    transport.on(
      Method::POST,
      "/bookings",
      MockReply::Status(201, json!({"booking": booking(2, "pending", "2026-09-02", "10:00")})),
    );

    let store = store(transport);
    store.fetch(&[]).await.unwrap();
    store.create(json!({"schedule_id": 2})).await.unwrap();

    let ids: Vec<u64> = store.bookings().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![2, 1]);
  }

  #[tokio::test]
  async fn rejected_create_leaves_cache_untouched() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::POST,
      "/bookings",
      MockReply::Status(409, json!({"message": "slot taken"})),
    );

    let store = store(transport);
    let err = store.create(json!({"schedule_id": 2})).await.unwrap_err();
    assert_eq!(err.status_code(), Some(409));
    assert!(store.bookings().is_empty());
  }

  #[tokio::test]
  async fn cancel_patches_status_in_place() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/bookings",
      MockReply::Status(200, json!({"bookings": [booking(1, "paid", "2026-09-01", "10:00")]})),
    );
    transport.on(
      Method::POST,
      "/bookings/1/cancel",
      MockReply::Status(200, json!({"message": "cancelled"})),
    );

    let store = store(transport);
    store.fetch(&[]).await.unwrap();
    store.cancel(1).await.unwrap();

    let cached = store.find(1).unwrap();
    assert_eq!(cached.status, BookingStatus::Cancelled);
    assert_eq!(cached.schedule.unwrap().id, 1, "rest of the row is kept");
  }

  #[test]
  fn cancellation_window_is_24_hours_for_paid_bookings() {
    let paid: Booking =
      serde_json::from_value(booking(1, "paid", "2026-09-02", "10:00")).unwrap();
    let pending: Booking =
      serde_json::from_value(booking(2, "pending", "2026-09-02", "10:00")).unwrap();

    let over_24h = NaiveDate::from_ymd_opt(2026, 9, 1)
      .unwrap()
      .and_hms_opt(9, 0, 0)
      .unwrap();
    let under_24h = NaiveDate::from_ymd_opt(2026, 9, 1)
      .unwrap()
      .and_hms_opt(11, 0, 0)
      .unwrap();

    assert!(BookingStore::can_cancel(&paid, over_24h));
    assert!(!BookingStore::can_cancel(&paid, under_24h));
    assert!(!BookingStore::can_cancel(&pending, over_24h));
  }

  #[tokio::test]
  async fn filters_narrow_the_cached_view() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/bookings",
      MockReply::Status(
        200,
        json!({"bookings": [
          booking(1, "paid", "2026-09-01", "10:00"),
          booking(2, "pending", "2026-09-05", "10:00"),
          booking(3, "paid", "2026-09-10", "10:00")
        ]}),
      ),
    );

    let store = store(transport);
    store.fetch(&[]).await.unwrap();

    store.set_status_filter(Some(BookingStatus::Paid));
    assert_eq!(store.filtered().len(), 2);

    store.set_date_range_filter(
      Some(NaiveDate::from_ymd_opt(2026, 9, 2).unwrap()),
      None,
    );
    let ids: Vec<u64> = store.filtered().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![3]);

    store.clear_filters();
    assert_eq!(store.filtered().len(), 3);
  }

  #[tokio::test]
  async fn upcoming_is_paid_future_and_sorted() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
      Method::GET,
      "/bookings",
      MockReply::Status(
        200,
        json!({"bookings": [
          booking(1, "paid", "2026-09-10", "10:00"),
          booking(2, "paid", "2026-09-05", "10:00"),
          booking(3, "pending", "2026-09-06", "10:00"),
          booking(4, "paid", "2026-08-01", "10:00")
        ]}),
      ),
    );

    let store = store(transport);
    store.fetch(&[]).await.unwrap();

    let now = NaiveDate::from_ymd_opt(2026, 9, 1)
      .unwrap()
      .and_hms_opt(0, 0, 0)
      .unwrap();
    let ids: Vec<u64> = store.upcoming(now).iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![2, 1]);
  }
}
