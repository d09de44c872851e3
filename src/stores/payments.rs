//! Payment store: payment history plus the payment-method roster.
//!
//! Most mutations here back admin screens, so failures are reported
//! through envelopes instead of bubbling; only the history fetches and the
//! callback re-throw.

use crate::api::PaymentApi;
use crate::collection::{Entity, EntityCollection, Envelope};
use crate::error::Result;
use crate::models::{Payment, PaymentMethod, PaymentStatus};
use crate::normalize::{parse_list, parse_record};
use crate::pagination::{self, PageState};
use crate::stores::page_query;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::warn;

pub struct PaymentStore {
  api: PaymentApi,
  payments: RwLock<EntityCollection<Payment>>,
  methods: RwLock<Vec<PaymentMethod>>,
  /// Separate from the payment pagination: the admin method roster pages
  /// independently, the public roster arrives whole.
  methods_page: RwLock<PageState>,
  loading: AtomicBool,
  processing: AtomicBool,
}

impl PaymentStore {
  pub fn new(api: PaymentApi, limit: u64) -> Self {
    Self {
      api,
      payments: RwLock::new(EntityCollection::new(limit)),
      methods: RwLock::new(Vec::new()),
      methods_page: RwLock::new(PageState::with_limit(limit)),
      loading: AtomicBool::new(false),
      processing: AtomicBool::new(false),
    }
  }

  pub fn payments(&self) -> Vec<Payment> {
    self
      .payments
      .read()
      .map(|c| c.items().to_vec())
      .unwrap_or_default()
  }

  pub fn current(&self) -> Option<Payment> {
    self.payments.read().ok().and_then(|c| c.current().cloned())
  }

  pub fn methods(&self) -> Vec<PaymentMethod> {
    self.methods.read().map(|m| m.clone()).unwrap_or_default()
  }

  pub fn active_methods(&self) -> Vec<PaymentMethod> {
    self.methods().into_iter().filter(|m| m.active).collect()
  }

  pub fn page(&self) -> PageState {
    self.payments.read().map(|c| c.page()).unwrap_or_default()
  }

  pub fn methods_page(&self) -> PageState {
    self
      .methods_page
      .read()
      .map(|p| *p)
      .unwrap_or_default()
  }

  pub fn is_loading(&self) -> bool {
    self.loading.load(Ordering::SeqCst)
  }

  /// True while a payment creation is in flight, so checkout UIs can
  /// block double submission.
  pub fn is_processing(&self) -> bool {
    self.processing.load(Ordering::SeqCst)
  }

  pub fn find(&self, id: u64) -> Option<Payment> {
    self.payments.read().ok().and_then(|c| c.find(id).cloned())
  }

  pub fn method_by_code(&self, code: &str) -> Option<PaymentMethod> {
    self.methods().into_iter().find(|m| m.code == code)
  }

  pub fn pending(&self) -> Vec<Payment> {
    self
      .payments()
      .into_iter()
      .filter(|p| p.status == PaymentStatus::Pending)
      .collect()
  }

  pub fn successful(&self) -> Vec<Payment> {
    self
      .payments()
      .into_iter()
      .filter(|p| p.status == PaymentStatus::Settlement)
      .collect()
  }

  pub fn failed(&self) -> Vec<Payment> {
    self
      .payments()
      .into_iter()
      .filter(|p| matches!(p.status, PaymentStatus::Failed | PaymentStatus::Cancel))
      .collect()
  }

  // Payment history.

  pub async fn fetch(&self, query: &[(String, String)]) -> Result<Vec<Payment>> {
    self.loading.store(true, Ordering::SeqCst);
    let (seq, page) = match self.payments.write() {
      Ok(mut c) => (c.begin_fetch(), c.page()),
      Err(_) => (0, PageState::default()),
    };

    let mut full_query = page_query(page.page, page.limit);
    full_query.extend(query.iter().cloned());

    let result = self.api.list(&full_query).await;
    self.loading.store(false, Ordering::SeqCst);

    let body = result?;
    let payments: Vec<Payment> = parse_list(&body, Payment::domain_key())?;
    let resolved = pagination::resolve(page.page, page.limit, payments.len() as u64, &body);
    if let Ok(mut c) = self.payments.write() {
      c.apply_fetch(seq, payments.clone(), resolved);
    }
    Ok(payments)
  }

  pub async fn fetch_one(&self, id: u64) -> Result<Payment> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.get(id).await;
    self.loading.store(false, Ordering::SeqCst);

    let payment: Payment = parse_record(&result?, "payment")?;
    if let Ok(mut c) = self.payments.write() {
      c.set_current(Some(payment.clone()));
    }
    Ok(payment)
  }

  /// Start a payment for a booking. Reported via envelope so checkout
  /// flows can render the failure inline.
  pub async fn create(&self, payment: Value) -> Envelope<Payment> {
    self.processing.store(true, Ordering::SeqCst);
    let result = self.api.create(payment).await;
    self.processing.store(false, Ordering::SeqCst);

    match result.and_then(|body| parse_record::<Payment>(&body, "payment")) {
      Ok(created) => {
        if created.id != 0 {
          if let Ok(mut c) = self.payments.write() {
            c.insert_front(created.clone());
          }
        }
        Envelope::ok_with(created, "Payment created successfully.")
      }
      Err(e) => {
        warn!("payment creation failed: {}", e);
        Envelope::fail(e.to_string())
      }
    }
  }

  /// Apply a provider callback; the confirmed payment replaces the cached
  /// row. Re-throws so webhook-driven flows see the real error.
  pub async fn apply_callback(&self, payload: Value) -> Result<Payment> {
    let body = self.api.callback(payload).await?;
    let updated: Payment = parse_record(&body, "payment")?;
    if let Ok(mut c) = self.payments.write() {
      c.replace_by_id(updated.id, updated.clone());
    }
    Ok(updated)
  }

  // Payment methods.

  /// Fetch the method roster. With a `page`, the admin endpoint is used
  /// and server pagination applies; without one, the public endpoint
  /// returns every active method at once.
  pub async fn fetch_methods(&self, page: Option<u64>, limit: Option<u64>) -> Envelope<Vec<PaymentMethod>> {
    self.loading.store(true, Ordering::SeqCst);
    let result = match page {
      Some(page) => {
        let limit = limit.unwrap_or(self.methods_page().limit);
        self.api.admin_methods(&page_query(page, limit)).await
      }
      None => self.api.methods(&[]).await,
    };
    self.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(body) => {
        let methods: Vec<PaymentMethod> = match parse_list(&body, PaymentMethod::domain_key()) {
          Ok(methods) => methods,
          Err(e) => return Envelope::fail(e.to_string()),
        };

        let resolved = match page {
          Some(page) => pagination::resolve(
            page,
            limit.unwrap_or(self.methods_page().limit),
            methods.len() as u64,
            &body,
          ),
          None => PageState {
            page: 1,
            limit: (methods.len() as u64).max(10),
            total: methods.len() as u64,
            total_pages: 1,
          },
        };

        if let Ok(mut cached) = self.methods.write() {
          *cached = methods.clone();
        }
        if let Ok(mut p) = self.methods_page.write() {
          *p = resolved;
        }
        Envelope::ok(methods)
      }
      Err(e) => {
        warn!("payment method fetch failed: {}", e);
        Envelope::fail(e.to_string())
      }
    }
  }

  pub async fn create_method(&self, method: Value) -> Envelope<PaymentMethod> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.create_method(method).await;
    self.loading.store(false, Ordering::SeqCst);

    match result.and_then(|body| parse_record::<PaymentMethod>(&body, "payment_method")) {
      Ok(created) => {
        if let Ok(mut cached) = self.methods.write() {
          cached.insert(0, created.clone());
        }
        Envelope::ok(created)
      }
      Err(e) => Envelope::fail(e.to_string()),
    }
  }

  pub async fn update_method(&self, id: u64, method: Value) -> Envelope<PaymentMethod> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.update_method(id, method).await;
    self.loading.store(false, Ordering::SeqCst);

    match result.and_then(|body| parse_record::<PaymentMethod>(&body, "payment_method")) {
      Ok(updated) => {
        if let Ok(mut cached) = self.methods.write() {
          if let Some(existing) = cached.iter_mut().find(|m| m.id == id) {
            *existing = updated.clone();
          }
        }
        Envelope::ok(updated)
      }
      Err(e) => Envelope::fail(e.to_string()),
    }
  }

  pub async fn delete_method(&self, id: u64) -> Envelope<()> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.delete_method(id).await;
    self.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(_) => {
        if let Ok(mut cached) = self.methods.write() {
          cached.retain(|m| m.id != id);
        }
        Envelope::done("Payment method deleted successfully.")
      }
      Err(e) => Envelope::fail(e.to_string()),
    }
  }

  pub async fn set_method_status(&self, code: &str, active: bool) -> Envelope<()> {
    self.loading.store(true, Ordering::SeqCst);
    let result = self.api.set_method_status(code, active).await;
    self.loading.store(false, Ordering::SeqCst);

    match result {
      Ok(_) => {
        if let Ok(mut cached) = self.methods.write() {
          if let Some(existing) = cached.iter_mut().find(|m| m.code == code) {
            existing.active = active;
          }
        }
        Envelope::done("Payment method status updated.")
      }
      Err(e) => Envelope::fail(e.to_string()),
    }
  }

  // Pagination.

  pub fn set_page(&self, page: u64) {
    if let Ok(mut c) = self.payments.write() {
      c.set_page(page);
    }
  }

  pub fn set_limit(&self, limit: u64) {
    if let Ok(mut c) = self.payments.write() {
      c.set_limit(limit);
    }
  }

  pub fn reset_page(&self) {
    if let Ok(mut c) = self.payments.write() {
      c.reset_page();
    }
  }
}
