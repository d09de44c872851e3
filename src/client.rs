//! Top-level client wiring configuration, storage, transport, session, and
//! the domain stores together.

use crate::api::{BookingApi, PaymentApi, TeacherApi, UserApi};
use crate::config::ApiConfig;
use crate::error::Result;
use crate::gateway::RequestGateway;
use crate::session::SessionManager;
use crate::storage::{KeyValueStore, MemoryStorage, SqliteStorage, TokenStore};
use crate::stores::{BookingStore, DashboardStore, FavoritesStore, PaymentStore, TeacherStore};
use crate::transport::{HttpTransport, Transport};
use std::sync::Arc;
use tracing::warn;

/// One fully-wired client: a session manager plus one store per domain,
/// all sharing a transport and configuration.
pub struct Client {
  config: Arc<ApiConfig>,
  session: SessionManager,
  users: UserApi,
  bookings: BookingStore,
  teachers: TeacherStore,
  payments: PaymentStore,
  favorites: FavoritesStore,
  dashboard: DashboardStore,
}

impl Client {
  /// Build a client with the real HTTP transport and SQLite-backed
  /// persistence. A storage failure degrades to in-memory persistence so
  /// the client still works, just without sessions surviving restarts.
  pub fn new(config: ApiConfig) -> Result<Self> {
    config.validate()?;
    let store: Arc<dyn KeyValueStore> =
      match SqliteStorage::open(config.storage.path.as_deref()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
          warn!("falling back to in-memory storage: {}", e);
          Arc::new(MemoryStorage::new())
        }
      };
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
    Ok(Self::with_parts(config, transport, store))
  }

  /// Build a client from explicit parts. Tests use this with a scripted
  /// transport and in-memory storage.
  pub fn with_parts(
    config: ApiConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
  ) -> Self {
    let config = Arc::new(config);
    let tokens = TokenStore::new(store, config.storage.keys.clone());
    let session = SessionManager::new(config.clone(), transport.clone(), tokens);
    let gateway = RequestGateway::new(transport, config.clone(), session.clone());

    let limit = config.default_page_size;
    let user_api = UserApi::new(gateway.clone());
    let teacher_api = TeacherApi::new(gateway.clone());

    Self {
      users: user_api.clone(),
      bookings: BookingStore::new(BookingApi::new(gateway.clone()), limit),
      teachers: TeacherStore::new(teacher_api.clone(), limit),
      payments: PaymentStore::new(PaymentApi::new(gateway), limit),
      favorites: FavoritesStore::new(user_api, teacher_api.clone()),
      dashboard: DashboardStore::new(teacher_api, session.clone()),
      config,
      session,
    }
  }

  /// Verify any rehydrated session against the server. Call once at
  /// startup; an invalid stored session is silently dropped.
  pub async fn initialize(&self) {
    self.session.initialize().await;
  }

  pub fn config(&self) -> &ApiConfig {
    &self.config
  }

  pub fn session(&self) -> &SessionManager {
    &self.session
  }

  /// Direct user-service access (admin screens, activity log, uploads).
  pub fn users(&self) -> &UserApi {
    &self.users
  }

  pub fn bookings(&self) -> &BookingStore {
    &self.bookings
  }

  pub fn teachers(&self) -> &TeacherStore {
    &self.teachers
  }

  pub fn payments(&self) -> &PaymentStore {
    &self.payments
  }

  pub fn favorites(&self) -> &FavoritesStore {
    &self.favorites
  }

  pub fn dashboard(&self) -> &DashboardStore {
    &self.dashboard
  }
}
