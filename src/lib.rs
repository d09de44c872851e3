//! Client-side session and cache synchronization layer for a multi-service
//! tutoring platform.
//!
//! The crate talks to five backends (user, admin, teacher, booking,
//! payment) and keeps a local mirror of server-confirmed state: a session
//! with token refresh and single-shot 401 recovery, plus one store per
//! domain whose caches are only ever updated from confirmed responses.
//!
//! ```no_run
//! use tutorlink::{ApiConfig, Client};
//!
//! # async fn run() -> tutorlink::Result<()> {
//! let client = Client::new(ApiConfig::load(None)?)?;
//! client.initialize().await;
//!
//! client.session().login("mika@example.com", "secret").await?;
//! let bookings = client.bookings().fetch(&[]).await?;
//! println!("{} bookings", bookings.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod normalize;
pub mod pagination;
pub mod session;
pub mod storage;
pub mod stores;
pub mod transport;

pub use client::Client;
pub use collection::Envelope;
pub use config::{ApiConfig, Service};
pub use error::{ApiError, AuthError, Result};
pub use session::{Session, SessionManager, SessionState};
