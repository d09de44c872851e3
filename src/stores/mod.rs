//! Domain stores: cached collections layered over the API facades.
//!
//! Each store owns one entity collection and mirrors only server-confirmed
//! state into it. Error handling differs per store on purpose: bookings and
//! teachers re-throw so callers can branch on the failure, payments mostly
//! report through result envelopes, favorites swallow and log.

mod bookings;
mod dashboard;
mod favorites;
mod payments;
mod teachers;

pub use bookings::{BookingFilters, BookingStore};
pub use dashboard::DashboardStore;
pub use favorites::FavoritesStore;
pub use payments::PaymentStore;
pub use teachers::{TeacherFilters, TeacherStore};

/// Standard page/limit query parameters.
pub(crate) fn page_query(page: u64, limit: u64) -> Vec<(String, String)> {
  vec![
    ("page".to_string(), page.to_string()),
    ("limit".to_string(), limit.to_string()),
  ]
}
