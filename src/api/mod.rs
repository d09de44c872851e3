//! Thin typed facades over the five backend services.

mod auth;
mod booking;
mod payment;
mod teacher;
mod user;

pub use auth::{AuthApi, AuthResponse};
pub use booking::BookingApi;
pub use payment::PaymentApi;
pub use teacher::TeacherApi;
pub use user::UserApi;
