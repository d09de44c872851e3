//! Domain records mirrored from the backend services.
//!
//! Wire names are `snake_case`, but some teacher-service responses leak
//! `PascalCase` field names; `serde` aliases absorb that. Every record
//! tolerates missing fields so that a partially-populated payload still
//! deserializes.

use crate::collection::Entity;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Role carried by the authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Teacher,
  Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
  Pending,
  Paid,
  Cancelled,
  Rescheduled,
  Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Settlement,
  Failed,
  Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
  Available,
  Booked,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeacherLevel {
  Beginner,
  Intermediate,
  Advanced,
}

impl TeacherLevel {
  pub fn as_str(&self) -> &'static str {
    match self {
      TeacherLevel::Beginner => "beginner",
      TeacherLevel::Intermediate => "intermediate",
      TeacherLevel::Advanced => "advanced",
    }
  }
}

/// The authenticated identity associated with a session.
///
/// Never mutated in place: profile updates replace the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
  pub id: u64,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  pub role: Role,
  #[serde(default)]
  pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: u64,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  pub role: Role,
  #[serde(default)]
  pub profile_image: Option<String>,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
  pub id: u64,
  #[serde(default)]
  pub user_id: u64,
  #[serde(default, alias = "Name")]
  pub name: String,
  #[serde(default, alias = "Bio")]
  pub bio: String,
  #[serde(default, alias = "LanguageLevel")]
  pub language_level: String,
  #[serde(default, alias = "PricePerHour")]
  pub price_per_hour: f64,
  #[serde(default)]
  pub available_start_time: Option<String>,
  #[serde(default)]
  pub available_end_time: Option<String>,
  #[serde(default)]
  pub profile_image: Option<String>,
  #[serde(default)]
  pub schedules: Option<Vec<Schedule>>,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
  pub id: u64,
  #[serde(default)]
  pub teacher_id: u64,
  #[serde(default)]
  pub teacher: Option<Box<Teacher>>,
  /// Wire format varies between "YYYY-MM-DD" and a full RFC 3339 stamp.
  #[serde(default)]
  pub date: String,
  #[serde(default)]
  pub start_time: String,
  #[serde(default)]
  pub end_time: String,
  #[serde(default = "default_schedule_status")]
  pub status: ScheduleStatus,
}

fn default_schedule_status() -> ScheduleStatus {
  ScheduleStatus::Available
}

impl Schedule {
  /// Calendar date of the slot, tolerating both wire formats.
  pub fn date_naive(&self) -> Option<NaiveDate> {
    let prefix = self.date.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
  }

  /// Start of the slot as a naive datetime.
  pub fn starts_at(&self) -> Option<NaiveDateTime> {
    let date = self.date_naive()?;
    let time = NaiveTime::parse_from_str(&self.start_time, "%H:%M")
      .or_else(|_| NaiveTime::parse_from_str(&self.start_time, "%H:%M:%S"))
      .ok()?;
    Some(date.and_time(time))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
  pub id: u64,
  #[serde(default)]
  pub user_id: u64,
  #[serde(default)]
  pub schedule_id: u64,
  #[serde(default = "default_booking_status")]
  pub status: BookingStatus,
  #[serde(default)]
  pub payment_id: Option<u64>,
  #[serde(default)]
  pub reschedule_from: Option<u64>,
  #[serde(default)]
  pub note: String,
  #[serde(default)]
  pub total_price: f64,
  #[serde(default)]
  pub schedule: Option<Schedule>,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
}

fn default_booking_status() -> BookingStatus {
  BookingStatus::Pending
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
  pub id: u64,
  #[serde(default)]
  pub booking_id: u64,
  #[serde(default)]
  pub amount: f64,
  #[serde(default = "default_payment_status")]
  pub status: PaymentStatus,
  #[serde(default)]
  pub payment_method: String,
  #[serde(default)]
  pub midtrans_transaction_id: Option<String>,
  #[serde(default)]
  pub paid_at: Option<String>,
  #[serde(default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
}

fn default_payment_status() -> PaymentStatus {
  PaymentStatus::Pending
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
  pub id: u64,
  #[serde(default)]
  pub code: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub active: bool,
}

/// One entry in the per-user activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
  #[serde(default)]
  pub id: u64,
  #[serde(default)]
  pub user_id: u64,
  pub action: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroImage {
  #[serde(default)]
  pub id: u64,
  #[serde(default)]
  pub key_image: String,
  #[serde(default)]
  pub image_url: String,
}

/// Aggregate served by the teacher dashboard endpoint (camelCase wire names).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardData {
  pub teacher_profile: Option<Teacher>,
  pub stats: DashboardStats,
  pub upcoming_bookings: Vec<serde_json::Value>,
  pub recent_students: Vec<serde_json::Value>,
  pub completed_lessons: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
  pub total_students: u64,
  pub upcoming_bookings: u64,
  pub completed_lessons: u64,
  pub total_earnings: f64,
}

impl Entity for Teacher {
  fn id(&self) -> u64 {
    self.id
  }

  fn domain_key() -> &'static str {
    "teachers"
  }
}

impl Entity for Schedule {
  fn id(&self) -> u64 {
    self.id
  }

  fn domain_key() -> &'static str {
    "schedules"
  }
}

impl Entity for Booking {
  fn id(&self) -> u64 {
    self.id
  }

  fn domain_key() -> &'static str {
    "bookings"
  }
}

impl Entity for Payment {
  fn id(&self) -> u64 {
    self.id
  }

  fn domain_key() -> &'static str {
    "payments"
  }
}

impl Entity for PaymentMethod {
  fn id(&self) -> u64 {
    self.id
  }

  fn domain_key() -> &'static str {
    "payment_methods"
  }
}
