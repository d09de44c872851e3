//! Booking-service facade.

use crate::config::Service;
use crate::error::Result;
use crate::gateway::RequestGateway;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct BookingApi {
  gateway: RequestGateway,
}

impl BookingApi {
  pub fn new(gateway: RequestGateway) -> Self {
    Self { gateway }
  }

  pub async fn list(&self, query: &[(String, String)]) -> Result<Value> {
    self.gateway.get(Service::Booking, "bookings", query).await
  }

  pub async fn admin_list(&self, query: &[(String, String)]) -> Result<Value> {
    self.gateway.get(Service::Booking, "admin/bookings", query).await
  }

  pub async fn get(&self, id: u64) -> Result<Value> {
    self.gateway.get(Service::Booking, &format!("booking/{id}"), &[]).await
  }

  /// Booking joined with its schedule and teacher.
  pub async fn detail(&self, id: u64) -> Result<Value> {
    self.gateway.get(Service::Booking, &format!("booking-detail/{id}"), &[]).await
  }

  pub async fn for_user(&self, user_id: u64) -> Result<Value> {
    self.gateway.get(Service::Booking, &format!("bookings/user/{user_id}"), &[]).await
  }

  pub async fn upcoming_lessons(&self, user_id: u64, query: &[(String, String)]) -> Result<Value> {
    self
      .gateway
      .get(
        Service::Booking,
        &format!("bookings/user/{user_id}/upcoming-lessons"),
        query,
      )
      .await
  }

  pub async fn create(&self, booking: Value) -> Result<Value> {
    self.gateway.post(Service::Booking, "bookings", booking).await
  }

  pub async fn reschedule(&self, id: u64, new_schedule_id: u64) -> Result<Value> {
    self
      .gateway
      .post(
        Service::Booking,
        &format!("bookings/{id}/reschedule"),
        json!({"new_schedule_id": new_schedule_id}),
      )
      .await
  }

  pub async fn cancel(&self, id: u64) -> Result<Value> {
    self
      .gateway
      .post(Service::Booking, &format!("bookings/{id}/cancel"), Value::Null)
      .await
  }

  pub async fn set_status(&self, id: u64, status: &str) -> Result<Value> {
    self
      .gateway
      .put(
        Service::Booking,
        &format!("bookings/{id}/status"),
        json!({"status": status}),
      )
      .await
  }

  /// Status transition on the path, used by payment callbacks.
  pub async fn change_status(&self, id: u64, status: &str) -> Result<Value> {
    self
      .gateway
      .put(
        Service::Booking,
        &format!("booking-change/{id}/status/{status}"),
        Value::Null,
      )
      .await
  }

  pub async fn delete(&self, id: u64) -> Result<Value> {
    self.gateway.delete(Service::Booking, &format!("booking/{id}")).await
  }

  pub async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> Result<Value> {
    self
      .gateway
      .upload(Service::Booking, "upload-image", filename, bytes)
      .await
  }
}
