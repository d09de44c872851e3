//! Teacher-service facade: teacher records, schedules, and the teacher
//! dashboard.

use crate::config::Service;
use crate::error::Result;
use crate::gateway::RequestGateway;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct TeacherApi {
  gateway: RequestGateway,
}

impl TeacherApi {
  pub fn new(gateway: RequestGateway) -> Self {
    Self { gateway }
  }

  pub async fn list(&self, query: &[(String, String)]) -> Result<Value> {
    self.gateway.get(Service::Teacher, "teachers", query).await
  }

  pub async fn get(&self, id: u64) -> Result<Value> {
    self.gateway.get(Service::Teacher, &format!("teachers/{id}"), &[]).await
  }

  /// The teacher record belonging to the authenticated user.
  pub async fn me(&self) -> Result<Value> {
    self.gateway.get(Service::Teacher, "teachers/me", &[]).await
  }

  pub async fn create(&self, teacher: Value) -> Result<Value> {
    self.gateway.post(Service::Teacher, "teachers", teacher).await
  }

  pub async fn update(&self, id: u64, teacher: Value) -> Result<Value> {
    self.gateway.put(Service::Teacher, &format!("teachers/{id}"), teacher).await
  }

  pub async fn delete(&self, id: u64) -> Result<Value> {
    self.gateway.delete(Service::Teacher, &format!("teachers/{id}")).await
  }

  pub async fn dashboard(&self, teacher_id: u64) -> Result<Value> {
    self
      .gateway
      .get(Service::Teacher, &format!("teachers/dashboard/{teacher_id}"), &[])
      .await
  }

  // Schedules.

  pub async fn schedules(&self, query: &[(String, String)]) -> Result<Value> {
    self.gateway.get(Service::Teacher, "schedules", query).await
  }

  pub async fn schedule(&self, id: u64) -> Result<Value> {
    self.gateway.get(Service::Teacher, &format!("schedule/{id}"), &[]).await
  }

  pub async fn teacher_schedules(&self, teacher_id: u64, query: &[(String, String)]) -> Result<Value> {
    self
      .gateway
      .get(Service::Teacher, &format!("schedule/teacher/{teacher_id}"), query)
      .await
  }

  pub async fn create_schedule(&self, schedule: Value) -> Result<Value> {
    self.gateway.post(Service::Teacher, "schedule", schedule).await
  }

  pub async fn update_schedule(&self, id: u64, schedule: Value) -> Result<Value> {
    self.gateway.put(Service::Teacher, &format!("schedule/{id}"), schedule).await
  }

  pub async fn delete_schedule(&self, id: u64) -> Result<Value> {
    self.gateway.delete(Service::Teacher, &format!("schedule/{id}")).await
  }

  pub async fn set_schedule_status(&self, schedule_id: u64, status: &str) -> Result<Value> {
    self
      .gateway
      .put(
        Service::Teacher,
        "schedule-status",
        json!({"schedule_id": schedule_id, "status": status}),
      )
      .await
  }

  pub async fn cancel_schedule(&self, id: u64) -> Result<Value> {
    self
      .gateway
      .put(Service::Teacher, &format!("cancel-schedule/{id}"), Value::Null)
      .await
  }

  pub async fn filter_schedules_by_teacher(&self, filter: Value) -> Result<Value> {
    self
      .gateway
      .post(Service::Teacher, "schedule/filter-by-teacher", filter)
      .await
  }

  /// Resolve many schedules at once for booking hydration.
  pub async fn schedule_batch_detail(&self, schedule_ids: &[u64]) -> Result<Value> {
    self
      .gateway
      .post(
        Service::Teacher,
        "schedule/batch-detail",
        json!({"schedule_ids": schedule_ids}),
      )
      .await
  }

  pub async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> Result<Value> {
    self
      .gateway
      .upload(Service::Teacher, "upload-image", filename, bytes)
      .await
  }
}
