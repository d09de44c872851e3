//! Payment-service facade: payments and payment methods.

use crate::config::Service;
use crate::error::Result;
use crate::gateway::RequestGateway;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct PaymentApi {
  gateway: RequestGateway,
}

impl PaymentApi {
  pub fn new(gateway: RequestGateway) -> Self {
    Self { gateway }
  }

  pub async fn list(&self, query: &[(String, String)]) -> Result<Value> {
    self.gateway.get(Service::Payment, "payments", query).await
  }

  pub async fn get(&self, id: u64) -> Result<Value> {
    self.gateway.get(Service::Payment, &format!("payment/{id}"), &[]).await
  }

  pub async fn create(&self, payment: Value) -> Result<Value> {
    self.gateway.post(Service::Payment, "payments", payment).await
  }

  /// Provider webhook replay, used to settle a payment manually.
  pub async fn callback(&self, payload: Value) -> Result<Value> {
    self.gateway.post(Service::Payment, "payments/callback", payload).await
  }

  // Payment methods.

  /// Active methods only; the public checkout list.
  pub async fn methods(&self, query: &[(String, String)]) -> Result<Value> {
    self.gateway.get(Service::Payment, "payment-methods/", query).await
  }

  /// Every method regardless of active flag.
  pub async fn admin_methods(&self, query: &[(String, String)]) -> Result<Value> {
    self.gateway.get(Service::Payment, "admin/payment-methods/", query).await
  }

  pub async fn create_method(&self, method: Value) -> Result<Value> {
    self.gateway.post(Service::Payment, "admin/payment-methods/", method).await
  }

  pub async fn update_method(&self, id: u64, method: Value) -> Result<Value> {
    self
      .gateway
      .put(Service::Payment, &format!("admin/payment-methods/{id}"), method)
      .await
  }

  pub async fn delete_method(&self, id: u64) -> Result<Value> {
    self
      .gateway
      .delete(Service::Payment, &format!("admin/payment-methods/{id}"))
      .await
  }

  pub async fn set_method_status(&self, code: &str, active: bool) -> Result<Value> {
    self
      .gateway
      .post(
        Service::Payment,
        "payment-methods/status",
        json!({"code": code, "active": active}),
      )
      .await
  }
}
