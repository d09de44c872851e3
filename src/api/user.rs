//! User-service facade: profile, admin user management, favorites,
//! activity log, hero images, and dashboard statistics.

use crate::config::Service;
use crate::error::Result;
use crate::gateway::RequestGateway;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct UserApi {
  gateway: RequestGateway,
}

impl UserApi {
  pub fn new(gateway: RequestGateway) -> Self {
    Self { gateway }
  }

  pub async fn me(&self) -> Result<Value> {
    self.gateway.get(Service::User, "me", &[]).await
  }

  pub async fn update_profile(&self, profile: Value) -> Result<Value> {
    self.gateway.put(Service::User, "profile", profile).await
  }

  pub async fn change_password(&self, current: &str, new: &str) -> Result<Value> {
    self
      .gateway
      .post(
        Service::User,
        "change-password",
        json!({"current_password": current, "new_password": new}),
      )
      .await
  }

  // Admin user management.

  pub async fn list_users(&self, query: &[(String, String)]) -> Result<Value> {
    self.gateway.get(Service::Admin, "users", query).await
  }

  pub async fn get_user(&self, id: u64) -> Result<Value> {
    self.gateway.get(Service::Admin, &format!("users/{id}"), &[]).await
  }

  pub async fn create_user(&self, user: Value) -> Result<Value> {
    self.gateway.post(Service::Admin, "users", user).await
  }

  pub async fn update_user(&self, id: u64, user: Value) -> Result<Value> {
    self.gateway.put(Service::Admin, &format!("users/{id}"), user).await
  }

  pub async fn delete_user(&self, id: u64) -> Result<Value> {
    self.gateway.delete(Service::Admin, &format!("users/{id}")).await
  }

  // Favorites.

  pub async fn favorite_teachers(&self) -> Result<Value> {
    self.gateway.get(Service::User, "favorites", &[]).await
  }

  /// `favorite: None` lets the server toggle; `Some(bool)` forces the state.
  pub async fn toggle_favorite(&self, teacher_id: u64, favorite: Option<bool>) -> Result<Value> {
    let mut payload = json!({"teacher_id": teacher_id});
    if let Some(favorite) = favorite {
      payload["favorite"] = json!(favorite);
    }
    self.gateway.post(Service::User, "favorites", payload).await
  }

  // Activity log.

  pub async fn log_activity(&self, action: &str, description: Option<&str>) -> Result<Value> {
    let mut payload = json!({"action": action});
    if let Some(description) = description {
      payload["description"] = json!(description);
    }
    self.gateway.post(Service::User, "activity", payload).await
  }

  pub async fn recent_activity(&self, limit: u64) -> Result<Value> {
    self
      .gateway
      .get(
        Service::User,
        "activity/recent",
        &[("limit".to_string(), limit.to_string())],
      )
      .await
  }

  // Hero images.

  pub async fn hero_images(&self, query: &[(String, String)]) -> Result<Value> {
    self.gateway.get(Service::User, "hero-image", query).await
  }

  pub async fn save_hero_image(&self, upload: Value) -> Result<Value> {
    self.gateway.post(Service::Admin, "hero-image", upload).await
  }

  pub async fn delete_hero_image(&self, key: &str) -> Result<Value> {
    self
      .gateway
      .delete(Service::Admin, &format!("hero-image?key={key}"))
      .await
  }

  pub async fn upload_hero_image(&self, filename: &str, bytes: Vec<u8>) -> Result<Value> {
    self
      .gateway
      .upload(Service::Admin, "upload-hero-image", filename, bytes)
      .await
  }

  pub async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> Result<Value> {
    self
      .gateway
      .upload(Service::User, "upload-image", filename, bytes)
      .await
  }

  // Admin dashboard.

  pub async fn dashboard_stats(&self) -> Result<Value> {
    self.gateway.get(Service::Admin, "dashboard-stats", &[]).await
  }
}
