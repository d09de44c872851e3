use crate::error::{ApiError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Which backend a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
  User,
  Admin,
  Teacher,
  Booking,
  Payment,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub services: ServiceConfig,
  /// Request timeout in seconds, applied uniformly to all calls.
  pub timeout_secs: u64,
  /// Page size used when a store has no explicit limit yet.
  pub default_page_size: u64,
  pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  pub user: String,
  pub admin: String,
  pub teacher: String,
  pub booking: String,
  pub payment: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  /// Path of the key-value database. Defaults to the platform data dir.
  pub path: Option<PathBuf>,
  pub keys: StorageKeys,
}

/// Key names for persisted session material.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
  pub token: String,
  pub principal: String,
  pub refresh_token: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      services: ServiceConfig::default(),
      timeout_secs: 10,
      default_page_size: 10,
      storage: StorageConfig::default(),
    }
  }
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      user: "http://localhost:8081/api/v1".to_string(),
      admin: "http://localhost:8081/api/admin".to_string(),
      teacher: "http://localhost:8082/api/v1".to_string(),
      booking: "http://localhost:8083/api/v1".to_string(),
      payment: "http://localhost:8084/api/v1".to_string(),
    }
  }
}

impl Default for StorageKeys {
  fn default() -> Self {
    Self {
      token: "tutorlink_token".to_string(),
      principal: "tutorlink_user".to_string(),
      refresh_token: "tutorlink_refresh_token".to_string(),
    }
  }
}

impl ApiConfig {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./tutorlink.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/tutorlink/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found; base URLs are
  /// static configuration and never re-resolved at runtime.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(ApiError::Config(format!(
          "config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        tracing::debug!("no config file found, using defaults");
        Self::default()
      }
    };

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("tutorlink.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("tutorlink").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      ApiError::Config(format!(
        "failed to read config file {}: {}",
        path.display(),
        e
      ))
    })?;

    serde_yaml::from_str(&contents).map_err(|e| {
      ApiError::Config(format!(
        "failed to parse config file {}: {}",
        path.display(),
        e
      ))
    })
  }

  /// Check that every service base URL parses.
  pub fn validate(&self) -> Result<()> {
    for (name, base) in [
      ("user", &self.services.user),
      ("admin", &self.services.admin),
      ("teacher", &self.services.teacher),
      ("booking", &self.services.booking),
      ("payment", &self.services.payment),
    ] {
      Url::parse(base)
        .map_err(|e| ApiError::Config(format!("invalid {} service URL {}: {}", name, base, e)))?;
    }
    Ok(())
  }

  /// Base URL for a service.
  pub fn base_url(&self, service: Service) -> &str {
    match service {
      Service::User => &self.services.user,
      Service::Admin => &self.services.admin,
      Service::Teacher => &self.services.teacher,
      Service::Booking => &self.services.booking,
      Service::Payment => &self.services.payment,
    }
  }

  /// Join a service base URL with a path.
  pub fn endpoint(&self, service: Service, path: &str) -> String {
    let base = self.base_url(service).trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let config = ApiConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.timeout_secs, 10);
    assert_eq!(config.default_page_size, 10);
  }

  #[test]
  fn endpoint_joins_without_double_slash() {
    let config = ApiConfig::default();
    assert_eq!(
      config.endpoint(Service::Booking, "/bookings"),
      "http://localhost:8083/api/v1/bookings"
    );
    assert_eq!(
      config.endpoint(Service::Admin, "users"),
      "http://localhost:8081/api/admin/users"
    );
  }

  #[test]
  fn partial_yaml_fills_defaults() {
    let config: ApiConfig =
      serde_yaml::from_str("services:\n  booking: \"http://booking.internal/api\"\n").unwrap();
    assert_eq!(config.services.booking, "http://booking.internal/api");
    assert_eq!(config.services.user, "http://localhost:8081/api/v1");
    assert_eq!(config.storage.keys.token, "tutorlink_token");
  }

  #[test]
  fn bad_service_url_is_rejected() {
    let mut config = ApiConfig::default();
    config.services.payment = "not a url".to_string();
    assert!(config.validate().is_err());
  }
}
