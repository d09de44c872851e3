//! Transport primitive: a thin, substitutable layer over HTTP.
//!
//! The gateway and session manager only see the [`Transport`] trait, so
//! tests can swap the network for a scripted transport. The real
//! implementation is a `reqwest` client with a fixed timeout applied
//! uniformly to every call. A transport reports protocol-level failures
//! (connect errors, timeouts) as errors; a received non-2xx response is a
//! successful send and is translated further up.

use crate::config::ApiConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// What goes on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
  pub method: Method,
  pub url: String,
  pub query: Vec<(String, String)>,
  pub bearer: Option<String>,
  pub body: Option<RequestBody>,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
  Json(Value),
  /// A single-file multipart upload under the given form field.
  File {
    field: String,
    filename: String,
    bytes: Vec<u8>,
  },
}

/// What came back.
#[derive(Debug, Clone)]
pub struct TransportResponse {
  pub status: u16,
  pub body: Value,
}

impl TransportRequest {
  pub fn new(method: Method, url: impl Into<String>) -> Self {
    Self {
      method,
      url: url.into(),
      query: Vec::new(),
      bearer: None,
      body: None,
    }
  }

  pub fn get(url: impl Into<String>) -> Self {
    Self::new(Method::GET, url)
  }

  pub fn post(url: impl Into<String>) -> Self {
    Self::new(Method::POST, url)
  }

  pub fn put(url: impl Into<String>) -> Self {
    Self::new(Method::PUT, url)
  }

  pub fn delete(url: impl Into<String>) -> Self {
    Self::new(Method::DELETE, url)
  }

  pub fn with_query(mut self, query: &[(String, String)]) -> Self {
    self.query.extend(query.iter().cloned());
    self
  }

  pub fn with_json(mut self, body: Value) -> Self {
    self.body = Some(RequestBody::Json(body));
    self
  }

  pub fn with_file(mut self, field: &str, filename: &str, bytes: Vec<u8>) -> Self {
    self.body = Some(RequestBody::File {
      field: field.to_string(),
      filename: filename.to_string(),
      bytes,
    });
    self
  }

  pub fn with_bearer(mut self, token: Option<String>) -> Self {
    self.bearer = token;
    self
  }
}

#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// `reqwest`-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
  http: reqwest::Client,
}

impl HttpTransport {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { http })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
    let mut builder = self.http.request(request.method, &request.url);

    if !request.query.is_empty() {
      builder = builder.query(&request.query);
    }
    if let Some(token) = &request.bearer {
      builder = builder.bearer_auth(token);
    }
    match request.body {
      Some(RequestBody::Json(body)) => {
        builder = builder.json(&body);
      }
      Some(RequestBody::File {
        field,
        filename,
        bytes,
      }) => {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        builder = builder.multipart(reqwest::multipart::Form::new().part(field, part));
      }
      None => {}
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    // Some endpoints answer with an empty body; treat it as null rather
    // than a parse failure.
    let text = response.text().await?;
    let body = serde_json::from_str(&text).unwrap_or(Value::Null);

    Ok(TransportResponse { status, body })
  }
}
