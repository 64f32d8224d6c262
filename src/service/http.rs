use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::client::WorkOrderService;
use super::error::{ServiceError, ServiceResult};
use super::types::{NewWorkOrder, WorkOrder, WorkOrderId, WorkOrderUpdate};

/// Work order service reached over HTTP with JSON bodies
#[derive(Clone, Debug)]
pub struct HttpService {
  client: reqwest::Client,
  base: Url,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
  id: WorkOrderId,
}

/// JSON error body, as in `{"error": "..."}` or `{"message": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
  #[serde(alias = "message")]
  error: String,
}

impl HttpService {
  pub fn new(base_url: &str) -> Result<Self> {
    let base = normalize_base(base_url)?;
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base })
  }

  /// Build the client and check that the service answers its health route
  pub async fn connect(base_url: &str) -> Result<Self> {
    let service = Self::new(base_url)?;
    let url = service
      .endpoint("health")
      .map_err(|e| eyre!("Invalid health endpoint: {}", e))?;

    let response = service
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach work order service at {}: {}", service.base, e))?;

    if !response.status().is_success() {
      return Err(eyre!(
        "Work order service at {} is not healthy: {}",
        service.base,
        response.status()
      ));
    }

    Ok(service)
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn endpoint(&self, path: &str) -> ServiceResult<Url> {
    self
      .base
      .join(path)
      .map_err(|e| ServiceError::Remote(format!("Invalid endpoint {}: {}", path, e)))
  }

  fn order_endpoint(&self, id: WorkOrderId) -> ServiceResult<Url> {
    self.endpoint(&format!("work-orders/{}", id))
  }

  async fn fetch_list(&self, query: Option<(&str, &str)>) -> ServiceResult<Vec<WorkOrder>> {
    let mut request = self.client.get(self.endpoint("work-orders")?);
    if let Some(pair) = query {
      request = request.query(&[pair]);
    }

    let response = request.send().await.map_err(transport_error)?;
    let response = check_status(response, None).await?;
    response.json().await.map_err(decode_error)
  }
}

/// Make sure relative joins append to the base path instead of replacing its
/// last segment
fn normalize_base(base_url: &str) -> Result<Url> {
  let trimmed = base_url.trim();
  let with_slash = if trimmed.ends_with('/') {
    trimmed.to_string()
  } else {
    format!("{}/", trimmed)
  };

  Url::parse(&with_slash).map_err(|e| eyre!("Invalid service URL '{}': {}", base_url, e))
}

/// Map a non-success status to the service error taxonomy.
///
/// 404 on a route addressing a single work order means the id does not exist.
fn classify_status(status: StatusCode, id: Option<WorkOrderId>, body: &str) -> ServiceError {
  let message = error_message(body);
  match (status, id) {
    (StatusCode::NOT_FOUND, Some(id)) => ServiceError::NotFound(id),
    _ if message.is_empty() => ServiceError::Remote(format!("Service returned {}", status)),
    _ => ServiceError::Remote(format!("Service returned {}: {}", status, message)),
  }
}

fn error_message(body: &str) -> String {
  serde_json::from_str::<ErrorBody>(body)
    .map(|b| b.error)
    .unwrap_or_else(|_| body.trim().to_string())
}

async fn check_status(
  response: reqwest::Response,
  id: Option<WorkOrderId>,
) -> ServiceResult<reqwest::Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  Err(classify_status(status, id, &body))
}

fn transport_error(e: reqwest::Error) -> ServiceError {
  ServiceError::Remote(format!("Request failed: {}", e))
}

fn decode_error(e: reqwest::Error) -> ServiceError {
  ServiceError::Remote(format!("Failed to decode response: {}", e))
}

#[async_trait]
impl WorkOrderService for HttpService {
  async fn create(&self, order: NewWorkOrder) -> ServiceResult<WorkOrderId> {
    let response = self
      .client
      .post(self.endpoint("work-orders")?)
      .json(&order)
      .send()
      .await
      .map_err(transport_error)?;

    let created: CreatedResponse = check_status(response, None)
      .await?
      .json()
      .await
      .map_err(decode_error)?;

    Ok(created.id)
  }

  async fn delete(&self, id: WorkOrderId) -> ServiceResult<()> {
    let response = self
      .client
      .delete(self.order_endpoint(id)?)
      .send()
      .await
      .map_err(transport_error)?;

    check_status(response, Some(id)).await?;
    Ok(())
  }

  async fn get(&self, id: WorkOrderId) -> ServiceResult<WorkOrder> {
    let response = self
      .client
      .get(self.order_endpoint(id)?)
      .send()
      .await
      .map_err(transport_error)?;

    check_status(response, Some(id))
      .await?
      .json()
      .await
      .map_err(decode_error)
  }

  async fn list(&self) -> ServiceResult<Vec<WorkOrder>> {
    self.fetch_list(None).await
  }

  async fn list_by_status(&self, status: &str) -> ServiceResult<Vec<WorkOrder>> {
    self.fetch_list(Some(("status", status))).await
  }

  async fn list_by_worker(&self, worker_name: &str) -> ServiceResult<Vec<WorkOrder>> {
    self.fetch_list(Some(("worker", worker_name))).await
  }

  async fn update(&self, id: WorkOrderId, update: WorkOrderUpdate) -> ServiceResult<()> {
    let response = self
      .client
      .put(self.order_endpoint(id)?)
      .json(&update)
      .send()
      .await
      .map_err(transport_error)?;

    check_status(response, Some(id)).await?;
    Ok(())
  }
}
