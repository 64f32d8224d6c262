use async_trait::async_trait;

use super::error::ServiceResult;
use super::types::{NewWorkOrder, WorkOrder, WorkOrderId, WorkOrderUpdate};

/// Calls exposed by the remote work order service.
///
/// Every call is atomic from the caller's point of view. List results come
/// back in the service's own order and are never re-sorted locally.
#[async_trait]
pub trait WorkOrderService: Send + Sync {
  /// Create a work order, returning the id the service assigned
  async fn create(&self, order: NewWorkOrder) -> ServiceResult<WorkOrderId>;

  async fn delete(&self, id: WorkOrderId) -> ServiceResult<()>;

  async fn get(&self, id: WorkOrderId) -> ServiceResult<WorkOrder>;

  async fn list(&self) -> ServiceResult<Vec<WorkOrder>>;

  /// Server-side exact match on status
  async fn list_by_status(&self, status: &str) -> ServiceResult<Vec<WorkOrder>>;

  /// Server-side exact match on worker name
  async fn list_by_worker(&self, worker_name: &str) -> ServiceResult<Vec<WorkOrder>>;

  /// Overwrite every mutable field of an existing work order
  async fn update(&self, id: WorkOrderId, update: WorkOrderUpdate) -> ServiceResult<()>;
}
