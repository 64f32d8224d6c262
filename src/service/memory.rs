//! In-process work order service.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::client::WorkOrderService;
use super::error::{ServiceError, ServiceResult};
use super::types::{CanonicalStatus, NewWorkOrder, WorkOrder, WorkOrderId, WorkOrderUpdate};

#[derive(Debug)]
struct Store {
  next_id: WorkOrderId,
  orders: BTreeMap<WorkOrderId, WorkOrder>,
}

/// Work order service that keeps its records in memory.
///
/// Ids are handed out sequentially starting at 1 and lists come back in
/// ascending id order.
#[derive(Debug)]
pub struct InMemoryService {
  store: Mutex<Store>,
}

impl InMemoryService {
  pub fn new() -> Self {
    Self {
      store: Mutex::new(Store {
        next_id: 1,
        orders: BTreeMap::new(),
      }),
    }
  }

  fn store(&self) -> ServiceResult<MutexGuard<'_, Store>> {
    self
      .store
      .lock()
      .map_err(|e| ServiceError::Remote(format!("Lock poisoned: {}", e)))
  }

  fn select(&self, pred: impl Fn(&WorkOrder) -> bool) -> ServiceResult<Vec<WorkOrder>> {
    let store = self.store()?;
    Ok(store.orders.values().filter(|o| pred(o)).cloned().collect())
  }
}

impl Default for InMemoryService {
  fn default() -> Self {
    Self::new()
  }
}

fn now_nanos() -> i64 {
  let now = Utc::now();
  now
    .timestamp_nanos_opt()
    .unwrap_or_else(|| now.timestamp_millis().saturating_mul(1_000_000))
}

#[async_trait]
impl WorkOrderService for InMemoryService {
  async fn create(&self, order: NewWorkOrder) -> ServiceResult<WorkOrderId> {
    let mut store = self.store()?;
    let id = store.next_id;
    store.next_id += 1;
    store.orders.insert(
      id,
      WorkOrder {
        id,
        customer_name: order.customer_name,
        worker_name: order.worker_name,
        status: CanonicalStatus::Pending.into(),
        created_at: now_nanos(),
        date_of_work: order.date_of_work,
        due_date: order.due_date,
        notes: String::new(),
      },
    );
    Ok(id)
  }

  async fn delete(&self, id: WorkOrderId) -> ServiceResult<()> {
    let mut store = self.store()?;
    store
      .orders
      .remove(&id)
      .map(|_| ())
      .ok_or(ServiceError::NotFound(id))
  }

  async fn get(&self, id: WorkOrderId) -> ServiceResult<WorkOrder> {
    let store = self.store()?;
    store.orders.get(&id).cloned().ok_or(ServiceError::NotFound(id))
  }

  async fn list(&self) -> ServiceResult<Vec<WorkOrder>> {
    self.select(|_| true)
  }

  async fn list_by_status(&self, status: &str) -> ServiceResult<Vec<WorkOrder>> {
    self.select(|o| o.status.as_str() == status)
  }

  async fn list_by_worker(&self, worker_name: &str) -> ServiceResult<Vec<WorkOrder>> {
    self.select(|o| o.worker_name == worker_name)
  }

  async fn update(&self, id: WorkOrderId, update: WorkOrderUpdate) -> ServiceResult<()> {
    let mut store = self.store()?;
    let order = store.orders.get_mut(&id).ok_or(ServiceError::NotFound(id))?;
    // id and created_at stay as they were
    order.status = update.status;
    order.notes = update.notes;
    order.customer_name = update.customer_name;
    order.date_of_work = update.date_of_work;
    order.due_date = update.due_date;
    order.worker_name = update.worker_name;
    Ok(())
  }
}
