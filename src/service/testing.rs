//! Test double that counts calls and can hold list calls in flight.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use super::client::WorkOrderService;
use super::error::{ServiceError, ServiceResult};
use super::memory::InMemoryService;
use super::types::{NewWorkOrder, WorkOrder, WorkOrderId, WorkOrderUpdate};

#[derive(Default)]
pub struct CountingService {
  inner: InMemoryService,
  calls: Mutex<HashMap<&'static str, usize>>,
  gate: Option<Arc<Semaphore>>,
  next_list_error: Mutex<Option<ServiceError>>,
}

impl CountingService {
  pub fn new() -> Self {
    Self::default()
  }

  /// List calls wait for a permit on the returned semaphore before answering
  pub fn gated() -> (Self, Arc<Semaphore>) {
    let gate = Arc::new(Semaphore::new(0));
    let service = Self {
      gate: Some(Arc::clone(&gate)),
      ..Self::default()
    };
    (service, gate)
  }

  pub fn calls(&self, op: &str) -> usize {
    self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
  }

  pub fn list_calls(&self) -> usize {
    self.calls("list") + self.calls("list_by_status") + self.calls("list_by_worker")
  }

  /// Make the next list call fail with `err`
  pub fn fail_next_list(&self, err: ServiceError) {
    *self.next_list_error.lock().unwrap() = Some(err);
  }

  fn record(&self, op: &'static str) {
    *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
  }

  async fn list_gate(&self) -> ServiceResult<()> {
    if let Some(gate) = &self.gate {
      gate.acquire().await.unwrap().forget();
    }
    match self.next_list_error.lock().unwrap().take() {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }
}

#[async_trait]
impl WorkOrderService for CountingService {
  async fn create(&self, order: NewWorkOrder) -> ServiceResult<WorkOrderId> {
    self.record("create");
    self.inner.create(order).await
  }

  async fn delete(&self, id: WorkOrderId) -> ServiceResult<()> {
    self.record("delete");
    self.inner.delete(id).await
  }

  async fn get(&self, id: WorkOrderId) -> ServiceResult<WorkOrder> {
    self.record("get");
    self.inner.get(id).await
  }

  async fn list(&self) -> ServiceResult<Vec<WorkOrder>> {
    self.record("list");
    self.list_gate().await?;
    self.inner.list().await
  }

  async fn list_by_status(&self, status: &str) -> ServiceResult<Vec<WorkOrder>> {
    self.record("list_by_status");
    self.list_gate().await?;
    self.inner.list_by_status(status).await
  }

  async fn list_by_worker(&self, worker_name: &str) -> ServiceResult<Vec<WorkOrder>> {
    self.record("list_by_worker");
    self.list_gate().await?;
    self.inner.list_by_worker(worker_name).await
  }

  async fn update(&self, id: WorkOrderId, update: WorkOrderUpdate) -> ServiceResult<()> {
    self.record("update");
    self.inner.update(id, update).await
  }
}

pub fn new_order(customer: &str, worker: &str, due: &str) -> NewWorkOrder {
  NewWorkOrder {
    customer_name: customer.to_string(),
    date_of_work: "2026-01-01".to_string(),
    due_date: due.to_string(),
    worker_name: worker.to_string(),
  }
}

/// A stored work order, for tests that work on collections directly
pub fn work_order(id: WorkOrderId, customer: &str, worker: &str, status: &str, due: &str) -> WorkOrder {
  WorkOrder {
    id,
    customer_name: customer.to_string(),
    worker_name: worker.to_string(),
    status: status.into(),
    created_at: 0,
    date_of_work: "2026-01-01".to_string(),
    due_date: due.to_string(),
    notes: String::new(),
  }
}
