use std::sync::Arc;
use tokio::sync::watch;

use super::client::WorkOrderService;
use super::error::{ServiceError, ServiceResult};

type Slot = Option<Arc<dyn WorkOrderService>>;

/// Shared handle to the work order service.
///
/// The service may not exist yet when the cache and the mutations are built,
/// so the handle starts out not ready and is filled in once a connection is
/// established. Every clone observes the same slot.
#[derive(Clone)]
pub struct ServiceHandle {
  slot: Arc<watch::Sender<Slot>>,
}

impl ServiceHandle {
  /// A handle with no service behind it yet
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(None);
    Self { slot: Arc::new(tx) }
  }

  /// A handle that is ready immediately
  #[cfg(test)]
  pub fn ready(service: Arc<dyn WorkOrderService>) -> Self {
    let handle = Self::new();
    handle.establish(service);
    handle
  }

  /// Install the service, making the handle ready for every clone
  pub fn establish(&self, service: Arc<dyn WorkOrderService>) {
    self.slot.send_replace(Some(service));
  }

  pub fn is_ready(&self) -> bool {
    self.slot.borrow().is_some()
  }

  /// Get the service, failing fast when it is not established
  pub fn service(&self) -> ServiceResult<Arc<dyn WorkOrderService>> {
    self.slot.borrow().clone().ok_or(ServiceError::Unavailable)
  }

  /// Wait until a service has been established
  pub async fn wait_ready(&self) -> Arc<dyn WorkOrderService> {
    let mut rx = self.slot.subscribe();
    loop {
      if let Some(service) = rx.borrow_and_update().clone() {
        return service;
      }
      // `self` owns the sender, so the channel stays open while we wait
      let _ = rx.changed().await;
    }
  }
}

impl Default for ServiceHandle {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for ServiceHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ServiceHandle")
      .field("ready", &self.is_ready())
      .finish()
  }
}
