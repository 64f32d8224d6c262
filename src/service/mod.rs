//! Work order service contract, its transports and the shared handle.

mod client;
mod error;
mod handle;
mod http;
mod memory;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use client::WorkOrderService;
pub use error::{ServiceError, ServiceResult};
pub use handle::ServiceHandle;
pub use http::HttpService;
pub use memory::InMemoryService;
pub use types::{CanonicalStatus, NewWorkOrder, Status, WorkOrder, WorkOrderId, WorkOrderUpdate};
