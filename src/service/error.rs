use super::types::WorkOrderId;

/// Failure of a call against the work order service.
///
/// Errors are passed through to callers untouched. `Clone` lets a single
/// fetch outcome be handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
  /// The service handle has not been established yet
  #[error("work order service is not available")]
  Unavailable,
  /// The identifier does not resolve to a work order
  #[error("work order {0} not found")]
  NotFound(WorkOrderId),
  /// Any other failure reported by the service or the transport
  #[error("{0}")]
  Remote(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
