//! Point-in-time view of a cache entry.

use chrono::{DateTime, Utc};

use crate::service::ServiceError;

/// Coarse state of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// No data and no error yet
  Pending,
  /// Data is available and the last fetch succeeded
  Success,
  /// The last fetch failed; earlier data may still be present
  Error,
}

/// Snapshot of a cache entry at the time it was read.
///
/// Data and error can coexist: a failed refetch keeps the data from the last
/// successful one.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
  pub data: Option<T>,
  pub error: Option<ServiceError>,
  /// A fetch for this key is in flight
  pub fetching: bool,
  /// The data no longer reflects the service and will be refetched
  pub invalidated: bool,
  /// When the data was last fetched successfully
  pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QuerySnapshot<T> {
  pub fn status(&self) -> QueryStatus {
    if self.error.is_some() {
      QueryStatus::Error
    } else if self.data.is_some() {
      QueryStatus::Success
    } else {
      QueryStatus::Pending
    }
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&ServiceError> {
    self.error.as_ref()
  }

  /// First load in progress
  pub fn is_loading(&self) -> bool {
    self.fetching && self.data.is_none()
  }

  #[cfg(test)]
  pub fn is_success(&self) -> bool {
    self.status() == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status() == QueryStatus::Error
  }
}

impl<T> Default for QuerySnapshot<T> {
  fn default() -> Self {
    Self {
      data: None,
      error: None,
      fetching: false,
      invalidated: false,
      updated_at: None,
    }
  }
}
