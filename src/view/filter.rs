use std::collections::BTreeSet;

use crate::service::{Status, WorkOrder};

/// Status half of the dashboard filter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
  /// Match every status
  #[default]
  All,
  /// Match exactly this status (case-sensitive)
  Only(String),
}

impl StatusFilter {
  /// Parse a selector value, where `All` means match-all
  pub fn parse(value: &str) -> Self {
    match value {
      "All" => StatusFilter::All,
      other => StatusFilter::Only(other.to_string()),
    }
  }

  pub fn matches(&self, status: &Status) -> bool {
    match self {
      StatusFilter::All => true,
      StatusFilter::Only(value) => status.as_str() == value,
    }
  }

  pub fn label(&self) -> &str {
    match self {
      StatusFilter::All => "All",
      StatusFilter::Only(value) => value,
    }
  }
}

/// Filter state driven by the dashboard controls
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
  pub status: StatusFilter,
  /// Exact worker name, empty for all workers
  pub worker: String,
  /// Free-text search over customer and worker names
  pub search: String,
}

impl FilterState {
  /// Whether a work order passes every active filter
  pub fn matches(&self, order: &WorkOrder) -> bool {
    if !self.status.matches(&order.status) {
      return false;
    }
    if !self.worker.is_empty() && order.worker_name != self.worker {
      return false;
    }
    if self.search.is_empty() {
      return true;
    }

    let query = self.search.to_lowercase();
    order.customer_name.to_lowercase().contains(&query)
      || order.worker_name.to_lowercase().contains(&query)
  }

  /// Orders passing the filter, in collection order
  pub fn filter<'a>(&self, orders: &'a [WorkOrder]) -> Vec<&'a WorkOrder> {
    orders.iter().filter(|order| self.matches(order)).collect()
  }

  pub fn has_filters(&self) -> bool {
    self.status != StatusFilter::All || !self.worker.is_empty() || !self.search.is_empty()
  }

  pub fn clear(&mut self) {
    *self = Self::default();
  }
}

/// Distinct worker names, sorted ascending
pub fn worker_names(orders: &[WorkOrder]) -> Vec<String> {
  let names: BTreeSet<&str> = orders.iter().map(|o| o.worker_name.as_str()).collect();
  names.into_iter().map(str::to_string).collect()
}
