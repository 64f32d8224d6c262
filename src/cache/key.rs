use std::fmt;

const ROOT: &str = "workOrders";

/// Query shapes tracked by the cache.
///
/// Keys are hierarchical: `All` is the root of the work order family and the
/// filtered keys live under it, so invalidating `All` reaches every key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
  /// The full, unfiltered collection
  All,
  /// Server-side filter on exact status
  ByStatus(String),
  /// Server-side filter on exact worker name
  ByWorker(String),
}

impl QueryKey {
  pub fn segments(&self) -> Vec<&str> {
    match self {
      Self::All => vec![ROOT],
      Self::ByStatus(status) => vec![ROOT, "status", status],
      Self::ByWorker(worker) => vec![ROOT, "worker", worker],
    }
  }

  /// Whether this key equals `prefix` or lives underneath it
  pub fn is_under(&self, prefix: &QueryKey) -> bool {
    self.segments().starts_with(&prefix.segments())
  }

  /// Filtered keys with an empty value never fetch
  pub fn is_enabled(&self) -> bool {
    match self {
      Self::All => true,
      Self::ByStatus(value) | Self::ByWorker(value) => !value.is_empty(),
    }
  }

  pub fn description(&self) -> String {
    match self {
      Self::All => "all work orders".to_string(),
      Self::ByStatus(status) => format!("work orders with status '{}'", status),
      Self::ByWorker(worker) => format!("work orders for worker '{}'", worker),
    }
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.segments().join("/"))
  }
}
