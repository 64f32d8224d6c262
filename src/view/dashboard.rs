use chrono::NaiveDate;
use std::sync::Arc;

use super::filter::{worker_names, FilterState};
use super::overdue::order_is_overdue;
use super::stats::Stats;
use crate::cache::Collection;
use crate::service::WorkOrder;

/// Everything the dashboard shows for one collection and filter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Derived {
  /// Orders passing the filter, in collection order
  pub visible: Vec<WorkOrder>,
  pub workers: Vec<String>,
  /// Counts over the unfiltered collection
  pub stats: Stats,
}

impl Derived {
  pub fn overdue_count(&self, today: NaiveDate) -> usize {
    self
      .visible
      .iter()
      .filter(|o| order_is_overdue(o, today))
      .count()
  }
}

struct Memo {
  collection: Option<Collection>,
  filter: FilterState,
  derived: Arc<Derived>,
}

/// Memoized derivation of the dashboard from the cached collection.
///
/// Outputs are reused while the collection and the filter are unchanged. A
/// new collection snapshot with equal contents counts as unchanged.
#[derive(Default)]
pub struct DashboardView {
  memo: Option<Memo>,
  computations: usize,
}

impl DashboardView {
  pub fn new() -> Self {
    Self::default()
  }

  /// Derive the dashboard; `None` means the collection has not loaded yet
  pub fn derive(&mut self, collection: Option<&Collection>, filter: &FilterState) -> Arc<Derived> {
    if let Some(memo) = &mut self.memo {
      if same_collection(memo.collection.as_ref(), collection) {
        // Keep the newest snapshot so the next identity check is cheap
        memo.collection = collection.cloned();
        if memo.filter == *filter {
          return Arc::clone(&memo.derived);
        }

        let derived = Arc::new(Derived {
          visible: visible(collection, filter),
          workers: memo.derived.workers.clone(),
          stats: memo.derived.stats,
        });
        self.computations += 1;
        memo.filter = filter.clone();
        memo.derived = Arc::clone(&derived);
        return derived;
      }
    }

    let orders = collection.map(|c| c.as_slice()).unwrap_or_default();
    let derived = Arc::new(Derived {
      visible: visible(collection, filter),
      workers: worker_names(orders),
      stats: Stats::from_orders(orders),
    });
    self.computations += 1;
    self.memo = Some(Memo {
      collection: collection.cloned(),
      filter: filter.clone(),
      derived: Arc::clone(&derived),
    });
    derived
  }

  /// How many times outputs were recomputed rather than reused
  pub fn computations(&self) -> usize {
    self.computations
  }
}

fn same_collection(previous: Option<&Collection>, current: Option<&Collection>) -> bool {
  match (previous, current) {
    (None, None) => true,
    (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
    _ => false,
  }
}

fn visible(collection: Option<&Collection>, filter: &FilterState) -> Vec<WorkOrder> {
  collection
    .map(|orders| filter.filter(orders).into_iter().cloned().collect())
    .unwrap_or_default()
}
