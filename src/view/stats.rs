use crate::service::{CanonicalStatus, WorkOrder};

/// Counts over the full, unfiltered collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
  pub total: usize,
  pub pending: usize,
  pub in_progress: usize,
  pub completed: usize,
}

impl Stats {
  /// Orders with a status outside the canonical three only count in `total`
  pub fn from_orders(orders: &[WorkOrder]) -> Self {
    orders.iter().fold(
      Stats {
        total: orders.len(),
        ..Default::default()
      },
      |mut stats, order| {
        match order.status.canonical() {
          Some(CanonicalStatus::Pending) => stats.pending += 1,
          Some(CanonicalStatus::InProgress) => stats.in_progress += 1,
          Some(CanonicalStatus::Completed) => stats.completed += 1,
          None => {}
        }
        stats
      },
    )
  }

  pub fn count(&self, status: CanonicalStatus) -> usize {
    match status {
      CanonicalStatus::Pending => self.pending,
      CanonicalStatus::InProgress => self.in_progress,
      CanonicalStatus::Completed => self.completed,
    }
  }

  /// Orders whose status is not one of the canonical three
  pub fn other(&self) -> usize {
    self.total - self.pending - self.in_progress - self.completed
  }
}
