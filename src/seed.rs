//! Demo data used to populate an empty service.

use crate::service::{CanonicalStatus, NewWorkOrder, WorkOrderUpdate};

#[derive(Debug, Clone, Copy)]
pub struct SeedOrder {
  pub customer_name: &'static str,
  pub date_of_work: &'static str,
  pub due_date: &'static str,
  pub worker_name: &'static str,
}

impl SeedOrder {
  pub fn to_new(&self) -> NewWorkOrder {
    NewWorkOrder {
      customer_name: self.customer_name.to_string(),
      date_of_work: self.date_of_work.to_string(),
      due_date: self.due_date.to_string(),
      worker_name: self.worker_name.to_string(),
    }
  }
}

/// Follow-up edit applied to one of the seeded orders
#[derive(Debug, Clone, Copy)]
pub struct SeedUpdate {
  /// Index into [`SEED_ORDERS`]
  pub order: usize,
  pub status: CanonicalStatus,
  pub notes: &'static str,
}

impl SeedUpdate {
  pub fn to_update(&self, order: &SeedOrder) -> WorkOrderUpdate {
    WorkOrderUpdate {
      status: self.status.into(),
      notes: self.notes.to_string(),
      customer_name: order.customer_name.to_string(),
      date_of_work: order.date_of_work.to_string(),
      due_date: order.due_date.to_string(),
      worker_name: order.worker_name.to_string(),
    }
  }
}

pub const SEED_ORDERS: &[SeedOrder] = &[
  SeedOrder {
    customer_name: "Hartfield Construction Co.",
    date_of_work: "2026-02-20",
    due_date: "2026-03-15",
    worker_name: "Marcus Rivera",
  },
  SeedOrder {
    customer_name: "Lakewood Development Group",
    date_of_work: "2026-02-24",
    due_date: "2026-03-10",
    worker_name: "Sarah Chen",
  },
  SeedOrder {
    customer_name: "Summit Ridge Builders",
    date_of_work: "2026-02-18",
    due_date: "2026-02-28",
    worker_name: "Jake Morrison",
  },
  SeedOrder {
    customer_name: "Pinecrest Renovation LLC",
    date_of_work: "2026-03-01",
    due_date: "2026-03-30",
    worker_name: "Marcus Rivera",
  },
  SeedOrder {
    customer_name: "Broadstone Commercial Realty",
    date_of_work: "2026-02-10",
    due_date: "2026-02-25",
    worker_name: "Lisa Tran",
  },
];

pub const SEED_UPDATES: &[SeedUpdate] = &[
  SeedUpdate {
    order: 0,
    status: CanonicalStatus::InProgress,
    notes: "Foundation work 60% complete. Concrete pour scheduled for next week.",
  },
  SeedUpdate {
    order: 2,
    status: CanonicalStatus::Completed,
    notes: "All framing and drywall work completed ahead of schedule. Final inspection passed.",
  },
  SeedUpdate {
    order: 4,
    status: CanonicalStatus::Completed,
    notes: "Commercial fit-out finished. Client sign-off received on 2/24.",
  },
];
