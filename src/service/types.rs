use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the service when a work order is created
pub type WorkOrderId = u64;

/// The three statuses the dashboard knows how to bucket and color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalStatus {
  Pending,
  InProgress,
  Completed,
}

impl CanonicalStatus {
  pub const ALL: [CanonicalStatus; 3] = [
    CanonicalStatus::Pending,
    CanonicalStatus::InProgress,
    CanonicalStatus::Completed,
  ];

  /// Wire spelling of the status
  pub fn as_str(&self) -> &'static str {
    match self {
      CanonicalStatus::Pending => "Pending",
      CanonicalStatus::InProgress => "In Progress",
      CanonicalStatus::Completed => "Completed",
    }
  }

  pub fn from_str_exact(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|c| c.as_str() == s)
  }
}

impl fmt::Display for CanonicalStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Work order status as stored by the service.
///
/// The service does not constrain the value, so anything it returns is kept
/// verbatim. `canonical()` recognizes the three known tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(String);

impl Status {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn canonical(&self) -> Option<CanonicalStatus> {
    CanonicalStatus::from_str_exact(&self.0)
  }

  pub fn is_completed(&self) -> bool {
    self.canonical() == Some(CanonicalStatus::Completed)
  }
}

impl From<CanonicalStatus> for Status {
  fn from(value: CanonicalStatus) -> Self {
    Self(value.as_str().to_string())
  }
}

impl From<&str> for Status {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A work order record as returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
  pub id: WorkOrderId,
  pub customer_name: String,
  pub worker_name: String,
  pub status: Status,
  /// Nanoseconds since the Unix epoch
  pub created_at: i64,
  pub date_of_work: String,
  pub due_date: String,
  pub notes: String,
}

/// Fields required to create a work order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkOrder {
  pub customer_name: String,
  pub date_of_work: String,
  pub due_date: String,
  pub worker_name: String,
}

/// Full overwrite of every mutable field of a work order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderUpdate {
  pub status: Status,
  pub notes: String,
  pub customer_name: String,
  pub date_of_work: String,
  pub due_date: String,
  pub worker_name: String,
}

impl WorkOrderUpdate {
  /// Start an update from the current values of an existing record
  pub fn from_order(order: &WorkOrder) -> Self {
    Self {
      status: order.status.clone(),
      notes: order.notes.clone(),
      customer_name: order.customer_name.clone(),
      date_of_work: order.date_of_work.clone(),
      due_date: order.due_date.clone(),
      worker_name: order.worker_name.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_canonical_status_parsing() {
    assert_eq!(
      Status::from("In Progress").canonical(),
      Some(CanonicalStatus::InProgress)
    );
    assert_eq!(Status::from("in progress").canonical(), None);
    assert_eq!(Status::from("Blocked").canonical(), None);
  }

  #[test]
  fn test_unknown_status_round_trips() {
    let json = r#"{"id":7,"customerName":"Acme","workerName":"Bob","status":"On Hold",
      "createdAt":1700000000000000000,"dateOfWork":"2026-01-01","dueDate":"2026-02-01","notes":""}"#;
    let order: WorkOrder = serde_json::from_str(json).unwrap();
    assert_eq!(order.status.as_str(), "On Hold");

    let back = serde_json::to_value(&order).unwrap();
    assert_eq!(back["status"], "On Hold");
    assert_eq!(back["customerName"], "Acme");
  }

  #[test]
  fn test_update_from_order_copies_all_fields() {
    let order = WorkOrder {
      id: 3,
      customer_name: "Acme".to_string(),
      worker_name: "Bob".to_string(),
      status: CanonicalStatus::Completed.into(),
      created_at: 1,
      date_of_work: "2026-01-01".to_string(),
      due_date: "2026-01-05".to_string(),
      notes: "done".to_string(),
    };
    let update = WorkOrderUpdate::from_order(&order);
    assert_eq!(update.status, order.status);
    assert_eq!(update.notes, "done");
    assert_eq!(update.worker_name, "Bob");
    assert_eq!(update.due_date, "2026-01-05");
  }
}
