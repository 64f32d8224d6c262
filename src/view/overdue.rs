use chrono::{Local, NaiveDate};

use crate::service::{Status, WorkOrder};

/// Today's date in the local time zone
pub fn today_local() -> NaiveDate {
  Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// A due date strictly before `today` on an order that is not completed.
///
/// Empty or unparseable due dates are never overdue.
pub fn is_overdue(due_date: &str, status: &Status, today: NaiveDate) -> bool {
  if status.is_completed() {
    return false;
  }
  parse_date(due_date).is_some_and(|due| due < today)
}

pub fn order_is_overdue(order: &WorkOrder, today: NaiveDate) -> bool {
  is_overdue(&order.due_date, &order.status, today)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
  }

  #[test]
  fn test_past_due_is_overdue() {
    let today = date("2025-01-01");
    assert!(is_overdue("2020-01-01", &"Pending".into(), today));
    assert!(is_overdue("2024-12-31", &"In Progress".into(), today));
    assert!(is_overdue("2024-12-31", &"On Hold".into(), today));
  }

  #[test]
  fn test_due_today_or_later_is_not_overdue() {
    let today = date("2025-01-01");
    assert!(!is_overdue("2025-01-01", &"Pending".into(), today));
    assert!(!is_overdue("2025-06-01", &"Pending".into(), today));
  }

  #[test]
  fn test_completed_is_never_overdue() {
    let today = date("2025-01-01");
    for due in ["1999-01-01", "2024-12-31", "2025-01-01", "", "garbage"] {
      assert!(!is_overdue(due, &"Completed".into(), today));
    }
  }

  #[test]
  fn test_missing_or_invalid_due_date_is_not_overdue() {
    let today = date("2025-01-01");
    assert!(!is_overdue("", &"Pending".into(), today));
    assert!(!is_overdue("01/02/2020", &"Pending".into(), today));
    assert!(!is_overdue("2020-13-45", &"Pending".into(), today));
  }
}
