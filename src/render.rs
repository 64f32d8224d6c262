//! Text rendering for the shell.

use chrono::{DateTime, Local, NaiveDate};
use crossterm::style::{Color, Stylize};
use std::fmt::{self, Write};

use crate::cache::{Collection, QueryKey, QuerySnapshot, QueryStatus};
use crate::mutation::{Mutation, MutationState};
use crate::service::{CanonicalStatus, Status, WorkOrder};
use crate::view::{order_is_overdue, parse_date, Derived, FilterState, Stats};

const DATE_FORMAT: &str = "%b %-d, %Y";

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a work order status; unknown statuses look pending
pub fn status_color(status: &Status) -> Color {
  match status.canonical() {
    Some(CanonicalStatus::Completed) => Color::Green,
    Some(CanonicalStatus::InProgress) => Color::Blue,
    Some(CanonicalStatus::Pending) | None => Color::Yellow,
  }
}

/// Format a creation timestamp given in nanoseconds or milliseconds
pub fn format_timestamp(nanos_or_ms: i64) -> String {
  let ms = if nanos_or_ms > 10_000_000_000_000 {
    nanos_or_ms / 1_000_000
  } else {
    nanos_or_ms
  };
  match DateTime::from_timestamp_millis(ms) {
    Some(utc) => utc.with_timezone(&Local).format(DATE_FORMAT).to_string(),
    None => nanos_or_ms.to_string(),
  }
}

/// Format a `YYYY-MM-DD` date; empty becomes a dash, anything else that
/// does not parse is shown as is
pub fn format_date_str(value: &str) -> String {
  if value.is_empty() {
    return "—".to_string();
  }
  match parse_date(value) {
    Some(date) => date.format(DATE_FORMAT).to_string(),
    None => value.to_string(),
  }
}

/// One line per order for the list view
pub fn order_row(order: &WorkOrder, today: NaiveDate) -> String {
  let status = format!("{:<12}", truncate(order.status.as_str(), 12));
  let due = format_date_str(&order.due_date);
  let due = if order_is_overdue(order, today) {
    format!("{} {}", due, "OVERDUE".red().bold())
  } else {
    due
  };

  format!(
    "{:>4}  {}  {:<28}  {:<18}  {}",
    order.id,
    status.with(status_color(&order.status)),
    truncate(&order.customer_name, 28),
    truncate(&order.worker_name, 18),
    due
  )
}

pub fn order_detail(order: &WorkOrder, today: NaiveDate) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{}", format!("Work order #{}", order.id).bold());
  let _ = writeln!(out, "  Customer:     {}", order.customer_name);
  let _ = writeln!(out, "  Worker:       {}", order.worker_name);
  let _ = writeln!(
    out,
    "  Status:       {}",
    order.status.as_str().with(status_color(&order.status))
  );
  let _ = writeln!(out, "  Date of work: {}", format_date_str(&order.date_of_work));
  let overdue = if order_is_overdue(order, today) {
    format!(" {}", "OVERDUE".red().bold())
  } else {
    String::new()
  };
  let _ = writeln!(
    out,
    "  Due:          {}{}",
    format_date_str(&order.due_date),
    overdue
  );
  let _ = writeln!(out, "  Created:      {}", format_timestamp(order.created_at));
  if !order.notes.is_empty() {
    let _ = writeln!(out, "  Notes:        {}", order.notes);
  }
  out
}

pub fn stats_line(stats: &Stats) -> String {
  let mut line = format!("Total {}", stats.total.to_string().bold());
  for status in CanonicalStatus::ALL {
    let _ = write!(
      line,
      "  {} {}",
      status.as_str().with(status_color(&status.into())),
      stats.count(status)
    );
  }
  if stats.other() > 0 {
    let _ = write!(line, "  Other {}", stats.other());
  }
  line
}

/// Name and state of a mutation, e.g. `create  success 4`
pub fn mutation_line<I, O>(mutation: &Mutation<I, O>) -> String
where
  I: Send + 'static,
  O: Clone + Send + fmt::Debug + 'static,
{
  let state = match mutation.state() {
    MutationState::Idle => "idle".dark_grey().to_string(),
    MutationState::Pending => "pending".yellow().to_string(),
    MutationState::Success(output) => format!("{} {:?}", "success".green(), output),
    MutationState::Error(e) => format!("{} {}", "error".red(), e),
  };
  format!("{:<8} {}", mutation.name(), state)
}

pub fn filter_line(filter: &FilterState) -> String {
  if !filter.has_filters() {
    return "No filters".dark_grey().to_string();
  }
  let worker = if filter.worker.is_empty() {
    "all"
  } else {
    &filter.worker
  };
  format!(
    "Status: {}  Worker: {}  Search: {:?}",
    filter.status.label(),
    worker,
    filter.search
  )
}

/// The dashboard list, or the loading, error and empty states
pub fn dashboard(
  snapshot: &QuerySnapshot<Collection>,
  derived: &Derived,
  filter: &FilterState,
  today: NaiveDate,
) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{}", stats_line(&derived.stats));
  let _ = writeln!(out, "{}", filter_line(filter));

  match snapshot.status() {
    QueryStatus::Pending => {
      let label = if snapshot.is_loading() {
        "Loading work orders..."
      } else {
        "Waiting for the service..."
      };
      let _ = writeln!(out, "{}", label.dark_grey());
      return out;
    }
    QueryStatus::Error => {
      if let Some(e) = snapshot.error() {
        let _ = writeln!(out, "{} {}", "Failed to load work orders:".red(), e);
      }
      if snapshot.data.is_none() {
        return out;
      }
    }
    QueryStatus::Success => {}
  }

  if derived.visible.is_empty() {
    let message = if filter.has_filters() {
      "No work orders match your filters"
    } else {
      "No work orders yet"
    };
    let _ = writeln!(out, "{}", message.dark_grey());
    return out;
  }

  for order in &derived.visible {
    let _ = writeln!(out, "{}", order_row(order, today));
  }
  let overdue = derived.overdue_count(today);
  if overdue > 0 {
    let _ = writeln!(out, "{}", format!("{} overdue", overdue).red());
  }
  out
}

/// A filtered list fetched from the service
pub fn remote_list(
  key: &QueryKey,
  snapshot: &QuerySnapshot<Collection>,
  today: NaiveDate,
) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{}", key.description().bold());
  if let Some(e) = snapshot.error() {
    let _ = writeln!(out, "{} {}", "Error:".red(), e);
  }
  match snapshot.data() {
    Some(orders) if orders.is_empty() => {
      let _ = writeln!(out, "{}", "No work orders".dark_grey());
    }
    Some(orders) => {
      for order in orders.iter() {
        let _ = writeln!(out, "{}", order_row(order, today));
      }
    }
    None => {}
  }
  out
}

/// One line per cache entry
pub fn cache_table(entries: &[(QueryKey, QuerySnapshot<Collection>)]) -> String {
  if entries.is_empty() {
    return "Cache is empty\n".to_string();
  }
  let mut out = String::new();
  for (key, snapshot) in entries {
    let count = snapshot
      .data()
      .map(|d| d.len().to_string())
      .unwrap_or_else(|| "-".to_string());
    let updated = snapshot
      .updated_at
      .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
      .unwrap_or_else(|| "never".to_string());

    let mut flags = Vec::new();
    if snapshot.fetching {
      flags.push("fetching");
    }
    if snapshot.invalidated {
      flags.push("invalidated");
    }
    if snapshot.is_error() {
      flags.push("error");
    }
    let _ = writeln!(
      out,
      "{:<32} {:>5} orders  updated {}  {}",
      key.to_string(),
      count,
      updated,
      flags.join(",")
    );
  }
  out
}
