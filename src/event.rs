use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Which mutation changed the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  Create,
  Update,
  Delete,
  Seed,
}

impl MutationKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      MutationKind::Create => "create",
      MutationKind::Update => "update",
      MutationKind::Delete => "delete",
      MutationKind::Seed => "seed",
    }
  }
}

impl fmt::Display for MutationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Application events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// A mutation succeeded and the service's collection is no longer what
  /// was last fetched
  CollectionChanged { cause: MutationKind },
}

/// Receives events published on an [`EventBus`]
pub trait Subscriber: Send + Sync {
  fn on_event(&self, event: &Event);
}

/// Synchronous fan-out of events to subscribers.
///
/// `publish` returns only after every subscriber has seen the event, so a
/// publisher can rely on its effects being in place.
#[derive(Clone, Default)]
pub struct EventBus {
  subscribers: Arc<RwLock<Vec<Arc<dyn Subscriber>>>>,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
    let mut subscribers = self
      .subscribers
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    subscribers.push(subscriber);
  }

  pub fn publish(&self, event: Event) {
    // Clone the list so subscribers may publish or subscribe themselves
    let subscribers = self
      .subscribers
      .read()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .clone();

    debug!(?event, subscribers = subscribers.len(), "publishing event");
    for subscriber in subscribers {
      subscriber.on_event(&event);
    }
  }
}

impl fmt::Debug for EventBus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let count = self.subscribers.read().map(|s| s.len()).unwrap_or(0);
    f.debug_struct("EventBus")
      .field("subscribers", &count)
      .finish()
  }
}
