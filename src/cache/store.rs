//! Query cache that keeps the last fetched work order collections.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{debug, warn};

use super::key::QueryKey;
use super::snapshot::QuerySnapshot;
use crate::event::{Event, Subscriber};
use crate::service::{ServiceError, ServiceHandle, ServiceResult, WorkOrder, WorkOrderService};

/// Immutable snapshot of a fetched collection, shared by every reader
pub type Collection = Arc<Vec<WorkOrder>>;

type FetchOutcome = ServiceResult<Collection>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct InFlight {
  outcome: SharedFetch,
}

#[derive(Default)]
struct Entry {
  data: Option<Collection>,
  error: Option<ServiceError>,
  updated_at: Option<DateTime<Utc>>,
  /// Bumped on every invalidation
  generation: u64,
  invalidated: bool,
  /// Generation whose fetch failed; `read` leaves the entry alone until the
  /// generation moves on
  failed_generation: Option<u64>,
  in_flight: Option<InFlight>,
}

impl Entry {
  fn is_expired(&self, stale_after: Option<Duration>) -> bool {
    match (stale_after, self.updated_at) {
      (Some(stale_after), Some(updated_at)) => Utc::now() - updated_at >= stale_after,
      _ => false,
    }
  }

  fn needs_fetch(&self, stale_after: Option<Duration>) -> bool {
    self.data.is_none() || self.invalidated || self.is_expired(stale_after)
  }

  fn failed_at_current_generation(&self) -> bool {
    self.failed_generation == Some(self.generation)
  }

  fn snapshot(&self) -> QuerySnapshot<Collection> {
    QuerySnapshot {
      data: self.data.clone(),
      error: self.error.clone(),
      fetching: self.in_flight.is_some(),
      invalidated: self.invalidated,
      updated_at: self.updated_at,
    }
  }
}

struct CacheInner {
  handle: ServiceHandle,
  entries: Mutex<HashMap<QueryKey, Entry>>,
  stale_after: Option<Duration>,
}

/// Cache of work order collections, one entry per [`QueryKey`].
///
/// - `read` never waits: it returns whatever the entry holds and starts a
///   background fetch when the entry needs one.
/// - `fetch` waits for valid data, joining a fetch that is already in flight.
/// - At most one fetch per key is in flight at a time.
/// - An invalidation that lands while a fetch is in flight leaves the entry
///   invalid once that fetch completes, so the next read fetches again.
///
/// The entry lock is never held across an await.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<CacheInner>,
}

impl QueryCache {
  /// Create a cache over `handle`.
  ///
  /// With `stale_after` set, entries older than that are refetched on the
  /// next read even without an invalidation.
  pub fn new(handle: ServiceHandle, stale_after: Option<Duration>) -> Self {
    Self {
      inner: Arc::new(CacheInner {
        handle,
        entries: Mutex::new(HashMap::new()),
        stale_after,
      }),
    }
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
    self
      .inner
      .entries
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Current state of `key`, starting a background fetch if it needs one.
  ///
  /// Stale data is returned as is while the refresh runs. A fetch is only
  /// started when the service is ready, the key is enabled, nothing is in
  /// flight and the entry has not already failed for its current generation.
  pub fn read(&self, key: &QueryKey) -> QuerySnapshot<Collection> {
    let mut entries = self.entries();
    let entry = entries.entry(key.clone()).or_default();

    let wants_fetch = entry.in_flight.is_none()
      && !entry.failed_at_current_generation()
      && entry.needs_fetch(self.inner.stale_after)
      && key.is_enabled();

    if wants_fetch {
      match self.inner.handle.service() {
        Ok(service) => {
          let _ = self.start_fetch(key, entry, service);
        }
        Err(_) => debug!(key = %key, "service not ready, skipping fetch"),
      }
    }

    entry.snapshot()
  }

  /// Valid data for `key`, fetching it if needed.
  ///
  /// Joins a fetch already in flight instead of issuing another call. If the
  /// key is invalidated while the joined fetch runs, one more fetch is made
  /// before returning. Unlike `read`, this retries an entry whose last fetch
  /// failed. A disabled key never reaches the service and yields whatever it
  /// holds, or an empty collection.
  pub async fn fetch(&self, key: &QueryKey) -> ServiceResult<Collection> {
    if !key.is_enabled() {
      debug!(key = %key, "key disabled, not fetching");
      let mut entries = self.entries();
      let entry = entries.entry(key.clone()).or_default();
      return Ok(entry.data.clone().unwrap_or_default());
    }

    loop {
      let outcome = {
        let mut entries = self.entries();
        let entry = entries.entry(key.clone()).or_default();

        match entry.in_flight.as_ref().map(|f| f.outcome.clone()) {
          Some(outcome) => {
            debug!(key = %key, "joining in-flight fetch");
            outcome
          }
          None => {
            if !entry.needs_fetch(self.inner.stale_after) {
              if let Some(data) = &entry.data {
                return Ok(Arc::clone(data));
              }
            }
            let service = self.inner.handle.service()?;
            self.start_fetch(key, entry, service)
          }
        }
      };

      let data = outcome.await?;
      if !self.is_invalidated(key) {
        return Ok(data);
      }
      debug!(key = %key, "invalidated while in flight, fetching again");
    }
  }

  /// Invalidate `key` and wait for fresh data
  pub async fn refetch(&self, key: &QueryKey) -> ServiceResult<Collection> {
    self.invalidate(key);
    self.fetch(key).await
  }

  /// Mark `prefix` and every key under it invalid.
  ///
  /// Returns the number of entries touched. Data stays readable until the
  /// refetch replaces it.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.entries();
    let mut touched = 0;

    for (_, entry) in entries.iter_mut().filter(|(key, _)| key.is_under(prefix)) {
      entry.generation += 1;
      entry.invalidated = true;
      touched += 1;
    }

    debug!(prefix = %prefix, touched, "invalidated cache entries");
    touched
  }

  /// Snapshots of every tracked key, ordered by key
  pub fn snapshots(&self) -> Vec<(QueryKey, QuerySnapshot<Collection>)> {
    let entries = self.entries();
    let mut result: Vec<_> = entries
      .iter()
      .map(|(key, entry)| (key.clone(), entry.snapshot()))
      .collect();
    result.sort_by(|a, b| a.0.cmp(&b.0));
    result
  }

  fn is_invalidated(&self, key: &QueryKey) -> bool {
    self
      .entries()
      .get(key)
      .map(|entry| entry.invalidated)
      .unwrap_or(false)
  }

  /// Start a fetch for `key` and record it as the entry's in-flight fetch.
  ///
  /// The fetch is spawned so it runs to completion even if nobody awaits it.
  fn start_fetch(
    &self,
    key: &QueryKey,
    entry: &mut Entry,
    service: Arc<dyn WorkOrderService>,
  ) -> SharedFetch {
    let generation = entry.generation;
    let cache: Weak<CacheInner> = Arc::downgrade(&self.inner);
    let key = key.clone();

    let outcome = async move {
      debug!(key = %key, generation, "fetching");
      let result = fetch_key(service.as_ref(), &key).await.map(Arc::new);
      if let Some(inner) = cache.upgrade() {
        QueryCache { inner }.complete(&key, generation, &result);
      }
      result
    }
    .boxed()
    .shared();

    entry.in_flight = Some(InFlight {
      outcome: outcome.clone(),
    });
    tokio::spawn(outcome.clone());
    outcome
  }

  fn complete(&self, key: &QueryKey, generation: u64, result: &FetchOutcome) {
    let mut entries = self.entries();
    let entry = entries.entry(key.clone()).or_default();
    entry.in_flight = None;

    match result {
      Ok(data) => {
        entry.data = Some(Arc::clone(data));
        entry.error = None;
        entry.failed_generation = None;
        entry.updated_at = Some(Utc::now());
        entry.invalidated = entry.generation != generation;
        debug!(
          key = %key,
          count = data.len(),
          still_invalid = entry.invalidated,
          "fetch complete"
        );
      }
      Err(e) => {
        warn!(key = %key, error = %e, "fetch failed");
        entry.error = Some(e.clone());
        entry.failed_generation = Some(generation);
      }
    }
  }
}

async fn fetch_key(service: &dyn WorkOrderService, key: &QueryKey) -> ServiceResult<Vec<WorkOrder>> {
  match key {
    QueryKey::All => service.list().await,
    QueryKey::ByStatus(status) => service.list_by_status(status).await,
    QueryKey::ByWorker(worker) => service.list_by_worker(worker).await,
  }
}

impl Subscriber for QueryCache {
  fn on_event(&self, event: &Event) {
    match event {
      Event::CollectionChanged { cause } => {
        let touched = self.invalidate(&QueryKey::All);
        debug!(%cause, touched, "collection changed");
      }
    }
  }
}

impl std::fmt::Debug for QueryCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCache")
      .field("handle", &self.inner.handle)
      .field("stale_after", &self.inner.stale_after)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::QueryStatus;
  use crate::event::MutationKind;
  use crate::service::testing::{new_order, CountingService};
  use std::time::Duration as StdDuration;

  fn ready_cache(service: Arc<CountingService>) -> QueryCache {
    QueryCache::new(ServiceHandle::ready(service), None)
  }

  /// Wait until nothing is in flight for `key`
  async fn settle(cache: &QueryCache, key: &QueryKey) -> QuerySnapshot<Collection> {
    for _ in 0..200 {
      let snapshot = cache
        .snapshots()
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, s)| s)
        .unwrap_or_default();
      if !snapshot.fetching {
        return snapshot;
      }
      tokio::time::sleep(StdDuration::from_millis(5)).await;
    }
    panic!("fetch for {} never settled", key);
  }

  #[tokio::test]
  async fn test_read_without_service_does_not_fetch() {
    let handle = ServiceHandle::new();
    let cache = QueryCache::new(handle.clone(), None);

    let snapshot = cache.read(&QueryKey::All);
    assert_eq!(snapshot.status(), QueryStatus::Pending);
    assert!(!snapshot.fetching);

    assert!(matches!(
      cache.fetch(&QueryKey::All).await,
      Err(ServiceError::Unavailable)
    ));

    let service = Arc::new(CountingService::new());
    handle.establish(service.clone());
    assert!(cache.read(&QueryKey::All).fetching);
    settle(&cache, &QueryKey::All).await;
    assert_eq!(service.calls("list"), 1);
  }

  #[tokio::test]
  async fn test_concurrent_requests_share_one_fetch() {
    let (service, gate) = CountingService::gated();
    let service = Arc::new(service);
    service.create(new_order("Acme", "Bob", "2026-01-01")).await.unwrap();
    let cache = ready_cache(service.clone());

    assert!(cache.read(&QueryKey::All).is_loading());
    assert!(cache.read(&QueryKey::All).is_loading());

    let first = tokio::spawn({
      let cache = cache.clone();
      async move { cache.fetch(&QueryKey::All).await }
    });
    let second = tokio::spawn({
      let cache = cache.clone();
      async move { cache.fetch(&QueryKey::All).await }
    });
    tokio::time::sleep(StdDuration::from_millis(20)).await;
    assert_eq!(service.calls("list"), 1);

    gate.add_permits(1);
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), 1);
    assert_eq!(service.calls("list"), 1);
  }

  #[tokio::test]
  async fn test_fresh_data_is_served_without_network() {
    let service = Arc::new(CountingService::new());
    let cache = ready_cache(service.clone());

    cache.fetch(&QueryKey::All).await.unwrap();
    cache.fetch(&QueryKey::All).await.unwrap();
    let snapshot = cache.read(&QueryKey::All);

    assert!(snapshot.is_success());
    assert!(!snapshot.fetching);
    assert_eq!(service.calls("list"), 1);
  }

  #[tokio::test]
  async fn test_stale_read_returns_old_data_and_refreshes() {
    let service = Arc::new(CountingService::new());
    let cache = ready_cache(service.clone());
    cache.fetch(&QueryKey::All).await.unwrap();

    service.create(new_order("Acme", "Bob", "2026-01-01")).await.unwrap();
    cache.invalidate(&QueryKey::All);

    let snapshot = cache.read(&QueryKey::All);
    assert!(snapshot.invalidated);
    assert!(snapshot.fetching);
    assert_eq!(snapshot.data().map(|d| d.len()), Some(0));

    let settled = settle(&cache, &QueryKey::All).await;
    assert!(!settled.invalidated);
    assert_eq!(settled.data().map(|d| d.len()), Some(1));
    assert_eq!(service.calls("list"), 2);
  }

  #[tokio::test]
  async fn test_invalidation_during_fetch_forces_refetch() {
    let (service, gate) = CountingService::gated();
    let service = Arc::new(service);
    let cache = ready_cache(service.clone());

    assert!(cache.read(&QueryKey::All).fetching);
    cache.invalidate(&QueryKey::All);
    gate.add_permits(1);

    let snapshot = settle(&cache, &QueryKey::All).await;
    assert!(snapshot.data.is_some());
    assert!(snapshot.invalidated);

    assert!(cache.read(&QueryKey::All).fetching);
    gate.add_permits(1);
    let snapshot = settle(&cache, &QueryKey::All).await;
    assert!(!snapshot.invalidated);
    assert_eq!(service.calls("list"), 2);
  }

  #[tokio::test]
  async fn test_fetch_follows_up_after_invalidation_in_flight() {
    let (service, gate) = CountingService::gated();
    let service = Arc::new(service);
    let cache = ready_cache(service.clone());

    let task = tokio::spawn({
      let cache = cache.clone();
      async move { cache.fetch(&QueryKey::All).await }
    });
    tokio::time::sleep(StdDuration::from_millis(10)).await;
    cache.invalidate(&QueryKey::All);
    gate.add_permits(2);

    task.await.unwrap().unwrap();
    assert_eq!(service.calls("list"), 2);
    assert!(!cache.read(&QueryKey::All).invalidated);
  }

  #[tokio::test]
  async fn test_invalidating_root_reaches_filtered_keys() {
    let service = Arc::new(CountingService::new());
    let cache = ready_cache(service.clone());
    let pending = QueryKey::ByStatus("Pending".to_string());
    let bob = QueryKey::ByWorker("Bob".to_string());

    cache.fetch(&QueryKey::All).await.unwrap();
    cache.fetch(&pending).await.unwrap();
    cache.fetch(&bob).await.unwrap();

    assert_eq!(cache.invalidate(&pending), 1);
    assert_eq!(cache.invalidate(&QueryKey::All), 3);
    for (_, snapshot) in cache.snapshots() {
      assert!(snapshot.invalidated);
    }
  }

  #[tokio::test]
  async fn test_filtered_keys_are_independent_entries() {
    let service = Arc::new(CountingService::new());
    service.create(new_order("Acme", "Bob", "2026-01-01")).await.unwrap();
    service.create(new_order("Globex", "Ann", "2026-01-01")).await.unwrap();
    let cache = ready_cache(service.clone());

    let all = cache.fetch(&QueryKey::All).await.unwrap();
    let bob = cache.fetch(&QueryKey::ByWorker("Bob".to_string())).await.unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(bob.len(), 1);
    assert_eq!(service.calls("list"), 1);
    assert_eq!(service.calls("list_by_worker"), 1);
  }

  #[tokio::test]
  async fn test_empty_filter_value_never_fetches() {
    let service = Arc::new(CountingService::new());
    let cache = ready_cache(service.clone());

    let snapshot = cache.read(&QueryKey::ByStatus(String::new()));
    assert!(!snapshot.fetching);
    assert_eq!(service.list_calls(), 0);
  }

  #[tokio::test]
  async fn test_fetch_on_empty_filter_value_skips_service() {
    let service = Arc::new(CountingService::new());
    service.create(new_order("Acme", "Bob", "2026-02-01")).await.unwrap();
    let cache = ready_cache(service.clone());

    let by_status = cache.fetch(&QueryKey::ByStatus(String::new())).await.unwrap();
    let by_worker = cache.fetch(&QueryKey::ByWorker(String::new())).await.unwrap();
    assert!(by_status.is_empty());
    assert!(by_worker.is_empty());
    assert_eq!(service.calls("list_by_status"), 0);
    assert_eq!(service.calls("list_by_worker"), 0);
  }

  #[tokio::test]
  async fn test_failed_fetch_is_terminal_for_reads() {
    let service = Arc::new(CountingService::new());
    service.fail_next_list(ServiceError::Remote("down".to_string()));
    let cache = ready_cache(service.clone());

    assert_eq!(
      cache.fetch(&QueryKey::All).await,
      Err(ServiceError::Remote("down".to_string()))
    );

    let snapshot = cache.read(&QueryKey::All);
    assert!(snapshot.is_error());
    assert!(!snapshot.fetching);
    assert_eq!(service.calls("list"), 1);

    // An explicit fetch is the caller retrying
    assert!(cache.fetch(&QueryKey::All).await.is_ok());
    assert!(cache.read(&QueryKey::All).is_success());
    assert_eq!(service.calls("list"), 2);
  }

  #[tokio::test]
  async fn test_failed_refetch_keeps_old_data() {
    let service = Arc::new(CountingService::new());
    service.create(new_order("Acme", "Bob", "2026-01-01")).await.unwrap();
    let cache = ready_cache(service.clone());
    cache.fetch(&QueryKey::All).await.unwrap();

    service.fail_next_list(ServiceError::Remote("down".to_string()));
    assert!(cache.refetch(&QueryKey::All).await.is_err());

    let snapshot = cache.read(&QueryKey::All);
    assert!(snapshot.is_error());
    assert_eq!(snapshot.data().map(|d| d.len()), Some(1));
    assert!(!snapshot.fetching);
  }

  #[tokio::test]
  async fn test_collection_changed_event_invalidates() {
    let service = Arc::new(CountingService::new());
    let cache = ready_cache(service.clone());
    cache.fetch(&QueryKey::All).await.unwrap();

    cache.on_event(&Event::CollectionChanged {
      cause: MutationKind::Update,
    });

    assert!(cache.read(&QueryKey::All).invalidated);
  }

  #[tokio::test]
  async fn test_expired_entries_refetch_on_read() {
    let service = Arc::new(CountingService::new());
    let cache = QueryCache::new(ServiceHandle::ready(service.clone()), Some(Duration::zero()));
    cache.fetch(&QueryKey::All).await.unwrap();

    assert!(cache.read(&QueryKey::All).fetching);
    settle(&cache, &QueryKey::All).await;
    assert_eq!(service.calls("list"), 2);
  }
}
