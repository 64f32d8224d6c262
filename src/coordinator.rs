//! Work order mutations that keep the cache in step with the service.

use futures::future::try_join_all;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::event::{Event, EventBus, MutationKind};
use crate::mutation::Mutation;
use crate::seed::{SEED_ORDERS, SEED_UPDATES};
use crate::service::{
  NewWorkOrder, ServiceError, ServiceHandle, ServiceResult, WorkOrderId, WorkOrderService,
  WorkOrderUpdate,
};

/// The write operations of the dashboard.
///
/// Each one fails fast with `Unavailable` when the service handle is not
/// established, and publishes `CollectionChanged` only after the service
/// reports success. Failures are returned untouched and publish nothing, so
/// the cache keeps serving what it has.
#[derive(Clone, Debug)]
pub struct WorkOrderMutations {
  pub create: Mutation<NewWorkOrder, WorkOrderId>,
  pub update: Mutation<(WorkOrderId, WorkOrderUpdate), ()>,
  pub delete: Mutation<WorkOrderId, ()>,
  /// Populate an empty service with demo orders, returning how many were
  /// created
  pub seed: Mutation<(), usize>,
}

impl WorkOrderMutations {
  pub fn new(handle: ServiceHandle, events: EventBus) -> Self {
    let create = coordinated(
      MutationKind::Create,
      handle.clone(),
      events.clone(),
      |service, order: NewWorkOrder| async move { service.create(order).await },
    );

    let update = coordinated(
      MutationKind::Update,
      handle.clone(),
      events.clone(),
      |service, (id, update): (WorkOrderId, WorkOrderUpdate)| async move {
        service.update(id, update).await
      },
    );

    let delete = coordinated(
      MutationKind::Delete,
      handle.clone(),
      events.clone(),
      |service, id: WorkOrderId| async move { service.delete(id).await },
    );

    let seed = Mutation::new(MutationKind::Seed.as_str(), move |()| {
      let handle = handle.clone();
      let events = events.clone();
      async move {
        let service = handle.service()?;
        let created = seed_if_empty(service.as_ref()).await.inspect_err(|e| {
          warn!(error = %e, "seeding failed");
        })?;

        if created > 0 {
          info!(created, "seeded work orders");
          events.publish(Event::CollectionChanged {
            cause: MutationKind::Seed,
          });
        }
        Ok(created)
      }
    });

    Self {
      create,
      update,
      delete,
      seed,
    }
  }

  /// Return every mutation to `Idle`
  pub fn reset(&self) {
    self.create.reset();
    self.update.reset();
    self.delete.reset();
    self.seed.reset();
  }
}

/// Wrap a single service call so that success publishes a collection change
fn coordinated<I, O, F, Fut>(
  kind: MutationKind,
  handle: ServiceHandle,
  events: EventBus,
  call: F,
) -> Mutation<I, O>
where
  I: Send + 'static,
  O: Clone + Send + std::fmt::Debug + 'static,
  F: Fn(Arc<dyn WorkOrderService>, I) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = ServiceResult<O>> + Send + 'static,
{
  let call = Arc::new(call);

  Mutation::new(kind.as_str(), move |input| {
    let handle = handle.clone();
    let events = events.clone();
    let call = Arc::clone(&call);
    async move {
      let service = handle.service().inspect_err(|_| {
        warn!(mutation = %kind, "service not ready, rejecting mutation");
      })?;

      match call(service, input).await {
        Ok(output) => {
          info!(mutation = %kind, ?output, "mutation succeeded");
          events.publish(Event::CollectionChanged { cause: kind });
          Ok(output)
        }
        Err(e) => {
          warn!(mutation = %kind, error = %e, "mutation failed");
          Err(e)
        }
      }
    }
  })
}

/// Create the demo orders and their follow-up edits if the service is empty
async fn seed_if_empty(service: &dyn WorkOrderService) -> ServiceResult<usize> {
  if !service.list().await?.is_empty() {
    return Ok(0);
  }

  let ids = try_join_all(SEED_ORDERS.iter().map(|order| service.create(order.to_new()))).await?;
  let ids = &ids;

  try_join_all(SEED_UPDATES.iter().map(|edit| async move {
    let order = SEED_ORDERS
      .get(edit.order)
      .ok_or_else(|| ServiceError::Remote(format!("No seed order at index {}", edit.order)))?;
    let id = *ids
      .get(edit.order)
      .ok_or_else(|| ServiceError::Remote(format!("No id for seed order {}", edit.order)))?;
    service.update(id, edit.to_update(order)).await
  }))
  .await?;

  Ok(ids.len())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{QueryCache, QueryKey};
  use crate::mutation::MutationState;
  use crate::service::testing::{new_order, CountingService};
  use std::time::Duration;

  struct Fixture {
    service: Arc<CountingService>,
    cache: QueryCache,
    mutations: WorkOrderMutations,
  }

  fn fixture(handle: ServiceHandle, service: Arc<CountingService>) -> Fixture {
    let events = EventBus::new();
    let cache = QueryCache::new(handle.clone(), None);
    events.subscribe(Arc::new(cache.clone()));
    Fixture {
      service,
      cache,
      mutations: WorkOrderMutations::new(handle, events),
    }
  }

  fn ready_fixture() -> Fixture {
    let service = Arc::new(CountingService::new());
    fixture(ServiceHandle::ready(service.clone()), service)
  }

  async fn wait_idle(cache: &QueryCache) {
    for _ in 0..200 {
      if cache.snapshots().iter().all(|(_, s)| !s.fetching) {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("cache never went idle");
  }

  #[tokio::test]
  async fn test_create_without_service_fails_fast() {
    let service = Arc::new(CountingService::new());
    let f = fixture(ServiceHandle::new(), service);

    let result = f
      .mutations
      .create
      .mutate_async(new_order("X", "Y", "2026-02-01"))
      .await;

    assert_eq!(result, Err(ServiceError::Unavailable));
    assert_eq!(f.service.calls("create"), 0);
    assert_eq!(
      f.mutations.create.state(),
      MutationState::Error(ServiceError::Unavailable)
    );
    assert!(f.cache.snapshots().is_empty());
  }

  #[tokio::test]
  async fn test_update_missing_id_does_not_invalidate() {
    let f = ready_fixture();
    f.service.create(new_order("Acme", "Bob", "2026-02-01")).await.unwrap();
    let order = f.cache.fetch(&QueryKey::All).await.unwrap()[0].clone();

    let update = WorkOrderUpdate::from_order(&order);
    let result = f.mutations.update.mutate_async((5, update)).await;

    assert_eq!(result, Err(ServiceError::NotFound(5)));
    let snapshot = f.cache.read(&QueryKey::All);
    assert!(!snapshot.invalidated);
    assert!(!snapshot.fetching);
    assert_eq!(f.service.calls("list"), 1);
  }

  #[tokio::test]
  async fn test_delete_missing_id_surfaces_not_found() {
    let f = ready_fixture();
    f.cache.fetch(&QueryKey::All).await.unwrap();

    assert_eq!(
      f.mutations.delete.mutate_async(99).await,
      Err(ServiceError::NotFound(99))
    );
    assert!(!f.cache.read(&QueryKey::All).invalidated);
  }

  #[tokio::test]
  async fn test_each_successful_mutation_causes_exactly_one_refetch() {
    let f = ready_fixture();
    f.cache.fetch(&QueryKey::All).await.unwrap();
    assert_eq!(f.service.calls("list"), 1);

    let id = f
      .mutations
      .create
      .mutate_async(new_order("Acme", "Bob", "2026-02-01"))
      .await
      .unwrap();

    // Several readers right after the mutation share one refetch
    for _ in 0..3 {
      assert!(f.cache.read(&QueryKey::All).fetching);
    }
    let (a, b) = tokio::join!(f.cache.fetch(&QueryKey::All), f.cache.fetch(&QueryKey::All));
    assert_eq!(a.unwrap().len(), 1);
    assert_eq!(b.unwrap().len(), 1);
    assert_eq!(f.service.calls("list"), 2);

    let mut update = WorkOrderUpdate::from_order(&f.service.get(id).await.unwrap());
    update.status = "Completed".into();
    f.mutations.update.mutate_async((id, update)).await.unwrap();
    let orders = f.cache.fetch(&QueryKey::All).await.unwrap();
    assert_eq!(orders[0].status.as_str(), "Completed");
    assert_eq!(f.service.calls("list"), 3);

    f.mutations.delete.mutate_async(id).await.unwrap();
    f.cache.read(&QueryKey::All);
    wait_idle(&f.cache).await;
    assert!(f.cache.read(&QueryKey::All).data().unwrap().is_empty());
    assert_eq!(f.service.calls("list"), 4);
  }

  #[tokio::test]
  async fn test_success_invalidates_filtered_keys() {
    let f = ready_fixture();
    let pending = QueryKey::ByStatus("Pending".to_string());
    f.cache.fetch(&pending).await.unwrap();

    f.mutations
      .create
      .mutate_async(new_order("Acme", "Bob", "2026-02-01"))
      .await
      .unwrap();

    assert!(f.cache.read(&pending).invalidated);
    assert_eq!(f.cache.fetch(&pending).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_concurrent_update_and_delete_report_independently() {
    let f = ready_fixture();
    let id = f
      .mutations
      .create
      .mutate_async(new_order("Acme", "Bob", "2026-02-01"))
      .await
      .unwrap();
    let update = WorkOrderUpdate::from_order(&f.service.get(id).await.unwrap());

    let (updated, deleted) = tokio::join!(
      f.mutations.update.mutate_async((id, update)),
      f.mutations.delete.mutate_async(id)
    );

    // Either order is acceptable, but the delete always lands
    assert!(deleted.is_ok());
    assert!(updated.is_ok() || updated == Err(ServiceError::NotFound(id)));
    assert!(f.mutations.delete.state().is_success());
  }

  #[tokio::test]
  async fn test_reset_returns_states_to_idle() {
    let f = ready_fixture();
    f.mutations.delete.mutate_async(42).await.unwrap_err();
    f.mutations
      .create
      .mutate_async(new_order("Acme", "Bob", "2026-02-01"))
      .await
      .unwrap();

    f.mutations.reset();
    assert!(f.mutations.create.state().is_idle());
    assert!(f.mutations.delete.state().is_idle());
  }

  #[tokio::test]
  async fn test_seed_populates_empty_service_once() {
    let f = ready_fixture();
    f.cache.fetch(&QueryKey::All).await.unwrap();

    assert_eq!(f.mutations.seed.mutate_async(()).await, Ok(5));
    let orders = f.cache.fetch(&QueryKey::All).await.unwrap();
    assert_eq!(orders.len(), 5);

    let status_of = |customer: &str| {
      orders
        .iter()
        .find(|o| o.customer_name == customer)
        .map(|o| o.status.as_str().to_string())
        .unwrap()
    };
    assert_eq!(status_of("Hartfield Construction Co."), "In Progress");
    assert_eq!(status_of("Summit Ridge Builders"), "Completed");
    assert_eq!(status_of("Broadstone Commercial Realty"), "Completed");
    assert_eq!(status_of("Lakewood Development Group"), "Pending");

    assert_eq!(f.mutations.seed.mutate_async(()).await, Ok(0));
    assert!(!f.cache.read(&QueryKey::All).invalidated);
    assert_eq!(f.service.calls("create"), 5);
  }
}
