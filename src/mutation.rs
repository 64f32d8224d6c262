//! Async mutation abstraction with observable state.
//!
//! Inspired by TanStack Query's mutations, a `Mutation<I, O>` wraps a write
//! operation and tracks its state as `Idle -> Pending -> Success | Error`.
//!
//! # Example
//!
//! ```ignore
//! let delete = Mutation::new("delete", move |id| {
//!     let handle = handle.clone();
//!     async move { handle.service()?.delete(id).await }
//! });
//!
//! // Wait for this call's own outcome
//! delete.mutate_async(7).await?;
//!
//! // Or fire and forget, watching the state from a render loop
//! delete.mutate(8);
//! match delete.state() {
//!     MutationState::Pending => render_spinner(),
//!     MutationState::Error(e) => render_error(e),
//!     _ => {}
//! }
//! ```

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::service::{ServiceError, ServiceResult};

/// The state of a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState<O> {
  /// Not started, or reset
  Idle,
  /// A call is running
  Pending,
  /// The latest call succeeded
  Success(O),
  /// The latest call failed
  Error(ServiceError),
}

impl<O> MutationState<O> {
  pub fn is_pending(&self) -> bool {
    matches!(self, MutationState::Pending)
  }
}

#[cfg(test)]
impl<O> MutationState<O> {
  pub fn is_idle(&self) -> bool {
    matches!(self, MutationState::Idle)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, MutationState::Success(_))
  }

  pub fn data(&self) -> Option<&O> {
    match self {
      MutationState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ServiceError> {
    match self {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type RunnerFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, ServiceResult<O>> + Send + Sync>;

struct Tracked<O> {
  state: MutationState<O>,
  /// Id of the most recently started call; only that call may set the state
  latest_call: u64,
}

/// A write operation with observable state.
///
/// Calls are not serialized: overlapping calls all run, each returns its own
/// result, and the observable state follows the most recently started one.
pub struct Mutation<I, O> {
  name: &'static str,
  runner: RunnerFn<I, O>,
  tracked: Arc<Mutex<Tracked<O>>>,
}

impl<I, O> Clone for Mutation<I, O> {
  fn clone(&self) -> Self {
    Self {
      name: self.name,
      runner: Arc::clone(&self.runner),
      tracked: Arc::clone(&self.tracked),
    }
  }
}

impl<I: Send + 'static, O: Clone + Send + 'static> Mutation<I, O> {
  /// Create a mutation around `runner`, called once per invocation.
  pub fn new<F, Fut>(name: &'static str, runner: F) -> Self
  where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ServiceResult<O>> + Send + 'static,
  {
    Self {
      name,
      runner: Arc::new(move |input| runner(input).boxed()),
      tracked: Arc::new(Mutex::new(Tracked {
        state: MutationState::Idle,
        latest_call: 0,
      })),
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Current state of the latest call
  pub fn state(&self) -> MutationState<O> {
    self.tracked().state.clone()
  }

  pub fn is_pending(&self) -> bool {
    self.tracked().state.is_pending()
  }

  /// Return to `Idle`. A call still running will not update the state.
  pub fn reset(&self) {
    let mut tracked = self.tracked();
    tracked.latest_call += 1;
    tracked.state = MutationState::Idle;
  }

  /// Run the mutation and wait for this call's own result
  pub async fn mutate_async(&self, input: I) -> ServiceResult<O> {
    let call = self.begin();
    let result = (self.runner)(input).await;
    self.finish(call, &result);
    result
  }

  /// Run the mutation on the runtime without waiting.
  ///
  /// The state is `Pending` as soon as this returns.
  pub fn mutate(&self, input: I) -> JoinHandle<ServiceResult<O>> {
    let call = self.begin();
    let future = (self.runner)(input);
    let this = self.clone();

    tokio::spawn(async move {
      let result = future.await;
      this.finish(call, &result);
      result
    })
  }

  fn tracked(&self) -> MutexGuard<'_, Tracked<O>> {
    self
      .tracked
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn begin(&self) -> u64 {
    let mut tracked = self.tracked();
    tracked.latest_call += 1;
    tracked.state = MutationState::Pending;
    tracked.latest_call
  }

  fn finish(&self, call: u64, result: &ServiceResult<O>) {
    let mut tracked = self.tracked();
    if tracked.latest_call != call {
      return;
    }
    tracked.state = match result {
      Ok(data) => MutationState::Success(data.clone()),
      Err(e) => MutationState::Error(e.clone()),
    };
  }
}

impl<I, O: std::fmt::Debug> std::fmt::Debug for Mutation<I, O> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self
      .tracked
      .lock()
      .map(|t| format!("{:?}", t.state))
      .unwrap_or_else(|_| "<poisoned>".to_string());
    f.debug_struct("Mutation")
      .field("name", &self.name)
      .field("state", &state)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;
  use tokio::sync::oneshot;

  #[tokio::test]
  async fn test_mutation_success() {
    let mutation = Mutation::new("double", |n: u32| async move { Ok(n * 2) });
    assert!(mutation.state().is_idle());

    assert_eq!(mutation.mutate_async(21).await, Ok(42));
    assert_eq!(mutation.state(), MutationState::Success(42));
  }

  #[tokio::test]
  async fn test_mutation_error() {
    let mutation: Mutation<u64, ()> =
      Mutation::new("delete", |id| async move { Err(ServiceError::NotFound(id)) });

    assert_eq!(mutation.mutate_async(5).await, Err(ServiceError::NotFound(5)));
    assert_eq!(mutation.state().error(), Some(&ServiceError::NotFound(5)));
  }

  #[tokio::test]
  async fn test_mutate_is_pending_until_done() {
    let mutation = Mutation::new("slow", |n: u32| async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok(n)
    });

    let handle = mutation.mutate(1);
    assert!(mutation.is_pending());

    assert_eq!(handle.await.unwrap(), Ok(1));
    assert_eq!(mutation.state().data(), Some(&1));
  }

  #[tokio::test]
  async fn test_overlapping_calls_report_independently() {
    let (release_first, first_gate) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(first_gate)));

    let mutation = Mutation::new("gated", move |n: u32| {
      let gate = gate.lock().unwrap().take();
      async move {
        if let Some(gate) = gate {
          let _ = gate.await;
          return Err(ServiceError::Remote(format!("call {} failed", n)));
        }
        Ok(n)
      }
    });

    let first = mutation.mutate(1);
    let second = mutation.mutate_async(2).await;
    assert_eq!(second, Ok(2));
    assert_eq!(mutation.state(), MutationState::Success(2));

    release_first.send(()).unwrap();
    assert_eq!(
      first.await.unwrap(),
      Err(ServiceError::Remote("call 1 failed".to_string()))
    );
    // The older call finishing does not overwrite the newer state
    assert_eq!(mutation.state(), MutationState::Success(2));
  }

  #[tokio::test]
  async fn test_reset_ignores_running_call() {
    let mutation = Mutation::new("slow", |n: u32| async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok(n)
    });

    let handle = mutation.mutate(3);
    mutation.reset();
    handle.await.unwrap().unwrap();
    assert!(mutation.state().is_idle());
  }
}
