//! # Todo API Runtime
//!
//! The [`Store`] owns a reducer's state and runs the effects it returns.
//!
//! - Actions are reduced one at a time, under the state's write lock.
//! - Effects run on spawned tasks. An action an effect produces is first
//!   broadcast to observers and then reduced like any other.
//! - [`Store::send_and_wait_for`] turns that loop into request/response: the
//!   caller subscribes, sends a command, and waits for the effect-produced
//!   action that answers it.
//!
//! ```ignore
//! use todo_api_runtime::Store;
//!
//! let store = Store::new(TodoState::new(), TodoReducer::new(), environment);
//!
//! let outcome = store
//!     .send_and_wait_for(command, |a| a.is_outcome_for(request_id), timeout)
//!     .await?;
//!
//! let count = store.state(|s| s.count()).await;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use todo_api_core::effect::{Effect, SnapshotOperation};
use todo_api_core::reducer::Reducer;
use tokio::sync::{broadcast, Notify, RwLock};

/// Store errors
pub mod error {
    use thiserror::Error;

    /// Why a store operation did not complete
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// [`Store::shutdown`](crate::Store::shutdown) was called; no new
        /// actions are accepted
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown gave up with this many effects still running
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// No matching action arrived within the caller's timeout
        #[error("Timeout waiting for action")]
        Timeout,

        /// The action broadcast channel is gone
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Default capacity of the action broadcast channel.
///
/// Every in-flight HTTP command holds one subscription, so this bounds how far
/// a slow handler can fall behind before it starts missing outcomes.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

type EffectFuture<A> = Pin<Box<dyn Future<Output = Option<A>> + Send>>;

/// Counts running effects and wakes shutdown when the count reaches zero
#[derive(Default)]
struct InFlight {
    running: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.running.fetch_add(1, Ordering::AcqRel);
        InFlightGuard(Arc::clone(self))
    }

    fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    async fn drained(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking, so a wake-up between the two is kept
            notified.as_mut().enable();
            if self.running() == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.running.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

struct Shared<S, A, E, R> {
    state: RwLock<S>,
    reducer: R,
    environment: E,
    closed: AtomicBool,
    in_flight: Arc<InFlight>,
    actions: broadcast::Sender<A>,
}

/// Runtime for one reducer: its state, its environment, and its effects
///
/// Cloning is cheap; clones share everything.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    shared: Arc<Shared<S, A, E, R>>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Clone + Send + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Creates a store with a [`DEFAULT_BROADCAST_CAPACITY`] action channel
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Creates a store whose action channel buffers `capacity` actions
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (actions, _) = broadcast::channel(capacity);

        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(initial_state),
                reducer,
                environment,
                closed: AtomicBool::new(false),
                in_flight: Arc::new(InFlight::default()),
                actions,
            }),
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.shared.in_flight.running()
    }

    /// Stops accepting actions and waits for running effects to finish
    ///
    /// Actions produced by effects that finish during shutdown are still
    /// broadcast, so callers already waiting get their answer.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownTimeout`] if effects are still running after
    /// `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.shared.closed.store(true, Ordering::Release);
        metrics::counter!("store.shutdown.initiated").increment(1);
        tracing::info!(pending_effects = self.pending_effects(), "Store shutting down");

        if tokio::time::timeout(timeout, self.shared.in_flight.drained())
            .await
            .is_ok()
        {
            tracing::info!("Store drained");
            return Ok(());
        }

        let pending = self.pending_effects();
        tracing::error!(pending_effects = pending, "Store shutdown timed out");
        metrics::counter!("store.shutdown.timeout").increment(1);
        Err(StoreError::ShutdownTimeout(pending))
    }

    /// Reduces `action` and starts its effects
    ///
    /// Returns once the effects are spawned, not when they finish. Concurrent
    /// calls are serialized by the state's write lock.
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownInProgress`] after [`Store::shutdown`].
    #[tracing::instrument(skip_all, name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.shared.closed.load(Ordering::Acquire) {
            metrics::counter!("store.shutdown.rejected_actions").increment(1);
            tracing::warn!("Rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("store.commands.total").increment(1);

        let effects = {
            let mut state = self.shared.state.write().await;
            let started = Instant::now();
            let effects = self
                .shared
                .reducer
                .reduce(&mut state, action, &self.shared.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(started.elapsed().as_secs_f64());
            effects
        };

        tracing::trace!(effects = effects.len(), "Reduced");
        for effect in effects {
            self.spawn_effect(effect);
        }

        Ok(())
    }

    /// Sends `action` and waits for the first effect-produced action
    /// matching `predicate`
    ///
    /// The caller subscribes before sending, so the answer cannot be missed.
    /// `action` itself is never broadcast; the reducer must answer it through
    /// an effect.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`]: the store no longer accepts actions
    /// - [`StoreError::Timeout`]: nothing matched within `timeout`
    /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut actions = self.shared.actions.subscribe();
        self.send(action).await?;

        let answer = async {
            loop {
                match actions.recv().await {
                    Ok(candidate) if predicate(&candidate) => return Ok(candidate),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // The answer may be among the skipped; the timeout covers that case
                        tracing::warn!(skipped, "Action observer lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => return Err(StoreError::ChannelClosed),
                }
            }
        };

        tokio::time::timeout(timeout, answer)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    /// Receives every action produced by an effect from now on
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.shared.actions.subscribe()
    }

    /// Reads state through `f` under the read lock
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        f(&*self.shared.state.read().await)
    }

    fn spawn_effect(&self, effect: Effect<A>) {
        let work: EffectFuture<A> = match effect {
            Effect::None => {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                return;
            },
            Effect::Future(future) => {
                metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                future
            },
            Effect::Snapshot(operation) => {
                metrics::counter!("store.effects.executed", "type" => "snapshot").increment(1);
                Box::pin(save_snapshot(operation))
            },
        };

        let guard = self.shared.in_flight.enter();
        let store = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Some(action) = work.await {
                store.feed_back(action).await;
            }
        });
    }

    async fn feed_back(&self, action: A) {
        // No receivers is fine: nobody is waiting
        let _ = self.shared.actions.send(action.clone());

        if let Err(error) = self.send(action).await {
            tracing::debug!(%error, "Effect result not reduced");
        }
    }
}

async fn save_snapshot<A>(operation: SnapshotOperation<A>) -> Option<A> {
    let SnapshotOperation::Save {
        snapshot_store,
        snapshot,
        on_success,
        on_error,
    } = operation;

    let revision = snapshot.revision;
    let bytes = snapshot.payload.len();

    match snapshot_store.save(snapshot).await {
        Ok(()) => {
            tracing::debug!(%revision, bytes, "Snapshot saved");
            on_success(())
        },
        Err(error) => {
            tracing::error!(%revision, %error, "Snapshot save failed");
            metrics::counter!("store.snapshot.failures").increment(1);
            on_error(error)
        },
    }
}
