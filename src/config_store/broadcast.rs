use std::{
    error::Error,
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;
use futures::Stream;
use tokio::{
    sync::mpsc::{self, Receiver},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, error, warn};

use super::ConfigChange;

/// Error returned by a change handler. Logged by the worker, never propagated.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Which keys a subscription is interested in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Changes to exactly this agent id.
    Exact(String),
    /// Changes to every key.
    All,
}

impl Scope {
    /// Shorthand for `Scope::Exact`.
    pub fn exact(key: impl Into<String>) -> Self {
        Self::Exact(key.into())
    }

    /// Returns true if a change to `key` should reach this scope.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == key,
            Self::All => true,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(key) => write!(f, "{key}"),
            Self::All => write!(f, "<all>"),
        }
    }
}

/// Receives configuration changes from the store's background worker.
///
/// Any `Fn(ConfigChange) -> impl Future<Output = Result<(), HandlerError>>`
/// closure implements this trait.
#[async_trait]
pub trait ChangeHandler: Send + Sync + 'static {
    /// Called once per matching change.
    ///
    /// # Errors
    /// Errors are logged by the worker and do not affect other handlers.
    async fn on_change(&self, change: ConfigChange) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> ChangeHandler for F
where
    F: Fn(ConfigChange) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn on_change(&self, change: ConfigChange) -> Result<(), HandlerError> {
        (self)(change).await
    }
}

/// Identifies a registered handler, for `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    scope: Scope,
    handler: Arc<dyn ChangeHandler>,
}

/// Outcome of delivering one change to its subscribers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DispatchReport {
    /// Handlers that returned `Ok`.
    pub(crate) delivered: usize,
    /// Handlers that returned an error, panicked or timed out.
    pub(crate) failed: usize,
}

#[derive(Default)]
struct Registrations {
    list: Vec<Registration>,
    closed: bool,
}

/// A spawned handler invocation, aborted if dropped before it finishes.
struct HandlerTask(JoinHandle<Result<(), HandlerError>>);

impl Drop for HandlerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Ordered set of change handlers keyed by scope.
#[derive(Clone)]
pub(crate) struct SubscriberRegistry {
    registrations: Arc<Mutex<Registrations>>,
    next_id: Arc<AtomicU64>,
    handler_timeout: Duration,
}

impl SubscriberRegistry {
    pub(crate) fn new(handler_timeout: Duration) -> Self {
        Self {
            registrations: Arc::new(Mutex::new(Registrations::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            handler_timeout,
        }
    }

    /// Adds a handler. Once the registry is closed the handler is dropped
    /// immediately, which closes a channel-backed subscription.
    pub(crate) fn register(&self, scope: Scope, handler: Arc<dyn ChangeHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut registrations = self.lock();

        if registrations.closed {
            debug!(?id, %scope, "Registry closed; handler dropped");
            return id;
        }

        debug!(?id, %scope, "Registering change handler");
        registrations.list.push(Registration { id, scope, handler });
        id
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut registrations = self.lock();

        let before = registrations.list.len();
        registrations.list.retain(|registration| registration.id != id);
        registrations.list.len() != before
    }

    /// Handlers for `key`: exact-key registrations first, then wildcard ones,
    /// each group in registration order.
    fn matching(&self, key: &str) -> Vec<(SubscriptionId, Arc<dyn ChangeHandler>)> {
        let registrations = self.lock();

        let exact = registrations
            .list
            .iter()
            .filter(|r| matches!(&r.scope, Scope::Exact(k) if k == key));
        let wildcard = registrations.list.iter().filter(|r| r.scope == Scope::All);

        exact
            .chain(wildcard)
            .map(|r| (r.id, r.handler.clone()))
            .collect()
    }

    /// Delivers a change to every matching handler, one at a time.
    ///
    /// Each handler runs in its own task so that a panic is contained; the
    /// task is awaited before the next handler starts. A handler still running
    /// after the handler timeout is aborted and counted as failed.
    pub(crate) async fn dispatch(&self, change: &ConfigChange) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (id, handler) in self.matching(&change.key) {
            let owned = change.clone();
            let mut task =
                HandlerTask(tokio::spawn(async move { handler.on_change(owned).await }));

            match timeout(self.handler_timeout, &mut task.0).await {
                Ok(Ok(Ok(()))) => report.delivered += 1,
                Ok(Ok(Err(e))) => {
                    warn!(?id, key = %change.key, error = %e, "Change handler failed");
                    report.failed += 1;
                }
                Ok(Err(e)) => {
                    error!(?id, key = %change.key, error = %e, "Change handler panicked");
                    report.failed += 1;
                }
                Err(_) => {
                    warn!(
                        ?id,
                        key = %change.key,
                        timeout = ?self.handler_timeout,
                        "Change handler timed out and was aborted"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Drops every registration and refuses new ones, closing channel-backed
    /// subscriptions both current and future.
    pub(crate) fn close(&self) {
        let mut registrations = self.lock();
        registrations.closed = true;
        registrations.list.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().list.len()
    }

    fn lock(&self) -> MutexGuard<'_, Registrations> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A channel-backed subscription that unregisters itself when dropped.
///
/// Created by `ConfigStore::watch`. Also usable as a `Stream` of changes.
/// A subscription opened on a stopped store is already closed.
pub struct Subscription {
    id: SubscriptionId,
    registry: SubscriberRegistry,
    receiver: Receiver<ConfigChange>,
}

impl Subscription {
    pub(crate) fn open(registry: &SubscriberRegistry, scope: Scope, capacity: usize) -> Self {
        let (tx, receiver) = mpsc::channel(capacity);

        let forward = move |change: ConfigChange| {
            let tx = tx.clone();
            async move { tx.try_send(change).map_err(HandlerError::from) }
        };

        let id = registry.register(scope, Arc::new(forward));

        Self {
            id,
            registry: registry.clone(),
            receiver,
        }
    }

    /// The id under which this subscription is registered.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Get a mutable reference to the receiver for configuration changes.
    pub fn receiver_mut(&mut self) -> &mut Receiver<ConfigChange> {
        &mut self.receiver
    }

    /// Waits for the next matching change.
    ///
    /// Returns `None` once the store has been stopped and the buffer is drained.
    pub async fn recv(&mut self) -> Option<ConfigChange> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = ConfigChange;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
