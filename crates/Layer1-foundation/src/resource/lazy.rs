//! Lazy Resource - 비싼 클라이언트의 지연 초기화
//!
//! State machine: `Uninitialized → Initializing → Ready | Failed`.
//!
//! - The first `acquire` runs the initializer; callers that arrive while it
//!   runs wait for that attempt and share its outcome (same handle, or the
//!   same [`ResourceInitError`]), even if a later attempt has started by the
//!   time they wake.
//! - `Ready` is terminal: the handle is reused for the rest of the process.
//! - After `Failed`, the next new `acquire` starts another attempt.
//! - If the initializing future is dropped, the state falls back to
//!   `Uninitialized` and its waiters start over, so one of them can retry.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Initializer 반환 타입
pub type InitFuture<T> = BoxFuture<'static, anyhow::Result<Arc<T>>>;

type Initializer<T> = Arc<dyn Fn() -> InitFuture<T> + Send + Sync>;

type Outcome<T> = Result<Arc<T>, ResourceInitError>;

/// 리소스 초기화 실패
///
/// Shared verbatim by every caller that waited on the failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to initialize resource '{kind}' (attempt {attempt}): {reason}")]
pub struct ResourceInitError {
    pub kind: String,
    pub attempt: u64,
    pub reason: String,
}

impl ResourceInitError {
    pub fn new(kind: impl Into<String>, attempt: u64, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attempt,
            reason: reason.into(),
        }
    }
}

/// 외부에 노출되는 리소스 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

enum Slot<T: ?Sized> {
    Uninitialized,
    /// `outcome` yields `Some` once this attempt finishes; closed if abandoned
    Initializing {
        attempt: u64,
        outcome: watch::Receiver<Option<Outcome<T>>>,
    },
    Ready(Arc<T>),
    Failed,
}

struct State<T: ?Sized> {
    slot: Slot<T>,
    attempts: u64,
}

enum Action<T: ?Sized> {
    Done(Outcome<T>),
    Wait {
        attempt: u64,
        outcome: watch::Receiver<Option<Outcome<T>>>,
    },
    Build {
        attempt: u64,
        publish: watch::Sender<Option<Outcome<T>>>,
    },
}

/// 지연 초기화 싱글톤 리소스
///
/// # Example
///
/// ```rust,ignore
/// let generator: LazyResource<dyn Summarizer> = LazyResource::new("generator", || async {
///     let client = GeminiClient::from_env()?;
///     Ok(Arc::new(client) as Arc<dyn Summarizer>)
/// });
///
/// let handle = generator.acquire().await?;
/// ```
pub struct LazyResource<T: ?Sized> {
    kind: String,
    init: Initializer<T>,
    state: Mutex<State<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> LazyResource<T> {
    /// Create an uninitialized resource; nothing runs until `acquire`
    pub fn new<F, Fut>(kind: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Arc<T>>> + Send + 'static,
    {
        Self {
            kind: kind.into(),
            init: Arc::new(move || init().boxed()),
            state: Mutex::new(State {
                slot: Slot::Uninitialized,
                attempts: 0,
            }),
        }
    }

    /// Create a resource that is already `Ready`
    pub fn ready(kind: impl Into<String>, value: Arc<T>) -> Self {
        let kind = kind.into();
        let failed_kind = kind.clone();
        Self {
            kind,
            init: Arc::new(move || {
                let kind = failed_kind.clone();
                async move {
                    Err::<Arc<T>, _>(anyhow::anyhow!("resource '{}' was provided ready-made", kind))
                }
                    .boxed()
            }),
            state: Mutex::new(State {
                slot: Slot::Ready(value),
                attempts: 0,
            }),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn status(&self) -> ResourceStatus {
        match self.state.lock().slot {
            Slot::Uninitialized => ResourceStatus::Uninitialized,
            Slot::Initializing { .. } => ResourceStatus::Initializing,
            Slot::Ready(_) => ResourceStatus::Ready,
            Slot::Failed => ResourceStatus::Failed,
        }
    }

    /// Number of initialization attempts started so far
    pub fn attempts(&self) -> u64 {
        self.state.lock().attempts
    }

    /// The handle if already `Ready`; never starts initialization
    pub fn get(&self) -> Option<Arc<T>> {
        match &self.state.lock().slot {
            Slot::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Get the shared handle, initializing it on first use
    pub async fn acquire(&self) -> Result<Arc<T>, ResourceInitError> {
        loop {
            let action = {
                let mut state = self.state.lock();
                let settled = match &state.slot {
                    Slot::Ready(value) => Some(Action::Done(Ok(Arc::clone(value)))),
                    Slot::Initializing { attempt, outcome } => Some(Action::Wait {
                        attempt: *attempt,
                        outcome: outcome.clone(),
                    }),
                    Slot::Uninitialized | Slot::Failed => None,
                };
                settled.unwrap_or_else(|| {
                    let attempt = state.attempts + 1;
                    let (publish, outcome) = watch::channel(None);
                    state.attempts = attempt;
                    state.slot = Slot::Initializing { attempt, outcome };
                    Action::Build { attempt, publish }
                })
            };

            match action {
                Action::Done(result) => return result,
                Action::Wait {
                    attempt,
                    mut outcome,
                } => {
                    debug!(kind = %self.kind, attempt, "waiting for resource initialization");
                    let shared = outcome
                        .wait_for(Option::is_some)
                        .await
                        .map(|finished| finished.clone());
                    match shared {
                        Ok(Some(result)) => return result,
                        // abandoned: start over
                        _ => debug!(kind = %self.kind, attempt, "initialization abandoned, retrying"),
                    }
                }
                Action::Build { attempt, publish } => return self.initialize(attempt, publish).await,
            }
        }
    }

    async fn initialize(
        &self,
        attempt: u64,
        publish: watch::Sender<Option<Outcome<T>>>,
    ) -> Outcome<T> {
        let started = Instant::now();
        debug!(kind = %self.kind, attempt, "initializing shared resource");

        let mut guard = InitGuard {
            resource: self,
            attempt,
            armed: true,
            publish,
        };
        let outcome = (self.init)().await;
        guard.armed = false;

        let result = outcome.map_err(|e| ResourceInitError::new(&self.kind, attempt, format!("{e:#}")));
        self.state.lock().slot = match &result {
            Ok(value) => Slot::Ready(Arc::clone(value)),
            Err(_) => Slot::Failed,
        };
        guard.publish.send_replace(Some(result.clone()));

        match &result {
            Ok(_) => info!(
                kind = %self.kind,
                attempt,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "shared resource ready"
            ),
            Err(e) => warn!(kind = %self.kind, attempt, error = %e.reason, "shared resource failed to initialize"),
        }
        result
    }
}

impl<T: ?Sized> std::fmt::Debug for LazyResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        let status = match state.slot {
            Slot::Uninitialized => "Uninitialized",
            Slot::Initializing { .. } => "Initializing",
            Slot::Ready(_) => "Ready",
            Slot::Failed => "Failed",
        };
        f.debug_struct("LazyResource")
            .field("kind", &self.kind)
            .field("status", &status)
            .field("attempts", &state.attempts)
            .finish()
    }
}

/// Resets an abandoned `Initializing` state so waiters do not hang
///
/// The sender is dropped after the reset, which is what wakes the waiters.
struct InitGuard<'a, T: ?Sized> {
    resource: &'a LazyResource<T>,
    attempt: u64,
    armed: bool,
    publish: watch::Sender<Option<Outcome<T>>>,
}

impl<T: ?Sized> Drop for InitGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.resource.state.lock();
        if matches!(state.slot, Slot::Initializing { attempt, .. } if attempt == self.attempt) {
            state.slot = Slot::Uninitialized;
        }
        drop(state);
        warn!(kind = %self.resource.kind, attempt = self.attempt, "resource initialization abandoned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    trait Client: Send + Sync + std::fmt::Debug {
        fn id(&self) -> usize;
    }

    #[derive(Debug)]
    struct FakeClient(usize);

    impl Client for FakeClient {
        fn id(&self) -> usize {
            self.0
        }
    }

    fn counting_resource(
        calls: Arc<AtomicUsize>,
        fail: bool,
        delay: Duration,
    ) -> LazyResource<dyn Client> {
        LazyResource::new("client", move || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(delay).await;
                if fail {
                    anyhow::bail!("construction failed on call {}", n);
                }
                Ok(Arc::new(FakeClient(n)) as Arc<dyn Client>)
            }
        })
    }

    #[tokio::test]
    async fn test_initializes_once_and_reuses() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resource = counting_resource(Arc::clone(&calls), false, Duration::ZERO);

        assert_eq!(resource.status(), ResourceStatus::Uninitialized);
        assert!(resource.get().is_none());

        let first = resource.acquire().await.unwrap();
        let second = resource.acquire().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resource.status(), ResourceStatus::Ready);
        assert_eq!(resource.get().unwrap().id(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_single_construction() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resource = Arc::new(counting_resource(
            Arc::clone(&calls),
            false,
            Duration::from_millis(50),
        ));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let resource = Arc::clone(&resource);
                tokio::spawn(async move { resource.acquire().await })
            })
            .collect();

        let mut clients = Vec::new();
        for handle in handles {
            clients.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
        assert_eq!(resource.attempts(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_shares_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resource = Arc::new(counting_resource(
            Arc::clone(&calls),
            true,
            Duration::from_millis(50),
        ));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let resource = Arc::clone(&resource);
                tokio::spawn(async move { resource.acquire().await })
            })
            .collect();

        let mut errors = Vec::new();
        for handle in handles {
            errors.push(handle.await.unwrap().unwrap_err());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(errors.iter().all(|e| e == &errors[0]));
        assert_eq!(errors[0].kind, "client");
        assert_eq!(errors[0].attempt, 1);
        assert!(errors[0].reason.contains("construction failed"));
        assert_eq!(resource.status(), ResourceStatus::Failed);
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resource: LazyResource<dyn Client> = LazyResource::new("flaky", move || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 {
                    anyhow::bail!("first attempt fails");
                }
                Ok(Arc::new(FakeClient(n)) as Arc<dyn Client>)
            }
        });

        let err = resource.acquire().await.unwrap_err();
        assert_eq!(err.attempt, 1);

        let client = resource.acquire().await.unwrap();
        assert_eq!(client.id(), 2);
        assert_eq!(resource.attempts(), 2);

        // Ready is terminal
        resource.acquire().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_waiter_keeps_outcome_of_its_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resource: LazyResource<dyn Client> = LazyResource::new("flaky", move || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
                if n == 1 {
                    anyhow::bail!("first attempt fails");
                }
                Ok(Arc::new(FakeClient(n)) as Arc<dyn Client>)
            }
        });

        let mut builder = Box::pin(resource.acquire());
        assert!(futures::poll!(&mut builder).is_pending());
        let mut waiter = Box::pin(resource.acquire());
        assert!(futures::poll!(&mut waiter).is_pending());

        let first = builder.await.err().unwrap();
        assert_eq!(first.attempt, 1);

        // a newer attempt starts before the waiter observes the failure
        let mut retry = Box::pin(resource.acquire());
        assert!(futures::poll!(&mut retry).is_pending());
        assert_eq!(resource.attempts(), 2);

        let seen = waiter.await.err().unwrap();
        assert_eq!(seen, first);
        assert_eq!(retry.await.unwrap().id(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_abandoned_initialization_resets() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resource = counting_resource(Arc::clone(&calls), false, Duration::from_secs(60));

        let abandoned = tokio::time::timeout(Duration::from_millis(20), resource.acquire()).await;
        assert!(abandoned.is_err());
        assert_eq!(resource.status(), ResourceStatus::Uninitialized);
    }

    #[tokio::test]
    async fn test_ready_made() {
        let resource: LazyResource<dyn Client> =
            LazyResource::ready("fixed", Arc::new(FakeClient(7)) as Arc<dyn Client>);
        assert_eq!(resource.status(), ResourceStatus::Ready);
        assert_eq!(resource.acquire().await.unwrap().id(), 7);
        assert_eq!(resource.attempts(), 0);
    }
}
